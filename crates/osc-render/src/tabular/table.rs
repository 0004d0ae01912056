//! Bordered ASCII tables.
//!
//! ```text
//! +----+------+
//! | ID | Name |
//! +----+------+
//! | r1 | edge |
//! +----+------+
//! ```
//!
//! Column widths start at the widest cell (or heading) of each column. When a
//! maximum width is set and the table does not fit, the widest column is
//! narrowed one step at a time and its cells wrap.

use super::util::{display_width, max_line_width, pad_right, wrap_to_width};

/// Characters used to draw a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BorderChars {
    pub horizontal: char,
    pub vertical: char,
    pub joint: char,
}

impl Default for BorderChars {
    fn default() -> Self {
        Self {
            horizontal: '-',
            vertical: '|',
            joint: '+',
        }
    }
}

/// A table with a header row and a width limit.
#[derive(Clone, Debug)]
pub struct Table {
    headers: Vec<String>,
    max_width: Option<usize>,
    border: BorderChars,
}

impl Table {
    /// Creates a table with the given headings.
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(headers: I) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            max_width: None,
            border: BorderChars::default(),
        }
    }

    /// Limits the rendered width, borders included.
    pub fn max_width(mut self, max_width: Option<usize>) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn border(mut self, border: BorderChars) -> Self {
        self.border = border;
        self
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    /// Width taken by borders and padding for `columns` columns.
    fn overhead(columns: usize) -> usize {
        3 * columns + 1
    }

    /// Resolves the content width of every column.
    pub fn resolve_widths<S: AsRef<str>>(&self, rows: &[Vec<S>]) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| max_line_width(h)).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(max_line_width(cell.as_ref()));
            }
        }

        let Some(limit) = self.max_width else {
            return widths;
        };
        let available = limit
            .saturating_sub(Self::overhead(widths.len()))
            .max(widths.len());
        while widths.iter().sum::<usize>() > available {
            let Some(widest) = widths
                .iter()
                .enumerate()
                .max_by_key(|(i, w)| (**w, usize::MAX - *i))
                .map(|(i, _)| i)
            else {
                break;
            };
            if widths[widest] <= 1 {
                break;
            }
            widths[widest] -= 1;
        }
        widths
    }

    /// Horizontal separator line.
    pub fn separator_row(&self, widths: &[usize]) -> String {
        let mut line = String::new();
        line.push(self.border.joint);
        for width in widths {
            line.extend(std::iter::repeat_n(self.border.horizontal, width + 2));
            line.push(self.border.joint);
        }
        line
    }

    /// Formats one logical row, which may span several lines.
    pub fn row<S: AsRef<str>>(&self, cells: &[S], widths: &[usize]) -> Vec<String> {
        let wrapped: Vec<Vec<String>> = widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let text = cells.get(i).map(AsRef::as_ref).unwrap_or("");
                wrap_to_width(text, *width)
            })
            .collect();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);

        (0..height)
            .map(|line_no| {
                let mut line = String::new();
                line.push(self.border.vertical);
                for (lines, width) in wrapped.iter().zip(widths) {
                    let text = lines.get(line_no).map(String::as_str).unwrap_or("");
                    line.push(' ');
                    line.push_str(&pad_right(text, *width));
                    line.push(' ');
                    line.push(self.border.vertical);
                }
                line
            })
            .collect()
    }

    /// Renders the header and all rows.
    pub fn render<S: AsRef<str>>(&self, rows: &[Vec<S>]) -> String {
        let widths = self.resolve_widths(rows);
        let separator = self.separator_row(&widths);

        let mut output = vec![separator.clone()];
        output.extend(self.row(&self.headers, &widths));
        output.push(separator.clone());
        for row in rows {
            output.extend(self.row(row, &widths));
        }
        if !rows.is_empty() {
            output.push(separator);
        }
        output.join("\n")
    }

    /// Total rendered width for the given content widths.
    pub fn total_width(widths: &[usize]) -> usize {
        widths.iter().sum::<usize>() + Self::overhead(widths.len())
    }
}

/// Width of the widest line of a rendered table.
pub fn rendered_width(table: &str) -> usize {
    table.lines().map(display_width).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic() {
        let table = Table::new(["ID", "Name"]);
        let out = table.render(&[vec!["r1", "edge"], vec!["r22", "core"]]);
        assert_eq!(
            out,
            "+-----+------+\n\
             | ID  | Name |\n\
             +-----+------+\n\
             | r1  | edge |\n\
             | r22 | core |\n\
             +-----+------+"
        );
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let rows: Vec<Vec<&str>> = Vec::new();
        let out = Table::new(["ID"]).render(&rows);
        assert_eq!(out, "+----+\n| ID |\n+----+");
    }

    #[test]
    fn test_multiline_cells() {
        let table = Table::new(["Field", "Value"]);
        let out = table.render(&[vec!["routes", "a\nbb"]]);
        assert!(out.contains("| routes | a     |\n|        | bb    |"));
    }

    #[test]
    fn test_max_width_shrinks_widest_column() {
        let table = Table::new(["ID", "Description"]).max_width(Some(20));
        let rows = vec![vec!["1", "a fairly long description here"]];
        let widths = table.resolve_widths(&rows);
        assert_eq!(widths, vec![2, 11]);
        let out = table.render(&rows);
        assert!(rendered_width(&out) <= 20);
        assert!(out.contains("description"));
    }

    #[test]
    fn test_total_width() {
        assert_eq!(Table::total_width(&[2, 4]), 13);
    }
}
