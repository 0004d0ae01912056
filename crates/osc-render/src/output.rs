//! Output formats and the formatter options shared by every command.
//!
//! [`OutputFormat`] is the value of the `-f/--format` flag. Table and value
//! formats print cell text; JSON, YAML and CSV serialize cell values, so
//! `admin_state_up` is `UP` in a table but `true` in JSON.
//!
//! List commands produce a [`Listing`], show commands a [`DisplayRow`]:
//!
//! | format | list | show |
//! |--------|------|------|
//! | table  | one row per resource | `Field`/`Value` rows |
//! | value  | space separated rows | one value per line |
//! | json / yaml | array of objects | one object |
//! | csv    | header and rows | n/a |
//! | shell  | n/a | `name="value"` lines |

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::project::{DisplayRow, Listing};
use crate::tabular::Table;

/// Value of the `-f/--format` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Value,
    Json,
    Yaml,
    Csv,
    Shell,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Value => "value",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Csv => "csv",
            OutputFormat::Shell => "shell",
        }
    }

    pub fn all() -> [OutputFormat; 6] {
        [
            OutputFormat::Table,
            OutputFormat::Value,
            OutputFormat::Json,
            OutputFormat::Yaml,
            OutputFormat::Csv,
            OutputFormat::Shell,
        ]
    }

    /// Returns true for formats that serialize values instead of text.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            OutputFormat::Json | OutputFormat::Yaml | OutputFormat::Csv
        )
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::all()
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = OutputFormat::all().iter().map(|f| f.as_str()).collect();
                format!("invalid choice: '{}' (choose from {})", s, names.join(", "))
            })
    }
}

/// Formatter flags of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// `-c` headings; empty means all.
    pub columns: Vec<String>,
    /// `--max-width`; `None` or `0` means automatic.
    pub max_width: Option<usize>,
    pub fit_width: bool,
    pub sort_columns: Vec<String>,
    pub sort_descending: bool,
    pub noindent: bool,
    /// `--prefix` for shell output.
    pub prefix: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            columns: Vec::new(),
            max_width: None,
            fit_width: false,
            sort_columns: Vec::new(),
            sort_descending: false,
            noindent: false,
            prefix: String::new(),
        }
    }
}

impl OutputOptions {
    pub fn with_format(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Width limit for tables: an explicit `--max-width`, else the terminal
    /// width when fitting was requested or stdout is a terminal.
    pub fn table_width(&self) -> Option<usize> {
        match self.max_width {
            Some(width) if width > 0 => Some(width),
            _ if self.fit_width || atty::is(atty::Stream::Stdout) => terminal_width(),
            _ => None,
        }
    }
}

fn terminal_width() -> Option<usize> {
    terminal_size::terminal_size().map(|(terminal_size::Width(w), _)| w as usize)
}

/// Renders the result of a list command.
pub fn render_listing(
    mut listing: Listing,
    options: &OutputOptions,
) -> Result<String, RenderError> {
    listing.sort_by(&options.sort_columns, options.sort_descending);
    let listing = listing.select(&options.columns)?;
    let texts: Vec<Vec<&str>> = listing
        .rows()
        .iter()
        .map(|row| row.iter().map(|c| c.text.as_str()).collect())
        .collect();

    match options.format {
        OutputFormat::Table => Ok(Table::new(listing.columns().to_vec())
            .max_width(options.table_width())
            .render(&texts)),
        OutputFormat::Value => Ok(texts
            .iter()
            .map(|row| row.join(" "))
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json | OutputFormat::Yaml => {
            let objects: Vec<Value> = listing
                .rows()
                .iter()
                .map(|row| {
                    let map: Map<String, Value> = listing
                        .columns()
                        .iter()
                        .cloned()
                        .zip(row.iter().map(|c| c.value.clone()))
                        .collect();
                    Value::Object(map)
                })
                .collect();
            serialize(&Value::Array(objects), options)
        }
        OutputFormat::Csv => {
            let mut writer = csv::WriterBuilder::new()
                .quote_style(csv::QuoteStyle::NonNumeric)
                .from_writer(Vec::new());
            writer.write_record(listing.columns())?;
            for row in &texts {
                writer.write_record(row)?;
            }
            let bytes = writer.into_inner()?;
            Ok(String::from_utf8(bytes)?.trim_end().to_string())
        }
        OutputFormat::Shell => Err(RenderError::UnsupportedFormat {
            format: options.format.to_string(),
            shape: "list",
        }),
    }
}

/// Renders the result of a show, create or set command.
pub fn render_show(row: DisplayRow, options: &OutputOptions) -> Result<String, RenderError> {
    let row = row.select(&options.columns)?;

    match options.format {
        OutputFormat::Table => {
            let rows: Vec<Vec<&str>> = row
                .iter()
                .map(|(heading, cell)| vec![heading, cell.text.as_str()])
                .collect();
            Ok(Table::new(["Field", "Value"])
                .max_width(options.table_width())
                .render(&rows))
        }
        OutputFormat::Value => Ok(row
            .cells()
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json | OutputFormat::Yaml => {
            let map: Map<String, Value> = row
                .iter()
                .map(|(heading, cell)| (heading.to_string(), cell.value.clone()))
                .collect();
            serialize(&Value::Object(map), options)
        }
        OutputFormat::Shell => Ok(row
            .iter()
            .map(|(heading, cell)| {
                format!(
                    "{}{}=\"{}\"",
                    options.prefix,
                    shell_name(heading),
                    cell.text.replace('"', "\\\"")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Csv => Err(RenderError::UnsupportedFormat {
            format: options.format.to_string(),
            shape: "show",
        }),
    }
}

fn serialize(value: &Value, options: &OutputOptions) -> Result<String, RenderError> {
    match options.format {
        OutputFormat::Json if options.noindent => Ok(serde_json::to_string(value)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        _ => Ok(serde_yaml::to_string(value)?.trim_end().to_string()),
    }
}

/// Shell variable name for a heading.
fn shell_name(heading: &str) -> String {
    heading
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Writes rendered output followed by a newline; empty output writes
/// nothing.
pub fn write_output<W: Write>(out: &mut W, rendered: &str) -> Result<(), RenderError> {
    if !rendered.is_empty() {
        writeln!(out, "{}", rendered)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnSpec, Format};
    use crate::project::project;
    use serde_json::json;

    fn router() -> Map<String, Value> {
        let router = json!({
            "id": "r1",
            "name": "edge",
            "admin_state_up": true,
            "description": "say \"hi\""
        });
        match router {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    fn listing() -> Listing {
        let spec = ColumnSpec::list(&[
            ("id", "ID"),
            ("name", "Name"),
            ("admin_state_up", "State"),
        ])
        .format("admin_state_up", Format::AdminState);
        Listing::new(&spec, [&router()])
    }

    fn options(format: OutputFormat) -> OutputOptions {
        OutputOptions {
            max_width: Some(200),
            ..OutputOptions::with_format(format)
        }
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("yaml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("xml".parse::<OutputFormat>().unwrap_err().contains("choose from"));
    }

    #[test]
    fn test_listing_table() {
        let out = render_listing(listing(), &options(OutputFormat::Table)).unwrap();
        assert!(out.contains("| ID | Name | State |"));
        assert!(out.contains("| r1 | edge | UP    |"));
    }

    #[test]
    fn test_listing_json_uses_values() {
        let out = render_listing(listing(), &options(OutputFormat::Json)).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!([{"ID": "r1", "Name": "edge", "State": true}]));
    }

    #[test]
    fn test_listing_csv() {
        let out = render_listing(listing(), &options(OutputFormat::Csv)).unwrap();
        assert_eq!(out, "\"ID\",\"Name\",\"State\"\n\"r1\",\"edge\",\"UP\"");
    }

    #[test]
    fn test_listing_value_with_columns() {
        let mut opts = options(OutputFormat::Value);
        opts.columns = vec!["ID".into()];
        assert_eq!(render_listing(listing(), &opts).unwrap(), "r1");
    }

    #[test]
    fn test_show_table() {
        let row = project(&router(), &ColumnSpec::show().hide("description"));
        let out = render_show(row, &options(OutputFormat::Table)).unwrap();
        assert!(out.starts_with("+----------------+-------+\n| Field          | Value |"));
        assert!(out.contains("| admin_state_up | True  |"));
    }

    #[test]
    fn test_show_shell_escapes_quotes() {
        let mut opts = options(OutputFormat::Shell);
        opts.prefix = "r_".into();
        opts.columns = vec!["description".into(), "id".into()];
        let row = project(&router(), &ColumnSpec::show());
        assert_eq!(
            render_show(row, &opts).unwrap(),
            "r_description=\"say \\\"hi\\\"\"\nr_id=\"r1\""
        );
    }

    #[test]
    fn test_show_yaml() {
        let mut opts = options(OutputFormat::Yaml);
        opts.columns = vec!["id".into(), "name".into()];
        let row = project(&router(), &ColumnSpec::show());
        assert_eq!(render_show(row, &opts).unwrap(), "id: r1\nname: edge");
    }

    #[test]
    fn test_unsupported_shapes() {
        assert!(render_listing(listing(), &options(OutputFormat::Shell)).is_err());
        let row = project(&router(), &ColumnSpec::show());
        assert!(render_show(row, &options(OutputFormat::Csv)).is_err());
    }

    #[test]
    fn test_write_output_skips_empty() {
        let mut buf = Vec::new();
        write_output(&mut buf, "").unwrap();
        assert!(buf.is_empty());
        write_output(&mut buf, "x").unwrap();
        assert_eq!(buf, b"x\n");
    }
}
