//! Projection of resources into display rows.
//!
//! [`project`] turns one resource into a [`DisplayRow`]: headings and cells of
//! the same length, where a field the resource does not carry yields an empty
//! cell. [`Listing`] does the same for many resources with one shared set of
//! headings.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::column::{Cell, ColumnSpec};
use crate::error::RenderError;

/// Headings and cells of one projected resource.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    columns: Vec<String>,
    cells: Vec<Cell>,
}

/// Projects `resource` through `spec`.
pub fn project(resource: &Map<String, Value>, spec: &ColumnSpec) -> DisplayRow {
    let (columns, cells) = spec
        .fields_for(resource)
        .into_iter()
        .map(|(field, heading)| (heading, spec.format_of(&field).cell(&field, resource)))
        .unzip();
    DisplayRow { columns, cells }
}

impl DisplayRow {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The cell under `heading`.
    pub fn get(&self, heading: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .position(|c| c == heading)
            .map(|i| &self.cells[i])
    }

    /// Heading/cell pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.columns.iter().map(String::as_str).zip(&self.cells)
    }

    /// Keeps only the headings listed in `wanted`.
    pub fn select(self, wanted: &[String]) -> Result<Self, RenderError> {
        let keep = selection(&self.columns, wanted)?;
        let (columns, cells) = self
            .columns
            .into_iter()
            .zip(self.cells)
            .zip(keep)
            .filter_map(|(pair, keep)| keep.then_some(pair))
            .unzip();
        Ok(Self { columns, cells })
    }
}

/// Projected rows of a list command.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Listing {
    /// Projects every resource through a list spec.
    pub fn new<'a, I>(spec: &ColumnSpec, resources: I) -> Self
    where
        I: IntoIterator<Item = &'a Map<String, Value>>,
    {
        let fields = spec.fields_for(&Map::new());
        let columns = fields.iter().map(|(_, h)| h.clone()).collect();
        let rows = resources
            .into_iter()
            .map(|resource| {
                fields
                    .iter()
                    .map(|(field, _)| spec.format_of(field).cell(field, resource))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// A listing from already built cells.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keeps only the headings listed in `wanted`, in listing order.
    pub fn select(self, wanted: &[String]) -> Result<Self, RenderError> {
        let keep = selection(&self.columns, wanted)?;
        let pick = |items: Vec<Cell>| -> Vec<Cell> {
            items
                .into_iter()
                .zip(&keep)
                .filter_map(|(cell, keep)| keep.then_some(cell))
                .collect()
        };
        let columns = self
            .columns
            .into_iter()
            .zip(&keep)
            .filter_map(|(c, keep)| keep.then_some(c))
            .collect();
        let rows = self.rows.into_iter().map(pick).collect();
        Ok(Self { columns, rows })
    }

    /// Sorts rows by the given headings, in priority order. Headings that
    /// are not part of the listing are ignored.
    pub fn sort_by(&mut self, keys: &[String], descending: bool) {
        let indices: Vec<usize> = keys
            .iter()
            .filter_map(|k| self.columns.iter().position(|c| c == k))
            .collect();
        if indices.is_empty() {
            return;
        }
        self.rows.sort_by(|a, b| {
            let ordering = indices
                .iter()
                .map(|&i| compare_cells(&a[i], &b[i]))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a.value.as_f64(), b.value.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.text.cmp(&b.text),
    }
}

fn selection(columns: &[String], wanted: &[String]) -> Result<Vec<bool>, RenderError> {
    if wanted.is_empty() {
        return Ok(vec![true; columns.len()]);
    }
    let keep: Vec<bool> = columns.iter().map(|c| wanted.contains(c)).collect();
    if !keep.contains(&true) {
        return Err(RenderError::UnknownColumns {
            requested: wanted.to_vec(),
            available: columns.to_vec(),
        });
    }
    Ok(keep)
}
