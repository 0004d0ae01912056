//! Column specifications and per-field formatters.
//!
//! A [`ColumnSpec`] says which resource fields become display columns, under
//! which heading and through which [`Format`]. List commands declare an
//! explicit column order with [`ColumnSpec::list`]; show commands start from
//! every field the resource carries with [`ColumnSpec::show`] and only add
//! renames, hidden fields and formatters.
//!
//! ```rust
//! use osc_render::{ColumnSpec, Format};
//!
//! let list = ColumnSpec::list(&[("id", "ID"), ("name", "Name"), ("admin_state_up", "State")])
//!     .format("admin_state_up", Format::AdminState);
//!
//! let show = ColumnSpec::show()
//!     .hide("location")
//!     .rename("tenant_id", "project_id")
//!     .format("tags", Format::List);
//! # let _ = (list, show);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};

/// How a field value becomes cell text.
#[derive(Clone, Copy)]
pub enum Format {
    /// Scalars as-is, booleans as `True`/`False`, lists and mappings with
    /// the [`List`](Format::List) and [`Dict`](Format::Dict) rules.
    Raw,
    /// Comma-joined list, `a, b, c`.
    List,
    /// Mapping as `k1='v1', k2='v2'`, keys sorted.
    Dict,
    /// List of mappings, one [`Dict`](Format::Dict) per line.
    DictList,
    /// `True` / `False`.
    Bool,
    /// `UP` / `DOWN`.
    AdminState,
    /// Any other rendering of the field value.
    Custom(fn(&Value) -> String),
    /// A value derived from the whole resource rather than one field.
    Computed(fn(&Map<String, Value>) -> Value),
}

impl std::fmt::Debug for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Format::Raw => "Raw",
            Format::List => "List",
            Format::Dict => "Dict",
            Format::DictList => "DictList",
            Format::Bool => "Bool",
            Format::AdminState => "AdminState",
            Format::Custom(_) => "Custom",
            Format::Computed(_) => "Computed",
        };
        f.write_str(name)
    }
}

impl Format {
    /// Builds the cell for one field of `resource`.
    pub fn cell(&self, field: &str, resource: &Map<String, Value>) -> Cell {
        if let Format::Computed(derive) = self {
            let value = derive(resource);
            return Cell {
                text: raw_text(&value),
                value,
            };
        }
        match resource.get(field) {
            None | Some(Value::Null) => Cell::empty(),
            Some(value) => Cell {
                text: self.text(value),
                value: value.clone(),
            },
        }
    }

    fn text(&self, value: &Value) -> String {
        match (self, value) {
            (Format::List, Value::Array(items)) => list_text(items),
            (Format::Dict, Value::Object(map)) => dict_text(map),
            (Format::DictList, Value::Array(items)) => items
                .iter()
                .map(raw_text)
                .collect::<Vec<_>>()
                .join("\n"),
            (Format::AdminState, Value::Bool(true)) => "UP".to_string(),
            (Format::AdminState, Value::Bool(false)) => "DOWN".to_string(),
            (Format::Custom(render), value) => render(value),
            _ => raw_text(value),
        }
    }
}

/// Default text of a JSON value.
pub fn raw_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => list_text(items),
        Value::Object(map) => dict_text(map),
    }
}

fn list_text(items: &[Value]) -> String {
    items.iter().map(raw_text).collect::<Vec<_>>().join(", ")
}

fn dict_text(map: &Map<String, Value>) -> String {
    let mut pairs: Vec<(&String, &Value)> = map.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}='{}'", k, raw_text(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One projected value: the text shown in tables and the value used by
/// structured formats.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub value: Value,
}

impl Cell {
    /// The cell of an absent field.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            value: Value::Null,
        }
    }

    /// A plain text cell.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            value: Value::String(text.clone()),
            text,
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

/// Field list, renames, hidden fields and formatters for one command.
#[derive(Debug, Clone, Default)]
pub struct ColumnSpec {
    /// Explicit `(field, heading)` order. Empty for show specs.
    columns: Vec<(String, String)>,
    /// Whether all resource fields are shown.
    all_fields: bool,
    renames: BTreeMap<String, String>,
    hidden: BTreeSet<String>,
    formats: BTreeMap<String, Format>,
}

impl ColumnSpec {
    /// Fixed column order, as `(field, heading)` pairs.
    pub fn list(columns: &[(&str, &str)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|(f, h)| (f.to_string(), h.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Every field of the resource, sorted by display name.
    pub fn show() -> Self {
        Self {
            all_fields: true,
            ..Self::default()
        }
    }

    /// Appends a column to a list spec, or adds a field that the resource
    /// may not carry (e.g. a computed one) to a show spec.
    pub fn column(mut self, field: &str, heading: &str) -> Self {
        self.columns.push((field.to_string(), heading.to_string()));
        self
    }

    /// Appends columns only when `long` is set, as `--long` does.
    pub fn long(mut self, long: bool, columns: &[(&str, &str)]) -> Self {
        if long {
            for (field, heading) in columns {
                self = self.column(field, heading);
            }
        }
        self
    }

    /// Displays `field` under another name.
    pub fn rename(mut self, field: &str, heading: &str) -> Self {
        self.renames.insert(field.to_string(), heading.to_string());
        self
    }

    /// Never displays `field`.
    pub fn hide(mut self, field: &str) -> Self {
        self.hidden.insert(field.to_string());
        self
    }

    /// Formats `field` with `format`.
    pub fn format(mut self, field: &str, format: Format) -> Self {
        self.formats.insert(field.to_string(), format);
        self
    }

    pub fn is_show(&self) -> bool {
        self.all_fields
    }

    /// Headings of a list spec, in order.
    pub fn headings(&self) -> Vec<String> {
        self.columns.iter().map(|(_, h)| h.clone()).collect()
    }

    fn heading_of(&self, name: &str) -> String {
        self.renames
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Resolves the `(field, heading)` pairs to project for `resource`.
    pub(crate) fn fields_for(&self, resource: &Map<String, Value>) -> Vec<(String, String)> {
        if !self.all_fields {
            return self
                .columns
                .iter()
                .cloned()
                .collect();
        }
        let mut fields: BTreeMap<String, String> = resource
            .keys()
            .filter(|k| !self.hidden.contains(*k))
            .map(|k| (self.heading_of(k), k.clone()))
            .collect();
        for (field, heading) in &self.columns {
            if !self.hidden.contains(field) {
                fields.insert(heading.clone(), field.clone());
            }
        }
        fields
            .into_iter()
            .map(|(heading, field)| (field, heading))
            .collect()
    }

    pub(crate) fn format_of(&self, field: &str) -> Format {
        self.formats.get(field).copied().unwrap_or(Format::Raw)
    }
}
