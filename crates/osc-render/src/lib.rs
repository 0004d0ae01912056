//! # osc-render: projection and output for `osc`
//!
//! Commands hand this crate JSON resources; it decides what the operator
//! sees.
//!
//! - [`ColumnSpec`] and [`Format`] describe which fields are shown, under
//!   which heading and how each value becomes text.
//! - [`project`] and [`Listing`] apply a spec to one or many resources. Every
//!   row has as many cells as there are headings; a missing field is an
//!   empty cell.
//! - [`render_listing`] and [`render_show`] turn projected data into a
//!   bordered table, bare values, JSON, YAML, CSV or shell assignments,
//!   honouring the formatter flags in [`OutputOptions`].
//!
//! ## Example
//!
//! ```rust
//! use osc_render::{render_listing, ColumnSpec, Format, Listing, OutputOptions};
//! use serde_json::json;
//!
//! let routers = vec![json!({"id": "r1", "name": "edge", "admin_state_up": true})];
//! let maps: Vec<_> = routers.iter().filter_map(|r| r.as_object()).collect();
//!
//! let spec = ColumnSpec::list(&[("id", "ID"), ("name", "Name"), ("admin_state_up", "State")])
//!     .format("admin_state_up", Format::AdminState);
//!
//! let options = OutputOptions { max_width: Some(80), ..OutputOptions::default() };
//! let table = render_listing(Listing::new(&spec, maps), &options).unwrap();
//! assert!(table.contains("| r1 | edge | UP    |"));
//! ```

mod column;
mod error;
mod output;
mod project;
pub mod tabular;

pub use column::{raw_text, Cell, ColumnSpec, Format};
pub use error::RenderError;
pub use output::{render_listing, render_show, write_output, OutputFormat, OutputOptions};
pub use project::{project, DisplayRow, Listing};
pub use tabular::{display_width, Table};
