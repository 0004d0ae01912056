//! Table layout: width resolution, wrapping and ASCII borders.

mod table;
mod util;

pub use table::{rendered_width, BorderChars, Table};
pub use util::{display_width, max_line_width, pad_right, wrap_to_width};
