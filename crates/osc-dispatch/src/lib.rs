//! Resource resolution, bulk mutation and attribute building for `osc`.
//!
//! `osc-dispatch` holds the pieces every `osc` command is made of, with no
//! knowledge of HTTP or of terminal output:
//!
//! - **Resource model**: [`ResourceKind`] describes a remote collection,
//!   [`ResourceHandle`] wraps one resolved object, [`ResourceApi`] is the
//!   backend seam.
//! - **Resolver**: [`Resolver`] turns a name-or-ID token into a handle, on the
//!   network or legacy compute [`Backend`] for [`DualKind`]s.
//! - **Bulk coordinator**: [`BulkMutation`] applies one mutation to many
//!   tokens and folds failures into a single [`Error::Batch`].
//! - **Attribute builder**: [`AttributePayload`] plus the exclusivity checks
//!   and the value parsers used by clap.
//!
//! # Delete Flow
//!
//! ```rust,ignore
//! use osc_dispatch::{BulkMutation, Resolver, ResourceQuery};
//!
//! let resolver = Resolver::new(api);
//! BulkMutation::delete(&ROUTER).apply(
//!     &args.routers,
//!     |token| resolver.resolve(&ROUTER, token),
//!     |router| api.delete(&ROUTER, router.id(), &ResourceQuery::new()),
//! )?;
//! ```

mod attrs;
mod bulk;
mod error;
mod parse;
mod resolve;
mod resource;

pub use attrs::{
    exactly_one, exclusive, require_changes, requires, AttributePayload, BuildAttributes,
};

pub use bulk::{BatchOutcome, BulkMutation, FailureRecord, FailureSink, Stage, TracingSink};

pub use error::{Error, Result};

pub use parse::{parse_key_value, parse_multi_key_value, parse_port_range, PortRange};

pub use resolve::{resolve, Backend, DualKind, Resolver};

pub use resource::{
    Action, Method, ResourceApi, ResourceHandle, ResourceKind, ResourceQuery, Service, UpdateMethod,
};
