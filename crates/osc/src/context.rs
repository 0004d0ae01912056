//! Command execution context and the handler trait.
//!
//! Every leaf command implements [`Run`]: it receives a [`Context`] with the
//! backend, the selected network/compute [`Backend`] and the failure sink, and
//! returns an [`Output`] describing what to print. Commands never print
//! themselves, so tests can run them against an in-memory cloud and inspect
//! the data.

use osc_dispatch::{
    Backend, BulkMutation, DualKind, FailureSink, Resolver, ResourceApi, ResourceHandle,
    ResourceKind, ResourceQuery, Result, TracingSink,
};
use osc_render::{project, ColumnSpec, DisplayRow, Listing};
use serde_json::{Map, Value};

/// What a command produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Rows of a list command.
    Listing(Listing),
    /// Fields of one resource.
    Show(DisplayRow),
    /// Nothing to print.
    Silent,
}

impl Output {
    /// Projects one resource through a show spec.
    pub fn show(resource: &ResourceHandle, spec: &ColumnSpec) -> Self {
        Output::Show(project(resource.attributes(), spec))
    }

    /// Projects resources through a list spec.
    pub fn list(resources: &[ResourceHandle], spec: &ColumnSpec) -> Self {
        Output::Listing(Listing::new(spec, resources.iter().map(|r| r.attributes())))
    }

    /// Projects raw attribute maps through a list spec.
    pub fn list_maps(resources: &[Map<String, Value>], spec: &ColumnSpec) -> Self {
        Output::Listing(Listing::new(spec, resources))
    }
}

/// A leaf command.
pub trait Run {
    fn run(&self, ctx: &Context<'_>) -> Result<Output>;
}

/// Everything a command needs from its environment.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub api: &'a dyn ResourceApi,
    pub backend: Backend,
    pub sink: &'a dyn FailureSink,
}

impl<'a> Context<'a> {
    /// A context on the network backend that logs bulk failures.
    pub fn new(api: &'a dyn ResourceApi) -> Self {
        Self {
            api,
            backend: Backend::Network,
            sink: &TracingSink,
        }
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn sink(mut self, sink: &'a dyn FailureSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn is_network(&self) -> bool {
        self.backend.is_network()
    }

    pub fn resolver(&self) -> Resolver<'a> {
        Resolver::new(self.api).backend(self.backend)
    }

    /// Resolves a token of a single-backend kind.
    pub fn find(&self, kind: &ResourceKind, token: &str) -> Result<ResourceHandle> {
        self.resolver().resolve(kind, token)
    }

    /// Resolves an optional token to its ID.
    pub fn find_id(&self, kind: &ResourceKind, token: Option<&str>) -> Result<Option<String>> {
        token
            .map(|t| self.resolver().resolve_id(kind, t))
            .transpose()
    }

    /// The description of a dual-stack kind on the selected backend.
    pub fn select(&self, kind: &'a DualKind) -> &'a ResourceKind {
        kind.select(self.backend)
    }

    /// A bulk mutation reporting to this context's sink.
    pub fn bulk(&self, kind: &ResourceKind, verb: &'a str) -> BulkMutation<'a> {
        BulkMutation::new(kind.noun, kind.noun_plural, verb).sink(self.sink)
    }

    /// Resolves and deletes every token of `kind`.
    pub fn delete_all(
        &self,
        kind: &ResourceKind,
        tokens: &[String],
        query: &ResourceQuery,
    ) -> Result<Output> {
        self.bulk(kind, "delete").apply(
            tokens,
            |token| self.find(kind, token),
            |resource| self.api.delete(kind, resource.id(), query),
        )?;
        Ok(Output::Silent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::ROUTER;
    use osc_test::{MemoryCloud, Op, RecordingSink};
    use serde_json::json;

    #[test]
    fn test_delete_all_reports_to_sink() {
        let cloud = MemoryCloud::new().with(&ROUTER, json!({"id": "r1", "name": "edge"}));
        let sink = RecordingSink::new();
        let ctx = Context::new(&cloud).sink(&sink);

        let tokens = ["edge".to_string(), "gone".to_string()];
        let err = ctx
            .delete_all(&ROUTER, &tokens, &ResourceQuery::new())
            .unwrap_err();

        assert_eq!(err.to_string(), "1 of 2 routers failed to delete.");
        assert_eq!(sink.tokens(), vec!["gone"]);
        assert_eq!(cloud.deleted_ids(), vec!["r1"]);
        assert_eq!(cloud.calls_of(Op::Delete).len(), 1);
    }

    #[test]
    fn test_find_id_skips_absent_token() {
        let cloud = MemoryCloud::new();
        let ctx = Context::new(&cloud);
        assert_eq!(ctx.find_id(&ROUTER, None).unwrap(), None);
        assert!(cloud.calls().is_empty());
    }
}
