//! Name-or-ID resolution of user supplied tokens.
//!
//! A token is first tried as an ID. When the ID lookup misses, the kind's
//! lookup attribute (usually `name`) is compared against the token over a
//! listing. Exactly one match resolves; none is [`Error::NotFound`]; more
//! than one is [`Error::AmbiguousName`]. Nothing is retried, and no partial
//! or case-insensitive matching is attempted.
//!
//! Security groups, their rules and floating IPs exist both in the network
//! service and in the legacy compute API. A [`DualKind`] carries both
//! descriptions and the [`Resolver`]'s [`Backend`] picks one.

use tracing::debug;

use crate::error::{Error, Result};
use crate::resource::{ResourceApi, ResourceHandle, ResourceKind, ResourceQuery};

/// Which API serves resources that exist in both network and compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Network,
    Compute,
}

impl Backend {
    pub fn is_network(&self) -> bool {
        matches!(self, Backend::Network)
    }
}

/// A resource that has a network and a legacy compute representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualKind {
    pub network: ResourceKind,
    pub compute: ResourceKind,
}

impl DualKind {
    pub const fn new(network: ResourceKind, compute: ResourceKind) -> Self {
        Self { network, compute }
    }

    /// Returns the description served by `backend`.
    pub fn select(&self, backend: Backend) -> &ResourceKind {
        match backend {
            Backend::Network => &self.network,
            Backend::Compute => &self.compute,
        }
    }
}

/// Resolves tokens against one backend.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    api: &'a dyn ResourceApi,
    backend: Backend,
}

impl<'a> Resolver<'a> {
    pub fn new(api: &'a dyn ResourceApi) -> Self {
        Self {
            api,
            backend: Backend::default(),
        }
    }

    /// Selects the backend used for [`DualKind`]s.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn selected_backend(&self) -> Backend {
        self.backend
    }

    /// Resolves a token of a single-backend kind.
    pub fn resolve(&self, kind: &ResourceKind, token: &str) -> Result<ResourceHandle> {
        resolve(self.api, kind, token)
    }

    /// Resolves a token of a dual-stack kind on the selected backend.
    pub fn resolve_dual(&self, kind: &DualKind, token: &str) -> Result<ResourceHandle> {
        resolve(self.api, kind.select(self.backend), token)
    }

    /// Resolves a token to its ID only.
    pub fn resolve_id(&self, kind: &ResourceKind, token: &str) -> Result<String> {
        self.resolve(kind, token).map(|h| h.id().to_string())
    }
}

/// Resolves `token` to exactly one resource of `kind`.
///
/// Makes one request when the token is an ID and two otherwise.
pub fn resolve(api: &dyn ResourceApi, kind: &ResourceKind, token: &str) -> Result<ResourceHandle> {
    if token.trim().is_empty() {
        return Err(Error::validation(format!(
            "A {} name or ID must not be empty",
            kind.noun
        )));
    }

    if let Some(handle) = api.get(kind, token)? {
        debug!(kind = kind.noun, token, "resolved by ID");
        return Ok(handle);
    }

    let not_found = || Error::NotFound {
        kind: kind.noun.to_string(),
        token: token.to_string(),
    };
    let Some(field) = kind.lookup_field else {
        return Err(not_found());
    };

    let query = if kind.server_filter {
        ResourceQuery::new().filter(field, token)
    } else {
        ResourceQuery::new()
    };
    let mut matches: Vec<ResourceHandle> = api
        .list(kind, &query)?
        .into_iter()
        .filter(|handle| handle.get_str(field) == Some(token))
        .collect();

    match matches.len() {
        0 => Err(not_found()),
        1 => {
            debug!(kind = kind.noun, token, field, "resolved by lookup field");
            Ok(matches.remove(0))
        }
        n => Err(Error::AmbiguousName {
            kind: kind.noun.to_string(),
            token: token.to_string(),
            matches: n,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::AttributePayload;
    use crate::resource::{Action, Service};
    use serde_json::{json, Value};
    use std::cell::RefCell;

    const NET_SG: ResourceKind = ResourceKind::new(
        Service::Network,
        "v2.0/security-groups",
        "security_group",
        "security_groups",
    )
    .nouns("security group", "security groups");
    const NOVA_SG: ResourceKind = ResourceKind::new(
        Service::Compute,
        "os-security-groups",
        "security_group",
        "security_groups",
    )
    .nouns("security group", "security groups")
    .client_filter();
    const RULE: ResourceKind = ResourceKind::new(
        Service::Network,
        "v2.0/security-group-rules",
        "security_group_rule",
        "security_group_rules",
    )
    .id_only();
    const SG: DualKind = DualKind::new(NET_SG, NOVA_SG);

    /// Minimal fake: a flat list of objects per path, plus a request log.
    struct FakeApi {
        items: Vec<(&'static str, Value)>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeApi {
        fn new(items: Vec<(&'static str, Value)>) -> Self {
            Self {
                items,
                requests: RefCell::new(Vec::new()),
            }
        }

        fn of(&self, kind: &ResourceKind) -> impl Iterator<Item = &Value> {
            let path = kind.path;
            self.items
                .iter()
                .filter(move |(p, _)| *p == path)
                .map(|(_, v)| v)
        }
    }

    impl ResourceApi for FakeApi {
        fn get(&self, kind: &ResourceKind, id: &str) -> Result<Option<ResourceHandle>> {
            self.requests.borrow_mut().push(format!("get {}", id));
            Ok(self
                .of(kind)
                .find(|v| v["id"] == json!(id))
                .map(|v| ResourceHandle::from_value(v.clone()).unwrap()))
        }

        fn list(&self, kind: &ResourceKind, query: &ResourceQuery) -> Result<Vec<ResourceHandle>> {
            let filter: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            self.requests
                .borrow_mut()
                .push(format!("list {}", filter.join("&")));
            Ok(self
                .of(kind)
                .map(|v| ResourceHandle::from_value(v.clone()).unwrap())
                .collect())
        }

        fn create(&self, _: &ResourceKind, _: &AttributePayload) -> Result<ResourceHandle> {
            unimplemented!()
        }

        fn update(
            &self,
            _: &ResourceKind,
            _: &str,
            _: &AttributePayload,
        ) -> Result<ResourceHandle> {
            unimplemented!()
        }

        fn delete(&self, _: &ResourceKind, _: &str, _: &ResourceQuery) -> Result<()> {
            unimplemented!()
        }

        fn action(&self, _: &ResourceKind, _: &str, _: &Action) -> Result<Option<ResourceHandle>> {
            unimplemented!()
        }
    }

    fn fixture() -> FakeApi {
        FakeApi::new(vec![
            ("v2.0/security-groups", json!({"id": "sg-1", "name": "web"})),
            ("v2.0/security-groups", json!({"id": "sg-2", "name": "db"})),
            ("v2.0/security-groups", json!({"id": "sg-3", "name": "db"})),
            ("os-security-groups", json!({"id": 7, "name": "legacy"})),
            ("v2.0/security-group-rules", json!({"id": "rule-1"})),
        ])
    }

    #[test]
    fn test_resolves_by_id_with_one_request() {
        let api = fixture();
        let handle = resolve(&api, &NET_SG, "sg-1").unwrap();
        assert_eq!(handle.id(), "sg-1");
        assert_eq!(*api.requests.borrow(), vec!["get sg-1"]);
    }

    #[test]
    fn test_resolves_by_name_after_id_miss() {
        let api = fixture();
        let handle = resolve(&api, &NET_SG, "web").unwrap();
        assert_eq!(handle.id(), "sg-1");
        assert_eq!(*api.requests.borrow(), vec!["get web", "list name=web"]);
    }

    #[test]
    fn test_not_found() {
        let api = fixture();
        let err = resolve(&api, &NET_SG, "missing").unwrap_err();
        assert_eq!(
            err,
            Error::NotFound {
                kind: "security group".into(),
                token: "missing".into()
            }
        );
    }

    #[test]
    fn test_ambiguous_name() {
        let api = fixture();
        let err = resolve(&api, &NET_SG, "db").unwrap_err();
        assert!(matches!(err, Error::AmbiguousName { matches: 2, .. }));
        assert!(err.to_string().contains("More than one security group"));
    }

    #[test]
    fn test_id_only_kind_never_lists() {
        let api = fixture();
        assert!(resolve(&api, &RULE, "rule-1").is_ok());
        let err = resolve(&api, &RULE, "some-name").unwrap_err();
        assert!(err.is_resolution());
        assert_eq!(
            *api.requests.borrow(),
            vec!["get rule-1", "get some-name"]
        );
    }

    #[test]
    fn test_client_filter_lists_without_query() {
        let api = fixture();
        let resolver = Resolver::new(&api).backend(Backend::Compute);
        let handle = resolver.resolve_dual(&SG, "legacy").unwrap();
        assert_eq!(handle.id(), "7");
        assert_eq!(*api.requests.borrow(), vec!["get legacy", "list "]);
    }

    #[test]
    fn test_dual_kind_selects_backend() {
        assert_eq!(SG.select(Backend::Network).path, "v2.0/security-groups");
        assert_eq!(SG.select(Backend::Compute).path, "os-security-groups");
    }

    #[test]
    fn test_empty_token_makes_no_request() {
        let api = fixture();
        let err = resolve(&api, &NET_SG, "  ").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(api.requests.borrow().is_empty());
    }

    #[test]
    fn test_resolve_id() {
        let api = fixture();
        let resolver = Resolver::new(&api);
        assert_eq!(resolver.resolve_id(&NET_SG, "web").unwrap(), "sg-1");
    }
}
