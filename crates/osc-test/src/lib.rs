//! In-process test support for `osc`.
//!
//! - [`MemoryCloud`]: a [`ResourceApi`] that keeps resources in memory,
//!   records every call and can be told to fail specific operations.
//! - [`RecordingSink`]: a [`FailureSink`] that keeps bulk failure records so
//!   tests can assert on them instead of scraping logs.
//!
//! # Example
//!
//! ```rust
//! use osc_dispatch::{ResourceApi, ResourceKind, ResourceQuery, Service};
//! use osc_test::{MemoryCloud, Op};
//! use serde_json::json;
//!
//! const ROUTER: ResourceKind =
//!     ResourceKind::new(Service::Network, "v2.0/routers", "router", "routers");
//!
//! let cloud = MemoryCloud::new().with(&ROUTER, json!({"id": "r1", "name": "edge"}));
//! let routers = cloud.list(&ROUTER, &ResourceQuery::new()).unwrap();
//!
//! assert_eq!(routers.len(), 1);
//! assert_eq!(cloud.calls_of(Op::List).len(), 1);
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Mutex;

use osc_dispatch::{
    Action, AttributePayload, Error, FailureRecord, FailureSink, Method, ResourceApi,
    ResourceHandle, ResourceKind, ResourceQuery, Result,
};
use serde_json::{Map, Value};

/// Operation kinds recorded by [`MemoryCloud`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Get,
    List,
    Create,
    Update,
    Delete,
    Action,
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: Op,
    /// Collection path of the kind, e.g. `v2.0/routers`.
    pub path: &'static str,
    pub id: Option<String>,
    pub query: Vec<(String, String)>,
    /// Payload for create/update, body for actions.
    pub body: Option<Value>,
    /// Sub-path and verb for actions, e.g. `POST action`.
    pub action: Option<String>,
}

struct Injected {
    op: Op,
    id: Option<String>,
    error: Error,
}

#[derive(Default)]
struct State {
    collections: BTreeMap<&'static str, Vec<Map<String, Value>>>,
    calls: Vec<Call>,
    failures: Vec<Injected>,
    next_id: u64,
}

/// An in-memory cloud.
///
/// Resources are stored per collection path, so two kinds that share a path
/// (e.g. a network and compute view declared separately) share data only if
/// their paths match.
#[derive(Default)]
pub struct MemoryCloud {
    state: RefCell<State>,
}

impl MemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a resource without recording a call.
    pub fn with(self, kind: &ResourceKind, resource: Value) -> Self {
        self.seed(kind, resource);
        self
    }

    /// Seeds a resource without recording a call.
    pub fn seed(&self, kind: &ResourceKind, resource: Value) {
        let Value::Object(map) = resource else {
            panic!("seeded resources must be JSON objects");
        };
        self.state
            .borrow_mut()
            .collections
            .entry(kind.path)
            .or_default()
            .push(map);
    }

    /// Makes every `op` on `id` (or on any ID when `None`) fail with `error`.
    ///
    /// Injected failures are checked before the operation touches state.
    pub fn fail(self, op: Op, id: Option<&str>, error: Error) -> Self {
        self.state.borrow_mut().failures.push(Injected {
            op,
            id: id.map(str::to_string),
            error,
        });
        self
    }

    /// Shorthand for failing deletes of one ID.
    pub fn fail_delete(self, id: &str, error: Error) -> Self {
        self.fail(Op::Delete, Some(id), error)
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Recorded calls of one kind of operation.
    pub fn calls_of(&self, op: Op) -> Vec<Call> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    /// IDs passed to successful and failed deletes, in call order.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.calls_of(Op::Delete)
            .into_iter()
            .filter_map(|c| c.id)
            .collect()
    }

    /// Forgets recorded calls, keeping resources.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Current resources of a kind.
    pub fn resources(&self, kind: &ResourceKind) -> Vec<Value> {
        self.state
            .borrow()
            .collections
            .get(kind.path)
            .map(|items| items.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// One resource by ID.
    pub fn find(&self, kind: &ResourceKind, id: &str) -> Option<Value> {
        self.resources(kind)
            .into_iter()
            .find(|r| id_of(r.as_object()) == Some(id.to_string()))
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let injected = state.failures.iter().find(|f| {
            f.op == call.op && (f.id.is_none() || f.id.as_deref() == call.id.as_deref())
        });
        let result = match injected {
            Some(f) => Err(f.error.clone()),
            None => Ok(()),
        };
        state.calls.push(call);
        result
    }

    fn call(op: Op, kind: &ResourceKind, id: Option<&str>) -> Call {
        Call {
            op,
            path: kind.path,
            id: id.map(str::to_string),
            query: Vec::new(),
            body: None,
            action: None,
        }
    }

    fn not_found(kind: &ResourceKind, id: &str) -> Error {
        Error::http(404, format!("{} {} could not be found.", kind.singular, id))
    }
}

fn id_of(map: Option<&Map<String, Value>>) -> Option<String> {
    match map?.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn query_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_query(map: &Map<String, Value>, query: &ResourceQuery) -> bool {
    query.iter().all(|(key, expected)| match map.get(key) {
        // Services ignore filters on attributes a resource does not carry.
        None => true,
        Some(Value::Array(items)) => items.iter().any(|v| query_string(v) == expected),
        Some(value) => query_string(value).eq_ignore_ascii_case(expected),
    })
}

impl ResourceApi for MemoryCloud {
    fn get(&self, kind: &ResourceKind, id: &str) -> Result<Option<ResourceHandle>> {
        self.record(Self::call(Op::Get, kind, Some(id)))?;
        self.find(kind, id)
            .map(ResourceHandle::from_value)
            .transpose()
    }

    fn list(&self, kind: &ResourceKind, query: &ResourceQuery) -> Result<Vec<ResourceHandle>> {
        let mut call = Self::call(Op::List, kind, None);
        call.query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.record(call)?;
        self.resources(kind)
            .into_iter()
            .filter(|r| r.as_object().is_some_and(|m| matches_query(m, query)))
            .map(ResourceHandle::from_value)
            .collect()
    }

    fn create(&self, kind: &ResourceKind, payload: &AttributePayload) -> Result<ResourceHandle> {
        let mut call = Self::call(Op::Create, kind, None);
        call.body = Some(payload.clone().into_value());
        self.record(call)?;

        let mut map = payload.as_map().clone();
        let mut state = self.state.borrow_mut();
        if !map.contains_key("id") {
            state.next_id += 1;
            map.insert(
                "id".to_string(),
                Value::String(format!("{}-{}", kind.singular, state.next_id)),
            );
        }
        state
            .collections
            .entry(kind.path)
            .or_default()
            .push(map.clone());
        ResourceHandle::new(map)
    }

    fn update(
        &self,
        kind: &ResourceKind,
        id: &str,
        payload: &AttributePayload,
    ) -> Result<ResourceHandle> {
        let mut call = Self::call(Op::Update, kind, Some(id));
        call.body = Some(payload.clone().into_value());
        self.record(call)?;

        let mut state = self.state.borrow_mut();
        let item = state
            .collections
            .get_mut(kind.path)
            .and_then(|items| {
                items
                    .iter_mut()
                    .find(|m| id_of(Some(&**m)) == Some(id.to_string()))
            })
            .ok_or_else(|| Self::not_found(kind, id))?;
        for (key, value) in payload.as_map() {
            item.insert(key.clone(), value.clone());
        }
        ResourceHandle::new(item.clone())
    }

    fn delete(&self, kind: &ResourceKind, id: &str, query: &ResourceQuery) -> Result<()> {
        let mut call = Self::call(Op::Delete, kind, Some(id));
        call.query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.record(call)?;

        let mut state = self.state.borrow_mut();
        let items = state.collections.entry(kind.path).or_default();
        let before = items.len();
        items.retain(|m| id_of(Some(m)) != Some(id.to_string()));
        if items.len() == before {
            return Err(Self::not_found(kind, id));
        }
        Ok(())
    }

    fn action(
        &self,
        kind: &ResourceKind,
        id: &str,
        action: &Action,
    ) -> Result<Option<ResourceHandle>> {
        let mut call = Self::call(Op::Action, kind, Some(id));
        call.body = action.body.clone();
        call.query = action
            .query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        call.action = Some(format!("{} {}", action.method.as_str(), action.path));
        self.record(call)?;

        let current = self
            .find(kind, id)
            .ok_or_else(|| Self::not_found(kind, id))?;
        if action.method == Method::Get {
            return Ok(None);
        }
        ResourceHandle::from_value(current).map(Some)
    }
}

/// A [`FailureSink`] that keeps what it receives.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<(String, String, FailureRecord)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded failures, in the order they were reported.
    pub fn records(&self) -> Vec<FailureRecord> {
        self.lock().iter().map(|(_, _, r)| r.clone()).collect()
    }

    /// Tokens of recorded failures, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|(_, _, r)| r.token.clone())
            .collect()
    }

    /// Log-style lines, as the default sink would phrase them.
    pub fn messages(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|(noun, verb, r)| {
                format!(
                    "Failed to {} {} with name or ID '{}': {}",
                    verb, noun, r.token, r.error
                )
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, String, FailureRecord)>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FailureSink for RecordingSink {
    fn record(&self, noun: &str, verb: &str, failure: &FailureRecord) {
        self.lock()
            .push((noun.to_string(), verb.to_string(), failure.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osc_dispatch::Service;
    use serde_json::json;

    const ROUTER: ResourceKind =
        ResourceKind::new(Service::Network, "v2.0/routers", "router", "routers");

    #[test]
    fn test_get_and_list() {
        let cloud = MemoryCloud::new()
            .with(&ROUTER, json!({"id": "r1", "name": "edge", "admin_state_up": true}))
            .with(&ROUTER, json!({"id": "r2", "name": "core", "admin_state_up": false}));

        assert!(cloud.get(&ROUTER, "r1").unwrap().is_some());
        assert!(cloud.get(&ROUTER, "nope").unwrap().is_none());

        let query = ResourceQuery::new().filter("admin_state_up", "True");
        let up = cloud.list(&ROUTER, &query).unwrap();
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].id(), "r1");
    }

    #[test]
    fn test_unknown_filter_is_ignored() {
        let cloud = MemoryCloud::new().with(&ROUTER, json!({"id": "r1"}));
        let all = cloud
            .list(&ROUTER, &ResourceQuery::new().filter("all_tenants", "1"))
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_create_assigns_id() {
        let cloud = MemoryCloud::new();
        let mut attrs = AttributePayload::new();
        attrs.set("name", "edge");
        let created = cloud.create(&ROUTER, &attrs).unwrap();
        assert_eq!(created.id(), "router-1");
        assert_eq!(cloud.resources(&ROUTER).len(), 1);
        assert_eq!(
            cloud.calls_of(Op::Create)[0].body,
            Some(json!({"name": "edge"}))
        );
    }

    #[test]
    fn test_update_merges() {
        let cloud = MemoryCloud::new().with(&ROUTER, json!({"id": "r1", "name": "edge"}));
        let mut attrs = AttributePayload::new();
        attrs.set("description", "d");
        let updated = cloud.update(&ROUTER, "r1", &attrs).unwrap();
        assert_eq!(updated.get_str("name"), Some("edge"));
        assert_eq!(updated.get_str("description"), Some("d"));
    }

    #[test]
    fn test_delete_missing_is_404() {
        let cloud = MemoryCloud::new();
        let err = cloud
            .delete(&ROUTER, "r9", &ResourceQuery::new())
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_injected_failure() {
        let cloud = MemoryCloud::new()
            .with(&ROUTER, json!({"id": "r1"}))
            .fail_delete("r1", Error::http(409, "in use"));
        let err = cloud
            .delete(&ROUTER, "r1", &ResourceQuery::new())
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(cloud.resources(&ROUTER).len(), 1);
        assert_eq!(cloud.deleted_ids(), vec!["r1"]);
    }

    #[test]
    fn test_action_recorded() {
        let cloud = MemoryCloud::new().with(&ROUTER, json!({"id": "r1"}));
        let result = cloud
            .action(&ROUTER, "r1", &Action::post("action", json!({"x": 1})))
            .unwrap();
        assert!(result.is_some());
        let call = &cloud.calls_of(Op::Action)[0];
        assert_eq!(call.action.as_deref(), Some("POST action"));
        assert_eq!(call.body, Some(json!({"x": 1})));
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.record(
            "router",
            "delete",
            &FailureRecord {
                token: "r1".into(),
                stage: osc_dispatch::Stage::Resolve,
                error: Error::NotFound {
                    kind: "router".into(),
                    token: "r1".into(),
                },
            },
        );
        assert_eq!(sink.tokens(), vec!["r1"]);
        assert_eq!(
            sink.messages(),
            vec![
                "Failed to delete router with name or ID 'r1': \
                 No router with a name or ID of 'r1' exists."
            ]
        );
    }
}
