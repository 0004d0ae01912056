//! Resource model and the backend trait for object-centric commands.
//!
//! This module provides the [`ResourceApi`] trait that connects commands to a
//! cloud. Commands never talk HTTP themselves: they describe *what* they want
//! with a [`ResourceKind`] and a [`ResourceQuery`] or [`AttributePayload`],
//! and the implementation decides how to reach the service. The trait is
//! sync-only, matching the one-request-at-a-time model of the client.
//!
//! # Example
//!
//! ```rust,ignore
//! use osc_dispatch::{ResourceApi, ResourceKind, ResourceQuery, Service};
//!
//! const ROUTER: ResourceKind =
//!     ResourceKind::new(Service::Network, "v2.0/routers", "router", "routers");
//!
//! fn list_routers(api: &dyn ResourceApi) -> osc_dispatch::Result<usize> {
//!     let query = ResourceQuery::new().filter("admin_state_up", "true");
//!     Ok(api.list(&ROUTER, &query)?.len())
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::attrs::AttributePayload;
use crate::error::{Error, Result};

/// The OpenStack service that owns a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    Compute,
    Network,
    Image,
    Identity,
    Volume,
}

impl Service {
    /// The service type as it appears in a service catalog.
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Compute => "compute",
            Service::Network => "network",
            Service::Image => "image",
            Service::Identity => "identity",
            Service::Volume => "volumev3",
        }
    }

    /// All known services, in catalog order.
    pub fn all() -> [Service; 5] {
        [
            Service::Compute,
            Service::Network,
            Service::Image,
            Service::Identity,
            Service::Volume,
        ]
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP verb used to update a resource in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    Put,
    Patch,
}

/// Static description of one kind of remote resource.
///
/// Kinds are declared as constants next to the commands that use them and
/// carry everything a transport needs to build requests, plus the nouns the
/// bulk coordinator uses in its messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKind {
    pub service: Service,
    /// Collection path relative to the service endpoint.
    pub path: &'static str,
    /// Envelope key for single resources (`{"router": {...}}`).
    pub singular: &'static str,
    /// Envelope key for collections (`{"routers": [...]}`).
    pub plural: &'static str,
    /// Human noun, e.g. `security group rule`.
    pub noun: &'static str,
    /// Human plural noun, e.g. `security group rules`.
    pub noun_plural: &'static str,
    /// Attribute compared against the token when the ID lookup misses.
    /// `None` means the kind can only be found by ID.
    pub lookup_field: Option<&'static str>,
    /// Whether the service accepts the lookup field as a list filter.
    pub server_filter: bool,
    /// Whether request and response bodies are wrapped in an envelope.
    pub enveloped: bool,
    pub update_method: UpdateMethod,
}

impl ResourceKind {
    /// Declares an enveloped, name-addressable kind updated with `PUT`.
    pub const fn new(
        service: Service,
        path: &'static str,
        singular: &'static str,
        plural: &'static str,
    ) -> Self {
        Self {
            service,
            path,
            singular,
            plural,
            noun: singular,
            noun_plural: plural,
            lookup_field: Some("name"),
            server_filter: true,
            enveloped: true,
            update_method: UpdateMethod::Put,
        }
    }

    /// Sets the human nouns used in messages.
    pub const fn nouns(mut self, noun: &'static str, noun_plural: &'static str) -> Self {
        self.noun = noun;
        self.noun_plural = noun_plural;
        self
    }

    /// Uses a different attribute than `name` for the fallback lookup.
    pub const fn lookup_by(mut self, field: &'static str) -> Self {
        self.lookup_field = Some(field);
        self
    }

    /// The kind can only be addressed by ID.
    pub const fn id_only(mut self) -> Self {
        self.lookup_field = None;
        self
    }

    /// The service ignores the lookup field as a filter; matching happens
    /// client side over the full listing.
    pub const fn client_filter(mut self) -> Self {
        self.server_filter = false;
        self
    }

    /// Bodies are bare objects rather than envelopes.
    pub const fn unenveloped(mut self) -> Self {
        self.enveloped = false;
        self
    }

    /// Updates use `PATCH` instead of `PUT`.
    pub const fn patch(mut self) -> Self {
        self.update_method = UpdateMethod::Patch;
        self
    }
}

/// A resolved, authoritative reference to a remote resource.
///
/// The handle owns the attributes the backend returned. Access goes through
/// [`get`](Self::get), which reports a missing field as `None` rather than
/// failing, so listings from older service versions never break on an
/// optional attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceHandle {
    id: String,
    attributes: Map<String, Value>,
}

impl ResourceHandle {
    /// Wraps a backend object. The object must carry an `id` attribute,
    /// either a string or a number (legacy compute resources use integers).
    pub fn new(attributes: Map<String, Value>) -> Result<Self> {
        let id = match attributes.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(Error::transport(
                    "response object does not carry an 'id' attribute",
                ))
            }
        };
        Ok(Self { id, attributes })
    }

    /// Wraps a JSON value, which must be an object with an `id`.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::new(map),
            other => Err(Error::transport(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// The canonical ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a field's value, or `None` when the backend did not send it.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    /// Returns a field as a string slice when it is a JSON string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Returns a field, or `default` when absent or null.
    pub fn get_or<'a>(&'a self, field: &str, default: &'a Value) -> &'a Value {
        match self.get(field) {
            Some(Value::Null) | None => default,
            Some(value) => value,
        }
    }

    /// The `name` attribute, if any.
    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// All attributes.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Consumes the handle, returning its attributes.
    pub fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }
}

impl Serialize for ResourceHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Query parameters for list and delete operations.
///
/// Filters are passed to the service as query-string parameters. Values are
/// kept as strings because that is how every OpenStack API receives them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    filters: BTreeMap<String, String>,
}

impl ResourceQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.filters.insert(key.into(), value.to_string());
        self
    }

    /// Adds a filter only when a value was supplied.
    pub fn filter_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.filter(key, value),
            None => self,
        }
    }

    /// Adds a boolean filter only when `flag` is set.
    pub fn filter_if(self, flag: bool, key: impl Into<String>, value: impl ToString) -> Self {
        if flag {
            self.filter(key, value)
        } else {
            self
        }
    }

    /// Returns a filter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    /// Iterates the filters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if this query has any filters.
    pub fn has_constraints(&self) -> bool {
        !self.filters.is_empty()
    }
}

/// HTTP verb of a resource action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A call on a sub-path of one resource, e.g.
/// `POST os-aggregates/{id}/action` or `GET qos-specs/{id}/associate`.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub method: Method,
    /// Path below the resource, e.g. `action`.
    pub path: &'static str,
    pub query: ResourceQuery,
    pub body: Option<Value>,
}

impl Action {
    /// A `POST` with a JSON body.
    pub fn post(path: &'static str, body: Value) -> Self {
        Self {
            method: Method::Post,
            path,
            query: ResourceQuery::new(),
            body: Some(body),
        }
    }

    /// A `PUT` with a JSON body.
    pub fn put(path: &'static str, body: Value) -> Self {
        Self {
            method: Method::Put,
            path,
            query: ResourceQuery::new(),
            body: Some(body),
        }
    }

    /// A bodiless `GET`.
    pub fn get(path: &'static str) -> Self {
        Self {
            method: Method::Get,
            path,
            query: ResourceQuery::new(),
            body: None,
        }
    }

    /// Attaches query parameters.
    pub fn query(mut self, query: ResourceQuery) -> Self {
        self.query = query;
        self
    }
}

/// Trait for cloud backends.
///
/// Implement this trait to connect commands to a cloud (the REST adapter in
/// the `osc` crate) or to a fake (the in-memory cloud in `osc-test`).
///
/// # Design Notes
///
/// - **Sync-only**: each call is one blocking request/response cycle.
///
/// - **Two-stage lookup**: [`get`](Self::get) returns `Ok(None)` when the ID
///   does not exist so the resolver can fall back to a name search.
///
/// - **Mapping payloads**: create and update receive an [`AttributePayload`]
///   that contains only the fields the user asked to set. Envelopes are the
///   implementation's concern.
pub trait ResourceApi {
    /// Fetches a resource by ID, returning `None` if it does not exist.
    fn get(&self, kind: &ResourceKind, id: &str) -> Result<Option<ResourceHandle>>;

    /// Lists resources matching the query.
    fn list(&self, kind: &ResourceKind, query: &ResourceQuery) -> Result<Vec<ResourceHandle>>;

    /// Creates a resource from the payload.
    fn create(&self, kind: &ResourceKind, payload: &AttributePayload) -> Result<ResourceHandle>;

    /// Updates the listed fields of a resource.
    fn update(
        &self,
        kind: &ResourceKind,
        id: &str,
        payload: &AttributePayload,
    ) -> Result<ResourceHandle>;

    /// Deletes a resource. The query carries flags such as `force`.
    fn delete(&self, kind: &ResourceKind, id: &str, query: &ResourceQuery) -> Result<()>;

    /// Invokes an action on a resource. Returns the updated resource when the
    /// service sends one back.
    fn action(
        &self,
        kind: &ResourceKind,
        id: &str,
        action: &Action,
    ) -> Result<Option<ResourceHandle>>;
}

impl<T: ResourceApi + ?Sized> ResourceApi for &T {
    fn get(&self, kind: &ResourceKind, id: &str) -> Result<Option<ResourceHandle>> {
        (**self).get(kind, id)
    }

    fn list(&self, kind: &ResourceKind, query: &ResourceQuery) -> Result<Vec<ResourceHandle>> {
        (**self).list(kind, query)
    }

    fn create(&self, kind: &ResourceKind, payload: &AttributePayload) -> Result<ResourceHandle> {
        (**self).create(kind, payload)
    }

    fn update(
        &self,
        kind: &ResourceKind,
        id: &str,
        payload: &AttributePayload,
    ) -> Result<ResourceHandle> {
        (**self).update(kind, id, payload)
    }

    fn delete(&self, kind: &ResourceKind, id: &str, query: &ResourceQuery) -> Result<()> {
        (**self).delete(kind, id, query)
    }

    fn action(
        &self,
        kind: &ResourceKind,
        id: &str,
        action: &Action,
    ) -> Result<Option<ResourceHandle>> {
        (**self).action(kind, id, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ROUTER: ResourceKind =
        ResourceKind::new(Service::Network, "v2.0/routers", "router", "routers");

    fn handle(value: Value) -> ResourceHandle {
        ResourceHandle::from_value(value).unwrap()
    }

    #[test]
    fn test_kind_defaults() {
        assert_eq!(ROUTER.noun, "router");
        assert_eq!(ROUTER.noun_plural, "routers");
        assert_eq!(ROUTER.lookup_field, Some("name"));
        assert!(ROUTER.enveloped);
        assert!(ROUTER.server_filter);
        assert_eq!(ROUTER.update_method, UpdateMethod::Put);
    }

    #[test]
    fn test_kind_builders() {
        let kind = ResourceKind::new(Service::Image, "v2/images", "image", "images")
            .unenveloped()
            .patch()
            .client_filter()
            .nouns("image", "images");
        assert!(!kind.enveloped);
        assert!(!kind.server_filter);
        assert_eq!(kind.update_method, UpdateMethod::Patch);

        let rule = ROUTER.id_only();
        assert_eq!(rule.lookup_field, None);
    }

    #[test]
    fn test_handle_string_id() {
        let h = handle(json!({"id": "abc", "name": "r1"}));
        assert_eq!(h.id(), "abc");
        assert_eq!(h.name(), Some("r1"));
    }

    #[test]
    fn test_handle_numeric_id() {
        let h = handle(json!({"id": 42, "name": "legacy"}));
        assert_eq!(h.id(), "42");
    }

    #[test]
    fn test_handle_requires_id() {
        assert!(ResourceHandle::from_value(json!({"name": "x"})).is_err());
        assert!(ResourceHandle::from_value(json!({"id": ""})).is_err());
        assert!(ResourceHandle::from_value(json!(["id"])).is_err());
    }

    #[test]
    fn test_handle_missing_field_is_none() {
        let h = handle(json!({"id": "abc"}));
        assert!(h.get("description").is_none());
        let default = json!("");
        assert_eq!(h.get_or("description", &default), &json!(""));
    }

    #[test]
    fn test_handle_null_uses_default() {
        let h = handle(json!({"id": "abc", "description": null}));
        let default = json!("n/a");
        assert_eq!(h.get_or("description", &default), &json!("n/a"));
    }

    #[test]
    fn test_handle_serializes_attributes() {
        let h = handle(json!({"id": "abc", "name": "r1"}));
        let value = serde_json::to_value(&h).unwrap();
        assert_eq!(value, json!({"id": "abc", "name": "r1"}));
    }

    #[test]
    fn test_resource_query_builder() {
        let query = ResourceQuery::new()
            .filter("name", "r1")
            .filter_opt("project_id", Some("p1"))
            .filter_opt::<&str>("status", None)
            .filter_if(true, "admin_state_up", true)
            .filter_if(false, "distributed", true);

        assert_eq!(query.get("name"), Some("r1"));
        assert_eq!(query.get("project_id"), Some("p1"));
        assert_eq!(query.get("status"), None);
        assert_eq!(query.get("admin_state_up"), Some("true"));
        assert_eq!(query.get("distributed"), None);
        assert!(query.has_constraints());
    }

    #[test]
    fn test_resource_query_empty() {
        let query = ResourceQuery::new();
        assert!(!query.has_constraints());
        assert_eq!(query.iter().count(), 0);
    }

    #[test]
    fn test_action_constructors() {
        let add = Action::post("action", json!({"add_host": {"host": "h1"}}));
        assert_eq!(add.method, Method::Post);
        assert_eq!(add.path, "action");

        let assoc = Action::get("associate").query(ResourceQuery::new().filter("vol_type_id", "t"));
        assert_eq!(assoc.method.as_str(), "GET");
        assert_eq!(assoc.query.get("vol_type_id"), Some("t"));
        assert!(assoc.body.is_none());
    }
}
