//! Attribute payloads built from parsed command-line flags.
//!
//! An [`AttributePayload`] starts empty and only grows when a flag was
//! explicitly supplied, so a `set` command never resets a server-side field
//! the user did not mention. Flag groups that clap cannot keep apart (because
//! their exclusivity depends on another flag) are checked with
//! [`exclusive`] and friends before anything is built.
//!
//! # Example
//!
//! ```rust
//! use osc_dispatch::{exclusive, AttributePayload};
//!
//! let name: Option<String> = Some("edge".into());
//! let description: Option<String> = None;
//! let (enable, disable) = (true, false);
//!
//! exclusive(&[("--enable", enable), ("--disable", disable)])?;
//!
//! let mut attrs = AttributePayload::new();
//! attrs
//!     .set_opt("name", name)
//!     .set_opt("description", description)
//!     .set_toggle("admin_state_up", enable, disable);
//!
//! assert_eq!(attrs.len(), 2);
//! assert!(!attrs.contains("description"));
//! # Ok::<(), osc_dispatch::Error>(())
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Mapping from backend field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributePayload {
    fields: Map<String, Value>,
}

impl AttributePayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field unconditionally.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Sets a field only when a value was supplied.
    pub fn set_opt<V: Into<Value>>(
        &mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    /// Sets a field only when `condition` holds.
    pub fn set_if(
        &mut self,
        condition: bool,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        if condition {
            self.set(key, value);
        }
        self
    }

    /// Maps an `--on`/`--off` flag pair to a boolean field.
    ///
    /// `on` sets `true`, `off` sets `false`, neither leaves the field out.
    /// Callers check exclusivity first; when both are set `off` wins.
    pub fn set_toggle(&mut self, key: impl Into<String>, on: bool, off: bool) -> &mut Self {
        let key = key.into();
        if on {
            self.set(key.clone(), true);
        }
        if off {
            self.set(key, false);
        }
        self
    }

    /// Sets a field to an object built from key/value pairs, when any were
    /// supplied.
    pub fn set_properties<'a, I>(&mut self, key: impl Into<String>, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        let map: Map<String, Value> = pairs
            .into_iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        if !map.is_empty() {
            self.set(key, Value::Object(map));
        }
        self
    }

    /// Copies every pair as a top-level string field.
    pub fn extend_properties<'a, I>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        for (k, v) in pairs {
            self.set(k.clone(), v.clone());
        }
        self
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Converts the payload into a JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for AttributePayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Value)> for AttributePayload {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Builds the request payload of a create or set command from its parsed
/// flags.
///
/// Implementations validate flag combinations first and perform no I/O.
pub trait BuildAttributes {
    fn build_attributes(&self) -> Result<AttributePayload>;
}

/// Fails when more than one flag of a mutually exclusive group was given.
///
/// Each entry is the flag's user-facing name and whether it was supplied.
/// The error names the first two offending flags the way argument parsers
/// do.
pub fn exclusive(group: &[(&str, bool)]) -> Result<()> {
    let mut given = group.iter().filter(|(_, present)| *present);
    if let (Some((first, _)), Some((second, _))) = (given.next(), given.next()) {
        return Err(Error::validation(format!(
            "argument {}: not allowed with argument {}",
            second, first
        )));
    }
    Ok(())
}

/// Fails unless exactly one flag of the group was given.
pub fn exactly_one(group: &[(&str, bool)]) -> Result<()> {
    exclusive(group)?;
    if group.iter().any(|(_, present)| *present) {
        return Ok(());
    }
    let names: Vec<&str> = group.iter().map(|(name, _)| *name).collect();
    Err(Error::validation(format!(
        "one of the arguments {} is required",
        names.join(" ")
    )))
}

/// Fails when `flag` was given without `dependency`.
pub fn requires(flag: (&str, bool), dependency: (&str, bool)) -> Result<()> {
    if flag.1 && !dependency.1 {
        return Err(Error::validation(format!(
            "Argument {} required with argument {}",
            dependency.0, flag.0
        )));
    }
    Ok(())
}

/// Fails when a `set` or `unset` command was given nothing to change.
pub fn require_changes(payload: &AttributePayload, command: &str) -> Result<()> {
    if payload.is_empty() {
        return Err(Error::validation(format!(
            "{}: at least one attribute to change must be given",
            command
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_opt_skips_none() {
        let mut attrs = AttributePayload::new();
        attrs
            .set_opt("name", Some("r1"))
            .set_opt::<String>("description", None);
        assert_eq!(attrs.as_map().len(), 1);
        assert_eq!(attrs.get_str("name"), Some("r1"));
        assert!(!attrs.contains("description"));
    }

    #[test]
    fn test_set_opt_keeps_falsy_values() {
        let mut attrs = AttributePayload::new();
        attrs
            .set_opt("description", Some(""))
            .set_opt("ha", Some(false));
        assert_eq!(attrs.get("description"), Some(&json!("")));
        assert_eq!(attrs.get("ha"), Some(&json!(false)));
    }

    #[test]
    fn test_set_toggle() {
        let mut attrs = AttributePayload::new();
        attrs.set_toggle("a", true, false);
        attrs.set_toggle("b", false, true);
        attrs.set_toggle("c", false, false);
        assert_eq!(attrs.get("a"), Some(&json!(true)));
        assert_eq!(attrs.get("b"), Some(&json!(false)));
        assert!(!attrs.contains("c"));
    }

    #[test]
    fn test_set_properties() {
        let pairs = vec![("k1".to_string(), "v1".to_string())];
        let mut attrs = AttributePayload::new();
        attrs.set_properties("metadata", &pairs);
        attrs.set_properties("empty", &Vec::new());
        assert_eq!(attrs.get("metadata"), Some(&json!({"k1": "v1"})));
        assert!(!attrs.contains("empty"));
    }

    #[test]
    fn test_extend_properties() {
        let pairs = vec![
            ("read_iops_sec".to_string(), "100".to_string()),
            ("write_iops_sec".to_string(), "50".to_string()),
        ];
        let mut attrs = AttributePayload::new();
        attrs.set("name", "gold").extend_properties(&pairs);
        assert_eq!(
            attrs.into_value(),
            json!({"name": "gold", "read_iops_sec": "100", "write_iops_sec": "50"})
        );
    }

    #[test]
    fn test_exclusive_allows_single() {
        assert!(exclusive(&[("--a", true), ("--b", false), ("--c", false)]).is_ok());
        assert!(exclusive(&[("--a", false), ("--b", false)]).is_ok());
    }

    #[test]
    fn test_exclusive_names_conflict() {
        let err = exclusive(&[("--remote-ip", true), ("--remote-group", true)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument --remote-group: not allowed with argument --remote-ip"
        );
    }

    #[test]
    fn test_exactly_one_requires_a_flag() {
        let flags = [
            ("--target-project", false),
            ("--target-all-projects", false),
        ];
        let message = exactly_one(&flags).unwrap_err().to_string();
        assert!(message.contains("--target-project --target-all-projects"));
        assert!(exactly_one(&[("--x", true), ("--y", false)]).is_ok());
    }

    #[test]
    fn test_requires() {
        let err = requires(("--icmp-code", true), ("--icmp-type", false)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Argument --icmp-type required with argument --icmp-code"
        );
        assert!(requires(("--icmp-code", true), ("--icmp-type", true)).is_ok());
        assert!(requires(("--icmp-code", false), ("--icmp-type", false)).is_ok());
    }

    #[test]
    fn test_require_changes() {
        let attrs = AttributePayload::new();
        assert!(require_changes(&attrs, "router set").is_err());
    }
}
