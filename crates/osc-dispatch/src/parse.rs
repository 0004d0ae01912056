//! Value parsers for structured flag arguments.
//!
//! These are plain `fn(&str) -> Result<T, String>` functions so they can be
//! handed to clap's `value_parser` directly:
//!
//! ```rust,ignore
//! #[arg(long, value_parser = osc_dispatch::parse_key_value)]
//! property: Vec<(String, String)>,
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Parses `KEY=VALUE`. The value may be empty and may contain `=`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!(
            "Expected 'key=value' type, but got: {}",
            s
        )),
    }
}

/// Parses `KEY1=VALUE1,KEY2=VALUE2` with a fixed vocabulary of keys.
///
/// Every key in `required` must be present; any key outside `required` and
/// `optional` is rejected. Duplicate keys keep the last value.
pub fn parse_multi_key_value(
    s: &str,
    required: &[&str],
    optional: &[&str],
) -> Result<BTreeMap<String, String>, String> {
    let mut out = BTreeMap::new();
    for part in s.split(',').filter(|p| !p.is_empty()) {
        let (key, value) = parse_key_value(part)?;
        if !required.contains(&key.as_str()) && !optional.contains(&key.as_str()) {
            let mut valid: Vec<&str> = required.iter().chain(optional).copied().collect();
            valid.sort_unstable();
            return Err(format!(
                "Invalid keys {} specified.\nValid keys are: {}",
                key,
                valid.join(", ")
            ));
        }
        out.insert(key, value);
    }
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| !out.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "Missing required keys {}.\nRequired keys are: {}",
            missing.join(", "),
            required.join(", ")
        ));
    }
    Ok(out)
}

/// An inclusive port range, `MIN[:MAX]` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        Self {
            min: port,
            max: port,
        }
    }
}

impl FromStr for PortRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u16>()
                .map_err(|_| format!("Invalid port range '{}': ports must be 0-65535", s))
        };
        let range = match s.split_once(':') {
            Some((min, max)) => PortRange {
                min: parse(min)?,
                max: parse(max)?,
            },
            None => PortRange::single(parse(s)?),
        };
        if range.min > range.max {
            return Err(format!(
                "Invalid port range '{}': the first port must not exceed the second",
                s
            ));
        }
        Ok(range)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}:{}", self.min, self.max)
        }
    }
}

/// clap adapter for [`PortRange`].
pub fn parse_port_range(s: &str) -> Result<PortRange, String> {
    s.parse()
}
