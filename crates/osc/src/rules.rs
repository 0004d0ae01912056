//! Security group rule attributes.
//!
//! Rule creation derives several fields from each other, always in this
//! order:
//!
//! 1. the protocol is normalised (`any` means no protocol);
//! 2. the ethertype follows the protocol unless given (`IPv6` for IPv6-only
//!    protocols, `IPv4` otherwise), and `icmp` on IPv6 becomes `ipv6-icmp`;
//! 3. without any remote flag, the remote prefix defaults to the ethertype's
//!    catch-all (`0.0.0.0/0` or `::/0`).
//!
//! Port ranges are shared between TCP/UDP ports and ICMP type/code: for ICMP
//! rules `port_range_min` carries the type and `port_range_max` the code.

use clap::{Args, ValueEnum};
use osc_dispatch::{exclusive, requires, AttributePayload, Error, PortRange, Result};
use serde_json::{Map, Value};

const ICMP_PROTOCOLS: &[&str] = &["icmp", "ipv6-icmp", "icmpv6", "1", "58"];

const IPV6_PROTOCOLS: &[&str] = &[
    "ipv6-icmp",
    "icmpv6",
    "ipv6-encap",
    "ipv6-frag",
    "ipv6-nonxt",
    "ipv6-opts",
    "ipv6-route",
    "41",
    "43",
    "44",
    "58",
    "59",
    "60",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Ethertype {
    #[value(name = "IPv4")]
    Ipv4,
    #[value(name = "IPv6")]
    Ipv6,
}

impl Ethertype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ethertype::Ipv4 => "IPv4",
            Ethertype::Ipv6 => "IPv6",
        }
    }

    /// Remote prefix matching every address of the family.
    pub fn any_prefix(&self) -> &'static str {
        match self {
            Ethertype::Ipv4 => "0.0.0.0/0",
            Ethertype::Ipv6 => "::/0",
        }
    }
}

pub fn is_icmp(protocol: Option<&str>) -> bool {
    protocol.is_some_and(|p| ICMP_PROTOCOLS.contains(&p))
}

pub fn is_ipv6_protocol(protocol: Option<&str>) -> bool {
    protocol.is_some_and(|p| IPV6_PROTOCOLS.contains(&p))
}

/// Lowercases a protocol, substituting `default` when none was given.
/// `any` yields no protocol at all.
pub fn normalize_protocol(protocol: Option<&str>, default: &str) -> Option<String> {
    let protocol = protocol.unwrap_or(default).to_ascii_lowercase();
    (protocol != "any").then_some(protocol)
}

/// The ethertype of a rule: the explicit one, else the protocol's family.
pub fn ethertype_for(explicit: Option<Ethertype>, protocol: Option<&str>) -> Ethertype {
    match explicit {
        Some(ethertype) => ethertype,
        None if is_ipv6_protocol(protocol) => Ethertype::Ipv6,
        None => Ethertype::Ipv4,
    }
}

/// Display form of a rule's port range.
///
/// `MIN:MAX` (or `MIN` when both are equal) for port protocols,
/// `type=T:code=C` for ICMP, empty when the rule has no range.
pub fn format_port_range(protocol: Option<&str>, min: Option<i64>, max: Option<i64>) -> String {
    if is_icmp(protocol) {
        return match (min, max) {
            (Some(t), Some(c)) if t >= 0 && c >= 0 => format!("type={}:code={}", t, c),
            (Some(t), _) if t >= 0 => format!("type={}", t),
            _ => String::new(),
        };
    }
    match (min, max) {
        (Some(min), Some(max)) if min == max => min.to_string(),
        (Some(min), Some(max)) => format!("{}:{}", min, max),
        (Some(min), None) => min.to_string(),
        _ => String::new(),
    }
}

/// Port range column of a network rule.
pub fn network_port_range(rule: &Map<String, Value>) -> Value {
    let protocol = rule.get("protocol").and_then(Value::as_str);
    Value::String(format_port_range(
        protocol,
        rule.get("port_range_min").and_then(Value::as_i64),
        rule.get("port_range_max").and_then(Value::as_i64),
    ))
}

/// Port range column of a legacy compute rule.
pub fn compute_port_range(rule: &Map<String, Value>) -> Value {
    let protocol = rule.get("ip_protocol").and_then(Value::as_str);
    Value::String(format_port_range(
        protocol,
        rule.get("from_port").and_then(Value::as_i64),
        rule.get("to_port").and_then(Value::as_i64),
    ))
}

/// IP range column of a legacy compute rule.
pub fn compute_ip_range(rule: &Map<String, Value>) -> Value {
    rule.get("ip_range")
        .and_then(|r| r.get("cidr"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Remote group column of a legacy compute rule.
pub fn compute_remote_group(rule: &Map<String, Value>) -> Value {
    rule.get("group")
        .and_then(|g| g.get("name"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Flags shared by `security group rule create` and
/// `default security group rule create`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RuleArgs {
    /// Remote IP address block (may use CIDR notation)
    #[arg(long, value_name = "IP-ADDRESS")]
    pub remote_ip: Option<String>,

    /// Remote security group (name or ID)
    #[arg(long, value_name = "GROUP")]
    pub remote_group: Option<String>,

    /// Remote address group (name or ID)
    #[arg(long, value_name = "ADDRESS-GROUP")]
    pub remote_address_group: Option<String>,

    /// Destination port, may be a single port or a range: 137:139
    #[arg(
        long,
        value_name = "PORT-RANGE",
        value_parser = osc_dispatch::parse_port_range
    )]
    pub dst_port: Option<PortRange>,

    /// ICMP type for ICMP IP protocols
    #[arg(long, value_name = "ICMP-TYPE", allow_negative_numbers = true)]
    pub icmp_type: Option<i64>,

    /// ICMP code for ICMP IP protocols
    #[arg(long, value_name = "ICMP-CODE", allow_negative_numbers = true)]
    pub icmp_code: Option<i64>,

    /// IP protocol (icmp, tcp, udp, any or a number; default: any)
    #[arg(long, value_name = "PROTOCOL")]
    pub protocol: Option<String>,

    /// Rule applies to incoming network traffic (default)
    #[arg(long)]
    pub ingress: bool,

    /// Rule applies to outgoing network traffic
    #[arg(long)]
    pub egress: bool,

    /// Ethertype of network traffic (IPv4, IPv6; default: based on IP protocol)
    #[arg(long, value_enum)]
    pub ethertype: Option<Ethertype>,

    /// Set security group rule description
    #[arg(long)]
    pub description: Option<String>,
}

/// A remote the caller still has to resolve to an ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remote {
    Group(String),
    AddressGroup(String),
}

impl RuleArgs {
    /// Flag conflicts that do not depend on the protocol.
    fn check_flags(&self) -> Result<()> {
        exclusive(&[
            ("--remote-ip", self.remote_ip.is_some()),
            ("--remote-group", self.remote_group.is_some()),
            ("--remote-address-group", self.remote_address_group.is_some()),
        ])?;
        exclusive(&[("--ingress", self.ingress), ("--egress", self.egress)])?;
        requires(
            ("--icmp-code", self.icmp_code.is_some()),
            ("--icmp-type", self.icmp_type.is_some()),
        )
    }

    /// Flag conflicts that depend on the resolved protocol.
    fn check_ports(&self, protocol: Option<&str>) -> Result<()> {
        let icmp_flags = self.icmp_type.is_some() || self.icmp_code.is_some();
        if is_icmp(protocol) {
            if self.dst_port.is_some() {
                return Err(Error::validation(
                    "--dst-port is not allowed with an ICMP IP protocol",
                ));
            }
        } else if icmp_flags {
            return Err(Error::validation(
                "ICMP IP protocol required with arguments --icmp-type and --icmp-code",
            ));
        }
        Ok(())
    }

    /// The remote group or address group to resolve, if any.
    pub fn remote(&self) -> Option<Remote> {
        match (&self.remote_group, &self.remote_address_group) {
            (Some(group), _) => Some(Remote::Group(group.clone())),
            (None, Some(group)) => Some(Remote::AddressGroup(group.clone())),
            _ => None,
        }
    }

    /// Payload for the network API, without the security group and the
    /// remote group IDs, which need lookups.
    pub fn network_attributes(&self) -> Result<AttributePayload> {
        self.check_flags()?;

        let mut protocol = normalize_protocol(self.protocol.as_deref(), "any");
        let ethertype = ethertype_for(self.ethertype, protocol.as_deref());
        if ethertype == Ethertype::Ipv6 && protocol.as_deref() == Some("icmp") {
            protocol = Some("ipv6-icmp".to_string());
        }
        self.check_ports(protocol.as_deref())?;

        let mut attrs = AttributePayload::new();
        attrs
            .set("direction", if self.egress { "egress" } else { "ingress" })
            .set("ethertype", ethertype.as_str())
            .set_opt("protocol", protocol.clone())
            .set_opt("description", self.description.clone());

        if is_icmp(protocol.as_deref()) {
            attrs
                .set_opt("port_range_min", self.icmp_type.filter(|t| *t >= 0))
                .set_opt("port_range_max", self.icmp_code.filter(|c| *c >= 0));
        } else if let Some(range) = self.dst_port {
            attrs
                .set("port_range_min", range.min)
                .set("port_range_max", range.max);
        }

        match (&self.remote_ip, self.remote()) {
            (Some(prefix), _) => {
                attrs.set("remote_ip_prefix", prefix.as_str());
            }
            (None, None) => {
                attrs.set("remote_ip_prefix", ethertype.any_prefix());
            }
            (None, Some(_)) => {}
        }
        Ok(attrs)
    }

    /// Payload for the legacy compute API, without the parent group and the
    /// remote group IDs.
    pub fn compute_attributes(&self) -> Result<AttributePayload> {
        self.check_flags()?;
        if self.egress {
            return Err(Error::validation(
                "--egress is only supported by the network API",
            ));
        }
        if self.ethertype.is_some() {
            return Err(Error::validation(
                "--ethertype is only supported by the network API",
            ));
        }
        if self.remote_address_group.is_some() {
            return Err(Error::validation(
                "--remote-address-group is only supported by the network API",
            ));
        }

        let protocol = normalize_protocol(self.protocol.as_deref(), "tcp")
            .ok_or_else(|| Error::validation("the compute API requires an IP protocol"))?;
        self.check_ports(Some(&protocol))?;

        let (from, to) = if is_icmp(Some(&protocol)) {
            (self.icmp_type.unwrap_or(-1), self.icmp_code.unwrap_or(-1))
        } else {
            let range = self.dst_port.unwrap_or(PortRange { min: 1, max: 65535 });
            (i64::from(range.min), i64::from(range.max))
        };

        let mut attrs = AttributePayload::new();
        attrs
            .set("ip_protocol", protocol)
            .set("from_port", from)
            .set("to_port", to);
        if self.remote_group.is_none() {
            attrs.set(
                "cidr",
                self.remote_ip
                    .clone()
                    .unwrap_or_else(|| Ethertype::Ipv4.any_prefix().to_string()),
            );
        }
        Ok(attrs)
    }
}
