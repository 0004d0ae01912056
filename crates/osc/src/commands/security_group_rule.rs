//! `security group rule` commands.
//!
//! The legacy compute API has no rule collection to read from: rules are
//! embedded in their group, so show, list and delete scan the groups.

use clap::{Args, Subcommand};
use osc_dispatch::{exclusive, AttributePayload, Error, ResourceHandle, ResourceQuery, Result};
use osc_render::{ColumnSpec, Format};
use serde_json::{Map, Value};

use super::{forward_run, network_only, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::{
    ADDRESS_GROUP, COMPUTE_SECURITY_GROUP, COMPUTE_SECURITY_GROUP_RULE, NETWORK_SECURITY_GROUP,
    NETWORK_SECURITY_GROUP_RULE, PROJECT,
};
use crate::rules::{self, Ethertype, Remote, RuleArgs};

#[derive(Subcommand, Debug)]
pub enum SecurityGroupRuleCommand {
    /// Create a new security group rule
    Create(CreateRule),
    /// Delete security group rule(s)
    Delete(DeleteRule),
    /// List security group rules
    List(ListRules),
    /// Display security group rule details
    Show(ShowRule),
}

forward_run!(SecurityGroupRuleCommand {
    Create, Delete, List, Show
});

/// Filters shared by the rule list commands.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RuleFilterArgs {
    /// List rules by the IP protocol (ah, dhcp, egp, esp, gre, icmp, igmp,
    /// ipv6-encap, ipv6-frag, ipv6-icmp, ipv6-nonxt, ipv6-opts, ipv6-route,
    /// ospf, pgm, rsvp, sctp, tcp, udp, udplite, vrrp and integer
    /// representations [0-255] or any; default: any (all protocols))
    #[arg(long)]
    pub protocol: Option<String>,

    /// List rules by the Ethertype (IPv4 or IPv6)
    #[arg(long, value_enum)]
    pub ethertype: Option<Ethertype>,

    /// List rules applied to incoming network traffic
    #[arg(long)]
    pub ingress: bool,

    /// List rules applied to outgoing network traffic
    #[arg(long)]
    pub egress: bool,
}

impl RuleFilterArgs {
    pub fn query(&self) -> Result<ResourceQuery> {
        exclusive(&[("--ingress", self.ingress), ("--egress", self.egress)])?;
        Ok(ResourceQuery::new()
            .filter_opt(
                "protocol",
                rules::normalize_protocol(self.protocol.as_deref(), "any"),
            )
            .filter_opt("ethertype", self.ethertype.map(|e| e.as_str()))
            .filter_if(self.ingress, "direction", "ingress")
            .filter_if(self.egress, "direction", "egress"))
    }
}

/// Columns of a network rule listing.
pub(crate) fn network_rule_columns() -> ColumnSpec {
    ColumnSpec::list(&[
        ("id", "ID"),
        ("protocol", "IP Protocol"),
        ("ethertype", "Ethertype"),
        ("remote_ip_prefix", "IP Range"),
        ("port_range", "Port Range"),
        ("direction", "Direction"),
        ("remote_group_id", "Remote Security Group"),
        ("remote_address_group_id", "Remote Address Group"),
    ])
    .format("port_range", Format::Computed(rules::network_port_range))
}

fn compute_rule_spec() -> ColumnSpec {
    show_spec()
        .column("port_range", "port_range")
        .format("port_range", Format::Computed(rules::compute_port_range))
        .format("ip_range", Format::Computed(rules::compute_ip_range))
        .format("group", Format::Computed(rules::compute_remote_group))
}

fn rule_spec(ctx: &Context<'_>) -> ColumnSpec {
    if ctx.is_network() {
        show_spec()
    } else {
        compute_rule_spec()
    }
}

/// Rules embedded in compute groups, each with its parent group ID.
fn compute_rules(groups: &[ResourceHandle]) -> Vec<Map<String, Value>> {
    groups
        .iter()
        .filter_map(|group| group.get("rules").and_then(Value::as_array))
        .flatten()
        .filter_map(|rule| rule.as_object().cloned())
        .collect()
}

fn same_id(value: Option<&Value>, id: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

/// Finds a compute rule by ID across every group.
fn find_compute_rule(ctx: &Context<'_>, id: &str) -> Result<ResourceHandle> {
    if id.trim().is_empty() {
        return Err(Error::validation(
            "A security group rule ID must not be empty",
        ));
    }
    let groups = ctx
        .api
        .list(&COMPUTE_SECURITY_GROUP, &ResourceQuery::new())?;
    compute_rules(&groups)
        .into_iter()
        .find(|rule| same_id(rule.get("id"), id))
        .map(ResourceHandle::new)
        .transpose()?
        .ok_or_else(|| Error::NotFound {
            kind: COMPUTE_SECURITY_GROUP_RULE.noun.to_string(),
            token: id.to_string(),
        })
}

fn find_rule(ctx: &Context<'_>, token: &str) -> Result<ResourceHandle> {
    if ctx.is_network() {
        ctx.find(&NETWORK_SECURITY_GROUP_RULE, token)
    } else {
        find_compute_rule(ctx, token)
    }
}

#[derive(Args, Debug, Default)]
pub struct CreateRule {
    /// Create rule in this security group (name or ID)
    pub group: String,

    #[command(flatten)]
    pub rule: RuleArgs,

    /// Owner's project (name or ID)
    #[arg(long)]
    pub project: Option<String>,
}

impl CreateRule {
    fn network_payload(&self, ctx: &Context<'_>) -> Result<AttributePayload> {
        let mut attrs = self.rule.network_attributes()?;
        let group = ctx.find(&NETWORK_SECURITY_GROUP, &self.group)?;
        attrs.set("security_group_id", group.id());
        match self.rule.remote() {
            Some(Remote::Group(token)) => {
                attrs.set(
                    "remote_group_id",
                    ctx.find(&NETWORK_SECURITY_GROUP, &token)?.id(),
                );
            }
            Some(Remote::AddressGroup(token)) => {
                attrs.set(
                    "remote_address_group_id",
                    ctx.find(&ADDRESS_GROUP, &token)?.id(),
                );
            }
            None => {}
        }
        attrs.set_opt(
            "project_id",
            ctx.find_id(&PROJECT, self.project.as_deref())?,
        );
        Ok(attrs)
    }

    fn compute_payload(&self, ctx: &Context<'_>) -> Result<AttributePayload> {
        network_only(ctx, &[("--project", self.project.is_some())])?;
        let mut attrs = self.rule.compute_attributes()?;
        let group = ctx.find(&COMPUTE_SECURITY_GROUP, &self.group)?;
        attrs.set("parent_group_id", group.id());
        if let Some(Remote::Group(token)) = self.rule.remote() {
            attrs.set("group_id", ctx.find(&COMPUTE_SECURITY_GROUP, &token)?.id());
        }
        Ok(attrs)
    }
}

impl Run for CreateRule {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let (kind, attrs) = if ctx.is_network() {
            (&NETWORK_SECURITY_GROUP_RULE, self.network_payload(ctx)?)
        } else {
            (&COMPUTE_SECURITY_GROUP_RULE, self.compute_payload(ctx)?)
        };
        let rule = ctx.api.create(kind, &attrs)?;
        Ok(Output::show(&rule, &rule_spec(ctx)))
    }
}

#[derive(Args, Debug)]
pub struct DeleteRule {
    /// Security group rule(s) to delete (ID only)
    #[arg(required = true)]
    pub rules: Vec<String>,
}

impl Run for DeleteRule {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        if ctx.is_network() {
            return ctx.delete_all(
                &NETWORK_SECURITY_GROUP_RULE,
                &self.rules,
                &ResourceQuery::new(),
            );
        }
        ctx.bulk(&COMPUTE_SECURITY_GROUP_RULE, "delete").apply(
            &self.rules,
            |token| find_compute_rule(ctx, token),
            |rule| {
                ctx.api
                    .delete(
                        &COMPUTE_SECURITY_GROUP_RULE,
                        rule.id(),
                        &ResourceQuery::new(),
                    )
            },
        )?;
        Ok(Output::Silent)
    }
}

#[derive(Args, Debug, Default)]
pub struct ListRules {
    /// List all rules in this security group (name or ID)
    pub group: Option<String>,

    #[command(flatten)]
    pub filters: RuleFilterArgs,

    /// List additional fields in output
    #[arg(long)]
    pub long: bool,
}

impl ListRules {
    fn list_network(&self, ctx: &Context<'_>) -> Result<Output> {
        let group_id = ctx.find_id(&NETWORK_SECURITY_GROUP, self.group.as_deref())?;
        let query = self
            .filters
            .query()?
            .filter_opt("security_group_id", group_id.as_deref());
        let spec = network_rule_columns()
            .long(self.long, &[("description", "Description")])
            .long(
                group_id.is_none(),
                &[("security_group_id", "Security Group")],
            );
        let rules = ctx.api.list(&NETWORK_SECURITY_GROUP_RULE, &query)?;
        Ok(Output::list(&rules, &spec))
    }

    fn list_compute(&self, ctx: &Context<'_>) -> Result<Output> {
        network_only(
            ctx,
            &[
                ("--ethertype", self.filters.ethertype.is_some()),
                ("--ingress", self.filters.ingress),
                ("--egress", self.filters.egress),
            ],
        )?;
        let groups = match &self.group {
            Some(token) => vec![ctx.find(&COMPUTE_SECURITY_GROUP, token)?],
            None => ctx
                .api
                .list(&COMPUTE_SECURITY_GROUP, &ResourceQuery::new())?,
        };
        let protocol = rules::normalize_protocol(self.filters.protocol.as_deref(), "any");
        let rules: Vec<Map<String, Value>> = compute_rules(&groups)
            .into_iter()
            .filter(|rule| match &protocol {
                Some(p) => rule.get("ip_protocol").and_then(Value::as_str) == Some(p.as_str()),
                None => true,
            })
            .collect();
        let spec = ColumnSpec::list(&[
            ("id", "ID"),
            ("ip_protocol", "IP Protocol"),
            ("ip_range", "IP Range"),
            ("port_range", "Port Range"),
            ("group", "Remote Security Group"),
        ])
        .long(
            self.group.is_none(),
            &[("parent_group_id", "Security Group")],
        )
        .format("ip_range", Format::Computed(rules::compute_ip_range))
        .format("port_range", Format::Computed(rules::compute_port_range))
        .format("group", Format::Computed(rules::compute_remote_group));
        Ok(Output::list_maps(&rules, &spec))
    }
}

impl Run for ListRules {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        if ctx.is_network() {
            self.list_network(ctx)
        } else {
            self.list_compute(ctx)
        }
    }
}

#[derive(Args, Debug)]
pub struct ShowRule {
    /// Security group rule to display (ID only)
    pub rule: String,
}

impl Run for ShowRule {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let rule = find_rule(ctx, &self.rule)?;
        Ok(Output::show(&rule, &rule_spec(ctx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osc_dispatch::Backend;
    use osc_test::{MemoryCloud, Op, RecordingSink};
    use serde_json::json;

    fn cloud() -> MemoryCloud {
        MemoryCloud::new()
            .with(&NETWORK_SECURITY_GROUP, json!({"id": "sg-1", "name": "web"}))
            .with(&NETWORK_SECURITY_GROUP, json!({"id": "sg-2", "name": "db"}))
            .with(
                &NETWORK_SECURITY_GROUP_RULE,
                json!({"id": "r1", "security_group_id": "sg-1", "protocol": "tcp",
                       "ethertype": "IPv4", "direction": "ingress",
                       "port_range_min": 22, "port_range_max": 22,
                       "remote_ip_prefix": "0.0.0.0/0"}),
            )
            .with(
                &COMPUTE_SECURITY_GROUP,
                json!({"id": 1, "name": "legacy", "rules": [
                    {"id": 10, "parent_group_id": 1, "ip_protocol": "icmp",
                     "from_port": -1, "to_port": -1,
                     "ip_range": {"cidr": "0.0.0.0/0"}, "group": {}},
                    {"id": 11, "parent_group_id": 1, "ip_protocol": "tcp",
                     "from_port": 80, "to_port": 80, "ip_range": {}, "group": {"name": "web"}}
                ]}),
            )
    }

    #[test]
    fn test_create_network_rule() {
        let cloud = cloud();
        CreateRule {
            group: "web".into(),
            rule: RuleArgs {
                protocol: Some("tcp".into()),
                dst_port: Some("443".parse().unwrap()),
                remote_group: Some("db".into()),
                ..RuleArgs::default()
            },
            project: None,
        }
        .run(&Context::new(&cloud))
        .unwrap();
        assert_eq!(
            cloud.calls_of(Op::Create)[0].body,
            Some(json!({
                "direction": "ingress", "ethertype": "IPv4", "protocol": "tcp",
                "port_range_min": 443, "port_range_max": 443,
                "security_group_id": "sg-1", "remote_group_id": "sg-2"
            }))
        );
    }

    #[test]
    fn test_invalid_rule_makes_no_calls() {
        let cloud = cloud();
        let err = CreateRule {
            group: "web".into(),
            rule: RuleArgs {
                ingress: true,
                egress: true,
                ..RuleArgs::default()
            },
            project: None,
        }
        .run(&Context::new(&cloud))
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(cloud.calls().is_empty());
    }

    #[test]
    fn test_create_compute_rule() {
        let cloud = cloud();
        let ctx = Context::new(&cloud).backend(Backend::Compute);
        CreateRule {
            group: "legacy".into(),
            rule: RuleArgs {
                protocol: Some("udp".into()),
                dst_port: Some("53".parse().unwrap()),
                ..RuleArgs::default()
            },
            project: None,
        }
        .run(&ctx)
        .unwrap();
        let call = &cloud.calls_of(Op::Create)[0];
        assert_eq!(call.path, "os-security-group-rules");
        assert_eq!(
            call.body,
            Some(json!({"ip_protocol": "udp", "from_port": 53, "to_port": 53,
                        "cidr": "0.0.0.0/0", "parent_group_id": "1"}))
        );
    }

    #[test]
    fn test_list_network_rules() {
        let cloud = cloud();
        let Output::Listing(listing) = ListRules {
            group: Some("web".into()),
            filters: RuleFilterArgs {
                ingress: true,
                ..RuleFilterArgs::default()
            },
            long: false,
        }
        .run(&Context::new(&cloud))
        .unwrap()
        else {
            panic!("expected a listing");
        };
        assert!(!listing.columns().contains(&"Security Group".to_string()));
        assert_eq!(listing.rows()[0][4].text, "22");
        let calls = cloud.calls_of(Op::List);
        let query = &calls.last().unwrap().query;
        assert!(query.contains(&("direction".to_string(), "ingress".to_string())));
        assert!(query.contains(&("security_group_id".to_string(), "sg-1".to_string())));
    }

    #[test]
    fn test_list_compute_rules_flattens_groups() {
        let cloud = cloud();
        let ctx = Context::new(&cloud).backend(Backend::Compute);
        let Output::Listing(listing) = ListRules::default().run(&ctx).unwrap() else {
            panic!("expected a listing");
        };
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.rows()[0][2].text, "0.0.0.0/0");
        assert_eq!(listing.rows()[0][3].text, "");
        assert_eq!(listing.rows()[1][3].text, "80");
        assert_eq!(listing.rows()[1][4].text, "web");
    }

    #[test]
    fn test_show_compute_rule_scans_groups() {
        let cloud = cloud();
        let ctx = Context::new(&cloud).backend(Backend::Compute);
        let Output::Show(row) = ShowRule { rule: "11".into() }.run(&ctx).unwrap() else {
            panic!("expected a show row");
        };
        assert_eq!(row.get("port_range").unwrap().text, "80");
        assert!(cloud.calls_of(Op::Get).is_empty());
    }

    #[test]
    fn test_compute_delete_unknown_rule() {
        let cloud = cloud().with(&COMPUTE_SECURITY_GROUP_RULE, json!({"id": 10}));
        let sink = RecordingSink::new();
        let ctx = Context::new(&cloud).backend(Backend::Compute).sink(&sink);
        let err = DeleteRule {
            rules: vec!["10".into(), "99".into()],
        }
        .run(&ctx)
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "1 of 2 security group rules failed to delete."
        );
        assert_eq!(cloud.calls_of(Op::Delete)[0].id.as_deref(), Some("10"));
        assert_eq!(sink.tokens(), vec!["99"]);
    }
}
