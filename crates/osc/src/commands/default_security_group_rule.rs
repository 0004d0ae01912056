//! `default security group rule` commands: the rule templates the network
//! service copies into new security groups.

use clap::{Args, Subcommand};
use osc_dispatch::{exclusive, AttributePayload, BuildAttributes, ResourceQuery, Result};
use osc_render::Format;

use super::security_group_rule::{network_rule_columns, RuleFilterArgs};
use super::{forward_run, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::{ADDRESS_GROUP, DEFAULT_SECURITY_GROUP_RULE, NETWORK_SECURITY_GROUP};
use crate::rules::{Remote, RuleArgs};

#[derive(Subcommand, Debug)]
pub enum DefaultRuleCommand {
    /// Create a new default security group rule
    Create(CreateDefaultRule),
    /// Delete default security group rule(s)
    Delete(DeleteDefaultRule),
    /// List default security group rules
    List(ListDefaultRules),
    /// Display default security group rule details
    Show(ShowDefaultRule),
}

forward_run!(DefaultRuleCommand {
    Create, Delete, List, Show
});

#[derive(Args, Debug, Default)]
pub struct CreateDefaultRule {
    #[command(flatten)]
    pub rule: RuleArgs,

    /// Set the rule to be used in the default security group of new projects
    #[arg(long)]
    pub for_default_sg: bool,

    /// Do not use the rule in default security groups
    #[arg(long)]
    pub not_for_default_sg: bool,

    /// Set the rule to be used in custom security groups
    #[arg(long)]
    pub for_project_sg: bool,

    /// Do not use the rule in custom security groups
    #[arg(long)]
    pub not_for_project_sg: bool,
}

impl BuildAttributes for CreateDefaultRule {
    fn build_attributes(&self) -> Result<AttributePayload> {
        exclusive(&[
            ("--for-default-sg", self.for_default_sg),
            ("--not-for-default-sg", self.not_for_default_sg),
        ])?;
        exclusive(&[
            ("--for-project-sg", self.for_project_sg),
            ("--not-for-project-sg", self.not_for_project_sg),
        ])?;
        let mut attrs = self.rule.network_attributes()?;
        attrs
            .set_toggle(
                "used_in_default_sg",
                self.for_default_sg,
                self.not_for_default_sg,
            )
            .set_toggle(
                "used_in_non_default_sg",
                self.for_project_sg,
                self.not_for_project_sg,
            );
        Ok(attrs)
    }
}

impl Run for CreateDefaultRule {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let mut attrs = self.build_attributes()?;
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
        let rule = ctx.api.create(&DEFAULT_SECURITY_GROUP_RULE, &attrs)?;
        Ok(Output::show(&rule, &show_spec()))
    }
}

#[derive(Args, Debug)]
pub struct DeleteDefaultRule {
    /// Default security group rule(s) to delete (ID only)
    #[arg(required = true)]
    pub rules: Vec<String>,
}

impl Run for DeleteDefaultRule {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        ctx.delete_all(
            &DEFAULT_SECURITY_GROUP_RULE,
            &self.rules,
            &ResourceQuery::new(),
        )
    }
}

#[derive(Args, Debug, Default)]
pub struct ListDefaultRules {
    #[command(flatten)]
    pub filters: RuleFilterArgs,

    /// List additional fields in output
    #[arg(long)]
    pub long: bool,
}

impl Run for ListDefaultRules {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let spec = network_rule_columns()
            .column("used_in_default_sg", "Used in default Security Group")
            .column("used_in_non_default_sg", "Used in custom Security Group")
            .long(self.long, &[("description", "Description")])
            .format("used_in_default_sg", Format::Bool)
            .format("used_in_non_default_sg", Format::Bool);
        let rules = ctx
            .api
            .list(&DEFAULT_SECURITY_GROUP_RULE, &self.filters.query()?)?;
        Ok(Output::list(&rules, &spec))
    }
}

#[derive(Args, Debug)]
pub struct ShowDefaultRule {
    /// Default security group rule to display (ID only)
    pub rule: String,
}

impl Run for ShowDefaultRule {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let rule = ctx.find(&DEFAULT_SECURITY_GROUP_RULE, &self.rule)?;
        Ok(Output::show(&rule, &show_spec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osc_dispatch::Error;
    use osc_test::{MemoryCloud, Op};
    use serde_json::json;

    fn cloud() -> MemoryCloud {
        MemoryCloud::new()
            .with(&ADDRESS_GROUP, json!({"id": "ag-1", "name": "office"}))
            .with(
                &DEFAULT_SECURITY_GROUP_RULE,
                json!({"id": "d1", "protocol": "icmp", "ethertype": "IPv4",
                       "direction": "ingress", "port_range_min": 8, "port_range_max": 0,
                       "used_in_default_sg": true, "used_in_non_default_sg": false}),
            )
    }

    #[test]
    fn test_create_with_address_group() {
        let cloud = cloud();
        CreateDefaultRule {
            rule: RuleArgs {
                protocol: Some("icmpv6".into()),
                remote_address_group: Some("office".into()),
                ..RuleArgs::default()
            },
            not_for_project_sg: true,
            ..CreateDefaultRule::default()
        }
        .run(&Context::new(&cloud))
        .unwrap();
        assert_eq!(
            cloud.calls_of(Op::Create)[0].body,
            Some(json!({
                "direction": "ingress", "ethertype": "IPv6", "protocol": "icmpv6",
                "remote_address_group_id": "ag-1", "used_in_non_default_sg": false
            }))
        );
    }

    #[test]
    fn test_conflicting_scope_flags() {
        let cloud = cloud();
        let err = CreateDefaultRule {
            for_default_sg: true,
            not_for_default_sg: true,
            ..CreateDefaultRule::default()
        }
        .run(&Context::new(&cloud))
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(cloud.calls().is_empty());
    }

    #[test]
    fn test_list_shows_icmp_range_and_usage() {
        let cloud = cloud();
        let Output::Listing(listing) = ListDefaultRules::default()
            .run(&Context::new(&cloud))
            .unwrap()
        else {
            panic!("expected a listing");
        };
        let row = &listing.rows()[0];
        assert_eq!(row[4].text, "type=8:code=0");
        assert_eq!(row[8].text, "True");
        assert_eq!(row[9].text, "False");
    }

    #[test]
    fn test_show_by_id_only() {
        let cloud = cloud();
        let err = ShowDefaultRule {
            rule: "icmp".into(),
        }
        .run(&Context::new(&cloud))
        .unwrap_err();
        assert!(err.is_resolution());
        assert!(cloud.calls_of(Op::List).is_empty());
    }
}
