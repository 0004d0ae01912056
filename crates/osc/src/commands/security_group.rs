//! `security group` commands, on the network API or the legacy compute API.

use clap::{Args, Subcommand};
use osc_dispatch::{exclusive, require_changes, AttributePayload, ResourceQuery, Result};
use osc_render::{ColumnSpec, Format};

use super::security_group_rule::SecurityGroupRuleCommand;
use super::{forward_run, network_only, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::{PROJECT, SECURITY_GROUP};

#[derive(Subcommand, Debug)]
pub enum SecurityGroupCommand {
    /// Create a new security group
    Create(CreateSecurityGroup),
    /// Delete security group(s)
    Delete(DeleteSecurityGroup),
    /// List security groups
    List(ListSecurityGroups),
    /// Display security group details
    Show(ShowSecurityGroup),
    /// Set security group properties
    Set(SetSecurityGroup),
    /// Security group rules
    #[command(subcommand)]
    Rule(SecurityGroupRuleCommand),
}

forward_run!(SecurityGroupCommand {
    Create, Delete, List, Show, Set, Rule
});

fn security_group_spec() -> ColumnSpec {
    show_spec()
        .rename("security_group_rules", "rules")
        .format("security_group_rules", Format::DictList)
        .format("rules", Format::DictList)
        .format("tags", Format::List)
}

#[derive(Args, Debug, Default)]
pub struct CreateSecurityGroup {
    /// New security group name
    pub name: String,

    /// Security group description
    #[arg(long)]
    pub description: Option<String>,

    /// Owner's project (name or ID)
    #[arg(long)]
    pub project: Option<String>,

    /// Security group is stateful (default)
    #[arg(long)]
    pub stateful: bool,

    /// Security group is stateless
    #[arg(long)]
    pub stateless: bool,
}

impl Run for CreateSecurityGroup {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        exclusive(&[
            ("--stateful", self.stateful),
            ("--stateless", self.stateless),
        ])?;
        network_only(
            ctx,
            &[
                ("--project", self.project.is_some()),
                ("--stateful", self.stateful),
                ("--stateless", self.stateless),
            ],
        )?;

        let mut attrs = AttributePayload::new();
        attrs.set("name", self.name.as_str()).set(
            "description",
            self.description.as_deref().unwrap_or(&self.name),
        );
        if ctx.is_network() {
            attrs
                .set_toggle("stateful", self.stateful, self.stateless)
                .set_opt(
                    "project_id",
                    ctx.find_id(&PROJECT, self.project.as_deref())?,
                );
        }
        let group = ctx.api.create(ctx.select(&SECURITY_GROUP), &attrs)?;
        Ok(Output::show(&group, &security_group_spec()))
    }
}

#[derive(Args, Debug)]
pub struct DeleteSecurityGroup {
    /// Security group(s) to delete (name or ID)
    #[arg(required = true)]
    pub groups: Vec<String>,
}

impl Run for DeleteSecurityGroup {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        ctx.delete_all(
            ctx.select(&SECURITY_GROUP),
            &self.groups,
            &ResourceQuery::new(),
        )
    }
}

#[derive(Args, Debug, Default)]
pub struct ListSecurityGroups {
    /// List security groups according to the project (name or ID)
    #[arg(long)]
    pub project: Option<String>,

    /// Display information from all projects (admin only)
    #[arg(long)]
    pub all_projects: bool,
}

impl Run for ListSecurityGroups {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        network_only(ctx, &[("--project", self.project.is_some())])?;

        let (query, spec) = if ctx.is_network() {
            let query = ResourceQuery::new()
                .filter_opt(
                    "project_id",
                    ctx.find_id(&PROJECT, self.project.as_deref())?,
                );
            let spec = ColumnSpec::list(&[
                ("id", "ID"),
                ("name", "Name"),
                ("description", "Description"),
                ("project_id", "Project"),
                ("tags", "Tags"),
            ])
            .format("tags", Format::List);
            (query, spec)
        } else {
            let query = ResourceQuery::new().filter_if(self.all_projects, "all_tenants", 1);
            let spec = ColumnSpec::list(&[
                ("id", "ID"),
                ("name", "Name"),
                ("description", "Description"),
            ])
            .long(self.all_projects, &[("tenant_id", "Project")]);
            (query, spec)
        };
        let groups = ctx.api.list(ctx.select(&SECURITY_GROUP), &query)?;
        Ok(Output::list(&groups, &spec))
    }
}

#[derive(Args, Debug)]
pub struct ShowSecurityGroup {
    /// Security group to display (name or ID)
    pub group: String,
}

impl Run for ShowSecurityGroup {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let group = ctx.find(ctx.select(&SECURITY_GROUP), &self.group)?;
        Ok(Output::show(&group, &security_group_spec()))
    }
}

#[derive(Args, Debug, Default)]
pub struct SetSecurityGroup {
    /// Security group to modify (name or ID)
    pub group: String,

    /// New security group name
    #[arg(long)]
    pub name: Option<String>,

    /// New security group description
    #[arg(long)]
    pub description: Option<String>,

    /// Security group is stateful
    #[arg(long)]
    pub stateful: bool,

    /// Security group is stateless
    #[arg(long)]
    pub stateless: bool,
}

impl Run for SetSecurityGroup {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        exclusive(&[
            ("--stateful", self.stateful),
            ("--stateless", self.stateless),
        ])?;
        network_only(
            ctx,
            &[
                ("--stateful", self.stateful),
                ("--stateless", self.stateless),
            ],
        )?;

        let mut attrs = AttributePayload::new();
        attrs
            .set_opt("name", self.name.clone())
            .set_opt("description", self.description.clone())
            .set_toggle("stateful", self.stateful, self.stateless);
        require_changes(&attrs, "security group set")?;

        let kind = ctx.select(&SECURITY_GROUP);
        let group = ctx.find(kind, &self.group)?;
        if !ctx.is_network() {
            // The compute API replaces both fields on every update.
            for field in ["name", "description"] {
                if !attrs.contains(field) {
                    attrs.set(field, group.get_str(field).unwrap_or_default());
                }
            }
        }
        ctx.api.update(kind, group.id(), &attrs)?;
        Ok(Output::Silent)
    }
}
