//! `network rbac` commands.

use clap::{Args, Subcommand, ValueEnum};
use osc_dispatch::{exactly_one, exclusive, AttributePayload, ResourceKind, ResourceQuery, Result};
use osc_render::ColumnSpec;

use super::{forward_run, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::{
    ADDRESS_GROUP, ADDRESS_SCOPE, NETWORK, NETWORK_SECURITY_GROUP, PROJECT, QOS_POLICY, RBAC_POLICY,
    SUBNET_POOL,
};

/// Target of a policy that applies to every project.
const ALL_PROJECTS: &str = "*";

#[derive(Subcommand, Debug)]
pub enum RbacCommand {
    /// Create network RBAC policy
    Create(CreateRbac),
    /// Delete network RBAC policy(s)
    Delete(DeleteRbac),
    /// List network RBAC policies
    List(ListRbac),
    /// Display network RBAC policy details
    Show(ShowRbac),
    /// Set network RBAC policy properties
    Set(SetRbac),
}

forward_run!(RbacCommand {
    Create, Delete, List, Show, Set
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum RbacObjectType {
    AddressScope,
    AddressGroup,
    Network,
    QosPolicy,
    SecurityGroup,
    Subnetpool,
}

impl RbacObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RbacObjectType::AddressScope => "address_scope",
            RbacObjectType::AddressGroup => "address_group",
            RbacObjectType::Network => "network",
            RbacObjectType::QosPolicy => "qos_policy",
            RbacObjectType::SecurityGroup => "security_group",
            RbacObjectType::Subnetpool => "subnetpool",
        }
    }

    /// The kind the policy's object is resolved as.
    pub fn kind(&self) -> &'static ResourceKind {
        match self {
            RbacObjectType::AddressScope => &ADDRESS_SCOPE,
            RbacObjectType::AddressGroup => &ADDRESS_GROUP,
            RbacObjectType::Network => &NETWORK,
            RbacObjectType::QosPolicy => &QOS_POLICY,
            RbacObjectType::SecurityGroup => &NETWORK_SECURITY_GROUP,
            RbacObjectType::Subnetpool => &SUBNET_POOL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum RbacAction {
    AccessAsExternal,
    AccessAsShared,
}

impl RbacAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RbacAction::AccessAsExternal => "access_as_external",
            RbacAction::AccessAsShared => "access_as_shared",
        }
    }
}

/// `--target-project` / `--target-all-projects`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct TargetArgs {
    /// The project to which the RBAC policy will be enforced (name or ID)
    #[arg(long)]
    pub target_project: Option<String>,

    /// Allow creating RBAC policy for all projects
    #[arg(long)]
    pub target_all_projects: bool,
}

impl TargetArgs {
    fn flags(&self) -> [(&'static str, bool); 2] {
        [
            ("--target-project", self.target_project.is_some()),
            ("--target-all-projects", self.target_all_projects),
        ]
    }

    /// The `target_tenant` value, if a target was given.
    fn target(&self, ctx: &Context<'_>) -> Result<Option<String>> {
        if self.target_all_projects {
            return Ok(Some(ALL_PROJECTS.to_string()));
        }
        ctx.find_id(&PROJECT, self.target_project.as_deref())
    }
}

#[derive(Args, Debug)]
pub struct CreateRbac {
    /// The object to which this RBAC policy affects (name or ID)
    pub rbac_object: String,

    /// Type of the object that RBAC policy affects
    #[arg(long = "type", value_enum)]
    pub object_type: RbacObjectType,

    /// Action for the RBAC policy
    #[arg(long, value_enum)]
    pub action: RbacAction,

    #[command(flatten)]
    pub target: TargetArgs,

    /// The owner project (name or ID)
    #[arg(long)]
    pub project: Option<String>,
}

impl Run for CreateRbac {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        exactly_one(&self.target.flags())?;

        let object = ctx.find(self.object_type.kind(), &self.rbac_object)?;
        let mut attrs = AttributePayload::new();
        attrs
            .set("object_type", self.object_type.as_str())
            .set("object_id", object.id())
            .set("action", self.action.as_str())
            .set_opt("target_tenant", self.target.target(ctx)?)
            .set_opt(
                "project_id",
                ctx.find_id(&PROJECT, self.project.as_deref())?,
            );

        let policy = ctx.api.create(&RBAC_POLICY, &attrs)?;
        Ok(Output::show(&policy, &show_spec()))
    }
}

#[derive(Args, Debug)]
pub struct DeleteRbac {
    /// RBAC policy(s) to delete (ID only)
    #[arg(required = true)]
    pub policies: Vec<String>,
}

impl Run for DeleteRbac {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        ctx.delete_all(&RBAC_POLICY, &self.policies, &ResourceQuery::new())
    }
}

#[derive(Args, Debug, Default)]
pub struct ListRbac {
    /// List network RBAC policies according to given object type
    #[arg(long = "type", value_enum)]
    pub object_type: Option<RbacObjectType>,

    /// List network RBAC policies according to given action
    #[arg(long, value_enum)]
    pub action: Option<RbacAction>,

    /// List network RBAC policies for a specific target project (name or ID)
    #[arg(long)]
    pub target_project: Option<String>,

    /// List additional fields in output
    #[arg(long)]
    pub long: bool,
}

impl Run for ListRbac {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let query = ResourceQuery::new()
            .filter_opt("object_type", self.object_type.map(|t| t.as_str()))
            .filter_opt("action", self.action.map(|a| a.as_str()))
            .filter_opt(
                "target_tenant",
                ctx.find_id(&PROJECT, self.target_project.as_deref())?,
            );
        let spec = ColumnSpec::list(&[
            ("id", "ID"),
            ("object_type", "Object Type"),
            ("object_id", "Object ID"),
        ])
        .long(self.long, &[("action", "Action")]);
        let policies = ctx.api.list(&RBAC_POLICY, &query)?;
        Ok(Output::list(&policies, &spec))
    }
}

#[derive(Args, Debug)]
pub struct ShowRbac {
    /// RBAC policy (ID only)
    pub policy: String,
}

impl Run for ShowRbac {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let policy = ctx.find(&RBAC_POLICY, &self.policy)?;
        Ok(Output::show(&policy, &show_spec()))
    }
}

#[derive(Args, Debug, Default)]
pub struct SetRbac {
    /// RBAC policy to be modified (ID only)
    pub policy: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

impl Run for SetRbac {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        exclusive(&self.target.flags())?;
        let policy = ctx.find(&RBAC_POLICY, &self.policy)?;
        let mut attrs = AttributePayload::new();
        attrs.set_opt("target_tenant", self.target.target(ctx)?);
        if !attrs.is_empty() {
            ctx.api.update(&RBAC_POLICY, policy.id(), &attrs)?;
        }
        Ok(Output::Silent)
    }
}
