//! `project` commands (identity v3).

use clap::{Args, Subcommand};
use osc_dispatch::{
    exclusive, parse_key_value, require_changes, AttributePayload, BuildAttributes, ResourceQuery,
    Result,
};
use osc_render::{ColumnSpec, Format};

use super::{forward_run, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::{DOMAIN, PROJECT};

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create new project
    Create(CreateProject),
    /// Delete project(s)
    Delete(DeleteProject),
    /// List projects
    List(ListProjects),
    /// Display project details
    Show(ShowProject),
    /// Set project properties
    Set(SetProject),
}

forward_run!(ProjectCommand {
    Create, Delete, List, Show, Set
});

fn project_spec() -> ColumnSpec {
    show_spec()
        .format("enabled", Format::Bool)
        .format("tags", Format::List)
}

/// Fields shared by create and set.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ProjectFields {
    /// Project description
    #[arg(long)]
    pub description: Option<String>,

    /// Enable project
    #[arg(long)]
    pub enable: bool,

    /// Disable project
    #[arg(long)]
    pub disable: bool,

    /// Add a property to the project (repeat option to set multiple properties)
    #[arg(
        long = "property",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value
    )]
    pub properties: Vec<(String, String)>,
}

impl BuildAttributes for ProjectFields {
    fn build_attributes(&self) -> Result<AttributePayload> {
        exclusive(&[("--enable", self.enable), ("--disable", self.disable)])?;
        let mut attrs = AttributePayload::new();
        attrs
            .extend_properties(&self.properties)
            .set_opt("description", self.description.clone())
            .set_toggle("enabled", self.enable, self.disable);
        Ok(attrs)
    }
}

#[derive(Args, Debug, Default)]
pub struct CreateProject {
    /// New project name
    pub name: String,

    /// Domain owning the project (name or ID)
    #[arg(long)]
    pub domain: Option<String>,

    #[command(flatten)]
    pub fields: ProjectFields,
}

impl Run for CreateProject {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let mut attrs = self.fields.build_attributes()?;
        attrs
            .set("name", self.name.as_str())
            .set_opt("domain_id", ctx.find_id(&DOMAIN, self.domain.as_deref())?);
        let project = ctx.api.create(&PROJECT, &attrs)?;
        Ok(Output::show(&project, &project_spec()))
    }
}

#[derive(Args, Debug)]
pub struct DeleteProject {
    /// Project(s) to delete (name or ID)
    #[arg(required = true)]
    pub projects: Vec<String>,
}

impl Run for DeleteProject {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        ctx.delete_all(&PROJECT, &self.projects, &ResourceQuery::new())
    }
}

#[derive(Args, Debug, Default)]
pub struct ListProjects {
    /// Filter projects by domain (name or ID)
    #[arg(long)]
    pub domain: Option<String>,

    /// List additional fields in output
    #[arg(long)]
    pub long: bool,
}

impl Run for ListProjects {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let query = ResourceQuery::new()
            .filter_opt("domain_id", ctx.find_id(&DOMAIN, self.domain.as_deref())?);
        let spec = ColumnSpec::list(&[("id", "ID"), ("name", "Name")])
            .long(
                self.long,
                &[
                    ("domain_id", "Domain ID"),
                    ("description", "Description"),
                    ("enabled", "Enabled"),
                ],
            )
            .format("enabled", Format::Bool);
        let projects = ctx.api.list(&PROJECT, &query)?;
        Ok(Output::list(&projects, &spec))
    }
}

#[derive(Args, Debug)]
pub struct ShowProject {
    /// Project to display (name or ID)
    pub project: String,
}

impl Run for ShowProject {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let project = ctx.find(&PROJECT, &self.project)?;
        Ok(Output::show(&project, &project_spec()))
    }
}

#[derive(Args, Debug, Default)]
pub struct SetProject {
    /// Project to modify (name or ID)
    pub project: String,

    /// Set project name
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub fields: ProjectFields,
}

impl Run for SetProject {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let mut attrs = self.fields.build_attributes()?;
        attrs.set_opt("name", self.name.clone());
        require_changes(&attrs, "project set")?;
        let project = ctx.find(&PROJECT, &self.project)?;
        ctx.api.update(&PROJECT, project.id(), &attrs)?;
        Ok(Output::Silent)
    }
}
