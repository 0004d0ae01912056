//! `network flavor profile` commands (network service profiles).

use clap::{Args, Subcommand};
use osc_dispatch::{
    exclusive, require_changes, AttributePayload, BuildAttributes, Error, ResourceQuery, Result,
};
use osc_render::{ColumnSpec, Format};

use super::{forward_run, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::{FLAVOR_PROFILE, PROJECT};

#[derive(Subcommand, Debug)]
pub enum FlavorProfileCommand {
    /// Create new network flavor profile
    Create(CreateFlavorProfile),
    /// Delete network flavor profile(s)
    Delete(DeleteFlavorProfile),
    /// List network flavor profile(s)
    List(ListFlavorProfiles),
    /// Display network flavor profile details
    Show(ShowFlavorProfile),
    /// Set network flavor profile properties
    Set(SetFlavorProfile),
}

forward_run!(FlavorProfileCommand {
    Create, Delete, List, Show, Set
});

fn profile_spec() -> ColumnSpec {
    show_spec()
        .rename("driver", "provider")
        .format("enabled", Format::Bool)
}

/// Fields shared by create and set.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ProfileFields {
    /// Description for the flavor profile
    #[arg(long)]
    pub description: Option<String>,

    /// Python module path to driver. This becomes required if --metainfo is
    /// missing and vice versa
    #[arg(long)]
    pub driver: Option<String>,

    /// Metainfo for the flavor profile. This becomes required if --driver is
    /// missing and vice versa
    #[arg(long)]
    pub metainfo: Option<String>,

    /// Enable the flavor profile
    #[arg(long)]
    pub enable: bool,

    /// Disable the flavor profile
    #[arg(long)]
    pub disable: bool,
}

impl BuildAttributes for ProfileFields {
    fn build_attributes(&self) -> Result<AttributePayload> {
        exclusive(&[("--enable", self.enable), ("--disable", self.disable)])?;
        let mut attrs = AttributePayload::new();
        attrs
            .set_opt("description", self.description.clone())
            .set_opt("driver", self.driver.clone())
            .set_opt("metainfo", self.metainfo.clone())
            .set_toggle("enabled", self.enable, self.disable);
        Ok(attrs)
    }
}

#[derive(Args, Debug, Default)]
pub struct CreateFlavorProfile {
    #[command(flatten)]
    pub fields: ProfileFields,

    /// Owner's project (name or ID)
    #[arg(long)]
    pub project: Option<String>,
}

impl Run for CreateFlavorProfile {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let mut attrs = self.fields.build_attributes()?;
        if self.fields.driver.is_none() && self.fields.metainfo.is_none() {
            return Err(Error::validation(
                "Either --driver or --metainfo or both are required",
            ));
        }
        attrs.set_opt(
            "project_id",
            ctx.find_id(&PROJECT, self.project.as_deref())?,
        );
        let profile = ctx.api.create(&FLAVOR_PROFILE, &attrs)?;
        Ok(Output::show(&profile, &profile_spec()))
    }
}

#[derive(Args, Debug)]
pub struct DeleteFlavorProfile {
    /// Flavor profile(s) to delete (ID only)
    #[arg(required = true)]
    pub profiles: Vec<String>,
}

impl Run for DeleteFlavorProfile {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        ctx.delete_all(&FLAVOR_PROFILE, &self.profiles, &ResourceQuery::new())
    }
}

#[derive(Args, Debug)]
pub struct ListFlavorProfiles {}

impl Run for ListFlavorProfiles {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let spec = ColumnSpec::list(&[
            ("id", "ID"),
            ("driver", "Driver"),
            ("enabled", "Enabled"),
            ("metainfo", "Metainfo"),
            ("description", "Description"),
        ])
        .format("enabled", Format::Bool);
        let profiles = ctx.api.list(&FLAVOR_PROFILE, &ResourceQuery::new())?;
        Ok(Output::list(&profiles, &spec))
    }
}

#[derive(Args, Debug)]
pub struct ShowFlavorProfile {
    /// Flavor profile to display (ID only)
    pub profile: String,
}

impl Run for ShowFlavorProfile {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let profile = ctx.find(&FLAVOR_PROFILE, &self.profile)?;
        Ok(Output::show(&profile, &profile_spec()))
    }
}

#[derive(Args, Debug, Default)]
pub struct SetFlavorProfile {
    /// Flavor profile to update (ID only)
    pub profile: String,

    #[command(flatten)]
    pub fields: ProfileFields,
}

impl Run for SetFlavorProfile {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let attrs = self.fields.build_attributes()?;
        require_changes(&attrs, "network flavor profile set")?;
        let profile = ctx.find(&FLAVOR_PROFILE, &self.profile)?;
        ctx.api.update(&FLAVOR_PROFILE, profile.id(), &attrs)?;
        Ok(Output::Silent)
    }
}
