//! One module per resource group.
//!
//! Each module defines a clap subcommand enum whose variants wrap the leaf
//! argument structs, and implements [`Run`] for every leaf. The enum's own
//! `Run` impl only forwards to the selected leaf.

pub mod aggregate;
pub mod default_security_group_rule;
pub mod floating_ip;
pub mod image;
pub mod network_flavor_profile;
pub mod network_rbac;
pub mod project;
pub mod router;
pub mod security_group;
pub mod security_group_rule;
pub mod volume_qos;

use osc_dispatch::Result;
use osc_render::ColumnSpec;

use crate::cli::{
    Command, DefaultGroupWord, DefaultSecurityWord, DefaultWord, FloatingWord, NetworkFlavorWord,
    NetworkWord, SecurityWord, VolumeWord,
};
use crate::context::{Context, Output, Run};

impl Run for Command {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        match self {
            Command::Aggregate(cmd) => cmd.run(ctx),
            Command::Default(DefaultWord::Security(DefaultSecurityWord::Group(
                DefaultGroupWord::Rule(cmd),
            ))) => cmd.run(ctx),
            Command::Floating(FloatingWord::Ip(cmd)) => cmd.run(ctx),
            Command::Image(cmd) => cmd.run(ctx),
            Command::Network(NetworkWord::Flavor(NetworkFlavorWord::Profile(cmd))) => cmd.run(ctx),
            Command::Network(NetworkWord::Rbac(cmd)) => cmd.run(ctx),
            Command::Project(cmd) => cmd.run(ctx),
            Command::Router(cmd) => cmd.run(ctx),
            Command::Security(SecurityWord::Group(cmd)) => cmd.run(ctx),
            Command::Volume(VolumeWord::Qos(cmd)) => cmd.run(ctx),
        }
    }
}

/// Show spec hiding the SDK bookkeeping fields every resource carries.
pub(crate) fn show_spec() -> ColumnSpec {
    ColumnSpec::show().hide("location").hide("links")
}

/// Rejects flags the legacy compute API has no equivalent for.
pub(crate) fn network_only(ctx: &Context<'_>, flags: &[(&str, bool)]) -> Result<()> {
    if ctx.is_network() {
        return Ok(());
    }
    match flags.iter().find(|(_, given)| *given) {
        Some((flag, _)) => Err(osc_dispatch::Error::validation(format!(
            "{} is only supported by the network API",
            flag
        ))),
        None => Ok(()),
    }
}

/// Forwards `Run` from a subcommand enum to its leaf structs.
macro_rules! forward_run {
    ($enum:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::context::Run for $enum {
            fn run(
                &self,
                ctx: &$crate::context::Context<'_>,
            ) -> osc_dispatch::Result<$crate::context::Output> {
                match self {
                    $($enum::$variant(cmd) => cmd.run(ctx),)+
                }
            }
        }
    };
}

pub(crate) use forward_run;
