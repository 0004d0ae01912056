//! The clap command tree and the global flags.
//!
//! Multi-word commands (`security group rule create`) are nested
//! subcommand enums; each word is one level.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use osc_dispatch::{Backend, Service};
use osc_render::{OutputFormat, OutputOptions};

use crate::commands::{
    aggregate::AggregateCommand, default_security_group_rule::DefaultRuleCommand,
    floating_ip::FloatingIpCommand, image::ImageCommand,
    network_flavor_profile::FlavorProfileCommand, network_rbac::RbacCommand,
    project::ProjectCommand, router::RouterCommand, security_group::SecurityGroupCommand,
    volume_qos::QosCommand,
};

#[derive(Parser, Debug)]
#[command(name = "osc", version, about = "OpenStack command-line client")]
pub struct Cli {
    #[command(flatten)]
    pub cloud: CloudArgs,

    #[command(flatten)]
    pub format: FormatArgs,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute host aggregates
    #[command(subcommand)]
    Aggregate(AggregateCommand),

    /// Default security group rules
    #[command(subcommand)]
    Default(DefaultWord),

    /// Floating IPs
    #[command(subcommand)]
    Floating(FloatingWord),

    /// Images
    #[command(subcommand)]
    Image(ImageCommand),

    /// Network flavor profiles and RBAC policies
    #[command(subcommand)]
    Network(NetworkWord),

    /// Identity projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Routers
    #[command(subcommand)]
    Router(RouterCommand),

    /// Security groups and their rules
    #[command(subcommand)]
    Security(SecurityWord),

    /// Volume QoS specifications
    #[command(subcommand)]
    Volume(VolumeWord),
}

#[derive(Subcommand, Debug)]
pub enum DefaultWord {
    #[command(subcommand)]
    Security(DefaultSecurityWord),
}

#[derive(Subcommand, Debug)]
pub enum DefaultSecurityWord {
    #[command(subcommand)]
    Group(DefaultGroupWord),
}

#[derive(Subcommand, Debug)]
pub enum DefaultGroupWord {
    #[command(subcommand)]
    Rule(DefaultRuleCommand),
}

#[derive(Subcommand, Debug)]
pub enum FloatingWord {
    #[command(subcommand)]
    Ip(FloatingIpCommand),
}

#[derive(Subcommand, Debug)]
pub enum SecurityWord {
    #[command(subcommand)]
    Group(SecurityGroupCommand),
}

#[derive(Subcommand, Debug)]
pub enum NetworkWord {
    #[command(subcommand)]
    Flavor(NetworkFlavorWord),
    #[command(subcommand)]
    Rbac(RbacCommand),
}

#[derive(Subcommand, Debug)]
pub enum NetworkFlavorWord {
    #[command(subcommand)]
    Profile(FlavorProfileCommand),
}

#[derive(Subcommand, Debug)]
pub enum VolumeWord {
    #[command(subcommand)]
    Qos(QosCommand),
}

/// API used for security groups, their rules and floating IPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkBackend {
    Network,
    Compute,
}

impl From<NetworkBackend> for Backend {
    fn from(backend: NetworkBackend) -> Self {
        match backend {
            NetworkBackend::Network => Backend::Network,
            NetworkBackend::Compute => Backend::Compute,
        }
    }
}

/// Cloud selection and connection flags.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct CloudArgs {
    /// Cloud name in clouds.yaml
    #[arg(
        long = "os-cloud",
        env = "OS_CLOUD",
        global = true,
        value_name = "NAME"
    )]
    pub cloud: Option<String>,

    /// Path to a clouds.yaml file
    #[arg(
        long = "os-config",
        env = "OS_CLIENT_CONFIG_FILE",
        global = true,
        value_name = "PATH"
    )]
    pub config: Option<PathBuf>,

    /// Pre-issued authentication token
    #[arg(
        long = "os-token",
        env = "OS_TOKEN",
        global = true,
        hide_env_values = true
    )]
    pub token: Option<String>,

    /// Compute API base URL
    #[arg(
        long = "os-compute-endpoint",
        env = "OS_COMPUTE_ENDPOINT",
        global = true,
        value_name = "URL"
    )]
    pub compute_endpoint: Option<String>,

    /// Network API base URL
    #[arg(
        long = "os-network-endpoint",
        env = "OS_NETWORK_ENDPOINT",
        global = true,
        value_name = "URL"
    )]
    pub network_endpoint: Option<String>,

    /// Image API base URL
    #[arg(
        long = "os-image-endpoint",
        env = "OS_IMAGE_ENDPOINT",
        global = true,
        value_name = "URL"
    )]
    pub image_endpoint: Option<String>,

    /// Identity API base URL
    #[arg(
        long = "os-identity-endpoint",
        env = "OS_IDENTITY_ENDPOINT",
        global = true,
        value_name = "URL"
    )]
    pub identity_endpoint: Option<String>,

    /// Block storage API base URL
    #[arg(
        long = "os-volume-endpoint",
        env = "OS_VOLUME_ENDPOINT",
        global = true,
        value_name = "URL"
    )]
    pub volume_endpoint: Option<String>,

    /// API for security groups and floating IPs (default: network when a
    /// network endpoint is configured)
    #[arg(long = "os-network-backend", value_enum, global = true)]
    pub network_backend: Option<NetworkBackend>,

    #[arg(
        long = "os-compute-api-version",
        env = "OS_COMPUTE_API_VERSION",
        global = true
    )]
    pub compute_api_version: Option<String>,

    #[arg(
        long = "os-volume-api-version",
        env = "OS_VOLUME_API_VERSION",
        global = true
    )]
    pub volume_api_version: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,
}

impl CloudArgs {
    /// Endpoint flags that were given.
    pub fn endpoint_overrides(&self) -> Vec<(Service, &str)> {
        [
            (Service::Compute, &self.compute_endpoint),
            (Service::Network, &self.network_endpoint),
            (Service::Image, &self.image_endpoint),
            (Service::Identity, &self.identity_endpoint),
            (Service::Volume, &self.volume_endpoint),
        ]
        .into_iter()
        .filter_map(|(service, url)| url.as_deref().map(|url| (service, url)))
        .collect()
    }
}

/// Output formatter flags.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct FormatArgs {
    /// Output format (table, value, json, yaml, csv, shell)
    #[arg(short = 'f', long = "format", global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Column to include; repeat to select several
    #[arg(short = 'c', long = "column", global = true, value_name = "COLUMN")]
    pub columns: Vec<String>,

    /// Maximum table width (0 for automatic)
    #[arg(long, global = true, value_name = "WIDTH")]
    pub max_width: Option<usize>,

    /// Fit tables to the terminal width
    #[arg(long, global = true)]
    pub fit_width: bool,

    /// Sort listings by this column; repeat for secondary keys
    #[arg(long = "sort-column", global = true, value_name = "COLUMN")]
    pub sort_columns: Vec<String>,

    #[arg(long, global = true)]
    pub sort_ascending: bool,

    #[arg(long, global = true, conflicts_with = "sort_ascending")]
    pub sort_descending: bool,

    /// Compact JSON output
    #[arg(long, global = true)]
    pub noindent: bool,

    /// Variable name prefix for shell output
    #[arg(long, global = true, default_value = "")]
    pub prefix: String,
}

impl From<&FormatArgs> for OutputOptions {
    fn from(args: &FormatArgs) -> Self {
        OutputOptions {
            format: args.format,
            columns: args.columns.clone(),
            max_width: args.max_width,
            fit_width: args.fit_width,
            sort_columns: args.sort_columns.clone(),
            sort_descending: args.sort_descending,
            noindent: args.noindent,
            prefix: args.prefix.clone(),
        }
    }
}
