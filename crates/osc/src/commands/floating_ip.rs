//! `floating ip` commands, on the network API or the legacy compute API.

use clap::{Args, Subcommand};
use osc_dispatch::{require_changes, AttributePayload, ResourceQuery, Result};
use osc_render::{ColumnSpec, Format};
use serde_json::Value;

use super::{forward_run, network_only, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::{FLOATING_IP, NETWORK, PORT, PROJECT, SUBNET};

#[derive(Subcommand, Debug)]
pub enum FloatingIpCommand {
    /// Create floating IP
    Create(CreateFloatingIp),
    /// Delete floating IP(s)
    Delete(DeleteFloatingIp),
    /// List floating IP(s)
    List(ListFloatingIps),
    /// Display floating IP details
    Show(ShowFloatingIp),
    /// Set floating IP properties
    Set(SetFloatingIp),
    /// Unset floating IP properties
    Unset(UnsetFloatingIp),
}

forward_run!(FloatingIpCommand {
    Create, Delete, List, Show, Set, Unset
});

fn floating_ip_spec() -> ColumnSpec {
    show_spec().format("tags", Format::List)
}

#[derive(Args, Debug, Default)]
pub struct CreateFloatingIp {
    /// Network to allocate floating IP from (name or ID)
    pub network: String,

    /// Subnet on which you want to create the floating IP (name or ID)
    #[arg(long)]
    pub subnet: Option<String>,

    /// Port to be associated with the floating IP (name or ID)
    #[arg(long)]
    pub port: Option<String>,

    /// Floating IP address
    #[arg(long, value_name = "IP-ADDRESS")]
    pub floating_ip_address: Option<String>,

    /// Fixed IP address mapped to the floating IP
    #[arg(long, value_name = "IP-ADDRESS")]
    pub fixed_ip_address: Option<String>,

    /// Set floating IP description
    #[arg(long)]
    pub description: Option<String>,

    /// Owner's project (name or ID)
    #[arg(long)]
    pub project: Option<String>,
}

impl Run for CreateFloatingIp {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        network_only(
            ctx,
            &[
                ("--subnet", self.subnet.is_some()),
                ("--port", self.port.is_some()),
                ("--floating-ip-address", self.floating_ip_address.is_some()),
                ("--fixed-ip-address", self.fixed_ip_address.is_some()),
                ("--description", self.description.is_some()),
                ("--project", self.project.is_some()),
            ],
        )?;

        let kind = ctx.select(&FLOATING_IP);
        let mut attrs = AttributePayload::new();
        if ctx.is_network() {
            attrs
                .set(
                    "floating_network_id",
                    ctx.find(&NETWORK, &self.network)?.id(),
                )
                .set_opt("subnet_id", ctx.find_id(&SUBNET, self.subnet.as_deref())?)
                .set_opt("port_id", ctx.find_id(&PORT, self.port.as_deref())?)
                .set_opt("floating_ip_address", self.floating_ip_address.clone())
                .set_opt("fixed_ip_address", self.fixed_ip_address.clone())
                .set_opt("description", self.description.clone())
                .set_opt(
                    "project_id",
                    ctx.find_id(&PROJECT, self.project.as_deref())?,
                );
        } else {
            attrs.set("pool", self.network.as_str());
        }
        let ip = ctx.api.create(kind, &attrs)?;
        Ok(Output::show(&ip, &floating_ip_spec()))
    }
}

#[derive(Args, Debug)]
pub struct DeleteFloatingIp {
    /// Floating IP(s) to delete (IP address or ID)
    #[arg(required = true)]
    pub floating_ips: Vec<String>,
}

impl Run for DeleteFloatingIp {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        ctx.delete_all(
            ctx.select(&FLOATING_IP),
            &self.floating_ips,
            &ResourceQuery::new(),
        )
    }
}

#[derive(Args, Debug, Default)]
pub struct ListFloatingIps {
    /// List floating IP(s) according to given network (name or ID)
    #[arg(long)]
    pub network: Option<String>,

    /// List floating IP(s) according to given port (name or ID)
    #[arg(long)]
    pub port: Option<String>,

    /// List floating IP(s) according to given fixed IP address
    #[arg(long, value_name = "IP-ADDRESS")]
    pub fixed_ip_address: Option<String>,

    /// List floating IP(s) according to given status ('ACTIVE', 'DOWN')
    #[arg(long, value_parser = ["ACTIVE", "DOWN"])]
    pub status: Option<String>,

    /// List floating IP(s) according to given project (name or ID)
    #[arg(long)]
    pub project: Option<String>,

    /// List additional fields in output
    #[arg(long)]
    pub long: bool,
}

impl ListFloatingIps {
    fn query(&self, ctx: &Context<'_>) -> Result<ResourceQuery> {
        Ok(ResourceQuery::new()
            .filter_opt(
                "floating_network_id",
                ctx.find_id(&NETWORK, self.network.as_deref())?,
            )
            .filter_opt("port_id", ctx.find_id(&PORT, self.port.as_deref())?)
            .filter_opt("fixed_ip_address", self.fixed_ip_address.as_deref())
            .filter_opt("status", self.status.as_deref())
            .filter_opt(
                "project_id",
                ctx.find_id(&PROJECT, self.project.as_deref())?,
            ))
    }
}

impl Run for ListFloatingIps {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        network_only(
            ctx,
            &[
                ("--network", self.network.is_some()),
                ("--port", self.port.is_some()),
                ("--fixed-ip-address", self.fixed_ip_address.is_some()),
                ("--status", self.status.is_some()),
                ("--project", self.project.is_some()),
                ("--long", self.long),
            ],
        )?;

        let kind = ctx.select(&FLOATING_IP);
        let spec = if ctx.is_network() {
            ColumnSpec::list(&[
                ("id", "ID"),
                ("floating_ip_address", "Floating IP Address"),
                ("fixed_ip_address", "Fixed IP Address"),
                ("port_id", "Port"),
                ("floating_network_id", "Floating Network"),
                ("project_id", "Project"),
            ])
            .long(
                self.long,
                &[
                    ("router_id", "Router"),
                    ("status", "Status"),
                    ("description", "Description"),
                    ("tags", "Tags"),
                ],
            )
            .format("tags", Format::List)
        } else {
            ColumnSpec::list(&[
                ("id", "ID"),
                ("ip", "Floating IP Address"),
                ("fixed_ip", "Fixed IP Address"),
                ("instance_id", "Server"),
                ("pool", "Pool"),
            ])
        };
        let ips = ctx.api.list(kind, &self.query(ctx)?)?;
        Ok(Output::list(&ips, &spec))
    }
}

#[derive(Args, Debug)]
pub struct ShowFloatingIp {
    /// Floating IP to display (IP address or ID)
    pub floating_ip: String,
}

impl Run for ShowFloatingIp {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let ip = ctx.find(ctx.select(&FLOATING_IP), &self.floating_ip)?;
        Ok(Output::show(&ip, &floating_ip_spec()))
    }
}

#[derive(Args, Debug, Default)]
pub struct SetFloatingIp {
    /// Floating IP to modify (IP address or ID)
    pub floating_ip: String,

    /// Associate the floating IP with port (name or ID)
    #[arg(long)]
    pub port: Option<String>,

    /// Fixed IP of the port (required only if port has multiple IPs)
    #[arg(long, value_name = "IP-ADDRESS")]
    pub fixed_ip_address: Option<String>,

    /// Set floating IP description
    #[arg(long)]
    pub description: Option<String>,
}

impl Run for SetFloatingIp {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        network_only(ctx, &[("floating ip set", true)])?;
        let ip = ctx.find(&FLOATING_IP.network, &self.floating_ip)?;

        let mut attrs = AttributePayload::new();
        attrs
            .set_opt("port_id", ctx.find_id(&PORT, self.port.as_deref())?)
            .set_opt("fixed_ip_address", self.fixed_ip_address.clone())
            .set_opt("description", self.description.clone());
        require_changes(&attrs, "floating ip set")?;

        ctx.api.update(&FLOATING_IP.network, ip.id(), &attrs)?;
        Ok(Output::Silent)
    }
}

#[derive(Args, Debug)]
pub struct UnsetFloatingIp {
    /// Floating IP to disassociate (IP address or ID)
    pub floating_ip: String,

    /// Disassociate any port associated with the floating IP
    #[arg(long)]
    pub port: bool,
}

impl Run for UnsetFloatingIp {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        network_only(ctx, &[("floating ip unset", true)])?;
        let mut attrs = AttributePayload::new();
        attrs.set_if(self.port, "port_id", Value::Null);
        require_changes(&attrs, "floating ip unset")?;

        let ip = ctx.find(&FLOATING_IP.network, &self.floating_ip)?;
        ctx.api.update(&FLOATING_IP.network, ip.id(), &attrs)?;
        Ok(Output::Silent)
    }
}
