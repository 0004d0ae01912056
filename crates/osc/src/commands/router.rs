//! `router` commands.

use std::collections::BTreeMap;

use clap::{Args, Subcommand};
use osc_dispatch::{
    exclusive, parse_multi_key_value, require_changes, AttributePayload, ResourceHandle,
    ResourceQuery, Result,
};
use osc_render::{ColumnSpec, Format};
use serde_json::{json, Value};

use super::{forward_run, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::{NETWORK, PROJECT, ROUTER, SUBNET};

#[derive(Subcommand, Debug)]
pub enum RouterCommand {
    /// Create a new router
    Create(CreateRouter),
    /// Delete router(s)
    Delete(DeleteRouter),
    /// List routers
    List(ListRouters),
    /// Display router details
    Show(ShowRouter),
    /// Set router properties
    Set(SetRouter),
    /// Unset router properties
    Unset(UnsetRouter),
}

forward_run!(RouterCommand {
    Create, Delete, List, Show, Set, Unset
});

fn parse_fixed_ip(s: &str) -> std::result::Result<BTreeMap<String, String>, String> {
    parse_multi_key_value(s, &[], &["subnet", "ip-address"])
}

fn parse_route(s: &str) -> std::result::Result<BTreeMap<String, String>, String> {
    parse_multi_key_value(s, &["destination", "gateway"], &[])
}

fn router_spec() -> ColumnSpec {
    show_spec()
        .rename("tenant_id", "project_id")
        .format("admin_state_up", Format::AdminState)
        .format("external_gateway_info", Format::Dict)
        .format("routes", Format::DictList)
        .format("availability_zones", Format::List)
        .format("availability_zone_hints", Format::List)
        .format("tags", Format::List)
}

/// `--enable`/`--disable` and `--distributed`/`--centralized`, shared by
/// create and set.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RouterToggles {
    /// Enable router
    #[arg(long)]
    pub enable: bool,

    /// Disable router
    #[arg(long)]
    pub disable: bool,

    /// Set router to distributed mode (disabled router only)
    #[arg(long)]
    pub distributed: bool,

    /// Set router to centralized mode (disabled router only)
    #[arg(long)]
    pub centralized: bool,
}

impl RouterToggles {
    fn apply(&self, attrs: &mut AttributePayload) -> Result<()> {
        exclusive(&[("--enable", self.enable), ("--disable", self.disable)])?;
        exclusive(&[
            ("--distributed", self.distributed),
            ("--centralized", self.centralized),
        ])?;
        attrs
            .set_toggle("admin_state_up", self.enable, self.disable)
            .set_toggle("distributed", self.distributed, self.centralized);
        Ok(())
    }
}

/// External gateway flags, shared by create and set.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct GatewayArgs {
    /// External network used as router's gateway (name or ID)
    #[arg(long, value_name = "NETWORK")]
    pub external_gateway: Option<String>,

    /// Desired IP and/or subnet on external gateway:
    /// subnet=<subnet>,ip-address=<ip-address> (repeat option to set multiple fixed IP addresses)
    #[arg(
        long,
        value_name = "subnet=<subnet>,ip-address=<ip-address>",
        value_parser = parse_fixed_ip
    )]
    pub fixed_ip: Vec<BTreeMap<String, String>>,

    /// Enable Source NAT on external gateway
    #[arg(long)]
    pub enable_snat: bool,

    /// Disable Source NAT on external gateway
    #[arg(long)]
    pub disable_snat: bool,
}

impl GatewayArgs {
    fn check(&self) -> Result<()> {
        exclusive(&[
            ("--enable-snat", self.enable_snat),
            ("--disable-snat", self.disable_snat),
        ])?;
        let needs_gateway = !self.fixed_ip.is_empty() || self.enable_snat || self.disable_snat;
        if needs_gateway && self.external_gateway.is_none() {
            return Err(osc_dispatch::Error::validation(
                "You must specify '--external-gateway' in order to specify SNAT or fixed-ip values",
            ));
        }
        Ok(())
    }

    /// The `external_gateway_info` object, when a gateway was given.
    fn info(&self, ctx: &Context<'_>) -> Result<Option<Value>> {
        let Some(network) = &self.external_gateway else {
            return Ok(None);
        };
        let mut info = json!({ "network_id": ctx.find(&NETWORK, network)?.id() });
        if self.enable_snat || self.disable_snat {
            info["enable_snat"] = Value::Bool(self.enable_snat);
        }
        if !self.fixed_ip.is_empty() {
            let mut ips = Vec::new();
            for entry in &self.fixed_ip {
                let mut ip = serde_json::Map::new();
                if let Some(subnet) = entry.get("subnet") {
                    ip.insert("subnet_id".into(), ctx.find(&SUBNET, subnet)?.id().into());
                }
                if let Some(address) = entry.get("ip-address") {
                    ip.insert("ip_address".into(), address.as_str().into());
                }
                ips.push(Value::Object(ip));
            }
            info["external_fixed_ips"] = Value::Array(ips);
        }
        Ok(Some(info))
    }
}

#[derive(Args, Debug, Default)]
pub struct CreateRouter {
    /// New router name
    pub name: String,

    #[command(flatten)]
    pub toggles: RouterToggles,

    /// Set the router as highly available (disabled router only)
    #[arg(long)]
    pub ha: bool,

    /// Clear high availability attribute of the router (disabled router only)
    #[arg(long)]
    pub no_ha: bool,

    /// Set router description
    #[arg(long)]
    pub description: Option<String>,

    /// Owner's project (name or ID)
    #[arg(long)]
    pub project: Option<String>,

    /// Availability Zone in which to create this router (repeat option to
    /// set multiple availability zones)
    #[arg(long = "availability-zone-hint", value_name = "AVAILABILITY-ZONE")]
    pub availability_zone_hints: Vec<String>,

    #[command(flatten)]
    pub gateway: GatewayArgs,
}

impl Run for CreateRouter {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let mut attrs = AttributePayload::new();
        attrs.set("name", self.name.as_str());
        self.toggles.apply(&mut attrs)?;
        exclusive(&[("--ha", self.ha), ("--no-ha", self.no_ha)])?;
        self.gateway.check()?;

        attrs
            .set_toggle("ha", self.ha, self.no_ha)
            .set_opt("description", self.description.clone())
            .set_if(
                !self.availability_zone_hints.is_empty(),
                "availability_zone_hints",
                self.availability_zone_hints.clone(),
            )
            .set_opt(
                "project_id",
                ctx.find_id(&PROJECT, self.project.as_deref())?,
            )
            .set_opt("external_gateway_info", self.gateway.info(ctx)?);

        let router = ctx.api.create(&ROUTER, &attrs)?;
        Ok(Output::show(&router, &router_spec()))
    }
}

#[derive(Args, Debug)]
pub struct DeleteRouter {
    /// Router(s) to delete (name or ID)
    #[arg(required = true)]
    pub routers: Vec<String>,
}

impl Run for DeleteRouter {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        ctx.delete_all(&ROUTER, &self.routers, &ResourceQuery::new())
    }
}

#[derive(Args, Debug, Default)]
pub struct ListRouters {
    /// List routers according to their name
    #[arg(long)]
    pub name: Option<String>,

    /// List enabled routers
    #[arg(long)]
    pub enable: bool,

    /// List disabled routers
    #[arg(long)]
    pub disable: bool,

    /// List routers according to their project (name or ID)
    #[arg(long)]
    pub project: Option<String>,

    /// List additional fields in output
    #[arg(long)]
    pub long: bool,
}

impl Run for ListRouters {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        exclusive(&[("--enable", self.enable), ("--disable", self.disable)])?;
        let query = ResourceQuery::new()
            .filter_opt("name", self.name.as_deref())
            .filter_if(self.enable, "admin_state_up", true)
            .filter_if(self.disable, "admin_state_up", false)
            .filter_opt(
                "project_id",
                ctx.find_id(&PROJECT, self.project.as_deref())?,
            );

        let spec = ColumnSpec::list(&[
            ("id", "ID"),
            ("name", "Name"),
            ("status", "Status"),
            ("admin_state_up", "State"),
            ("project_id", "Project"),
            ("distributed", "Distributed"),
            ("ha", "HA"),
        ])
        .long(
            self.long,
            &[
                ("routes", "Routes"),
                ("external_gateway_info", "External gateway info"),
                ("availability_zones", "Availability zones"),
                ("tags", "Tags"),
            ],
        )
        .format("admin_state_up", Format::AdminState)
        .format("distributed", Format::Bool)
        .format("ha", Format::Bool)
        .format("routes", Format::DictList)
        .format("external_gateway_info", Format::Dict)
        .format("availability_zones", Format::List)
        .format("tags", Format::List);

        let routers = ctx.api.list(&ROUTER, &query)?;
        Ok(Output::list(&routers, &spec))
    }
}

#[derive(Args, Debug)]
pub struct ShowRouter {
    /// Router to display (name or ID)
    pub router: String,
}

impl Run for ShowRouter {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let router = ctx.find(&ROUTER, &self.router)?;
        Ok(Output::show(&router, &router_spec()))
    }
}

fn route_value(route: &BTreeMap<String, String>) -> Value {
    json!({
        "destination": route.get("destination"),
        "nexthop": route.get("gateway"),
    })
}

fn current_routes(router: &ResourceHandle) -> Vec<Value> {
    router
        .get("routes")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

#[derive(Args, Debug, Default)]
pub struct SetRouter {
    /// Router to modify (name or ID)
    pub router: String,

    /// Set router name
    #[arg(long)]
    pub name: Option<String>,

    /// Set router description
    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub toggles: RouterToggles,

    /// Add routes to the router: destination=<subnet>,gateway=<ip-address>
    /// (repeat option to add multiple routes)
    #[arg(
        long = "route",
        value_name = "destination=<subnet>,gateway=<ip-address>",
        value_parser = parse_route
    )]
    pub routes: Vec<BTreeMap<String, String>>,

    /// Clear routes associated with the router. Specify both --route and
    /// --no-route to overwrite current value of routes.
    #[arg(long)]
    pub no_route: bool,

    #[command(flatten)]
    pub gateway: GatewayArgs,
}

impl Run for SetRouter {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let mut attrs = AttributePayload::new();
        attrs
            .set_opt("name", self.name.clone())
            .set_opt("description", self.description.clone());
        self.toggles.apply(&mut attrs)?;
        self.gateway.check()?;

        let router = ctx.find(&ROUTER, &self.router)?;
        if self.no_route || !self.routes.is_empty() {
            let mut routes = if self.no_route {
                Vec::new()
            } else {
                current_routes(&router)
            };
            routes.extend(self.routes.iter().map(route_value));
            attrs.set("routes", routes);
        }
        attrs.set_opt("external_gateway_info", self.gateway.info(ctx)?);
        require_changes(&attrs, "router set")?;

        ctx.api.update(&ROUTER, router.id(), &attrs)?;
        Ok(Output::Silent)
    }
}

#[derive(Args, Debug, Default)]
pub struct UnsetRouter {
    /// Router to modify (name or ID)
    pub router: String,

    /// Routes to be removed from the router: destination=<subnet>,gateway=<ip-address>
    /// (repeat option to unset multiple routes)
    #[arg(
        long = "route",
        value_name = "destination=<subnet>,gateway=<ip-address>",
        value_parser = parse_route
    )]
    pub routes: Vec<BTreeMap<String, String>>,

    /// Remove external gateway information from the router
    #[arg(long)]
    pub external_gateway: bool,
}

impl Run for UnsetRouter {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let router = ctx.find(&ROUTER, &self.router)?;
        let mut attrs = AttributePayload::new();
        if !self.routes.is_empty() {
            let removed: Vec<Value> = self.routes.iter().map(route_value).collect();
            let kept: Vec<Value> = current_routes(&router)
                .into_iter()
                .filter(|route| !removed.contains(route))
                .collect();
            attrs.set("routes", kept);
        }
        attrs.set_if(self.external_gateway, "external_gateway_info", json!({}));
        require_changes(&attrs, "router unset")?;

        ctx.api.update(&ROUTER, router.id(), &attrs)?;
        Ok(Output::Silent)
    }
}
