//! `aggregate` commands (compute host aggregates).
//!
//! Metadata changes go through the `set_metadata` action; a key set to
//! `null` is removed by the service.

use clap::{Args, Subcommand};
use osc_dispatch::{
    parse_key_value, require_changes, Action, AttributePayload, BuildAttributes, ResourceHandle,
    ResourceQuery, Result,
};
use osc_render::{ColumnSpec, Format};
use serde_json::{json, Map, Value};

use super::{forward_run, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::AGGREGATE;

#[derive(Subcommand, Debug)]
pub enum AggregateCommand {
    /// Create a new aggregate
    Create(CreateAggregate),
    /// Delete existing aggregate(s)
    Delete(DeleteAggregate),
    /// List all aggregates
    List(ListAggregates),
    /// Display aggregate details
    Show(ShowAggregate),
    /// Set aggregate properties
    Set(SetAggregate),
    /// Unset aggregate properties
    Unset(UnsetAggregate),
    #[command(subcommand)]
    Add(AddWord),
    #[command(subcommand)]
    Remove(RemoveWord),
}

forward_run!(AggregateCommand {
    Create, Delete, List, Show, Set, Unset, Add, Remove
});

#[derive(Subcommand, Debug)]
pub enum AddWord {
    /// Add host to aggregate
    Host(AddHost),
}

forward_run!(AddWord { Host });

#[derive(Subcommand, Debug)]
pub enum RemoveWord {
    /// Remove host from aggregate
    Host(RemoveHost),
}

forward_run!(RemoveWord { Host });

fn aggregate_spec() -> ColumnSpec {
    show_spec()
        .rename("metadata", "properties")
        .format("metadata", Format::Dict)
        .format("hosts", Format::List)
}

fn set_metadata(
    ctx: &Context<'_>,
    id: &str,
    metadata: Map<String, Value>,
) -> Result<Option<ResourceHandle>> {
    ctx.api.action(
        &AGGREGATE,
        id,
        &Action::post("action", json!({"set_metadata": {"metadata": metadata}})),
    )
}

fn properties_map(pairs: &[(String, String)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

#[derive(Args, Debug)]
pub struct CreateAggregate {
    /// New aggregate name
    pub name: String,

    /// Availability zone name
    #[arg(long)]
    pub zone: Option<String>,

    /// Property to add to this aggregate (repeat option to set multiple properties)
    #[arg(
        long = "property",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value
    )]
    pub properties: Vec<(String, String)>,
}

impl BuildAttributes for CreateAggregate {
    fn build_attributes(&self) -> Result<AttributePayload> {
        let mut attrs = AttributePayload::new();
        attrs
            .set("name", self.name.as_str())
            .set_opt("availability_zone", self.zone.clone());
        Ok(attrs)
    }
}

impl Run for CreateAggregate {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let mut aggregate = ctx.api.create(&AGGREGATE, &self.build_attributes()?)?;
        if !self.properties.is_empty() {
            let metadata = properties_map(&self.properties);
            if let Some(updated) = set_metadata(ctx, aggregate.id(), metadata)? {
                aggregate = updated;
            }
        }
        Ok(Output::show(&aggregate, &aggregate_spec()))
    }
}

#[derive(Args, Debug)]
pub struct DeleteAggregate {
    /// Aggregate(s) to delete (name or ID)
    #[arg(required = true)]
    pub aggregates: Vec<String>,
}

impl Run for DeleteAggregate {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        ctx.delete_all(&AGGREGATE, &self.aggregates, &ResourceQuery::new())
    }
}

#[derive(Args, Debug)]
pub struct ListAggregates {
    /// List additional fields in output
    #[arg(long)]
    pub long: bool,
}

impl Run for ListAggregates {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let aggregates = ctx.api.list(&AGGREGATE, &ResourceQuery::new())?;
        let spec = ColumnSpec::list(&[
            ("id", "ID"),
            ("name", "Name"),
            ("availability_zone", "Availability Zone"),
        ])
        .long(self.long, &[("metadata", "Properties"), ("hosts", "Hosts")])
        .format("metadata", Format::Dict)
        .format("hosts", Format::List);
        Ok(Output::list(&aggregates, &spec))
    }
}

#[derive(Args, Debug)]
pub struct ShowAggregate {
    /// Aggregate to display (name or ID)
    pub aggregate: String,
}

impl Run for ShowAggregate {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let aggregate = ctx.find(&AGGREGATE, &self.aggregate)?;
        Ok(Output::show(&aggregate, &aggregate_spec()))
    }
}

#[derive(Args, Debug)]
pub struct SetAggregate {
    /// Aggregate to modify (name or ID)
    pub aggregate: String,

    /// Set aggregate name
    #[arg(long)]
    pub name: Option<String>,

    /// Set availability zone name
    #[arg(long)]
    pub zone: Option<String>,

    /// Property to set on the aggregate (repeat option to set multiple properties)
    #[arg(
        long = "property",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value
    )]
    pub properties: Vec<(String, String)>,

    /// Remove all properties from the aggregate (specify both --property and
    /// --no-property to overwrite the current properties)
    #[arg(long)]
    pub no_property: bool,
}

impl BuildAttributes for SetAggregate {
    fn build_attributes(&self) -> Result<AttributePayload> {
        let mut attrs = AttributePayload::new();
        attrs
            .set_opt("name", self.name.clone())
            .set_opt("availability_zone", self.zone.clone());
        Ok(attrs)
    }
}

impl SetAggregate {
    /// Metadata changes: existing keys cleared by `--no-property`, then the
    /// new properties.
    fn metadata(&self, current: &ResourceHandle) -> Map<String, Value> {
        let mut metadata = Map::new();
        if self.no_property {
            if let Some(Value::Object(existing)) = current.get("metadata") {
                for key in existing.keys() {
                    metadata.insert(key.clone(), Value::Null);
                }
            }
        }
        metadata.extend(properties_map(&self.properties));
        metadata
    }
}

impl Run for SetAggregate {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let attrs = self.build_attributes()?;
        let aggregate = ctx.find(&AGGREGATE, &self.aggregate)?;
        if !attrs.is_empty() {
            ctx.api.update(&AGGREGATE, aggregate.id(), &attrs)?;
        }
        let metadata = self.metadata(&aggregate);
        if !metadata.is_empty() {
            set_metadata(ctx, aggregate.id(), metadata)?;
        }
        Ok(Output::Silent)
    }
}

#[derive(Args, Debug)]
pub struct UnsetAggregate {
    /// Aggregate to modify (name or ID)
    pub aggregate: String,

    /// Property to remove from aggregate (repeat option to remove multiple properties)
    #[arg(long = "property", value_name = "KEY")]
    pub properties: Vec<String>,
}

impl BuildAttributes for UnsetAggregate {
    fn build_attributes(&self) -> Result<AttributePayload> {
        let attrs: AttributePayload = self
            .properties
            .iter()
            .map(|key| (key.clone(), Value::Null))
            .collect();
        require_changes(&attrs, "aggregate unset")?;
        Ok(attrs)
    }
}

impl Run for UnsetAggregate {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let metadata = self.build_attributes()?;
        let aggregate = ctx.find(&AGGREGATE, &self.aggregate)?;
        set_metadata(ctx, aggregate.id(), metadata.as_map().clone())?;
        Ok(Output::Silent)
    }
}

fn host_action(ctx: &Context<'_>, token: &str, verb: &str, host: &str) -> Result<Output> {
    let aggregate = ctx.find(&AGGREGATE, token)?;
    let mut body = Map::new();
    body.insert(verb.to_string(), json!({ "host": host }));
    let action = Action::post("action", Value::Object(body));
    let updated = ctx
        .api
        .action(&AGGREGATE, aggregate.id(), &action)?
        .unwrap_or(aggregate);
    Ok(Output::show(&updated, &aggregate_spec()))
}

#[derive(Args, Debug)]
pub struct AddHost {
    /// Aggregate (name or ID)
    pub aggregate: String,
    /// Host to add to the aggregate
    pub host: String,
}

impl Run for AddHost {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        host_action(ctx, &self.aggregate, "add_host", &self.host)
    }
}

#[derive(Args, Debug)]
pub struct RemoveHost {
    /// Aggregate (name or ID)
    pub aggregate: String,
    /// Host to remove from the aggregate
    pub host: String,
}

impl Run for RemoveHost {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        host_action(ctx, &self.aggregate, "remove_host", &self.host)
    }
}
