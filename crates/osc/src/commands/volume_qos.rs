//! `volume qos` commands (block storage QoS specifications).
//!
//! Spec keys live in the `specs` mapping of a QoS resource. Keys are added
//! with a `PUT` of the resource and removed through `delete_keys`.

use clap::{Args, Subcommand, ValueEnum};
use osc_dispatch::{exactly_one, parse_key_value, Action, AttributePayload, ResourceQuery, Result};
use osc_render::{ColumnSpec, Format};
use serde_json::json;

use super::{forward_run, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::{QOS_SPEC, VOLUME_TYPE};

#[derive(Subcommand, Debug)]
pub enum QosCommand {
    /// Create new QoS specification
    Create(CreateQos),
    /// Delete QoS specification(s)
    Delete(DeleteQos),
    /// List QoS specifications
    List(ListQos),
    /// Display QoS specification details
    Show(ShowQos),
    /// Set QoS specification properties
    Set(SetQos),
    /// Unset QoS specification properties
    Unset(UnsetQos),
    /// Associate a QoS specification to a volume type
    Associate(AssociateQos),
    /// Disassociate a QoS specification from a volume type
    Disassociate(DisassociateQos),
}

forward_run!(QosCommand {
    Create, Delete, List, Show, Set, Unset, Associate, Disassociate
});

/// Where the QoS policy is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Consumer {
    FrontEnd,
    BackEnd,
    Both,
}

impl Consumer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consumer::FrontEnd => "front-end",
            Consumer::BackEnd => "back-end",
            Consumer::Both => "both",
        }
    }
}

fn qos_spec() -> ColumnSpec {
    show_spec()
        .rename("specs", "properties")
        .format("specs", Format::Dict)
}

#[derive(Args, Debug)]
pub struct CreateQos {
    /// New QoS specification name
    pub name: String,

    /// Consumer of the QoS
    #[arg(long, value_enum, default_value_t = Consumer::Both)]
    pub consumer: Consumer,

    /// Set a QoS specification property (repeat option to set multiple properties)
    #[arg(
        long = "property",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value
    )]
    pub properties: Vec<(String, String)>,
}

impl Run for CreateQos {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let mut attrs = AttributePayload::new();
        attrs
            .set("name", self.name.as_str())
            .set("consumer", self.consumer.as_str())
            .extend_properties(&self.properties);
        let qos = ctx.api.create(&QOS_SPEC, &attrs)?;
        Ok(Output::show(&qos, &qos_spec()))
    }
}

#[derive(Args, Debug)]
pub struct DeleteQos {
    /// QoS specification(s) to delete (name or ID)
    #[arg(required = true)]
    pub qos_specs: Vec<String>,

    /// Allow to delete in-use QoS specification(s)
    #[arg(long)]
    pub force: bool,
}

impl Run for DeleteQos {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let query = ResourceQuery::new().filter_if(self.force, "force", true);
        ctx.delete_all(&QOS_SPEC, &self.qos_specs, &query)
    }
}

#[derive(Args, Debug)]
pub struct ListQos {}

impl Run for ListQos {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let spec = ColumnSpec::list(&[
            ("id", "ID"),
            ("name", "Name"),
            ("consumer", "Consumer"),
            ("specs", "Properties"),
        ])
        .format("specs", Format::Dict);
        let specs = ctx.api.list(&QOS_SPEC, &ResourceQuery::new())?;
        Ok(Output::list(&specs, &spec))
    }
}

#[derive(Args, Debug)]
pub struct ShowQos {
    /// QoS specification to display (name or ID)
    pub qos_spec: String,
}

impl Run for ShowQos {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let qos = ctx.find(&QOS_SPEC, &self.qos_spec)?;
        Ok(Output::show(&qos, &qos_spec()))
    }
}

#[derive(Args, Debug)]
pub struct SetQos {
    /// QoS specification to modify (name or ID)
    pub qos_spec: String,

    /// Property to add or modify for this QoS specification (repeat option to
    /// set multiple properties)
    #[arg(
        long = "property",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value
    )]
    pub properties: Vec<(String, String)>,
}

impl Run for SetQos {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let qos = ctx.find(&QOS_SPEC, &self.qos_spec)?;
        if !self.properties.is_empty() {
            let mut attrs = AttributePayload::new();
            attrs.extend_properties(&self.properties);
            ctx.api.update(&QOS_SPEC, qos.id(), &attrs)?;
        }
        Ok(Output::Silent)
    }
}

#[derive(Args, Debug)]
pub struct UnsetQos {
    /// QoS specification to modify (name or ID)
    pub qos_spec: String,

    /// Property to remove from the QoS specification (repeat option to unset multiple properties)
    #[arg(long = "property", value_name = "KEY")]
    pub properties: Vec<String>,
}

impl Run for UnsetQos {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let qos = ctx.find(&QOS_SPEC, &self.qos_spec)?;
        if !self.properties.is_empty() {
            ctx.api.action(
                &QOS_SPEC,
                qos.id(),
                &Action::put("delete_keys", json!({"keys": self.properties})),
            )?;
        }
        Ok(Output::Silent)
    }
}

#[derive(Args, Debug)]
pub struct AssociateQos {
    /// QoS specification to modify (name or ID)
    pub qos_spec: String,

    /// Volume type to associate the QoS (name or ID)
    pub volume_type: String,
}

impl Run for AssociateQos {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let qos = ctx.find(&QOS_SPEC, &self.qos_spec)?;
        let volume_type = ctx.find(&VOLUME_TYPE, &self.volume_type)?;
        let query = ResourceQuery::new().filter("vol_type_id", volume_type.id());
        ctx.api
            .action(&QOS_SPEC, qos.id(), &Action::get("associate").query(query))?;
        Ok(Output::Silent)
    }
}

#[derive(Args, Debug)]
pub struct DisassociateQos {
    /// QoS specification to modify (name or ID)
    pub qos_spec: String,

    /// Volume type to disassociate the QoS from (name or ID)
    #[arg(long)]
    pub volume_type: Option<String>,

    /// Disassociate the QoS from every volume type
    #[arg(long)]
    pub all: bool,
}

impl Run for DisassociateQos {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        exactly_one(&[
            ("--volume-type", self.volume_type.is_some()),
            ("--all", self.all),
        ])?;
        let qos = ctx.find(&QOS_SPEC, &self.qos_spec)?;
        let action = match &self.volume_type {
            Some(token) => {
                let volume_type = ctx.find(&VOLUME_TYPE, token)?;
                Action::get("disassociate")
                    .query(ResourceQuery::new().filter("vol_type_id", volume_type.id()))
            }
            None => Action::get("disassociate_all"),
        };
        ctx.api.action(&QOS_SPEC, qos.id(), &action)?;
        Ok(Output::Silent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osc_test::{MemoryCloud, Op};

    fn cloud() -> MemoryCloud {
        MemoryCloud::new()
            .with(
                &QOS_SPEC,
                json!({"id": "q-1", "name": "gold", "consumer": "back-end",
                       "specs": {"read_iops_sec": "2000", "write_iops_sec": "1000"}}),
            )
            .with(&VOLUME_TYPE, json!({"id": "vt-1", "name": "ssd"}))
    }

    #[test]
    fn test_create_flattens_properties() {
        let cloud = MemoryCloud::new();
        CreateQos {
            name: "silver".into(),
            consumer: Consumer::FrontEnd,
            properties: vec![("total_iops_sec".into(), "500".into())],
        }
        .run(&Context::new(&cloud))
        .unwrap();
        assert_eq!(
            cloud.calls_of(Op::Create)[0].body,
            Some(json!({"name": "silver", "consumer": "front-end", "total_iops_sec": "500"}))
        );
    }

    #[test]
    fn test_list_formats_specs() {
        let cloud = cloud();
        let Output::Listing(listing) = ListQos {}.run(&Context::new(&cloud)).unwrap() else {
            panic!("expected a listing");
        };
        assert_eq!(
            listing.rows()[0][3].text,
            "read_iops_sec='2000', write_iops_sec='1000'"
        );
    }

    #[test]
    fn test_delete_force_passes_query() {
        let cloud = cloud();
        DeleteQos {
            qos_specs: vec!["gold".into()],
            force: true,
        }
        .run(&Context::new(&cloud))
        .unwrap();
        let delete = &cloud.calls_of(Op::Delete)[0];
        assert_eq!(delete.id.as_deref(), Some("q-1"));
        assert_eq!(
            delete.query,
            vec![("force".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn test_unset_sends_delete_keys() {
        let cloud = cloud();
        UnsetQos {
            qos_spec: "gold".into(),
            properties: vec!["read_iops_sec".into()],
        }
        .run(&Context::new(&cloud))
        .unwrap();
        let action = &cloud.calls_of(Op::Action)[0];
        assert_eq!(action.action.as_deref(), Some("PUT delete_keys"));
        assert_eq!(action.body, Some(json!({"keys": ["read_iops_sec"]})));
    }

    #[test]
    fn test_associate_resolves_volume_type() {
        let cloud = cloud();
        AssociateQos {
            qos_spec: "gold".into(),
            volume_type: "ssd".into(),
        }
        .run(&Context::new(&cloud))
        .unwrap();
        let action = &cloud.calls_of(Op::Action)[0];
        assert_eq!(action.action.as_deref(), Some("GET associate"));
        assert_eq!(
            action.query,
            vec![("vol_type_id".to_string(), "vt-1".to_string())]
        );
    }

    #[test]
    fn test_disassociate_all() {
        let cloud = cloud();
        DisassociateQos {
            qos_spec: "q-1".into(),
            volume_type: None,
            all: true,
        }
        .run(&Context::new(&cloud))
        .unwrap();
        assert_eq!(
            cloud.calls_of(Op::Action)[0].action.as_deref(),
            Some("GET disassociate_all")
        );
    }

    #[test]
    fn test_disassociate_needs_a_target() {
        let cloud = cloud();
        let err = DisassociateQos {
            qos_spec: "q-1".into(),
            volume_type: None,
            all: false,
        }
        .run(&Context::new(&cloud))
        .unwrap_err();
        assert!(err.to_string().contains("--volume-type"));
        assert!(cloud.calls().is_empty());
    }
}
