//! `image` commands.
//!
//! Images are not enveloped and are updated with JSON-patch documents, so
//! custom properties are plain top-level fields.

use clap::{Args, Subcommand};
use osc_dispatch::{
    exclusive, parse_key_value, require_changes, AttributePayload, BuildAttributes, ResourceQuery,
    Result,
};
use osc_render::{ColumnSpec, Format};

use super::{forward_run, show_spec};
use crate::context::{Context, Output, Run};
use crate::kinds::IMAGE;

#[derive(Subcommand, Debug)]
pub enum ImageCommand {
    /// List available images
    List(ListImages),
    /// Display image details
    Show(ShowImage),
    /// Delete image(s)
    Delete(DeleteImage),
    /// Set image properties
    Set(SetImage),
}

forward_run!(ImageCommand {
    List, Show, Delete, Set
});

fn image_spec() -> ColumnSpec {
    show_spec()
        .hide("file")
        .hide("schema")
        .hide("self")
        .format("tags", Format::List)
        .format("protected", Format::Bool)
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct VisibilityFilter {
    /// List only public images
    #[arg(long)]
    pub public: bool,

    /// List only private images
    #[arg(long)]
    pub private: bool,

    /// List only shared images
    #[arg(long)]
    pub shared: bool,

    /// List only community images
    #[arg(long)]
    pub community: bool,
}

impl VisibilityFilter {
    fn visibility(&self) -> Result<Option<&'static str>> {
        let flags = [
            ("--public", self.public, "public"),
            ("--private", self.private, "private"),
            ("--shared", self.shared, "shared"),
            ("--community", self.community, "community"),
        ];
        let group: Vec<(&str, bool)> = flags.iter().map(|(f, on, _)| (*f, *on)).collect();
        exclusive(&group)?;
        Ok(flags.iter().find(|(_, on, _)| *on).map(|(_, _, v)| *v))
    }
}

#[derive(Args, Debug, Default)]
pub struct ListImages {
    #[command(flatten)]
    pub visibility: VisibilityFilter,

    /// Filter images based on name
    #[arg(long)]
    pub name: Option<String>,

    /// Filter images based on status
    #[arg(long)]
    pub status: Option<String>,

    /// List additional fields in output
    #[arg(long)]
    pub long: bool,
}

impl Run for ListImages {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let query = ResourceQuery::new()
            .filter_opt("visibility", self.visibility.visibility()?)
            .filter_opt("name", self.name.as_deref())
            .filter_opt("status", self.status.as_deref());
        let spec = ColumnSpec::list(&[("id", "ID"), ("name", "Name"), ("status", "Status")])
            .long(
                self.long,
                &[
                    ("disk_format", "Disk Format"),
                    ("container_format", "Container Format"),
                    ("size", "Size"),
                    ("checksum", "Checksum"),
                    ("visibility", "Visibility"),
                    ("protected", "Protected"),
                    ("owner", "Project"),
                    ("tags", "Tags"),
                ],
            )
            .format("protected", Format::Bool)
            .format("tags", Format::List);
        let images = ctx.api.list(&IMAGE, &query)?;
        Ok(Output::list(&images, &spec))
    }
}

#[derive(Args, Debug)]
pub struct ShowImage {
    /// Image to display (name or ID)
    pub image: String,
}

impl Run for ShowImage {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let image = ctx.find(&IMAGE, &self.image)?;
        Ok(Output::show(&image, &image_spec()))
    }
}

#[derive(Args, Debug)]
pub struct DeleteImage {
    /// Image(s) to delete (name or ID)
    #[arg(required = true)]
    pub images: Vec<String>,
}

impl Run for DeleteImage {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        ctx.delete_all(&IMAGE, &self.images, &ResourceQuery::new())
    }
}

#[derive(Args, Debug, Default)]
pub struct SetImage {
    /// Image to modify (name or ID)
    pub image: String,

    /// New image name
    #[arg(long)]
    pub name: Option<String>,

    /// Set a property on this image (repeat option to set multiple properties)
    #[arg(
        long = "property",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value
    )]
    pub properties: Vec<(String, String)>,

    /// Image is accessible to the public
    #[arg(long)]
    pub public: bool,

    /// Image is inaccessible to the public
    #[arg(long)]
    pub private: bool,
}

impl BuildAttributes for SetImage {
    fn build_attributes(&self) -> Result<AttributePayload> {
        exclusive(&[("--public", self.public), ("--private", self.private)])?;
        let mut attrs = AttributePayload::new();
        attrs
            .extend_properties(&self.properties)
            .set_opt("name", self.name.clone())
            .set_if(self.public, "visibility", "public")
            .set_if(self.private, "visibility", "private");
        Ok(attrs)
    }
}

impl Run for SetImage {
    fn run(&self, ctx: &Context<'_>) -> Result<Output> {
        let attrs = self.build_attributes()?;
        require_changes(&attrs, "image set")?;
        let image = ctx.find(&IMAGE, &self.image)?;
        ctx.api.update(&IMAGE, image.id(), &attrs)?;
        Ok(Output::Silent)
    }
}
