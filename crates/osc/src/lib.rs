//! # osc: an OpenStack command-line client
//!
//! The binary parses a [`Cli`], loads connection [`Settings`], builds an
//! [`HttpApi`] and runs one leaf command. Commands return an [`Output`];
//! this crate renders it with `osc-render` and writes it to stdout.
//!
//! The pieces are split so that tests can swap the backend:
//!
//! - [`cli`] holds the clap command tree and the global flags.
//! - [`commands`] holds one module per resource group.
//! - [`context`] is the [`Run`] trait and what a command receives.
//! - [`http`] is the REST adapter, [`config`] the `clouds.yaml` layer.
//! - [`rules`] is the security group rule argument handling shared by the
//!   rule commands.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod http;
pub mod kinds;
pub mod logging;
pub mod rules;

use std::io::Write;

use anyhow::Result;
use osc_render::{render_listing, render_show, write_output, OutputOptions};

pub use cli::Cli;
pub use config::Settings;
pub use context::{Context, Output, Run};
pub use http::HttpApi;

/// Runs a parsed command line against the configured cloud.
pub fn run(cli: Cli) -> Result<()> {
    logging::init_logging(cli.verbose, cli.quiet);

    let settings = Settings::load(&cli.cloud)?;
    tracing::debug!(backend = ?settings.backend, "selected network backend");
    let backend = settings.backend;
    let api = HttpApi::new(settings)?;
    let ctx = Context::new(&api).backend(backend);

    let options = OutputOptions::from(&cli.format);
    let stdout = std::io::stdout();
    execute(&cli.command, &ctx, &options, &mut stdout.lock())
}

/// Runs one command and writes its rendered output.
pub fn execute<W: Write>(
    command: &dyn Run,
    ctx: &Context<'_>,
    options: &OutputOptions,
    out: &mut W,
) -> Result<()> {
    let rendered = match command.run(ctx)? {
        Output::Listing(listing) => render_listing(listing, options)?,
        Output::Show(row) => render_show(row, options)?,
        Output::Silent => return Ok(()),
    };
    write_output(out, &rendered)?;
    Ok(())
}
