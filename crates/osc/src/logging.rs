//! Diagnostic logging setup.
//!
//! Logs go to stderr so they never mix with command output on stdout. Bulk
//! failures reach the operator through this stream.

use tracing_subscriber::EnvFilter;

/// Filter for the given `-v` count, unless `RUST_LOG` is set.
///
/// `--quiet` drops everything below `error`.
pub fn create_env_filter(verbosity: u8, quiet: bool) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(directive(verbosity, quiet))
}

fn directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "osc=error,osc_dispatch=error";
    }
    match verbosity {
        0 => "osc=warn,osc_dispatch=warn",
        1 => "osc=info,osc_dispatch=info",
        // -vv adds request logging from the HTTP client
        2 => "osc=debug,osc_dispatch=debug,reqwest=debug",
        _ => "osc=trace,osc_dispatch=trace,reqwest=trace",
    }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(create_env_filter(verbosity, quiet))
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(verbosity > 1)
        .without_time()
        .try_init();
}
