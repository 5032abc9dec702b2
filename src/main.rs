use anyhow::anyhow;
use satchel::Bootstrapper;
use std::ffi::OsString;
use std::io::IsTerminal;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter, e.g. `SATCHEL_LOG=debug`
const LOG_ENV: &str = "SATCHEL_LOG";

fn init_logging() -> anyhow::Result<()> {
    let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(use_ansi)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}

fn main() {
    if let Err(err) = init_logging() {
        eprintln!("warning: {:#}", err);
    }

    let args: Vec<OsString> = std::env::args_os().collect();

    let code = Bootstrapper::new().run(&args);
    std::process::exit(code);
}
