//! Network status demo.
//!
//! Prints the current availability, re-prints it on every change, and exits
//! when Enter is pressed.
//!
//! Run with: cargo run -p netstatus --example network_status
//!
//! Set `NETSTATUS_CONFIG` to a TOML file to override the monitor settings,
//! and `RUST_LOG=netstatus=debug` to watch the detector at work.

use std::io::BufRead;

use netstatus::{MonitorConfig, NetworkStatus};
use tracing_subscriber::EnvFilter;

fn report(available: bool) {
    if available {
        println!("... Network is available");
    } else {
        println!("... Network is not available");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = match std::env::var_os("NETSTATUS_CONFIG") {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };

    let status = NetworkStatus::builder().config(config).build()?;

    println!();
    report(status.is_available());

    status.subscribe(|change| report(change.current.is_available()));

    if let Err(err) = status.start() {
        eprintln!("... Change notifications unavailable: {err}");
    }

    println!("... Press Enter to quit");
    println!();

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    status.stop();
    Ok(())
}
