use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use wakefleet::WakeStrategy;

#[derive(Parser, Debug)]
#[command(name = "wakefleet")]
#[command(about = "Keep idle-hibernating web apps awake")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Sites file: one URL per line, `#` comments allowed
    #[arg(long, global = true, value_name = "FILE", default_value = "sites.txt")]
    pub sites: PathBuf,

    /// DevTools endpoint of an already-running browser (http://host:port)
    #[arg(long, global = true, value_name = "URL")]
    pub cdp_endpoint: Option<String>,

    /// Launch a local headless browser with remote debugging enabled
    #[arg(long, global = true)]
    pub launch: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the keeper loop and the status dashboard
    Run {
        /// Address for the status dashboard
        #[arg(long, default_value = "127.0.0.1:8787")]
        listen: SocketAddr,

        /// Seconds between activity pings
        #[arg(long, default_value = "300")]
        interval: u64,

        /// Per-attempt navigation/load timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Wake-affordance detection window in seconds
        #[arg(long, default_value = "10")]
        wake_timeout: u64,

        /// Load attempts per site per cycle
        #[arg(long, default_value = "3")]
        max_attempts: u32,

        /// Seconds between failed load attempts
        #[arg(long, default_value = "5")]
        retry_delay: u64,

        /// Override wake strategies (priority order, repeatable)
        #[arg(long = "wake-selector", value_name = "NAME=SELECTOR")]
        wake_selectors: Vec<String>,
    },

    /// Visit one site once and report its resulting state
    Check {
        url: String,

        /// Navigation/load timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Wake-affordance detection window in seconds
        #[arg(long, default_value = "10")]
        wake_timeout: u64,
    },

    /// Parse and print the sites file
    Sites,
}

/// Parses repeated `NAME=SELECTOR` strategy overrides, keeping CLI order
/// as priority order.
pub fn parse_wake_selectors(specs: &[String]) -> anyhow::Result<Vec<WakeStrategy>> {
    let mut strategies = Vec::with_capacity(specs.len());
    for spec in specs {
        let Some((name, selector)) = spec.split_once('=') else {
            bail!("invalid wake selector {spec:?}; expected NAME=SELECTOR");
        };
        let (name, selector) = (name.trim(), selector.trim());
        if name.is_empty() || selector.is_empty() {
            bail!("invalid wake selector {spec:?}; expected NAME=SELECTOR");
        }
        strategies.push(WakeStrategy::new(name, selector));
    }
    Ok(strategies)
}
