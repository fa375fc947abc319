use crate::config::DEFAULT_ENDPOINT;
use clap::Parser;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("UPDATE_TESTER_GIT_SHA"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "updatetester")]
#[command(about = "Interactive update controller for testing update modules")]
#[command(version, long_version = LONG_VERSION)]
pub struct Cli {
    /// Address to listen on (`host:port`, or `:port` for all interfaces)
    #[arg(default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Disconnect update modules that send nothing for this many seconds
    #[arg(long, value_name = "SECS")]
    pub idle_timeout: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "debug")]
    pub log_level: String,
}
