//! Server configuration
//!
//! Parsed from the command line, with environment variable fallbacks.

use clap::Parser;
use serde::Serialize;
use std::net::SocketAddr;

use crate::store::default_shard_count;

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Parser, Debug, Clone, Serialize)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "FERROKV_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: SocketAddr,

    /// Number of store shards (defaults to one per CPU core, max 16)
    #[arg(
        long,
        env = "FERROKV_SHARDS",
        default_value_t = default_shard_count() as u16,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub shards: u16,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "FERROKV_LOG", default_value = "info")]
    pub log_level: String,

    /// Allow cross-origin requests from any origin
    #[arg(long, env = "FERROKV_CORS")]
    pub cors: bool,
}
