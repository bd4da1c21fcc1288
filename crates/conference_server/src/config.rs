//! Process configuration from command-line flags and `CONFERENCE_*` env vars.

use clap::Parser;
use conference_core::paging::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use conference_core::{default_log_level, PagingDefaults, DEFAULT_CACHE_CAPACITY};
use std::net::SocketAddr;
use std::num::NonZeroUsize;

/// Database path that selects a throwaway in-memory store.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "conference-server",
    version,
    about = "REST backend for conference rooms, timeslots and talks"
)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[arg(long, env = "CONFERENCE_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// SQLite database file, or `:memory:` for an ephemeral store.
    #[arg(long, env = "CONFERENCE_DATABASE", default_value = "conference.sqlite3")]
    pub database: String,

    /// One of trace, debug, info, warn, error.
    #[arg(long, env = "CONFERENCE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; logs go to stderr when unset.
    #[arg(long, env = "CONFERENCE_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Page size used when a list request sends none.
    #[arg(
        long,
        env = "CONFERENCE_DEFAULT_PAGE_SIZE",
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub default_page_size: u32,

    /// Upper bound for the `size` list parameter.
    #[arg(
        long,
        env = "CONFERENCE_MAX_PAGE_SIZE",
        default_value_t = MAX_PAGE_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_page_size: u32,

    /// Rows each entity read cache keeps before dropping the least recently used.
    #[arg(long, env = "CONFERENCE_CACHE_CAPACITY", default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: NonZeroUsize,
}

impl ServerConfig {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY_DATABASE
    }

    /// Paging limits, with the default never exceeding the maximum.
    pub fn paging(&self) -> PagingDefaults {
        PagingDefaults {
            default_size: self.default_page_size.min(self.max_page_size),
            max_size: self.max_page_size,
        }
    }
}
