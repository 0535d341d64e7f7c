use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "PEEPHOLE_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "PEEPHOLE_STORAGE_BACKEND";
pub const SQLITE_URL_ENV: &str = "PEEPHOLE_SQLITE_URL";
pub const LOG_FORMAT_ENV: &str = "PEEPHOLE_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "PEEPHOLE_OTLP_ENDPOINT";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_SQLITE_URL: &str = "sqlite://peephole.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "sqlite")]
    Sqlite,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "peephole-gateway", about = "Email open and link click tracking server")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Sqlite
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = SQLITE_URL_ENV, default_value = DEFAULT_SQLITE_URL)]
    pub sqlite_url: String,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP gRPC endpoint for span export, e.g. `http://localhost:4317`.
    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,
}
