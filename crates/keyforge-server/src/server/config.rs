use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Database path that selects a private in-memory SQLite database.
pub const IN_MEMORY_DB: &str = ":memory:";

/// Runtime configuration for the `keyforge-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "keyforge-server",
    version,
    about = "An HTTP service for asynchronous validator key provisioning"
)]
pub struct CliArgs {
    /// Socket address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Path of the SQLite database file. Parent directories are created on
    /// startup. Use `:memory:` for a throwaway database that lives only as
    /// long as the process.
    ///
    /// Environment variable: `DB_PATH`
    #[arg(long, env = "DB_PATH", default_value_t = String::from("./validator.db"))]
    pub db_path: String,

    /// Delay in milliseconds before each key a processing task generates.
    /// Zero disables pacing.
    ///
    /// Environment variable: `KEY_INTERVAL_MS`
    #[arg(long, env = "KEY_INTERVAL_MS", default_value_t = 20)]
    pub key_interval_ms: u64,

    /// Seconds to wait for in-flight processing tasks after the HTTP server
    /// stops. Requests whose tasks are still running afterwards stay
    /// `started`.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 10)]
    pub shutdown_timeout: u64,

    /// Emit logs as JSON lines instead of the pretty console format.
    ///
    /// Environment variable: `LOG_JSON`
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

/// Where the request store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
    File(PathBuf),
    InMemory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub database: Database,
    pub key_interval: Duration,
    pub shutdown_timeout: Duration,
    pub log_json: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let server_addr: SocketAddr = args.server_addr.parse().with_context(|| {
            format!("SERVER_ADDR ({}) is not a socket address", args.server_addr)
        })?;

        let database = match args.db_path.trim() {
            "" => bail!("DB_PATH must not be empty"),
            IN_MEMORY_DB => Database::InMemory,
            path => Database::File(PathBuf::from(path)),
        };

        Ok(Self {
            server_addr,
            database,
            key_interval: Duration::from_millis(args.key_interval_ms),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            log_json: args.log_json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let argv = core::iter::once("keyforge-server").chain(args.iter().copied());
        let args = CliArgs::try_parse_from(argv)?;
        ServerConfig::try_from(args)
    }

    #[test]
    fn explicit_flags_are_applied() {
        let config = parse(&[
            "--server-addr",
            "127.0.0.1:9000",
            "--db-path",
            "/tmp/keys.db",
            "--key-interval-ms",
            "0",
            "--shutdown-timeout",
            "3",
            "--log-json",
        ])
        .unwrap();

        assert_eq!(config.server_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.database, Database::File(PathBuf::from("/tmp/keys.db")));
        assert_eq!(config.key_interval, Duration::ZERO);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
        assert!(config.log_json);
    }

    #[test]
    fn memory_database_is_recognised() {
        let config = parse(&["--db-path", ":memory:"]).unwrap();
        assert_eq!(config.database, Database::InMemory);
    }

    #[test]
    fn bad_address_is_rejected() {
        let err = parse(&["--server-addr", "not-an-address"]).unwrap_err();
        assert!(err.to_string().contains("SERVER_ADDR"));
    }

    #[test]
    fn empty_db_path_is_rejected() {
        let err = parse(&["--db-path", "  "]).unwrap_err();
        assert!(err.to_string().contains("DB_PATH"));
    }
}
