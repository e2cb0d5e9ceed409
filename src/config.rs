//! CLI arguments, the JSON config file, and server defaults.

use clap::Parser;
use serde::Deserialize;
use shadow_rs::formatcp;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const AUTH_COOKIE_NAME: &str = "auth";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "filegate", version = VERSION_INFO, about = "Shared file drop with cookie login")]
pub struct Args {
    #[arg(
        short = 'c',
        long,
        env = "FILEGATE_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Path to the JSON config file"
    )]
    pub config: PathBuf,
    #[arg(
        long,
        env = "FILEGATE_STATIC_DIR",
        default_value = DEFAULT_STATIC_DIR,
        help = "Directory served under /static"
    )]
    pub static_dir: PathBuf,
    #[arg(
        short = 'b',
        long,
        env = "FILEGATE_HOST",
        help = "Bind address, overrides server_host"
    )]
    pub host: Option<String>,
    #[arg(
        short = 'p',
        long,
        env = "FILEGATE_PORT",
        help = "Port, overrides server_port"
    )]
    pub port: Option<u16>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to parse user file: {0}")]
    Credentials(#[source] serde_json::Error),
    #[error("config value `{0}` is required")]
    Missing(&'static str),
    #[error("invalid server_host `{0}`")]
    InvalidHost(String),
    #[error("invalid server_port `{0}`")]
    InvalidPort(String),
}

/// `server_port` is a string in existing config files; plain numbers are accepted too.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

#[derive(Deserialize, Debug)]
struct RawConfig {
    server_host: String,
    server_port: PortValue,
    file_dir: String,
    user_file: String,
}

/// Validated server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub file_dir: PathBuf,
    pub user_file: PathBuf,
}

impl ServerConfig {
    /// Reads the config file named by `args` and applies CLI overrides.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let bytes = read_file(&args.config)?;
        Self::from_slice(&bytes, args.host.as_deref(), args.port)
    }

    pub fn from_slice(
        bytes: &[u8],
        host_override: Option<&str>,
        port_override: Option<u16>,
    ) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_slice(bytes).map_err(ConfigError::Parse)?;

        let host = host_override.unwrap_or(raw.server_host.as_str()).trim();
        if host.is_empty() {
            return Err(ConfigError::Missing("server_host"));
        }
        let host = parse_host(host)?;

        let port = match (port_override, raw.server_port) {
            (Some(port), _) => port,
            (None, PortValue::Number(port)) => port,
            (None, PortValue::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(ConfigError::Missing("server_port"));
                }
                text.parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(text.to_string()))?
            }
        };

        if raw.file_dir.trim().is_empty() {
            return Err(ConfigError::Missing("file_dir"));
        }
        if raw.user_file.trim().is_empty() {
            return Err(ConfigError::Missing("user_file"));
        }

        Ok(Self {
            addr: SocketAddr::new(host, port),
            file_dir: PathBuf::from(raw.file_dir),
            user_file: PathBuf::from(raw.user_file),
        })
    }
}

fn parse_host(host: &str) -> Result<IpAddr, ConfigError> {
    if host.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::from([127, 0, 0, 1]));
    }
    host.parse::<IpAddr>()
        .map_err(|_| ConfigError::InvalidHost(host.to_string()))
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
