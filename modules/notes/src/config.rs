//! Startup configuration: command-line flags with environment fallbacks.

use crate::error::ServiceError;
use clap::Parser;
use std::path::PathBuf;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const HOST: &str = "NOTES_HOST";
    pub const PORT: &str = "NOTES_PORT";
    pub const NOTES_DIR: &str = "NOTES_DIR";
}

/// Default values
pub mod defaults {
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 9104;
    pub const NOTES_DIR: &str = "./notes";
}

/// Notes service CLI
///
/// `-h` is taken by `--host`, so help is long-only.
#[derive(Debug, Parser)]
#[command(name = "notes-service")]
#[command(about = "Serve a directory of plain-text notes over HTTP", long_about = None)]
#[command(version, disable_help_flag = true)]
pub struct Cli {
    /// Address to listen on
    #[arg(short = 'h', long, env = env_vars::HOST, default_value = defaults::HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = env_vars::PORT, default_value_t = defaults::PORT)]
    pub port: u16,

    /// Directory holding one file per note (created if missing)
    #[arg(
        short = 'c',
        long = "cache",
        visible_alias = "notes-dir",
        env = env_vars::NOTES_DIR,
        default_value = defaults::NOTES_DIR
    )]
    pub notes_dir: PathBuf,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    #[allow(dead_code)]
    help: Option<bool>,
}

/// Resolved service configuration, passed explicitly to the store and router
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Always absolute
    pub notes_dir: PathBuf,
}

impl ServiceConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ServiceError> {
        if cli.host.trim().is_empty() {
            return Err(ServiceError::Config("host must not be empty".to_string()));
        }
        if cli.port == 0 {
            return Err(ServiceError::Config("port must be between 1 and 65535".to_string()));
        }

        let notes_dir = std::path::absolute(&cli.notes_dir).map_err(|e| {
            ServiceError::Config(format!(
                "Invalid notes directory {}: {}",
                cli.notes_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            host: cli.host.trim().to_string(),
            port: cli.port,
            notes_dir,
        })
    }

    /// `host:port`, bracketing bare IPv6 hosts
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
