//! Server configuration
//!
//! Built from the command line: zero arguments for defaults, or a single
//! positional port number.

use std::path::PathBuf;

use crate::error::AppError;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8989;

/// Default connection ceiling
pub const DEFAULT_MAX_CLIENTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port to listen on
    pub port: u16,
    /// Registered sessions allowed before new connections are turned away
    pub max_clients: usize,
    /// Directory holding the chat log
    pub log_dir: PathBuf,
    /// Banner sent to every new connection
    pub banner_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
            log_dir: PathBuf::from("logs"),
            banner_path: PathBuf::from("logo.txt"),
        }
    }
}

impl ServerConfig {
    /// Build from command-line arguments, program name excluded
    pub fn from_args<I>(args: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        let mut config = Self::default();

        match args.as_slice() {
            [] => {}
            [port] => {
                config.port = port
                    .parse()
                    .map_err(|_| AppError::InvalidPort(port.clone()))?;
            }
            _ => return Err(AppError::Usage),
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-instance chat log, derived from the port
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(format!("chat_log_{}.log", self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_args(args(&[])).unwrap();
        assert_eq!(config.port, 8989);
        assert_eq!(config.max_clients, 10);
        assert_eq!(config.bind_address(), "0.0.0.0:8989");
        assert_eq!(config.log_path(), PathBuf::from("logs/chat_log_8989.log"));
    }

    #[test]
    fn test_port_argument() {
        let config = ServerConfig::from_args(args(&["2525"])).unwrap();
        assert_eq!(config.port, 2525);
        assert_eq!(config.log_path(), PathBuf::from("logs/chat_log_2525.log"));
    }

    #[test]
    fn test_bad_arguments() {
        assert!(matches!(
            ServerConfig::from_args(args(&["2525", "extra"])),
            Err(AppError::Usage)
        ));
        assert!(matches!(
            ServerConfig::from_args(args(&["http"])),
            Err(AppError::InvalidPort(p)) if p == "http"
        ));
        assert_eq!(AppError::Usage.to_string(), "[USAGE]: ./TCPChat $port");
    }
}
