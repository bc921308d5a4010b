use orderlink_auth::AuthConfig;
use orderlink_core::DEFAULT_TOPIC;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Bearer-token validation
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Worker pools used by the order fan-out
    #[serde(default)]
    pub fanout: FanoutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn addr(&self) -> SocketAddr {
        let ip: std::net::IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::from((ip, self.server.port))
    }

    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        // Auth validation
        self.auth.validate().map_err(|e| e.to_string())?;
        // Broker validations
        if self.broker.topic.trim().is_empty() {
            return Err("broker.topic cannot be empty".into());
        }
        if self.broker.capacity == 0 {
            return Err("broker.capacity must be > 0".into());
        }
        // Fan-out validations
        if self.fanout.discovery_threads == 0 || self.fanout.apply_threads == 0 {
            return Err("fanout thread counts must be > 0".into());
        }
        if self.fanout.max_in_flight == Some(0) {
            return Err("fanout.max_in_flight must be > 0 when set".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Topic user events are published to and consumed from
    pub topic: String,
    /// Per-topic buffer; slow consumers past this many records observe a lag
    pub capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.into(),
            capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
    /// Threads for dependent-record discovery scans
    pub discovery_threads: usize,
    /// Threads for per-record writes
    pub apply_threads: usize,
    /// Optional cap on concurrent per-record writes; unbounded when unset
    pub max_in_flight: Option<usize>,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            discovery_threads: 2,
            apply_threads: 5,
            max_in_flight: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default config file looked up in the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "orderlink.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        } else if path.is_some() {
            return Err(format!("config file not found: {}", pathbuf.display()));
        }
        // Environment variable overrides, e.g., ORDERLINK__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("ORDERLINK")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        // Validate
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn valid() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.auth.secret = SECRET.into();
        cfg
    }

    #[test]
    fn test_defaults_need_a_secret() {
        assert!(AppConfig::default().validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validation_rules() {
        let mut cfg = valid();
        cfg.fanout.apply_threads = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.fanout.max_in_flight = Some(0);
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.broker.topic = " ".into();
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }

    #[test]
    fn test_addr() {
        let mut cfg = valid();
        cfg.server.host = "127.0.0.1".into();
        cfg.server.port = 9000;
        assert_eq!(cfg.addr().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9191

[auth]
secret = "{SECRET}"

[broker]
topic = "profile-events"

[fanout]
apply_threads = 3
max_in_flight = 8
"#
        )
        .unwrap();

        let cfg = loader::load_config(file.path().to_str()).unwrap();
        assert_eq!(cfg.server.port, 9191);
        assert_eq!(cfg.broker.topic, "profile-events");
        assert_eq!(cfg.broker.capacity, 1024);
        assert_eq!(cfg.fanout.apply_threads, 3);
        assert_eq!(cfg.fanout.max_in_flight, Some(8));
        assert_eq!(cfg.auth.public_paths, AuthConfig::default().public_paths);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = loader::load_config(Some("/definitely/not/here.toml")).unwrap_err();
        assert!(err.contains("not found"));
    }
}
