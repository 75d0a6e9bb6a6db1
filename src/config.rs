use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// 通知默认停留时间 (秒), 0 表示不自动消失
    pub ttl_secs: u64,
}

impl NotificationConfig {
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/tax_ledger".to_string(),
                max_connections: 20,
            },
            notifications: NotificationConfig { ttl_secs: 5 },
        }
    }
}

impl AppConfig {
    /// 加载配置
    ///
    /// 优先级 (低到高): 内置默认值, `config.toml` (可选), `APP__SECTION__KEY`
    /// 环境变量, 以及 `DATABASE_URL` / `SERVER_HOST` / `SERVER_PORT`。
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default("notifications.ttl_secs", defaults.notifications.ttl_secs as i64)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option(
                "server.port",
                std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .map(i64::from),
            )?
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_notification_ttl() {
        let config = AppConfig::default();
        assert_eq!(config.notifications.default_ttl(), Some(Duration::from_secs(5)));

        let sticky = NotificationConfig { ttl_secs: 0 };
        assert_eq!(sticky.default_ttl(), None);
    }
}
