use std::net::SocketAddr;

use anyhow::Context;

/// Credentials for the administrator created at startup.
#[derive(Debug, Clone)]
pub struct RootAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub institute: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub listen: SocketAddr,
    pub root: Option<RootAccount>,
    pub debug: bool,
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).unwrap_or_default();

        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let listen: SocketAddr = format!(
            "{}:{}",
            lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            lookup("APP_PORT").unwrap_or_else(|| "8080".into())
        )
        .parse()
        .context("invalid APP_HOST/APP_PORT")?;

        // all three must be present, otherwise no root account is managed
        let root = RootAccount {
            name: var("ROOT_NAME"),
            email: var("ROOT_EMAIL"),
            password: var("ROOT_PASSWORD"),
            institute: var("ROOT_INSTITUTE"),
        };
        let root = (!root.name.is_empty() && !root.email.is_empty() && !root.password.is_empty())
            .then_some(root);

        Ok(Self {
            database_url,
            max_connections,
            listen,
            root,
            debug: is_truthy(&var("DEBUG")),
            json_logs: var("LOG_FORMAT") == "json",
        })
    }

    /// Default tracing filter when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "accounts=debug,sqlx=info,tower_http=debug"
        } else {
            "accounts=info,axum=info,tower_http=info"
        }
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
