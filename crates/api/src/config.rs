/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How often the alert aggregate stream pushes a fresh snapshot
    /// (default: `15`).
    pub aggregate_push_interval_secs: u64,
    /// How long a presence entry stays valid without a new heartbeat
    /// (default: `30`, two of the suggested 15 s client intervals).
    pub presence_ttl_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default   |
    /// |--------------------------------|-----------|
    /// | `HOST`                         | `0.0.0.0` |
    /// | `PORT`                         | `3000`    |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`      |
    /// | `AGGREGATE_PUSH_INTERVAL_SECS` | `15`      |
    /// | `PRESENCE_TTL_SECS`            | `30`      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let aggregate_push_interval_secs: u64 = std::env::var("AGGREGATE_PUSH_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("AGGREGATE_PUSH_INTERVAL_SECS must be a valid u64");

        let presence_ttl_secs: u64 = std::env::var("PRESENCE_TTL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("PRESENCE_TTL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            aggregate_push_interval_secs,
            presence_ttl_secs,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
            aggregate_push_interval_secs: 15,
            presence_ttl_secs: 30,
        }
    }
}
