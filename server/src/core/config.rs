use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "dev-secret-change";

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` means the in-memory store is used
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub ws_idle_timeout_secs: u64,
    pub token_ttl_hours: i64,
    pub cors_origins: Option<Vec<String>>,
    pub app_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 4000,
            max_connections: 10,
            acquire_timeout_secs: 30,
            ws_idle_timeout_secs: 300,
            token_ttl_hours: 24 * 7,
            cors_origins: None,
            app_env: "development".to_string(),
        }
    }
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente
    /// Chiama dotenv() automaticamente
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using default (not secure for production!)");
            defaults.jwt_secret.clone()
        });

        let server_host = lookup("SERVER_HOST").unwrap_or(defaults.server_host);

        let server_port = parse_or(
            &lookup,
            "SERVER_PORT",
            defaults.server_port,
            "Invalid SERVER_PORT: must be a number between 0-65535",
        )?;

        let max_connections: u32 = parse_or(
            &lookup,
            "MAX_DB_CONNECTIONS",
            defaults.max_connections,
            "Invalid MAX_DB_CONNECTIONS: must be a positive number",
        )?;
        if max_connections == 0 {
            return Err("Invalid MAX_DB_CONNECTIONS: must be a positive number".to_string());
        }

        let acquire_timeout_secs = parse_or(
            &lookup,
            "DB_ACQUIRE_TIMEOUT_SECS",
            defaults.acquire_timeout_secs,
            "Invalid DB_ACQUIRE_TIMEOUT_SECS: must be a positive number",
        )?;

        let ws_idle_timeout_secs = parse_or(
            &lookup,
            "WS_IDLE_TIMEOUT_SECS",
            defaults.ws_idle_timeout_secs,
            "Invalid WS_IDLE_TIMEOUT_SECS: must be a positive number",
        )?;

        let token_ttl_hours: i64 = parse_or(
            &lookup,
            "TOKEN_TTL_HOURS",
            defaults.token_ttl_hours,
            "Invalid TOKEN_TTL_HOURS: must be a positive number",
        )?;
        if token_ttl_hours <= 0 {
            return Err("Invalid TOKEN_TTL_HOURS: must be a positive number".to_string());
        }

        let cors_origins = lookup("CORS_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        let app_env = lookup("APP_ENV").unwrap_or(defaults.app_env);

        Ok(Config {
            database_url,
            jwt_secret,
            server_host,
            server_port,
            max_connections,
            acquire_timeout_secs,
            ws_idle_timeout_secs,
            token_ttl_hours,
            cors_origins,
            app_env,
        })
    }

    /// Logga la configurazione (nascondendo i segreti)
    pub fn print_info(&self) {
        info!("Server Configuration:");
        info!("   Environment: {}", self.app_env);
        info!("   Server Address: {}:{}", self.server_host, self.server_port);
        match &self.database_url {
            Some(url) => info!("   Database: {}", Self::mask_url(url)),
            None => warn!("   Database: none, using in-memory store (data is lost on restart)"),
        }
        info!("   Max DB Connections: {}", self.max_connections);
        info!("   DB Acquire Timeout: {}s", self.acquire_timeout_secs);
        info!("   WebSocket Idle Timeout: {}s", self.ws_idle_timeout_secs);
        info!("   Token TTL: {}h", self.token_ttl_hours);
        match &self.cors_origins {
            Some(origins) => info!("   CORS Origins: {}", origins.join(", ")),
            None => info!("   CORS Origins: any"),
        }
        if self.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("   JWT Secret: USING DEFAULT (INSECURE!)");
        } else {
            info!("   JWT Secret: custom secret configured");
        }
    }

    /// Maschera l'URL del database per il logging
    fn mask_url(url: &str) -> String {
        if let Some(at_pos) = url.find('@') {
            if let Some(scheme_end) = url.find("://") {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];
                return format!("{}***{}", scheme, after_at);
            }
        }
        "***".to_string()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T, error: &str) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| error.to_string()),
        None => Ok(default),
    }
}
