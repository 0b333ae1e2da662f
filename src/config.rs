use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

pub const DEFAULT_SERVICE_NAME: &str = "todolist";

#[derive(Clone)]
pub struct Config {
    /// Tag attached to every request span. Overridden by `--service`.
    pub service_name: String,
    pub api_host: String,
    pub api_port: u16,
    pub database: DatabaseConfig,
    pub jwt_secret: String,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
    pub bcrypt_cost: u32,
    /// Upper bound on a single request, handler and database work included.
    pub request_timeout: Duration,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    pub max_connections: u32,
    /// Total time spent retrying the initial connection before giving up.
    pub connect_timeout: Duration,
    /// How long an update or delete waits for a row lock.
    pub lock_timeout: Duration,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        let ssl_mode = PgSslMode::from_str(&self.ssl_mode)
            .map_err(|e| anyhow::anyhow!("invalid POSTGRES_SSL_MODE '{}': {}", self.ssl_mode, e))?;
        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
            .ssl_mode(ssl_mode))
    }
}

/// Reads environment variables, remembering every missing or malformed key
/// so startup can report them all at once.
#[derive(Default)]
struct EnvReader {
    missing: Vec<&'static str>,
    malformed: Vec<&'static str>,
}

impl EnvReader {
    fn raw(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn required(&mut self, key: &'static str) -> String {
        Self::raw(key).unwrap_or_else(|| {
            self.missing.push(key);
            String::new()
        })
    }

    fn required_parsed<T: FromStr + Default>(&mut self, key: &'static str) -> T {
        match Self::raw(key) {
            Some(v) => self.parse(key, &v).unwrap_or_default(),
            None => {
                self.missing.push(key);
                T::default()
            }
        }
    }

    fn optional(&mut self, key: &'static str, fallback: &str) -> String {
        Self::raw(key).unwrap_or_else(|| fallback.to_string())
    }

    fn optional_parsed<T: FromStr>(&mut self, key: &'static str, fallback: T) -> T {
        match Self::raw(key) {
            Some(v) => self.parse(key, &v).unwrap_or(fallback),
            None => fallback,
        }
    }

    /// A positive number of seconds that fits a `chrono::Duration`.
    fn optional_ttl(&mut self, key: &'static str, fallback_secs: i64) -> chrono::Duration {
        let fallback = chrono::Duration::seconds(fallback_secs);
        let Some(secs) = Self::raw(key).and_then(|v| self.parse::<i64>(key, &v)) else {
            return fallback;
        };
        match chrono::Duration::try_seconds(secs) {
            Some(ttl) if secs > 0 => ttl,
            _ => {
                self.malformed.push(key);
                fallback
            }
        }
    }

    fn parse<T: FromStr>(&mut self, key: &'static str, value: &str) -> Option<T> {
        let parsed = value.trim().parse().ok();
        if parsed.is_none() {
            self.malformed.push(key);
        }
        parsed
    }

    fn finish(self) -> anyhow::Result<()> {
        let mut problems = Vec::new();
        if !self.missing.is_empty() {
            problems.push(format!("missing: {}", self.missing.join(", ")));
        }
        if !self.malformed.is_empty() {
            problems.push(format!("malformed: {}", self.malformed.join(", ")));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("invalid environment ({})", problems.join("; "))
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let mut env = EnvReader::default();

    let database = DatabaseConfig {
        host: env.required("POSTGRES_HOST"),
        port: env.required_parsed("POSTGRES_PORT"),
        user: env.required("POSTGRES_USER"),
        password: env.required("POSTGRES_PASSWORD"),
        name: env.required("POSTGRES_DB"),
        ssl_mode: env.optional("POSTGRES_SSL_MODE", "disable"),
        max_connections: env.optional_parsed("DB_MAX_CONNECTIONS", 10),
        connect_timeout: Duration::from_secs(env.optional_parsed("DB_CONNECT_TIMEOUT_SECS", 30)),
        lock_timeout: Duration::from_millis(env.optional_parsed("DB_LOCK_TIMEOUT_MS", 5000)),
    };

    let jwt_secret = env.required("JWT_SECRET");

    let cfg = Config {
        service_name: env.optional("SERVICE_NAME", DEFAULT_SERVICE_NAME),
        api_host: env.optional("API_HOST", "0.0.0.0"),
        api_port: env.optional_parsed("API_PORT", 8080),
        database,
        jwt_secret,
        access_token_ttl: env.optional_ttl("ACCESS_TOKEN_TTL_SECS", 300),
        refresh_token_ttl: env.optional_ttl("REFRESH_TOKEN_TTL_SECS", 72 * 3600),
        bcrypt_cost: env.optional_parsed("BCRYPT_COST", bcrypt::DEFAULT_COST),
        request_timeout: Duration::from_secs(env.optional_parsed("REQUEST_TIMEOUT_SECS", 30)),
        cors_allowed_origins: env
            .optional("CORS_ALLOWED_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    };

    env.finish()?;

    if cfg.jwt_secret.len() < 32 {
        let env_mode = std::env::var("APP_ENV").unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!("JWT_SECRET must be at least 32 bytes when APP_ENV=production.");
        }
        eprintln!("⚠️  JWT_SECRET is shorter than 32 bytes. Use a longer secret in production.");
    }

    Ok(cfg)
}
