use std::str::FromStr;
use std::time::Duration;

/// Huddle API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. When unset the in-memory store is used.
    pub database_url: Option<String>,
    /// Maximum number of pooled database connections.
    pub db_pool_size: usize,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Exact origin allowed by CORS. Any origin when unset.
    pub cors_origin: Option<String>,
    /// Snowflake worker id for message ids (must fit in 10 bits).
    pub worker_id: u16,
    /// How long a connection may stay unauthenticated before it is closed.
    pub auth_timeout: Duration,
    /// Per-connection outbound queue length.
    pub outbox_capacity: usize,
    /// Maximum message length in characters.
    pub max_content_len: usize,
    /// Send explicit `error` events for rejected requests instead of dropping silently.
    pub error_acks: bool,
    /// Resolve `authenticate` identities against the `users` table.
    pub verify_users: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            db_pool_size: 20,
            port: 4100,
            cors_origin: None,
            worker_id: 0,
            auth_timeout: Duration::from_secs(10),
            outbox_capacity: 256,
            max_content_len: 4000,
            error_acks: false,
            verify_users: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Panics with a descriptive message if a variable is set but malformed.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: optional_var("DATABASE_URL"),
            db_pool_size: parsed_var("DB_POOL_SIZE", defaults.db_pool_size),
            port: parsed_var("PORT", defaults.port),
            cors_origin: optional_var("CORS_ORIGIN"),
            worker_id: parsed_var("WORKER_ID", defaults.worker_id),
            auth_timeout: Duration::from_secs(parsed_var(
                "AUTH_TIMEOUT_SECS",
                defaults.auth_timeout.as_secs(),
            )),
            outbox_capacity: parsed_var("OUTBOX_CAPACITY", defaults.outbox_capacity),
            max_content_len: parsed_var("MAX_CONTENT_LEN", defaults.max_content_len),
            error_acks: parsed_var("ERROR_ACKS", defaults.error_acks),
            verify_users: parsed_var("VERIFY_USERS", defaults.verify_users),
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    match optional_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{name} env var is malformed: {raw:?}")),
        None => default,
    }
}
