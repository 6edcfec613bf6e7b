use std::env;
use std::time::Duration;
use tracing::warn;

const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
/// Supabase's default `max-rows` on hosted projects.
const DEFAULT_MAX_ROWS: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Key used as the bearer for server-side reads. Falls back to the anon key.
    pub supabase_service_key: String,
    pub supabase_jwt_secret: String,
    pub stats_query_timeout_ms: u64,
    /// Page size for paged reads. Must not exceed the server's `max-rows`.
    pub supabase_max_rows: usize,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            });

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, falling back to anon key");
                    supabase_anon_key.clone()
                }),
            supabase_anon_key,
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            stats_query_timeout_ms: parse_positive(
                "STATS_QUERY_TIMEOUT_MS",
                env::var("STATS_QUERY_TIMEOUT_MS").ok(),
                DEFAULT_QUERY_TIMEOUT_MS,
            ),
            supabase_max_rows: parse_positive(
                "SUPABASE_MAX_ROWS",
                env::var("SUPABASE_MAX_ROWS").ok(),
                DEFAULT_MAX_ROWS,
            ) as usize,
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.stats_query_timeout_ms)
    }
}

fn parse_positive(name: &str, raw: Option<String>, default: u64) -> u64 {
    match raw {
        None => default,
        Some(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!("{}={} is not a positive integer, using {}", name, value, default);
                default
            }
        },
    }
}
