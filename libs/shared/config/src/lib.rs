use std::env;
use std::time::Duration;
use tracing::warn;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_JWT_EXPIRE: &str = "30d";
const DEFAULT_JWT_COOKIE_EXPIRE_DAYS: i64 = 30;
const DEFAULT_DAILY_CAPACITY: i32 = 50;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub jwt_expire: Duration,
    pub jwt_cookie_expire_days: i64,
    pub default_daily_capacity: i32,
    pub allow_admin_registration: bool,
    pub app_env: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            jwt_expire: env::var("JWT_EXPIRE")
                .ok()
                .and_then(|raw| {
                    let parsed = parse_duration(&raw);
                    if parsed.is_none() {
                        warn!("JWT_EXPIRE value '{}' is invalid, using default", raw);
                    }
                    parsed
                })
                .unwrap_or_else(|| default_jwt_expire()),
            jwt_cookie_expire_days: env_or("JWT_COOKIE_EXPIRE", DEFAULT_JWT_COOKIE_EXPIRE_DAYS),
            default_daily_capacity: env_or("DEFAULT_DAILY_CAPACITY", DEFAULT_DAILY_CAPACITY),
            allow_admin_registration: env_or("ALLOW_ADMIN_REGISTRATION", false),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            port: env_or("PORT", DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} value '{}' is invalid, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn default_jwt_expire() -> Duration {
    parse_duration(DEFAULT_JWT_EXPIRE).unwrap_or(Duration::from_secs(30 * 86_400))
}

/// Parses `30d`, `12h`, `15m`, `90s` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (digits, multiplier) = match raw.chars().last()? {
        'd' => (&raw[..raw.len() - 1], 86_400),
        'h' => (&raw[..raw.len() - 1], 3_600),
        'm' => (&raw[..raw.len() - 1], 60),
        's' => (&raw[..raw.len() - 1], 1),
        c if c.is_ascii_digit() => (raw, 1),
        _ => return None,
    };

    let value: u64 = digits.parse().ok()?;
    if value == 0 {
        return None;
    }
    Some(Duration::from_secs(value.checked_mul(multiplier)?))
}
