use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_env()
});

#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini credential. `None` leaves the assistant running but unconfigured.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub bind_addr: String,
    pub static_dir: String,
    pub debug: bool,
    /// Upper bound on live conversations; the least recently used is evicted past it.
    pub max_sessions: usize,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            gemini_api_key: get_env_opt("GEMINI_API_KEY"),
            gemini_model: get_env_or_default("GEMINI_MODEL", DEFAULT_MODEL),
            bind_addr: get_env_or_default("BIND_ADDR", DEFAULT_BIND_ADDR),
            static_dir: get_env_or_default("STATIC_DIR", DEFAULT_STATIC_DIR),
            debug: get_env_opt("APP_DEBUG").is_some_and(|v| is_truthy(&v)),
            max_sessions: get_env_opt("MAX_SESSIONS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_SESSIONS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
            debug: false,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

fn get_env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_env_opt(key).unwrap_or_else(|| default.to_string())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
