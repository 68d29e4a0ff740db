use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

use crate::location::AddressMode;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        bind_addr: get_env_or_default("TRIAGE_BIND_ADDR", "127.0.0.1:8000"),
        static_dir: get_env_or_default("TRIAGE_STATIC_DIR", "static"),
        fixtures: get_env_opt("TRIAGE_FIXTURES"),
        upstream_url: get_env_opt("TRIAGE_UPSTREAM_URL"),
        address_mode: parse_address_mode(get_env_opt("TRIAGE_ADDRESS_MODE")),
    }
});

pub struct Config {
    pub bind_addr: String,
    pub static_dir: String,
    pub fixtures: Option<String>,
    pub upstream_url: Option<String>,
    pub address_mode: AddressMode,
}

fn parse_address_mode(raw: Option<String>) -> AddressMode {
    match raw.map(|s| s.parse::<AddressMode>()) {
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            log::warn!("{e}, falling back to base path");
            AddressMode::default()
        }
        None => AddressMode::default(),
    }
}

fn get_env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
