pub mod config;

use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
};

pub use config::{AppConfig, ConfigError, Environment};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in production builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Returns the address the RPC server should bind to.
///
/// The port is read from the `PORT` environment variable and falls back to
/// [`DEFAULT_PORT`]. The server always listens on all interfaces.
pub fn server_bind_address() -> Result<SocketAddr, ConfigError> {
    let port = match env::var("PORT") {
        Ok(value) => value
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(value))?,
        Err(_) => DEFAULT_PORT,
    };
    Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
}

/// Returns the SQLite connection string, defaulting to a private in-memory database.
pub fn database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

#[cfg(test)]
pub(crate) static ENV_GUARD: std::sync::LazyLock<std::sync::Mutex<()>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(()));
