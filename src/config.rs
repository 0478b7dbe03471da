//! Application configuration.
//!
//! Endpoints and limits are compiled in and may be overridden through
//! `DIMEDIA_*` environment variables (a `.env` file is honored at
//! startup). Nothing is read from or written to a config file; the
//! application persists no state across runs.

use tracing::warn;

/// Default login endpoint.
const DEFAULT_LOGIN_URL: &str = "https://difreenet9.azurewebsites.net/api/Auth/login";

/// Default image endpoint.
const DEFAULT_IMAGE_URL: &str = "https://dimedianetapi9.azurewebsites.net/api/Files/457";

/// Storage container the image endpoint serves from.
const DEFAULT_CONTAINER: &str = "dimedianetblobs";

/// Default requested maximum texture dimension. Clamped by device
/// capability at fit time, so a generous value here just defers to the
/// device limit.
const DEFAULT_MAX_TEXTURE_DIM: u32 = 16384;

#[derive(Debug, Clone)]
pub struct Config {
    pub login_url: String,
    pub image_url: String,
    pub container: String,
    /// Requested maximum dimension for fitted images. `None` defers
    /// entirely to the device limit.
    pub max_texture_dim: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            max_texture_dim: Some(DEFAULT_MAX_TEXTURE_DIM),
        }
    }
}

impl Config {
    /// Compiled-in defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DIMEDIA_LOGIN_URL") {
            config.login_url = url;
        }
        if let Ok(url) = std::env::var("DIMEDIA_IMAGE_URL") {
            config.image_url = url;
        }
        if let Ok(name) = std::env::var("DIMEDIA_CONTAINER") {
            config.container = name;
        }
        if let Ok(raw) = std::env::var("DIMEDIA_MAX_TEXTURE_DIM") {
            match raw.parse::<i64>() {
                // Zero or negative means "use the device limit"
                Ok(v) if v > 0 => config.max_texture_dim = Some(v.min(i64::from(u32::MAX)) as u32),
                Ok(_) => config.max_texture_dim = None,
                Err(e) => {
                    warn!(value = %raw, error = %e, "ignoring unparseable DIMEDIA_MAX_TEXTURE_DIM")
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.login_url.ends_with("/api/Auth/login"));
        assert!(config.image_url.contains("/api/Files/"));
        assert_eq!(config.container, "dimedianetblobs");
        assert_eq!(config.max_texture_dim, Some(16384));
    }
}
