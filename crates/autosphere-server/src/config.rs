//! Server configuration

use std::path::PathBuf;

use autosphere_runtime::is_placeholder;

/// Listener, CORS and static file settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub allowed_origins: Vec<String>,
    pub static_dir: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8000,
            debug: false,
            allowed_origins: vec!["http://localhost:8000".into()],
            static_dir: PathBuf::from("static"),
        }
    }
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && !is_placeholder(v))
        };
        let defaults = Self::default();

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.allowed_origins);

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT").and_then(|p| p.parse().ok()).unwrap_or(defaults.port),
            debug: get("DEBUG").is_some_and(|d| d.eq_ignore_ascii_case("true")),
            allowed_origins,
            static_dir: get("STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether `*` was configured
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}
