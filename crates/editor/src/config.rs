use std::path::PathBuf;

use manga_core::types::ProjectId;
use manga_realtime::queue::{DEFAULT_CAPACITY, OverflowPolicy, QueueConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Editor configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local backend.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Backend REST root.
    pub api_url: String,
    /// Backend WebSocket base; channels live at `{ws_url}/ws/{project_id}`.
    pub ws_url: String,
    /// Bearer token attached to every API request.
    pub auth_token: Option<String>,
    /// Directory holding the persisted state blob.
    pub storage_dir: PathBuf,
    /// Inbound queue bound and overflow policy.
    pub queue: QueueConfig,
    /// Reopen the sync channel with backoff after it drops.
    pub reconnect: bool,
    /// Project to open at start instead of the persisted current one.
    pub project_id: Option<ProjectId>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api/v1".into(),
            ws_url: "ws://localhost:8000".into(),
            auth_token: None,
            storage_dir: PathBuf::from(".manga-factory"),
            queue: QueueConfig::default(),
            reconnect: false,
            project_id: None,
        }
    }
}

impl EditorConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                  | Default                        |
    /// |--------------------------|--------------------------------|
    /// | `MANGA_API_URL`          | `http://localhost:8000/api/v1` |
    /// | `MANGA_WS_URL`           | `ws://localhost:8000`          |
    /// | `MANGA_AUTH_TOKEN`       | unset                          |
    /// | `MANGA_STORAGE_DIR`      | `.manga-factory`               |
    /// | `MANGA_INBOUND_CAPACITY` | `64`                           |
    /// | `MANGA_OVERFLOW_POLICY`  | `drop_oldest`                  |
    /// | `MANGA_RECONNECT`        | `false`                        |
    /// | `MANGA_PROJECT_ID`       | unset                          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let capacity = match get("MANGA_INBOUND_CAPACITY") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid("MANGA_INBOUND_CAPACITY", value)),
            },
            None => DEFAULT_CAPACITY,
        };

        let policy = match get("MANGA_OVERFLOW_POLICY") {
            Some(value) => value
                .parse::<OverflowPolicy>()
                .map_err(|_| invalid("MANGA_OVERFLOW_POLICY", value))?,
            None => OverflowPolicy::default(),
        };

        let reconnect = match get("MANGA_RECONNECT") {
            Some(value) => parse_bool(&value).ok_or_else(|| invalid("MANGA_RECONNECT", value))?,
            None => defaults.reconnect,
        };

        let project_id = match get("MANGA_PROJECT_ID") {
            Some(value) => Some(
                value
                    .trim()
                    .parse::<ProjectId>()
                    .map_err(|_| invalid("MANGA_PROJECT_ID", value))?,
            ),
            None => None,
        };

        Ok(Self {
            api_url: get("MANGA_API_URL").unwrap_or(defaults.api_url),
            ws_url: get("MANGA_WS_URL").unwrap_or(defaults.ws_url),
            auth_token: get("MANGA_AUTH_TOKEN"),
            storage_dir: get("MANGA_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            queue: QueueConfig { capacity, policy },
            reconnect,
            project_id,
        })
    }
}

fn invalid(var: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid { var, value }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<EditorConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EditorConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000/api/v1");
        assert_eq!(config.ws_url, "ws://localhost:8000");
        assert_eq!(config.storage_dir, PathBuf::from(".manga-factory"));
        assert_eq!(config.queue, QueueConfig::default());
        assert!(!config.reconnect);
        assert!(config.auth_token.is_none());
        assert!(config.project_id.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let id = uuid::Uuid::new_v4().to_string();
        let config = load(&[
            ("MANGA_API_URL", "https://api.example/v1"),
            ("MANGA_AUTH_TOKEN", "tok"),
            ("MANGA_INBOUND_CAPACITY", "8"),
            ("MANGA_OVERFLOW_POLICY", "drop_newest"),
            ("MANGA_RECONNECT", "yes"),
            ("MANGA_PROJECT_ID", &id),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://api.example/v1");
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.queue.capacity, 8);
        assert_eq!(config.queue.policy, OverflowPolicy::DropNewest);
        assert!(config.reconnect);
        assert_eq!(config.project_id.unwrap().to_string(), id);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("MANGA_AUTH_TOKEN", "  "), ("MANGA_PROJECT_ID", "")]).unwrap();
        assert!(config.auth_token.is_none());
        assert!(config.project_id.is_none());
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert_matches!(
            load(&[("MANGA_INBOUND_CAPACITY", "0")]),
            Err(ConfigError::Invalid { var: "MANGA_INBOUND_CAPACITY", .. })
        );
        assert_matches!(
            load(&[("MANGA_OVERFLOW_POLICY", "block")]),
            Err(ConfigError::Invalid { var: "MANGA_OVERFLOW_POLICY", .. })
        );
        assert_matches!(
            load(&[("MANGA_RECONNECT", "maybe")]),
            Err(ConfigError::Invalid { var: "MANGA_RECONNECT", .. })
        );
        assert_matches!(
            load(&[("MANGA_PROJECT_ID", "not-a-uuid")]),
            Err(ConfigError::Invalid { var: "MANGA_PROJECT_ID", .. })
        );
    }
}
