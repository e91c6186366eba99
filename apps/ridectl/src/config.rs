use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use url::Url;

pub const CONFIG_FILE: &str = "ridectl.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub http_timeout_secs: u64,
    pub database_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000/api/".into(),
            poll_interval_ms: 5_000,
            http_timeout_secs: 15,
            database_url: "sqlite://./data/ridectl.db".into(),
        }
    }
}

impl Settings {
    /// The ride service base URL. Only http and https are accepted, and the
    /// path always ends in `/` so endpoint segments append cleanly.
    pub fn server_url(&self) -> anyhow::Result<Url> {
        let mut url = Url::parse(self.server_url.trim())
            .with_context(|| format!("invalid server url '{}'", self.server_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "server url '{}' must use http or https, not '{}'",
                self.server_url,
                url.scheme()
            );
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `ridectl.toml` table, then environment. The
/// `APP__*` spelling wins over the short one.
pub fn load_settings_from(
    config_file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_file) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("server_url") {
                settings.server_url = v.clone();
            }
            if let Some(v) = file_cfg.get("poll_interval_ms").and_then(|v| v.parse().ok()) {
                settings.poll_interval_ms = v;
            }
            if let Some(v) = file_cfg.get("http_timeout_secs").and_then(|v| v.parse().ok()) {
                settings.http_timeout_secs = v;
            }
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
        }
    }

    for key in ["RIDE_SERVER_URL", "APP__SERVER_URL"] {
        if let Some(v) = env(key) {
            settings.server_url = v;
        }
    }
    for key in ["RIDE_POLL_INTERVAL_MS", "APP__POLL_INTERVAL_MS"] {
        if let Some(v) = env(key).and_then(|v| v.trim().parse().ok()) {
            settings.poll_interval_ms = v;
        }
    }
    for key in ["RIDE_HTTP_TIMEOUT_SECS", "APP__HTTP_TIMEOUT_SECS"] {
        if let Some(v) = env(key).and_then(|v| v.trim().parse().ok()) {
            settings.http_timeout_secs = v;
        }
    }
    for key in ["RIDE_DATABASE_URL", "APP__DATABASE_URL"] {
        if let Some(v) = env(key) {
            settings.database_url = v;
        }
    }

    settings
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    storage::ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = load_settings_from(&dir.path().join(CONFIG_FILE), env_from(&[]));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn file_then_env_layering() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "server_url = \"https://rides.example/api\"\npoll_interval_ms = \"2500\"\ndatabase_url = \"./state/client.db\"\n",
        )
        .expect("write config");

        let settings = load_settings_from(&path, env_from(&[]));
        assert_eq!(settings.server_url, "https://rides.example/api");
        assert_eq!(settings.poll_interval_ms, 2_500);
        assert_eq!(settings.database_url, "./state/client.db");

        let settings = load_settings_from(
            &path,
            env_from(&[
                ("RIDE_SERVER_URL", "http://short.example/"),
                ("APP__SERVER_URL", "http://app.example/"),
                ("RIDE_POLL_INTERVAL_MS", "not-a-number"),
                ("APP__HTTP_TIMEOUT_SECS", "30"),
            ]),
        );
        assert_eq!(settings.server_url, "http://app.example/");
        assert_eq!(settings.poll_interval_ms, 2_500);
        assert_eq!(settings.http_timeout_secs, 30);
    }

    #[test]
    fn server_url_requires_http_and_gains_trailing_slash() {
        let mut settings = Settings {
            server_url: "https://rides.example/api".into(),
            ..Settings::default()
        };
        assert_eq!(
            settings.server_url().expect("url").as_str(),
            "https://rides.example/api/"
        );

        settings.server_url = "ftp://rides.example/".into();
        assert!(settings.server_url().is_err());
        settings.server_url = "not a url".into();
        assert!(settings.server_url().is_err());
    }

    #[test]
    fn normalizes_plain_file_path_to_sqlite_url() {
        assert_eq!(
            normalize_database_url("./data/test.db"),
            "sqlite://./data/test.db"
        );
        assert_eq!(normalize_database_url("sqlite:local.db"), "sqlite://local.db");
        assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(normalize_database_url("  "), Settings::default().database_url);
    }

    #[test]
    fn prepare_creates_parent_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("ridectl.db");
        let url = prepare_database_url(db_path.to_str().expect("utf-8 path")).expect("prepare");
        assert!(url.starts_with("sqlite://"));
        assert!(dir.path().join("nested").is_dir());
    }
}
