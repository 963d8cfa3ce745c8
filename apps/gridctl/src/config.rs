use std::{fs, io, path::Path, time::Duration};

use anyhow::Context;
use grid_engine::{EngineConfig, ProgramCatalog, ProgramEntry};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "gridctl.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub log_filter: String,
    pub action_delay_ms: u64,
    pub highlight_ms: u64,
    pub feedback_ms: u64,
    pub catalog_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/layouts.db".into(),
            log_filter: "info".into(),
            action_delay_ms: 1000,
            highlight_ms: 2000,
            feedback_ms: 3000,
            catalog_path: None,
        }
    }
}

impl Settings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            action_delay: Duration::from_millis(self.action_delay_ms),
            highlight_duration: Duration::from_millis(self.highlight_ms),
            feedback_duration: Duration::from_millis(self.feedback_ms),
        }
    }
}

/// Keys accepted in `gridctl.toml`; anything left out keeps its default.
#[derive(Debug, Deserialize)]
struct FileSettings {
    database_url: Option<String>,
    log_filter: Option<String>,
    catalog_path: Option<String>,
    action_delay_ms: Option<u64>,
    highlight_ms: Option<u64>,
    feedback_ms: Option<u64>,
}

/// Defaults, then `path`, then environment overrides.
///
/// A missing file is fine; a file that exists but cannot be read or parsed is
/// an error rather than a silent fall back to defaults.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
            apply_file(&mut settings, file_cfg);
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            return Err(error)
                .with_context(|| format!("failed to read settings file '{}'", path.display()));
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file_cfg.catalog_path {
        settings.catalog_path = Some(v);
    }
    if let Some(v) = file_cfg.action_delay_ms {
        settings.action_delay_ms = v;
    }
    if let Some(v) = file_cfg.highlight_ms {
        settings.highlight_ms = v;
    }
    if let Some(v) = file_cfg.feedback_ms {
        settings.feedback_ms = v;
    }
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("GRID_DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = lookup("GRID_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = lookup("APP__CATALOG_PATH") {
        settings.catalog_path = Some(v);
    }

    set_millis(&mut settings.action_delay_ms, lookup("APP__ACTION_DELAY_MS"));
    set_millis(&mut settings.highlight_ms, lookup("APP__HIGHLIGHT_MS"));
    set_millis(&mut settings.feedback_ms, lookup("APP__FEEDBACK_MS"));
}

fn set_millis(target: &mut u64, raw: Option<String>) {
    if let Some(parsed) = raw.and_then(|v| v.trim().parse::<u64>().ok()) {
        *target = parsed;
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "program")]
    programs: Vec<ProgramEntry>,
}

/// Program catalog from a TOML file of `[[program]]` tables, or the built-in
/// operating-room set.
pub fn load_catalog(path: Option<&str>) -> anyhow::Result<ProgramCatalog> {
    let Some(path) = path else {
        return Ok(ProgramCatalog::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read program catalog '{path}'"))?;
    let file: CatalogFile = toml::from_str(&raw)
        .with_context(|| format!("failed to parse program catalog '{path}'"))?;
    anyhow::ensure!(!file.programs.is_empty(), "program catalog '{path}' is empty");
    Ok(ProgramCatalog::new(file.programs))
}

/// Turns a bare path or `sqlite:` path into a `sqlite://` url.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
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

    #[test]
    fn normalizes_plain_file_path_to_sqlite_url() {
        assert_eq!(
            normalize_database_url("./data/test.db"),
            "sqlite://./data/test.db"
        );
        assert_eq!(normalize_database_url("sqlite:grid.db"), "sqlite://grid.db");
        assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_database_url("  "),
            Settings::default().database_url
        );
    }

    #[test]
    fn file_values_override_defaults_and_env_overrides_file() {
        let file_cfg: FileSettings = toml::from_str(
            r#"
            database_url = "sqlite://from-file.db"
            action_delay_ms = 250
            "#,
        )
        .expect("toml");

        let mut settings = Settings::default();
        apply_file(&mut settings, file_cfg);
        assert_eq!(settings.database_url, "sqlite://from-file.db");
        assert_eq!(settings.action_delay_ms, 250);
        assert_eq!(settings.feedback_ms, 3000);

        apply_env_overrides(&mut settings, |key| match key {
            "GRID_DATABASE_URL" => Some("sqlite://grid.db".to_string()),
            "APP__DATABASE_URL" => Some("sqlite://app.db".to_string()),
            "GRID_LOG" => Some("grid_engine=debug".to_string()),
            "APP__HIGHLIGHT_MS" => Some("0".to_string()),
            "APP__FEEDBACK_MS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(settings.database_url, "sqlite://app.db");
        assert_eq!(settings.log_filter, "grid_engine=debug");
        assert_eq!(settings.highlight_ms, 0);

        assert_eq!(settings.feedback_ms, 3000);

        let engine = settings.engine_config();
        assert_eq!(engine.action_delay, Duration::from_millis(250));
        assert_eq!(engine.highlight_duration, Duration::ZERO);
    }

    #[test]
    fn settings_file_with_bare_integers_is_honoured() {
        let temp_root = tempfile::tempdir().expect("tempdir");
        let path = temp_root.path().join("gridctl.toml");
        fs::write(
            &path,
            "database_url = \"sqlite://from-file.db\"\naction_delay_ms = 250\nhighlight_ms = 500\n",
        )
        .expect("write settings");

        let settings = load_settings(&path).expect("settings");
        assert_eq!(settings.action_delay_ms, 250);
        assert_eq!(settings.highlight_ms, 500);
        assert_eq!(settings.feedback_ms, 3000);
    }

    #[test]
    fn unparseable_settings_file_is_an_error() {
        let temp_root = tempfile::tempdir().expect("tempdir");
        let path = temp_root.path().join("gridctl.toml");
        fs::write(&path, "action_delay_ms = \"soon\"\n").expect("write settings");

        let error = load_settings(&path).expect_err("bad value");
        assert!(error.to_string().contains("failed to parse settings file"));

        let missing = load_settings(&temp_root.path().join("absent.toml")).expect("defaults");
        assert_eq!(missing.action_delay_ms, Settings::default().action_delay_ms);
    }

    #[test]
    fn catalog_file_replaces_the_built_in_programs() {
        let temp_root = tempfile::tempdir().expect("tempdir");
        let path = temp_root.path().join("catalog.toml");
        fs::write(
            &path,
            r#"
            [[program]]
            id = "endoscope"
            display_name = "Endoscope Feed"
            aliases = ["scope", "camera"]

            [[program]]
            id = "timer"
            display_name = "Surgical Timer"
            "#,
        )
        .expect("write catalog");

        let catalog = load_catalog(path.to_str()).expect("catalog");
        assert_eq!(catalog.entries().len(), 2);
        assert_eq!(
            catalog.find_program("the camera").map(|id| id.to_string()),
            Some("endoscope".to_string())
        );
        assert!(load_catalog(None).expect("default").contains(&"voice".into()));
    }
}
