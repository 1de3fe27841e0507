use crate::error::ErrorCode;
use crate::identity::{
    DEFAULT_ANONYMOUS_LABEL, DEFAULT_DISPLAY_PREFIX_LEN, GateSettings, IdentityPolicy,
};
use crate::storage::{DEFAULT_SLOT_NAME, FileSlot};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding a wall's config, slot, and session.
pub const WALL_DIR: &str = ".wishwall";

/// Config file name inside [`WALL_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallConfig {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl WallConfig {
    /// Gate settings described by this config.
    #[must_use]
    pub fn gate_settings(&self) -> GateSettings {
        GateSettings {
            policy: self.identity.policy,
            display_prefix_len: self.identity.display_prefix_len,
            anonymous_label: self.identity.anonymous_label.clone(),
        }
    }

    /// File slot described by this config, rooted at `wall_dir`.
    #[must_use]
    pub fn file_slot(&self, wall_dir: &Path) -> FileSlot {
        FileSlot::new(wall_dir.join(&self.storage.slot))
            .with_lock_timeout(Duration::from_millis(self.storage.lock_timeout_ms))
    }

    /// Render as TOML for `wish init`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize wall config")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub policy: IdentityPolicy,
    #[serde(default = "default_display_prefix_len")]
    pub display_prefix_len: usize,
    #[serde(default = "default_anonymous_label")]
    pub anonymous_label: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            policy: IdentityPolicy::default(),
            display_prefix_len: default_display_prefix_len(),
            anonymous_label: default_anonymous_label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_slot")]
    pub slot: PathBuf,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            slot: default_slot(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub wall: WallConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Path of the wall directory under `project_root`.
#[must_use]
pub fn wall_dir(project_root: &Path) -> PathBuf {
    project_root.join(WALL_DIR)
}

/// Load `.wishwall/config.toml` under `project_root`; a missing file yields
/// the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, or if it is not
/// valid TOML for [`WallConfig`] (reported with `E1002`).
pub fn load_wall_config(project_root: &Path) -> Result<WallConfig> {
    let path = wall_dir(project_root).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(WallConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<WallConfig>(&content).with_context(|| {
        format!(
            "{}: failed to parse {}",
            ErrorCode::ConfigParseError,
            path.display()
        )
    })
}

/// Load `<config_dir>/wishwall/config.toml`; a missing file or config
/// directory yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("wishwall/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content).with_context(|| {
        format!(
            "{}: failed to parse {}",
            ErrorCode::ConfigParseError,
            path.display()
        )
    })
}

/// Combine the wall config, the user config, and environment overrides
/// (`WISHWALL_POLICY`, `FORMAT`) into the settings a command runs with.
///
/// # Errors
///
/// Returns an error if either config file fails to load, or if
/// `WISHWALL_POLICY` names an unknown policy.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let mut wall = load_wall_config(project_root)?;
    let user = load_user_config()?;

    let env_policy = env::var("WISHWALL_POLICY").ok();
    wall.identity.policy = resolve_policy(wall.identity.policy, env_policy.as_deref())?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format)?;

    Ok(EffectiveConfig {
        wall,
        user,
        resolved_output,
    })
}

fn resolve_policy(configured: IdentityPolicy, env_policy: Option<&str>) -> Result<IdentityPolicy> {
    match env_policy.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => raw
            .parse::<IdentityPolicy>()
            .with_context(|| "Invalid WISHWALL_POLICY"),
        None => Ok(configured),
    }
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> Result<String> {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return Ok("json".to_string());
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return Ok(mode.to_string());
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return Ok(mode.to_string());
    }

    if std::io::stdout().is_terminal() {
        Ok("pretty".to_string())
    } else {
        Ok("text".to_string())
    }
}

const fn default_display_prefix_len() -> usize {
    DEFAULT_DISPLAY_PREFIX_LEN
}

fn default_anonymous_label() -> String {
    DEFAULT_ANONYMOUS_LABEL.to_string()
}

fn default_slot() -> PathBuf {
    PathBuf::from(DEFAULT_SLOT_NAME)
}

const fn default_lock_timeout_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(root: &Path, content: &str) {
        let dir = wall_dir(root);
        std::fs::create_dir_all(&dir).expect("create wall dir");
        std::fs::write(dir.join(CONFIG_FILE), content).expect("write config");
    }

    #[test]
    fn missing_wall_config_uses_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        let cfg = load_wall_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.identity.policy, IdentityPolicy::Gated);
        assert_eq!(cfg.identity.display_prefix_len, 10);
        assert_eq!(cfg.identity.anonymous_label, "Anonymous User");
        assert_eq!(cfg.storage.slot, PathBuf::from("wishes.json"));
        assert_eq!(cfg.storage.lock_timeout_ms, 2000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        write_config(root.path(), "[identity]\npolicy = \"open\"\n");

        let cfg = load_wall_config(root.path()).expect("load");
        assert_eq!(cfg.identity.policy, IdentityPolicy::Open);
        assert_eq!(cfg.identity.display_prefix_len, 10);
        assert_eq!(cfg.storage, StorageConfig::default());
    }

    #[test]
    fn malformed_config_reports_path() {
        let root = tempfile::tempdir().expect("tempdir");
        write_config(root.path(), "[identity\npolicy = ");

        let err = load_wall_config(root.path()).unwrap_err();
        let message = format!("{err}");
        assert!(message.contains("config.toml"));
        assert!(message.starts_with("E1002"));
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        let root = tempfile::tempdir().expect("tempdir");
        write_config(root.path(), "[identity]\npolicy = \"wallet\"\n");
        assert!(load_wall_config(root.path()).is_err());
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let rendered = WallConfig::default().to_toml().expect("render");
        assert!(rendered.contains("[identity]"));
        assert!(rendered.contains("policy = \"gated\""));
        assert!(rendered.contains("[storage]"));

        let parsed: WallConfig = toml::from_str(&rendered).expect("parse");
        assert_eq!(parsed, WallConfig::default());
    }

    #[test]
    fn gate_settings_and_slot_follow_config() {
        let mut cfg = WallConfig::default();
        cfg.identity.policy = IdentityPolicy::Open;
        cfg.identity.display_prefix_len = 6;
        cfg.storage.slot = PathBuf::from("wall.json");

        let settings = cfg.gate_settings();
        assert_eq!(settings.policy, IdentityPolicy::Open);
        assert_eq!(settings.display_prefix_len, 6);

        let slot = cfg.file_slot(Path::new("/srv/.wishwall"));
        assert_eq!(slot.path(), Path::new("/srv/.wishwall/wall.json"));
    }

    #[test]
    fn env_policy_overrides_file() {
        assert_eq!(
            resolve_policy(IdentityPolicy::Gated, Some("open")).expect("resolve"),
            IdentityPolicy::Open
        );
        assert_eq!(
            resolve_policy(IdentityPolicy::Open, Some("  ")).expect("resolve"),
            IdentityPolicy::Open
        );
        assert!(resolve_policy(IdentityPolicy::Open, Some("bogus")).is_err());
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty".to_string()), Some("text".to_string()))
            .expect("resolve should succeed");
        assert_eq!(output, "json");
    }

    #[test]
    fn legacy_aliases_are_normalized() {
        let pretty = resolve_output(false, Some("table".to_string()), Some("human".to_string()))
            .expect("resolve should succeed");
        assert_eq!(pretty, "pretty");

        let text = resolve_output(false, Some("human".to_string()), Some("table".to_string()))
            .expect("resolve should succeed");
        assert_eq!(text, "text");
    }

    #[test]
    fn user_config_parses_output() {
        let cfg: UserConfig = toml::from_str("output = \"json\"\n").expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
    }
}
