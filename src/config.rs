use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

use crate::adapter::WindowInfo;
use crate::server::DEFAULT_PREFIX;

const DEFAULT_PATH: &str = ".aion/remote.yaml";
const CONFIG_ENV: &str = "AION_REMOTE_CONFIG";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    pub prefix: String,
    /// Funnel every capability command through a single worker.
    pub serialize_commands: bool,
    pub desktop: DesktopConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DesktopConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    pub windows: Vec<WindowInfo>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            serialize_commands: false,
            desktop: DesktopConfig::default(),
        }
    }
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            screen_width: 1920,
            screen_height: 1080,
            windows: vec![WindowInfo {
                title: "AION Desktop Assistant".into(),
                process: "aion-remote".into(),
            }],
        }
    }
}

/// `$AION_REMOTE_CONFIG`, else `~/.aion/remote.yaml`.
pub fn default_path() -> PathBuf {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        PathBuf::from(p)
    } else {
        dirs::home_dir()
            .unwrap_or(PathBuf::from("/"))
            .join(DEFAULT_PATH)
    }
}

/// Load the config at `path` (or the default location). A missing file is not
/// an error.
pub fn load(path: Option<&Path>) -> Result<RemoteConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(RemoteConfig::default());
    }
    let txt = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: RemoteConfig = serde_yaml::from_str(&txt)
        .with_context(|| format!("invalid config {}", path.display()))?;
    log::info!("loaded config from {}", path.display());
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load(Some(&tmp.path().join("absent.yaml"))).unwrap();
        assert_eq!(cfg, RemoteConfig::default());
        assert_eq!(cfg.prefix, "http://localhost:8080/");
        assert!(!cfg.serialize_commands);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("remote.yaml");
        fs::write(
            &path,
            "prefix: http://127.0.0.1:9100/\n\
             serialize_commands: true\n\
             desktop:\n  screen_width: 1280\n  windows:\n    - title: Terminal\n      process: wt\n",
        )
        .unwrap();

        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.prefix, "http://127.0.0.1:9100/");
        assert!(cfg.serialize_commands);
        assert_eq!(cfg.desktop.screen_width, 1280);
        assert_eq!(cfg.desktop.screen_height, 1080);
        assert_eq!(
            cfg.desktop.windows,
            vec![WindowInfo { title: "Terminal".into(), process: "wt".into() }]
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("remote.yaml");
        fs::write(&path, "serialize_commands: [oops").unwrap();
        let err = load(Some(&path)).unwrap_err();
        assert!(err.to_string().starts_with("invalid config"));
    }
}
