use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "BRAIN_SCENE_CONFIG";
pub const WIDTH_ENV: &str = "BRAIN_SCENE_WIDTH";
pub const HEIGHT_ENV: &str = "BRAIN_SCENE_HEIGHT";
pub const HEADLESS_FRAMES_ENV: &str = "BRAIN_SCENE_HEADLESS_FRAMES";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{var}={value:?} is not a valid {expected}")]
    Env {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Startup settings of the viewer binary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VizConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// JSON snapshot applied before the first frame.
    pub snapshot_path: Option<PathBuf>,
    /// Read one JSON snapshot per line from stdin while running.
    pub stdin_feed: bool,
    /// Run this many frames without a window, then exit.
    pub headless_frames: Option<u32>,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            title: "Brain Model 3D".to_string(),
            width: 1280,
            height: 800,
            snapshot_path: None,
            stdin_feed: true,
            headless_frames: None,
        }
    }
}

impl VizConfig {
    /// Defaults, overlaid by the file named in `BRAIN_SCENE_CONFIG`, overlaid
    /// by the individual environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup(WIDTH_ENV) {
            self.width = parse_dimension(WIDTH_ENV, v)?;
        }
        if let Some(v) = lookup(HEIGHT_ENV) {
            self.height = parse_dimension(HEIGHT_ENV, v)?;
        }
        if let Some(v) = lookup(HEADLESS_FRAMES_ENV) {
            let frames = v.trim().parse().map_err(|_| ConfigError::Env {
                var: HEADLESS_FRAMES_ENV,
                value: v.clone(),
                expected: "frame count",
            })?;
            self.headless_frames = Some(frames);
        }
        Ok(())
    }
}

fn parse_dimension(var: &'static str, value: String) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Env {
            var,
            value,
            expected: "positive pixel size",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let c = VizConfig::default();
        assert_eq!(c.title, "Brain Model 3D");
        assert_eq!((c.width, c.height), (1280, 800));
        assert!(c.stdin_feed);
        assert!(c.headless_frames.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c: VizConfig = serde_json::from_str(r#"{"width": 640, "stdin_feed": false}"#).unwrap();
        assert_eq!(c.width, 640);
        assert_eq!(c.height, 800);
        assert!(!c.stdin_feed);
        assert!(serde_json::from_str::<VizConfig>(r#"{"colour": 1}"#).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(WIDTH_ENV, "320"), (HEADLESS_FRAMES_ENV, " 60 ")]
            .into_iter()
            .collect();
        let mut c = VizConfig::default();
        c.apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(c.width, 320);
        assert_eq!(c.height, 800);
        assert_eq!(c.headless_frames, Some(60));

        let mut c = VizConfig::default();
        let err = c
            .apply_overrides(|k| (k == HEIGHT_ENV).then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: HEIGHT_ENV, .. }));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = VizConfig::from_file(Path::new("/nonexistent/brain.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/brain.json"));
    }
}
