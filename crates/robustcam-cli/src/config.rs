//! Run configuration – reads/writes `~/.robustcam/config.toml`.

use robustcam_perturb::{AugmentConfig, MethodSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Persisted user configuration stored in `~/.robustcam/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory that receives perturbed frames and manifests.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Generator seed.  Absent means OS entropy and non-reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Batch augmentation settings.
    #[serde(default)]
    pub augment: AugmentConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("perturbed")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            seed: None,
            augment: AugmentConfig::default(),
        }
    }
}

/// Return the path to `~/.robustcam/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".robustcam").join("config.toml")
}

/// Load the config from disk, falling back to defaults when the file does
/// not exist.  Environment overrides are applied in both cases.
pub fn load_or_default(path: &Path) -> Result<Config, String> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does not
/// exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `ROBUSTCAM_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROBUSTCAM_OUTPUT_DIR` | `output_dir` |
/// | `ROBUSTCAM_SEED` | `seed` |
/// | `ROBUSTCAM_METHOD_SET` | `augment.method_set` |
///
/// Unparseable values are logged and ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ROBUSTCAM_OUTPUT_DIR") {
        cfg.output_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup("ROBUSTCAM_SEED") {
        match v.parse::<u64>() {
            Ok(seed) => cfg.seed = Some(seed),
            Err(_) => warn!(value = %v, "ignoring invalid ROBUSTCAM_SEED"),
        }
    }
    if let Some(v) = lookup("ROBUSTCAM_METHOD_SET") {
        match v.parse::<MethodSet>() {
            Ok(set) => cfg.augment.method_set = set,
            Err(e) => warn!(error = %e, "ignoring invalid ROBUSTCAM_METHOD_SET"),
        }
    }
}

/// Save the config to a specific path, creating parent directories.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use robustcam_perturb::IntensityMode;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn roundtrip_config_with_seed_and_augment_table() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config {
            output_dir: PathBuf::from("/data/out"),
            seed: Some(7),
            augment: AugmentConfig {
                method_set: MethodSet::HsvNoise,
                intensity: IntensityMode::Static,
            },
        };
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: Config = toml::from_str("seed = 3\n").expect("parse");
        assert_eq!(cfg.output_dir, PathBuf::from("perturbed"));
        assert_eq!(cfg.seed, Some(3));
        assert_eq!(cfg.augment, AugmentConfig::default());
    }

    #[test]
    fn config_path_points_to_robustcam_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".robustcam"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let result = load_from(&path).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "seed = \"not a number\"").expect("write");
        let err = load_from(&path).expect_err("bad seed must fail");
        assert!(err.contains("Failed to parse config"), "{err}");
    }

    #[test]
    fn overrides_replace_fields() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            lookup_from(&[
                ("ROBUSTCAM_OUTPUT_DIR", "/tmp/frames"),
                ("ROBUSTCAM_SEED", "99"),
                ("ROBUSTCAM_METHOD_SET", "rgb_only"),
            ]),
        );
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/frames"));
        assert_eq!(cfg.seed, Some(99));
        assert_eq!(cfg.augment.method_set, MethodSet::RgbOnly);
    }

    #[test]
    fn overrides_ignore_invalid_values() {
        let mut cfg = Config {
            seed: Some(1),
            ..Config::default()
        };
        apply_overrides(
            &mut cfg,
            lookup_from(&[("ROBUSTCAM_SEED", "minus one"), ("ROBUSTCAM_METHOD_SET", "fog_only")]),
        );
        assert_eq!(cfg.seed, Some(1));
        assert_eq!(cfg.augment.method_set, MethodSet::Full);
    }
}
