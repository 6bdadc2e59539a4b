//! Locating and layering config files.
//!
//! Two files are read, the later one overriding the earlier section by section:
//!
//! 1. `config.toml` in the user config directory (`KEEPSAKE_CONFIG_DIR`, or
//!    `keepsake/` under the platform config directory)
//! 2. `keepsake.toml` in the project directory
//!
//! An explicit `--config` file replaces both layers.

use std::path::{Path, PathBuf};

use crate::{ConfigError, KeepsakeConfig, Result};

const USER_FILE: &str = "config.toml";
const PROJECT_FILE: &str = "keepsake.toml";
const CONFIG_DIR_ENV: &str = "KEEPSAKE_CONFIG_DIR";

/// A config file that was considered during loading.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// False if the file was missing or could not be parsed.
    pub loaded: bool,
}

/// The merged configuration and how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: KeepsakeConfig,
    /// Every file considered, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Files that existed but were skipped, with the reason.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Load a single file, bypassing discovery. Unlike layered loading a
    /// broken file is an error here.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: load_config_file(path)?,
            sources: vec![ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }],
            warnings: Vec::new(),
        })
    }

    /// Paths of the files that contributed to the config.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|s| s.loaded.then_some(s.path.as_path()))
            .collect()
    }
}

/// Where the config layers are looked up.
#[derive(Debug, Clone)]
pub struct ConfigLayers {
    /// Directory holding the user `config.toml`; `None` skips that layer.
    pub user_dir: Option<PathBuf>,
    /// Directory holding the project `keepsake.toml`.
    pub project_dir: PathBuf,
}

impl ConfigLayers {
    /// The user config directory and the current directory.
    pub fn discover() -> Self {
        Self {
            user_dir: user_config_dir(),
            project_dir: PathBuf::from("."),
        }
    }

    /// Candidate files, lowest precedence first.
    pub fn files(&self) -> Vec<PathBuf> {
        self.user_dir
            .iter()
            .map(|dir| dir.join(USER_FILE))
            .chain(std::iter::once(self.project_dir.join(PROJECT_FILE)))
            .collect()
    }

    /// Merge every layer that exists. A layer that fails to read or parse is
    /// skipped and reported in [`LoadedConfig::warnings`].
    pub fn load(&self) -> LoadedConfig {
        let mut loaded = LoadedConfig {
            config: KeepsakeConfig::new(),
            sources: Vec::new(),
            warnings: Vec::new(),
        };

        for path in self.files() {
            let ok = path.is_file()
                && match load_config_file(&path) {
                    Ok(layer) => {
                        loaded.config.merge(layer);
                        true
                    }
                    Err(e) => {
                        loaded.warnings.push(format!("skipped {}: {e}", path.display()));
                        false
                    }
                };
            loaded.sources.push(ConfigSource { path, loaded: ok });
        }
        loaded
    }
}

/// Discover and merge the config layers.
pub fn load_config() -> LoadedConfig {
    ConfigLayers::discover().load()
}

/// Read and parse one config file.
pub fn load_config_file(path: &Path) -> Result<KeepsakeConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    KeepsakeConfig::from_toml(&contents)
}

/// Write `config` to `path`, creating missing parent directories.
pub fn save_config(config: &KeepsakeConfig, path: &Path) -> Result<()> {
    let write_err = |path: &Path, source| ConfigError::WriteFile {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }
    std::fs::write(path, config.to_toml()?).map_err(|e| write_err(path, e))
}

/// Path of the user config file.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join(USER_FILE))
}

/// The user config directory: `KEEPSAKE_CONFIG_DIR` if set and non-empty,
/// otherwise `keepsake/` under the platform config directory.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|dir| dir.join("keepsake")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn layers(user: &TempDir, project: &TempDir) -> ConfigLayers {
        ConfigLayers {
            user_dir: Some(user.path().to_path_buf()),
            project_dir: project.path().to_path_buf(),
        }
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[store]\ncapacity = 42\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.store().capacity, 42);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_config_file(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_from_file_rejects_broken_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[store\n").unwrap();

        assert!(matches!(
            LoadedConfig::from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_project_overrides_user() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            "[store]\ncapacity = 1\n[session]\nexpiry_secs = 5\n",
        )
        .unwrap();
        fs::write(project.path().join("keepsake.toml"), "[store]\ncapacity = 2\n").unwrap();

        let loaded = layers(&user, &project).load();

        assert_eq!(loaded.config.store().capacity, 2);
        assert_eq!(loaded.config.session().expiry_secs, 5);
        assert_eq!(loaded.loaded_from().len(), 2);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_missing_layers_use_defaults() {
        let project = TempDir::new().unwrap();
        let loaded = ConfigLayers {
            user_dir: None,
            project_dir: project.path().to_path_buf(),
        }
        .load();

        assert_eq!(loaded.sources.len(), 1);
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.config, KeepsakeConfig::default());
    }

    #[test]
    fn test_broken_layer_becomes_warning() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(user.path().join("config.toml"), "[store\n").unwrap();
        fs::write(project.path().join("keepsake.toml"), "[store]\ncapacity = 3\n").unwrap();

        let loaded = layers(&user, &project).load();

        assert_eq!(loaded.warnings.len(), 1);
        let project_file = project.path().join("keepsake.toml");
        assert_eq!(loaded.loaded_from(), vec![project_file.as_path()]);
        assert_eq!(loaded.config.store().capacity, 3);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = KeepsakeConfig::new();
        config.session = Some(crate::SessionConfig {
            expiry_secs: 99,
            lazy_fetch: true,
        });
        save_config(&config, &path).unwrap();

        assert_eq!(load_config_file(&path).unwrap(), config);
    }

    #[test]
    #[serial]
    fn test_config_dir_env_override() {
        let dir = TempDir::new().unwrap();
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::set_var(CONFIG_DIR_ENV, dir.path()) };
        let path = user_config_path();
        let files = ConfigLayers::discover().files();
        unsafe { std::env::remove_var(CONFIG_DIR_ENV) };

        assert_eq!(path, Some(dir.path().join("config.toml")));
        assert_eq!(files[0], dir.path().join("config.toml"));
    }
}
