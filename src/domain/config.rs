use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the per-repository config file, looked up at the git root.
pub const REPO_CONFIG_FILE: &str = ".nbkit.toml";

/// Configuration for nbkit.
///
/// Settings come from up to two TOML files: the user file
/// (`~/.config/nbkit/config.toml`) and the repository file (`.nbkit.toml` at
/// the root of the enclosing git repository). The repository file wins key by
/// key; nested tables are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// The notebook to operate on, if not discovered from the environment.
    pub notebook_path: Option<PathBuf>,

    /// Where `nbkit graph` writes its output by default.
    pub out_dir: Option<PathBuf>,

    /// Directory names skipped while scanning for notes.
    ///
    /// `.git` is always skipped.
    ignore: Vec<String>,

    /// Minimum number of outgoing links for a note to be reported as a hub.
    hub_threshold: usize,

    /// The `nb` executable.
    nb_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notebook_path: None,
            out_dir: None,
            ignore: Vec::new(),
            hub_threshold: default_hub_threshold(),
            nb_command: default_nb_command(),
        }
    }
}

/// Errors reading or writing a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("failed to access config file {path}: {source}")]
    Io {
        /// The config file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML, or doesn't match the config schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The config file.
        path: PathBuf,
        /// The underlying error.
        source: toml::de::Error,
    },

    /// The config could not be serialised.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Loads the configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let table = read_table(path)?;
        from_table(table).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Saves the configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialised or the file
    /// cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads and merges config files in order, later files overriding
    /// earlier ones.
    ///
    /// Missing files are skipped. Unreadable or invalid files are skipped
    /// with a warning, one file at a time, so a broken repository file never
    /// discards the user file. Relative `notebook_path` and `out_dir` values
    /// are resolved against the directory of the file that sets them.
    #[must_use]
    pub fn load_layered(paths: &[PathBuf]) -> Self {
        let mut merged = toml::Table::new();
        for path in paths {
            if !path.exists() {
                tracing::debug!("no config file at {}", path.display());
                continue;
            }
            let mut table = match read_table(path) {
                Ok(table) => table,
                Err(e) => {
                    tracing::warn!("ignoring config: {e}");
                    continue;
                }
            };
            if let Err(e) = from_table(table.clone()) {
                tracing::warn!("ignoring invalid config file {}: {e}", path.display());
                continue;
            }
            if let Some(dir) = path.parent() {
                resolve_relative_paths(&mut table, dir);
            }
            tracing::debug!("loaded config from {}", path.display());
            merge(&mut merged, table);
        }

        from_table(merged).unwrap_or_else(|e| {
            tracing::warn!("ignoring invalid merged config: {e}");
            Self::default()
        })
    }

    /// Loads the user and repository config files that apply in `cwd`.
    #[must_use]
    pub fn discover(cwd: &Path) -> Self {
        Self::load_layered(&Self::search_paths(cwd))
    }

    /// The config files that apply in `cwd`, lowest precedence first.
    #[must_use]
    pub fn search_paths(cwd: &Path) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("nbkit").join("config.toml"));
        }
        if let Some(root) = find_repo_root(cwd) {
            paths.push(root.join(REPO_CONFIG_FILE));
        }
        paths
    }

    /// Directory names skipped while scanning, always including `.git`.
    #[must_use]
    pub fn ignored_dirs(&self) -> Vec<String> {
        let mut dirs = vec![".git".to_string()];
        dirs.extend(self.ignore.iter().filter(|d| *d != ".git").cloned());
        dirs
    }

    /// Minimum outgoing links for a hub note.
    #[must_use]
    pub const fn hub_threshold(&self) -> usize {
        self.hub_threshold
    }

    /// The `nb` executable to run.
    #[must_use]
    pub fn nb_command(&self) -> &str {
        &self.nb_command
    }
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn from_table(mut table: toml::Table) -> Result<Config, toml::de::Error> {
    table
        .entry("_version")
        .or_insert_with(|| toml::Value::String("1".to_string()));
    toml::Value::Table(table).try_into()
}

/// Keys holding paths that are relative to the config file.
const PATH_KEYS: [&str; 2] = ["notebook_path", "out_dir"];

fn resolve_relative_paths(table: &mut toml::Table, dir: &Path) {
    for key in PATH_KEYS {
        if let Some(toml::Value::String(value)) = table.get_mut(key) {
            if Path::new(value.as_str()).is_relative() {
                *value = dir.join(value.as_str()).to_string_lossy().into_owned();
            }
        }
    }
}

/// Merges `overrides` into `base`; nested tables merge recursively, anything
/// else is replaced.
fn merge(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Walks up from `start` to the first directory containing `.git`.
fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

const fn default_hub_threshold() -> usize {
    5
}

fn default_nb_command() -> String {
    "nb".to_string()
}

/// The serialized versions of the configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notebook_path: Option<PathBuf>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        out_dir: Option<PathBuf>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        ignore: Vec<String>,

        #[serde(default = "default_hub_threshold")]
        hub_threshold: usize,

        #[serde(default = "default_nb_command")]
        nb_command: String,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                notebook_path,
                out_dir,
                ignore,
                hub_threshold,
                nb_command,
            } => Self {
                notebook_path,
                out_dir,
                ignore,
                hub_threshold,
                nb_command,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            notebook_path: config.notebook_path,
            out_dir: config.out_dir,
            ignore: config.ignore,
            hub_threshold: config.hub_threshold,
            nb_command: config.nb_command,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nnotebook_path = \"/notes/home\"\nignore = [\"archive\"]\nhub_threshold = 3\nnb_command = \"/usr/local/bin/nb\"\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.notebook_path, Some(PathBuf::from("/notes/home")));
        assert_eq!(config.ignored_dirs(), [".git", "archive"]);
        assert_eq!(config.hub_threshold(), 3);
        assert_eq!(config.nb_command(), "/usr/local/bin/nb");
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let error = Config::load(&tmp.path().join("missing.toml")).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hub_threshold = \"three\"\n").unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn version_defaults_to_one() {
        let config: Config = from_table(toml::Table::new()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let config = Config {
            out_dir: Some(PathBuf::from("site")),
            ..Config::default()
        };
        config.save(&path).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("_version = \"1\""));
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let user = tmp.path().join("user.toml");
        let repo = tmp.path().join("repo.toml");
        std::fs::write(&user, "hub_threshold = 8\nnb_command = \"nb-user\"\n").unwrap();
        std::fs::write(&repo, "hub_threshold = 2\n").unwrap();

        let config = Config::load_layered(&[user, repo, tmp.path().join("absent.toml")]);

        assert_eq!(config.hub_threshold(), 2);
        assert_eq!(config.nb_command(), "nb-user");
    }

    #[test]
    fn invalid_layer_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.toml");
        let bad = tmp.path().join("bad.toml");
        std::fs::write(&good, "hub_threshold = 9\n").unwrap();
        std::fs::write(&bad, "not = [valid").unwrap();

        let config = Config::load_layered(&[good, bad]);
        assert_eq!(config.hub_threshold(), 9);
    }

    #[test]
    fn wrongly_typed_layer_keeps_earlier_layers() {
        let tmp = tempfile::tempdir().unwrap();
        let user = tmp.path().join("user.toml");
        let repo = tmp.path().join("repo.toml");
        std::fs::write(&user, "hub_threshold = 8\nnb_command = \"nb-user\"\n").unwrap();
        std::fs::write(&repo, "hub_threshold = \"three\"\n").unwrap();

        let config = Config::load_layered(&[user, repo]);

        assert_eq!(config.hub_threshold(), 8);
        assert_eq!(config.nb_command(), "nb-user");
    }

    #[test]
    fn relative_paths_resolve_against_the_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        std::fs::write(
            tmp.path().join(REPO_CONFIG_FILE),
            "notebook_path = \"docs/nb\"\nout_dir = \"/srv/graph\"\n",
        )
        .unwrap();
        let nested = tmp.path().join("src").join("sub");
        std::fs::create_dir_all(&nested).unwrap();

        let repo_layer = Config::search_paths(&nested).pop().unwrap();
        let config = Config::load_layered(&[repo_layer]);

        assert_eq!(config.notebook_path, Some(tmp.path().join("docs/nb")));
        assert_eq!(config.out_dir, Some(PathBuf::from("/srv/graph")));
    }

    #[test]
    fn nested_tables_merge() {
        let mut base: toml::Table = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overrides: toml::Table = toml::from_str("[a]\ny = 3\nz = 4\n").unwrap();
        merge(&mut base, overrides);

        let a = base["a"].as_table().unwrap();
        assert_eq!(a["x"].as_integer(), Some(1));
        assert_eq!(a["y"].as_integer(), Some(3));
        assert_eq!(a["z"].as_integer(), Some(4));
    }

    #[test]
    fn repo_root_is_found_from_subdirectory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_repo_root(&nested), Some(tmp.path().to_path_buf()));
        assert!(
            Config::search_paths(&nested)
                .last()
                .is_some_and(|p| p.ends_with(REPO_CONFIG_FILE))
        );
    }
}
