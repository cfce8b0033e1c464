//! Installation layout and filesystem helpers
//!
//! Every input of a setup run is located relative to the script
//! (`ush`) directory. This module knows that layout, resolves the
//! experiment and model-code directories, and performs the few
//! filesystem side effects setup has: creating directories and dealing
//! with a pre-existing experiment directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::ini::load_ini_config;
use crate::error::{SetupError, SetupResult};

/// Default name of the user configuration file.
pub const DEFAULT_USER_CONFIG: &str = "config.yaml";

/// Property of an externals-manifest section that holds the checkout path.
pub const EXTERNALS_PATH_PROPERTY: &str = "local_path";

/// Where setup finds its inputs
#[derive(Debug, Clone, PartialEq)]
pub struct UshLayout {
    ush_dir: PathBuf,
    user_config: PathBuf,
}

impl UshLayout {
    /// Layout rooted at `ush_dir` (made absolute) with the default user
    /// configuration file name.
    pub fn new(ush_dir: impl AsRef<Path>) -> Self {
        Self {
            ush_dir: absolutize(ush_dir.as_ref()),
            user_config: PathBuf::from(DEFAULT_USER_CONFIG),
        }
    }

    /// Use a different user configuration file. Relative paths are taken
    /// relative to the ush directory.
    pub fn with_user_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_config = path.into();
        self
    }

    pub fn ush_dir(&self) -> &Path {
        &self.ush_dir
    }

    /// The installation root, one level above the ush directory.
    pub fn home(&self) -> PathBuf {
        normalize_lexically(&self.ush_dir.join(".."))
    }

    pub fn default_config(&self) -> PathBuf {
        self.ush_dir.join("config_defaults.yaml")
    }

    pub fn user_config(&self) -> PathBuf {
        self.ush_dir.join(&self.user_config)
    }

    pub fn machine_config(&self, machine: &str) -> PathBuf {
        self.ush_dir
            .join("machine")
            .join(format!("{}.yaml", machine.to_lowercase()))
    }

    pub fn fixed_files(&self) -> PathBuf {
        self.ush_dir
            .join("..")
            .join("parm")
            .join("fixed_files_mapping.yaml")
    }

    pub fn constants(&self) -> PathBuf {
        self.ush_dir.join("constants.yaml")
    }

    pub fn valid_values(&self) -> PathBuf {
        self.ush_dir.join("valid_param_vals.yaml")
    }

    pub fn predef_grids(&self) -> PathBuf {
        self.ush_dir.join("predef_grid_params.yaml")
    }

    /// The externals manifest, following a symlink if there is one.
    pub fn externals(&self) -> PathBuf {
        let path = self.home().join("Externals.cfg");
        match fs::read_link(&path) {
            Ok(target) if target.is_absolute() => target,
            Ok(target) => self.home().join(target),
            Err(_) => path,
        }
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_lexically(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize_lexically(&cwd.join(path)),
        Err(_) => normalize_lexically(path),
    }
}

/// Remove `.` components and fold `..` into its parent without touching
/// the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the longest existing prefix of a path and append the rest.
///
/// Works for paths that do not exist yet, such as an experiment directory
/// about to be created.
pub fn resolve_lenient(path: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);
    let mut existing = normalized.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut out = canonical;
            for part in rest.iter().rev() {
                out.push(part);
            }
            return out;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// Absolute experiment base directory. Empty or relative values live
/// under `<home>/../expt_dirs`.
pub fn resolve_expt_basedir(home: &Path, basedir: &str) -> PathBuf {
    let path = if basedir.starts_with('/') {
        PathBuf::from(basedir)
    } else {
        home.join("..").join("expt_dirs").join(basedir)
    };
    resolve_lenient(&path)
}

/// The part of a path template before the first `$` or `{{`.
pub fn truncate_at_template(path: &str) -> &str {
    let cut = [path.find('$'), path.find("{{")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(path.len());
    &path[..cut]
}

/// Locate the forecast model checkout through the externals manifest.
///
/// The manifest section named after the model gives a `local_path`
/// relative to the installation root; that directory must exist.
pub fn model_code_dir(layout: &UshLayout, component: &str) -> SetupResult<PathBuf> {
    let manifest = layout.externals();
    let ini = load_ini_config(&manifest)?;
    let local_path = ini
        .get(component, EXTERNALS_PATH_PROPERTY)
        .ok_or_else(|| SetupError::Externals {
            path: manifest.clone(),
            component: component.to_string(),
            property: EXTERNALS_PATH_PROPERTY.to_string(),
        })?;
    let dir = layout.home().join(local_path);
    if !dir.exists() {
        return Err(SetupError::NotFound {
            what: "forecast model code directory".to_string(),
            key: "UFS_WTHR_MDL_DIR".to_string(),
            path: dir,
        });
    }
    Ok(dir)
}

/// How to treat an experiment directory that already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreexistingDirMethod {
    Delete,
    Rename,
    Quit,
}

impl std::str::FromStr for PreexistingDirMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete" => Ok(PreexistingDirMethod::Delete),
            "rename" => Ok(PreexistingDirMethod::Rename),
            "quit" => Ok(PreexistingDirMethod::Quit),
            _ => Err(format!("unknown method: {}", s)),
        }
    }
}

/// Apply `method` to `dir` if it exists. Returns a message describing what
/// was done, for the caller to report as a warning.
pub fn handle_preexisting_dir(dir: &Path, method: &str) -> SetupResult<Option<String>> {
    if !dir.exists() {
        return Ok(None);
    }
    let parsed: PreexistingDirMethod =
        method.parse().map_err(|_| SetupError::InvalidValue {
            key: "PREEXISTING_DIR_METHOD".to_string(),
            value: method.to_string(),
            allowed: vec!["delete".into(), "rename".into(), "quit".into()],
        })?;
    match parsed {
        PreexistingDirMethod::Delete => {
            remove_path(dir)?;
            Ok(Some(format!("removed existing directory {}", dir.display())))
        }
        PreexistingDirMethod::Rename => {
            let renamed = next_old_name(dir)?;
            fs::rename(dir, &renamed).map_err(|e| SetupError::io(dir, e))?;
            Ok(Some(format!(
                "moved existing directory {} to {}",
                dir.display(),
                renamed.display()
            )))
        }
        PreexistingDirMethod::Quit => Err(SetupError::AlreadyExists {
            path: dir.to_path_buf(),
            method: method.to_string(),
        }),
    }
}

fn remove_path(path: &Path) -> SetupResult<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| SetupError::io(path, e))
}

/// First `<dir>_oldNNN` name that is not taken.
fn next_old_name(dir: &Path) -> SetupResult<PathBuf> {
    let base = dir.display().to_string();
    let base = base.trim_end_matches('/');
    (1..1000)
        .map(|n| PathBuf::from(format!("{}_old{:03}", base, n)))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| {
            SetupError::consistency(
                "preexisting_exptdir",
                format!("no unused _oldNNN name left for {}", dir.display()),
            )
        })
}

/// Create a directory and its parents.
pub fn create_dir(path: &Path) -> SetupResult<()> {
    fs::create_dir_all(path).map_err(|e| SetupError::io(path, e))
}
