//! Layer loading with provenance
//!
//! Each configuration layer is read from its file in the installation
//! layout, parsed according to its extension, and tagged with where it
//! came from and a SHA-256 digest of its raw bytes.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::merge::merge_layers;
use super::schema::{check_mandatory, ensure_known_keys};
use crate::document::Document;
use crate::error::{SetupError, SetupResult};
use crate::paths::UshLayout;
use crate::value::{Mapping, Value};

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LayerOrigin {
    Default,
    Constants,
    Machine,
    FixedFiles,
    User,
}

impl LayerOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerOrigin::Default => "default",
            LayerOrigin::Constants => "constants",
            LayerOrigin::Machine => "machine",
            LayerOrigin::FixedFiles => "fixed_files",
            LayerOrigin::User => "user",
        }
    }
}

/// A contributing layer file with provenance
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LayerSource {
    /// Origin of this layer
    pub origin: LayerOrigin,

    /// File the layer was read from
    pub path: PathBuf,

    /// SHA-256 digest of raw file bytes
    pub digest: String,
}

/// A parsed layer
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub source: LayerSource,
    pub mapping: Mapping,
}

impl Layer {
    /// Read and parse one layer file.
    pub fn load(path: &Path, origin: LayerOrigin) -> SetupResult<Self> {
        let bytes = read_source(path)?;
        let digest = hex::encode(Sha256::digest(&bytes));
        let mapping = parse_source(path, &bytes)?;
        tracing::debug!(
            origin = origin.as_str(),
            path = %path.display(),
            keys = mapping.len(),
            "loaded configuration layer"
        );
        Ok(Self {
            source: LayerSource {
                origin,
                path: path.to_path_buf(),
                digest,
            },
            mapping,
        })
    }
}

fn read_source(path: &Path) -> SetupResult<Vec<u8>> {
    if !path.exists() {
        return Err(SetupError::ConfigNotFound {
            path: path.to_path_buf(),
            hint: None,
        });
    }
    fs::read(path).map_err(|e| SetupError::io(path, e))
}

fn parse_source(path: &Path, bytes: &[u8]) -> SetupResult<Mapping> {
    let parse_err = |message: String| SetupError::ConfigParse {
        path: path.to_path_buf(),
        message,
    };
    let text = std::str::from_utf8(bytes).map_err(|e| parse_err(format!("invalid UTF-8: {}", e)))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let value = match extension.as_str() {
        "json" => {
            let json: serde_json::Value =
                serde_json::from_str(text).map_err(|e| parse_err(format!("JSON parse error: {}", e)))?;
            Value::from_json(json)
        }
        "toml" => {
            let toml: toml::Value =
                toml::from_str(text).map_err(|e| parse_err(format!("TOML parse error: {}", e)))?;
            Value::from_toml(toml)
        }
        _ => {
            if text.trim().is_empty() {
                return Ok(Mapping::new());
            }
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|e| parse_err(format!("YAML parse error: {}", e)))?;
            Value::from_yaml(yaml)
        }
    };

    match value {
        Value::Map(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(parse_err(format!(
            "top level must be a mapping, found {}",
            other.type_name()
        ))),
    }
}

/// Read a configuration file into a mapping.
pub fn load_config_file(path: &Path) -> SetupResult<Mapping> {
    let bytes = read_source(path)?;
    parse_source(path, &bytes)
}

/// All layers of a setup run
#[derive(Debug, Clone)]
pub struct Layers {
    pub default: Layer,
    pub constants: Layer,
    pub machine: Layer,
    pub fixed_files: Layer,
    pub user: Layer,
}

impl Layers {
    /// Provenance of every layer, lowest precedence first.
    pub fn sources(&self) -> Vec<LayerSource> {
        self.in_precedence_order()
            .into_iter()
            .map(|layer| layer.source.clone())
            .collect()
    }

    fn in_precedence_order(&self) -> [&Layer; 5] {
        [
            &self.default,
            &self.constants,
            &self.machine,
            &self.fixed_files,
            &self.user,
        ]
    }

    /// Merge all layers into a fresh document.
    pub fn merge(&self) -> Document {
        let overrides = [&self.constants, &self.machine, &self.fixed_files, &self.user]
            .into_iter()
            .map(|layer| layer.mapping.clone())
            .collect();
        Document::new(merge_layers(self.default.mapping.clone(), overrides))
    }
}

/// Load the default and user layers and check the user keys against the
/// defaults. The user layer's `MACHINE` is upper-cased.
pub fn load_checked_user(layout: &UshLayout) -> SetupResult<(Layer, Layer)> {
    let default = Layer::load(&layout.default_config(), LayerOrigin::Default)?;

    let user_path = layout.user_config();
    if !user_path.exists() {
        return Err(SetupError::ConfigNotFound {
            path: user_path,
            hint: Some("user configuration file".to_string()),
        });
    }
    let mut user = Layer::load(&user_path, LayerOrigin::User)?;

    ensure_known_keys(
        &user.mapping,
        &user.source.path,
        &default.mapping,
        &default.source.path,
    )?;
    check_mandatory(&user.mapping, &user.source.path)?;

    if let Some(Value::Map(section)) = user.mapping.get_mut("user") {
        if let Some(machine) = section.get_mut("MACHINE") {
            *machine = Value::Str(machine.to_string().to_uppercase());
        }
    }
    Ok((default, user))
}

/// Load every layer of the layout.
pub fn load_layers(layout: &UshLayout) -> SetupResult<Layers> {
    let (default, user) = load_checked_user(layout)?;

    let machine_name = user
        .mapping
        .get("user")
        .and_then(|u| u.as_map())
        .and_then(|u| u.get("MACHINE"))
        .map(|m| m.to_string())
        .unwrap_or_default();
    let machine_path = layout.machine_config(&machine_name);
    if !machine_path.exists() {
        return Err(SetupError::ConfigNotFound {
            path: machine_path,
            hint: Some(format!(
                "check that the correct machine ({}) is set in {}",
                machine_name,
                user.source.path.display()
            )),
        });
    }
    let machine = Layer::load(&machine_path, LayerOrigin::Machine)?;
    let fixed_files = Layer::load(&layout.fixed_files(), LayerOrigin::FixedFiles)?;
    let constants = Layer::load(&layout.constants(), LayerOrigin::Constants)?;

    Ok(Layers {
        default,
        constants,
        machine,
        fixed_files,
        user,
    })
}
