//! Layered configuration
//!
//! Resolution starts from five layers:
//! 1. Defaults (config_defaults.yaml)
//! 2. Constants (constants.yaml)
//! 3. Machine settings (machine/<name>.yaml)
//! 4. Fixed-file mappings (parm/fixed_files_mapping.yaml)
//! 5. User settings (config.yaml)
//!
//! They are checked, merged, expanded and normalized into one document.

pub mod expand;
pub mod ini;
pub mod loader;
pub mod merge;
pub mod normalize;
pub mod schema;

pub use expand::expand;
pub use ini::{load_ini_config, IniDoc};
pub use loader::{load_config_file, load_layers, Layer, LayerOrigin, LayerSource, Layers};
pub use merge::{apply_installation_root, deep_merge, merge_layers};
pub use normalize::{normalize, str_to_list, str_to_type};
pub use schema::{check_keys, check_mandatory, ensure_known_keys};
