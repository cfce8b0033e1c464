//! Setup orchestration
//!
//! A setup run resolves the experiment configuration end to end:
//! - Load and check the layers (default, constants, machine, fixed files, user)
//! - Merge them and fix the installation paths
//! - Expand placeholders and normalize types
//! - Run the rule catalog
//! - Expand again, write the variable-definitions file
//! - Check the result against the allowed-values catalog

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::{
    apply_installation_root, expand, load_config_file, load_layers, normalize, str_to_list,
    LayerSource,
};
use crate::derive::{FixedFileMapper, GridParamProvider, StandardGrids, SuiteFileMapper};
use crate::document::Document;
use crate::emit::{append_var_defns, to_yaml_string};
use crate::error::SetupResult;
use crate::paths::{model_code_dir, UshLayout};
use crate::rules::{run_all, Collaborators, RuleContext, Warning};
use crate::sweep::sweep;
use crate::value::Value;

/// Path of the per-run id, which differs between otherwise identical runs
const WORKFLOW_ID_KEY: &str = "workflow.WORKFLOW_ID";

/// A configured setup run
pub struct Setup {
    layout: UshLayout,
    grids: Box<dyn GridParamProvider>,
    fixed_files: Box<dyn FixedFileMapper>,
    env: Option<BTreeMap<String, String>>,
    started_at: Option<i64>,
}

impl Setup {
    /// Setup for the installation whose `ush` directory is `ush_dir`, with
    /// the standard collaborators.
    pub fn new(ush_dir: impl Into<PathBuf>) -> Self {
        let layout = UshLayout::new(ush_dir.into());
        let grids = Box::new(StandardGrids::new(layout.predef_grids()));
        Self {
            layout,
            grids,
            fixed_files: Box::new(SuiteFileMapper),
            env: None,
            started_at: None,
        }
    }

    /// Use a user config file other than `<ush>/config.yaml`.
    pub fn with_user_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.layout = self.layout.with_user_config(path);
        self
    }

    pub fn with_grid_provider(mut self, grids: impl GridParamProvider + 'static) -> Self {
        self.grids = Box::new(grids);
        self
    }

    pub fn with_fixed_file_mapper(mut self, mapper: impl FixedFileMapper + 'static) -> Self {
        self.fixed_files = Box::new(mapper);
        self
    }

    /// Use these environment variables instead of the process environment.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Fix the run's start time (Unix seconds).
    pub fn with_clock(mut self, started_at: i64) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn layout(&self) -> &UshLayout {
        &self.layout
    }

    /// Run the whole pipeline.
    pub fn run(&self) -> SetupResult<Resolution> {
        let started_at = self
            .started_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let env = match &self.env {
            Some(env) => env.clone(),
            None => std::env::vars().collect(),
        };
        tracing::info!(ush_dir = %self.layout.ush_dir().display(), "starting setup");

        let layers = load_layers(&self.layout)?;
        let sources = layers.sources();
        let mut doc = layers.merge();
        apply_installation_root(&mut doc, &self.layout.home());

        let model_dir = model_code_dir(&self.layout, &doc.text("workflow.FCST_MODEL"))?;
        doc.set("user.USHdir", self.layout.ush_dir().display().to_string());
        doc.set("user.UFS_WTHR_MDL_DIR", model_dir.display().to_string());

        expand(&mut doc);
        normalize(&mut doc)?;

        let warnings = {
            let mut ctx = RuleContext::new(
                &mut doc,
                Collaborators {
                    layout: &self.layout,
                    sources: &sources,
                    grids: self.grids.as_ref(),
                    fixed_files: self.fixed_files.as_ref(),
                    env: &env,
                    started_at,
                },
            );
            run_all(&mut ctx)?;
            ctx.into_warnings()
        };

        expand(&mut doc);
        listify(&mut doc);
        expand(&mut doc);

        if doc.flag("workflow.DEBUG") {
            match to_yaml_string(&doc) {
                Ok(yaml) => tracing::info!("resolved configuration:\n{}", yaml),
                Err(e) => tracing::warn!(error = %e, "could not render configuration as YAML"),
            }
        }
        let var_defns_path = append_var_defns(&doc)?;

        let catalog = load_config_file(&self.layout.valid_values())?;
        sweep(&doc, &catalog)?;

        tracing::info!(
            warnings = warnings.len(),
            workflow_id = %doc.text(WORKFLOW_ID_KEY),
            "setup complete"
        );
        Ok(Resolution {
            document: doc,
            warnings,
            sources,
            var_defns_path,
        })
    }
}

/// Read section-level strings that spell lists or scalars as typed values.
fn listify(doc: &mut Document) {
    for section in doc.root_mut().values_mut() {
        if let Value::Map(map) = section {
            for value in map.values_mut() {
                if let Value::Str(s) = value {
                    *value = str_to_list(s);
                }
            }
        }
    }
}

/// Outcome of a successful setup run
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub document: Document,
    pub warnings: Vec<Warning>,
    pub sources: Vec<LayerSource>,
    pub var_defns_path: PathBuf,
}

impl Resolution {
    /// SHA-256 of the JCS-canonical document, leaving out the per-run id.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        let mut doc = self.document.clone();
        doc.remove(WORKFLOW_ID_KEY);
        let jcs_bytes = serde_json_canonicalizer::to_vec(&doc)?;
        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    /// One-line summary for the CLI.
    pub fn summary(&self) -> String {
        format!(
            "experiment {} resolved from {} layers with {} warning(s); variable definitions in {}",
            self.document.text("workflow.EXPTDIR"),
            self.sources.len(),
            self.warnings.len(),
            self.var_defns_path.display()
        )
    }
}
