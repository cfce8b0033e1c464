//! The validation and derivation rule catalog
//!
//! Every cross-field check and derivation setup performs is a [`Rule`] in
//! [`CATALOG`]. Rules run in catalog order, grouped by [`Stage`]; the first
//! failing rule stops the run. Rules may mutate the document and record
//! warnings through the [`RuleContext`].

mod dirs;
mod extrn;
mod fcst;
mod inputs;
mod physics;
mod post;
mod workflow;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::config::{LayerOrigin, LayerSource};
use crate::derive::{FixedFileMapper, GridParamProvider};
use crate::document::Document;
use crate::error::{SetupError, SetupResult};
use crate::paths::UshLayout;

/// Group of rules that run together
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Workflow,
    ExternalData,
    Forecast,
    Physics,
    PostProcessing,
    Directories,
    ModelInputs,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 7] = [
        Stage::Workflow,
        Stage::ExternalData,
        Stage::Forecast,
        Stage::Physics,
        Stage::PostProcessing,
        Stage::Directories,
        Stage::ModelInputs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Workflow => "workflow",
            Stage::ExternalData => "external_data",
            Stage::Forecast => "forecast",
            Stage::Physics => "physics",
            Stage::PostProcessing => "post_processing",
            Stage::Directories => "directories",
            Stage::ModelInputs => "model_inputs",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A non-fatal finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    /// Rule that raised it
    pub rule: &'static str,
    pub message: String,
}

/// A rule action
pub type RuleFn = fn(&mut RuleContext<'_>) -> SetupResult<()>;

/// One entry of the catalog
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub stage: Stage,
    /// Settings the rule reads or writes
    pub fields: &'static [&'static str],
    pub run: RuleFn,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Read-only inputs rules may consult
pub struct Collaborators<'a> {
    pub layout: &'a UshLayout,
    pub sources: &'a [LayerSource],
    pub grids: &'a dyn GridParamProvider,
    pub fixed_files: &'a dyn FixedFileMapper,
    /// Process environment snapshot
    pub env: &'a BTreeMap<String, String>,
    /// Unix time the run started at
    pub started_at: i64,
}

/// State handed to each rule
pub struct RuleContext<'a> {
    pub doc: &'a mut Document,
    pub with: Collaborators<'a>,
    warnings: Vec<Warning>,
    rule: &'static str,
}

impl<'a> RuleContext<'a> {
    pub fn new(doc: &'a mut Document, with: Collaborators<'a>) -> Self {
        Self {
            doc,
            with,
            warnings: Vec::new(),
            rule: "",
        }
    }

    /// Record a warning for the running rule.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(rule = self.rule, "{}", message);
        self.warnings.push(Warning {
            rule: self.rule,
            message,
        });
    }

    /// A consistency failure of the running rule.
    pub fn fail(&self, message: impl Into<String>) -> SetupError {
        SetupError::consistency(self.rule, message)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    /// Path of the layer file with the given origin.
    pub fn source_path(&self, origin: LayerOrigin) -> &Path {
        self.with
            .sources
            .iter()
            .find(|s| s.origin == origin)
            .map(|s| s.path.as_path())
            .unwrap_or_else(|| Path::new("<unknown>"))
    }
}

/// The rule catalog, in execution order.
pub static CATALOG: &[Rule] = &[
    // Workflow
    Rule {
        name: "mandatory_leaves",
        stage: Stage::Workflow,
        fields: workflow::MANDATORY_LEAVES,
        run: workflow::mandatory_leaves,
    },
    Rule {
        name: "workflow_id",
        stage: Stage::Workflow,
        fields: &["workflow.WORKFLOW_ID", "workflow.DEBUG", "workflow.VERBOSE"],
        run: workflow::workflow_id,
    },
    Rule {
        name: "fcst_len_max",
        stage: Stage::Workflow,
        fields: &["workflow.FCST_LEN_HRS"],
        run: workflow::fcst_len_max,
    },
    Rule {
        name: "preexisting_exptdir",
        stage: Stage::Workflow,
        fields: &["workflow.EXPTDIR", "workflow.PREEXISTING_DIR_METHOD"],
        run: workflow::preexisting_exptdir,
    },
    Rule {
        name: "crontab_line",
        stage: Stage::Workflow,
        fields: &[
            "workflow.USE_CRON_TO_RELAUNCH",
            "workflow.CRON_RELAUNCH_INTVL_MNTS",
            "workflow.CRONTAB_LINE",
        ],
        run: workflow::crontab_line,
    },
    Rule {
        name: "pregen_basedir",
        stage: Stage::Workflow,
        fields: &[
            "platform.DOMAIN_PREGEN_BASEDIR",
            "workflow_switches.RUN_TASK_MAKE_GRID",
            "workflow_switches.RUN_TASK_MAKE_OROG",
            "workflow_switches.RUN_TASK_MAKE_SFC_CLIMO",
        ],
        run: workflow::pregen_basedir,
    },
    Rule {
        name: "account",
        stage: Stage::Workflow,
        fields: &["user.ACCOUNT", "platform.WORKFLOW_MANAGER"],
        run: workflow::account,
    },
    // External data
    Rule {
        name: "extrn_sysbasedir",
        stage: Stage::ExternalData,
        fields: &[
            "task_get_extrn_ics.EXTRN_MDL_SYSBASEDIR_ICS",
            "task_get_extrn_lbcs.EXTRN_MDL_SYSBASEDIR_LBCS",
            "data.ics_lbcs",
        ],
        run: extrn::extrn_sysbasedir,
    },
    Rule {
        name: "staged_extrn_dirs",
        stage: Stage::ExternalData,
        fields: &[
            "task_get_extrn_ics.EXTRN_MDL_SOURCE_BASEDIR_ICS",
            "task_get_extrn_lbcs.EXTRN_MDL_SOURCE_BASEDIR_LBCS",
        ],
        run: extrn::staged_extrn_dirs,
    },
    // Forecast
    Rule {
        name: "hires_dt_atmos",
        stage: Stage::Forecast,
        fields: &["workflow.CCPP_PHYS_SUITE", "task_run_fcst.DT_ATMOS"],
        run: fcst::hires_dt_atmos,
    },
    Rule {
        name: "predef_grid",
        stage: Stage::Forecast,
        fields: &["workflow.PREDEF_GRID_NAME", "task_run_fcst.QUILTING"],
        run: fcst::predef_grid,
    },
    Rule {
        name: "cycle_fcst_lengths",
        stage: Stage::Forecast,
        fields: &[
            "workflow.FCST_LEN_HRS",
            "workflow.FCST_LEN_CYCL",
            "workflow.ALL_CDATES",
            "workflow.INCR_CYCL_FREQ",
        ],
        run: fcst::cycle_fcst_lengths,
    },
    Rule {
        name: "grid_gen_method",
        stage: Stage::Forecast,
        fields: &["workflow.GRID_GEN_METHOD", "grid_params"],
        run: fcst::grid_gen_method,
    },
    Rule {
        name: "fcst_mandatory",
        stage: Stage::Forecast,
        fields: fcst::FCST_MANDATORY,
        run: fcst::fcst_mandatory,
    },
    // Physics
    Rule {
        name: "stochastic_sentinels",
        stage: Stage::Physics,
        fields: &["global.SHUM_MAG", "global.SKEB_MAG", "global.SPPT_MAG"],
        run: physics::stochastic_sentinels,
    },
    Rule {
        name: "spp_lengths",
        stage: Stage::Physics,
        fields: &["global.DO_SPP", "global.N_VAR_SPP", "global.SPP_VAR_LIST"],
        run: physics::spp_lengths,
    },
    Rule {
        name: "lsm_spp_lengths",
        stage: Stage::Physics,
        fields: &["global.DO_LSM_SPP", "global.N_VAR_LNDP", "global.LSM_SPP_VAR_LIST"],
        run: physics::lsm_spp_lengths,
    },
    Rule {
        name: "lbc_divisibility",
        stage: Stage::Physics,
        fields: &["workflow.FCST_LEN_HRS", "task_get_extrn_lbcs.LBC_SPEC_INTVL_HRS"],
        run: physics::lbc_divisibility,
    },
    // Post-processing
    Rule {
        name: "custom_post_config",
        stage: Stage::PostProcessing,
        fields: &[
            "task_run_post.USE_CUSTOM_POST_CONFIG_FILE",
            "task_run_post.CUSTOM_POST_CONFIG_FP",
        ],
        run: post::custom_post_config,
    },
    Rule {
        name: "crtm_dir",
        stage: Stage::PostProcessing,
        fields: &["global.USE_CRTM", "global.CRTM_DIR"],
        run: post::crtm_dir,
    },
    Rule {
        name: "subhourly_post",
        stage: Stage::PostProcessing,
        fields: &[
            "task_run_post.SUB_HOURLY_POST",
            "task_run_post.DT_SUBHOURLY_POST_MNTS",
            "task_run_fcst.DT_ATMOS",
        ],
        run: post::subhourly_post,
    },
    Rule {
        name: "post_domain_name",
        stage: Stage::PostProcessing,
        fields: &["task_run_post.POST_OUTPUT_DOMAIN_NAME", "workflow.PREDEF_GRID_NAME"],
        run: post::post_domain_name,
    },
    // Directories
    Rule {
        name: "nco_dirs",
        stage: Stage::Directories,
        fields: &["user.RUN_ENVIR", "nco.OPSROOT", "nco.LOGBASEDIR", "nco.DBNROOT"],
        run: dirs::nco_dirs,
    },
    // Model inputs
    Rule {
        name: "model_input_files",
        stage: Stage::ModelInputs,
        fields: &["workflow.CCPP_PHYS_SUITE_IN_CCPP_FP", "workflow.FIELD_DICT_IN_UWM_FP"],
        run: inputs::model_input_files,
    },
    Rule {
        name: "ozone_mapping",
        stage: Stage::ModelInputs,
        fields: &[
            "fixed_files.FIXgsm_FILES_TO_COPY_TO_FIXam",
            "fixed_files.CYCLEDIR_LINKS_TO_FIXam_FILES_MAPPING",
        ],
        run: inputs::ozone_mapping,
    },
    Rule {
        name: "ensemble_vx",
        stage: Stage::ModelInputs,
        fields: &[
            "global.DO_ENSEMBLE",
            "workflow_switches.RUN_TASK_VX_ENSGRID",
            "workflow_switches.RUN_TASK_VX_ENSPOINT",
        ],
        run: inputs::ensemble_vx,
    },
    Rule {
        name: "pregen_links",
        stage: Stage::ModelInputs,
        fields: &[
            "workflow.FIXlam",
            "workflow.RES_IN_FIXLAM_FILENAMES",
            "workflow.CRES",
        ],
        run: inputs::pregen_links,
    },
    Rule {
        name: "inline_post",
        stage: Stage::ModelInputs,
        fields: &[
            "task_run_fcst.WRITE_DOPOST",
            "workflow_switches.RUN_TASK_RUN_POST",
            "task_run_post.SUB_HOURLY_POST",
        ],
        run: inputs::inline_post,
    },
    Rule {
        name: "ruc_lsm",
        stage: Stage::ModelInputs,
        fields: &["workflow.SDF_USES_RUC_LSM"],
        run: inputs::ruc_lsm,
    },
    Rule {
        name: "thompson_mp",
        stage: Stage::ModelInputs,
        fields: &["workflow.SDF_USES_THOMPSON_MP", "workflow.THOMPSON_MP_CLIMO_FN"],
        run: inputs::thompson_mp,
    },
];

/// The rule catalog, in execution order.
pub fn catalog() -> &'static [Rule] {
    CATALOG
}

/// Run every rule of one stage.
pub fn run_stage(stage: Stage, ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    for rule in CATALOG.iter().filter(|r| r.stage == stage) {
        ctx.rule = rule.name;
        tracing::debug!(stage = %stage, rule = rule.name, "running rule");
        (rule.run)(ctx)?;
    }
    Ok(())
}

/// Run the whole catalog.
pub fn run_all(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    for stage in Stage::ALL {
        run_stage(stage, ctx)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for rule tests.

    use super::*;
    use crate::derive::{
        GridRequest, LinkRequest, OzoneMapping, OzoneRequest, PredefRequest, ThompsonMapping,
        ThompsonRequest,
    };
    use crate::value::{Mapping, Value};

    pub struct NoGrids;

    impl GridParamProvider for NoGrids {
        fn predefined(&self, request: &PredefRequest) -> SetupResult<Mapping> {
            Err(SetupError::Unsupported {
                key: "PREDEF_GRID_NAME".into(),
                value: request.grid_name.clone(),
                supported: vec![],
            })
        }

        fn grid_params(&self, _request: &GridRequest) -> SetupResult<Mapping> {
            let mut params = Mapping::new();
            params.insert("NHW".into(), Value::Int(6));
            Ok(params)
        }
    }

    pub struct NoFixFiles;

    impl FixedFileMapper for NoFixFiles {
        fn ozone(&self, request: &OzoneRequest<'_>) -> SetupResult<OzoneMapping> {
            Ok(OzoneMapping {
                ozone_param: "ozphys".into(),
                fixgsm_ozone_fn: "global_o3prdlos.f77".into(),
                link_mappings: request.link_mappings.to_vec(),
            })
        }

        fn uses_ruc_lsm(&self, _suite_file: &Path) -> SetupResult<bool> {
            Ok(false)
        }

        fn thompson(&self, _request: &ThompsonRequest<'_>) -> SetupResult<ThompsonMapping> {
            Ok(ThompsonMapping::default())
        }

        fn link_pregen(&self, _request: &LinkRequest<'_>) -> SetupResult<u32> {
            Ok(403)
        }
    }

    /// Run one catalog rule against a document with stub collaborators.
    pub fn run_rule(name: &str, doc: &mut Document) -> SetupResult<Vec<Warning>> {
        run_rule_with_env(name, doc, &BTreeMap::new())
    }

    pub fn run_rule_with_env(
        name: &str,
        doc: &mut Document,
        env: &BTreeMap<String, String>,
    ) -> SetupResult<Vec<Warning>> {
        let layout = UshLayout::new("/srw/ush");
        let rule = CATALOG
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no rule named {name}"));
        let mut ctx = RuleContext::new(
            doc,
            Collaborators {
                layout: &layout,
                sources: &[],
                grids: &NoGrids,
                fixed_files: &NoFixFiles,
                env,
                started_at: 1_700_000_000,
            },
        );
        ctx.rule = rule.name;
        (rule.run)(&mut ctx)?;
        Ok(ctx.into_warnings())
    }
}
