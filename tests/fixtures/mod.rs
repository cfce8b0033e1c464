//! Test fixtures for end-to-end setup runs
//!
//! [`Installation`] lays out a small but complete installation in a
//! temporary directory:
//! - `ush/` with the default, constants, valid-values and predefined-grid files
//! - `ush/machine/big_computer.yaml`
//! - `parm/fixed_files_mapping.yaml`
//! - `Externals.cfg` and a forecast model checkout with two suite files

#![allow(dead_code)]

use fcst_setup::Setup;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Start time used by fixture runs
pub const CLOCK: i64 = 1_700_000_000;

pub const CONFIG_DEFAULTS: &str = r#"
user:
  RUN_ENVIR: nco
  MACHINE: BIG_COMPUTER
  ACCOUNT: ""
  HOMEdir: ""
  USHdir: ""
  UFS_WTHR_MDL_DIR: ""
platform:
  WORKFLOW_MANAGER: null
  NCORES_PER_NODE: null
  DOMAIN_PREGEN_BASEDIR: null
  FIXgsm: ""
  FIXaer: ""
  FIXlut: ""
  FIXorg: ""
  FIXsfc: ""
workflow:
  WORKFLOW_ID: ""
  EXPT_BASEDIR: ""
  EXPT_SUBDIR: ""
  EXPTDIR: '{{ EXPT_BASEDIR }}/{{ EXPT_SUBDIR }}'
  DEBUG: false
  VERBOSE: true
  PREEXISTING_DIR_METHOD: delete
  USE_CRON_TO_RELAUNCH: false
  CRON_RELAUNCH_INTVL_MNTS: 3
  CRONTAB_LINE: ""
  WFLOW_LAUNCH_SCRIPT_FN: launch_FV3LAM_wflow.sh
  WFLOW_LAUNCH_LOG_FN: log.launch_FV3LAM_wflow
  GLOBAL_VAR_DEFNS_FP: '{{ EXPTDIR }}/var_defns.sh'
  FIXlam: '{{ EXPTDIR }}/fix_lam'
  DOT_OR_USCORE: _
  FCST_MODEL: ufs-weather-model
  CCPP_PHYS_SUITE: FV3_GFS_v16
  CCPP_PHYS_SUITE_IN_CCPP_FP: '{{ user.UFS_WTHR_MDL_DIR }}/FV3/ccpp/suites/suite_{{ CCPP_PHYS_SUITE }}.xml'
  FIELD_DICT_IN_UWM_FP: '{{ user.UFS_WTHR_MDL_DIR }}/tests/parm/fd_nems.yaml'
  THOMPSON_MP_CLIMO_FN: Thompson_MP_MONTHLY_CLIMO.nc
  SDF_USES_RUC_LSM: false
  SDF_USES_THOMPSON_MP: false
  PREDEF_GRID_NAME: ""
  GRID_GEN_METHOD: ""
  DATE_FIRST_CYCL: '2019061500'
  DATE_LAST_CYCL: '2019061500'
  INCR_CYCL_FREQ: 24
  FCST_LEN_HRS: 24
  FCST_LEN_CYCL: [24]
  RES_IN_FIXLAM_FILENAMES: ""
  CRES: ""
nco:
  OPSROOT: ""
  COMROOT: ""
  PACKAGEROOT: ""
  DATAROOT: ""
  DCOMROOT: ""
  COMIN_BASEDIR: ""
  COMOUT_BASEDIR: ""
  EXTROOT: ""
  LOGBASEDIR: ""
  DBNROOT: ""
workflow_switches:
  RUN_TASK_MAKE_GRID: true
  RUN_TASK_MAKE_OROG: true
  RUN_TASK_MAKE_SFC_CLIMO: true
  RUN_TASK_MAKE_ICS: true
  RUN_TASK_MAKE_LBCS: true
  RUN_TASK_RUN_FCST: true
  RUN_TASK_RUN_POST: true
  RUN_TASK_VX_ENSGRID: false
  RUN_TASK_VX_ENSPOINT: false
task_make_grid:
  GRID_DIR: null
  ESGgrid_LON_CTR: null
  ESGgrid_LAT_CTR: null
  ESGgrid_DELX: null
  ESGgrid_DELY: null
  ESGgrid_NX: null
  ESGgrid_NY: null
  ESGgrid_PAZI: null
  ESGgrid_WIDE_HALO_WIDTH: null
task_make_orog:
  OROG_DIR: null
task_make_sfc_climo:
  SFC_CLIMO_DIR: null
task_get_extrn_ics:
  EXTRN_MDL_NAME_ICS: FV3GFS
  FV3GFS_FILE_FMT_ICS: nemsio
  USE_USER_STAGED_EXTRN_FILES: false
  EXTRN_MDL_SOURCE_BASEDIR_ICS: ""
  EXTRN_MDL_SYSBASEDIR_ICS: ""
task_get_extrn_lbcs:
  EXTRN_MDL_NAME_LBCS: FV3GFS
  FV3GFS_FILE_FMT_LBCS: nemsio
  LBC_SPEC_INTVL_HRS: 6
  USE_USER_STAGED_EXTRN_FILES: false
  EXTRN_MDL_SOURCE_BASEDIR_LBCS: ""
  EXTRN_MDL_SYSBASEDIR_LBCS: ""
task_run_fcst:
  DT_ATMOS: null
  LAYOUT_X: null
  LAYOUT_Y: null
  BLOCKSIZE: null
  QUILTING: true
  WRITE_DOPOST: false
task_run_post:
  USE_CUSTOM_POST_CONFIG_FILE: false
  CUSTOM_POST_CONFIG_FP: ""
  SUB_HOURLY_POST: false
  DT_SUBHOURLY_POST_MNTS: 0
  POST_OUTPUT_DOMAIN_NAME: '{{ workflow.PREDEF_GRID_NAME }}'
global:
  DO_ENSEMBLE: false
  DO_SHUM: false
  DO_SPPT: false
  DO_SKEB: false
  SHUM_MAG: 0.006
  SPPT_MAG: 0.7
  SKEB_MAG: 0.5
  DO_SPP: false
  SPP_VAR_LIST: [pbl, sfc]
  SPP_MAG_LIST: [0.2, 0.2]
  SPP_LSCALE: [150000.0, 150000.0]
  SPP_TSCALE: [21600.0, 21600.0]
  SPP_SIGTOP1: [0.1, 0.1]
  SPP_SIGTOP2: [0.025, 0.025]
  SPP_STDDEV_CUTOFF: [1.5, 1.5]
  ISEED_SPP: [4, 5]
  N_VAR_SPP: 0
  DO_LSM_SPP: false
  LSM_SPP_VAR_LIST: [smc, vgf]
  LSM_SPP_MAG_LIST: [0.017, 0.001]
  LSM_SPP_LSCALE: [150000, 150000]
  LSM_SPP_TSCALE: [21600, 21600]
  N_VAR_LNDP: 0
  LNDP_TYPE: 0
  LNDP_MODEL_TYPE: 0
  FHCYC_LSM_SPP_OR_NOT: 0
  USE_CRTM: false
  CRTM_DIR: null
"#;

pub const CONSTANTS: &str = r#"
constants:
  NH0: 0
  NH3: 3
  NH4: 4
  TILE_RGNL: 7
  RADIUS_EARTH: 6371200.0
  DEGS_PER_RADIAN: 57.29577951308232
"#;

pub const MACHINE: &str = r#"
platform:
  WORKFLOW_MANAGER: rocoto
  NCORES_PER_NODE: 40
  FIXgsm: /fix/fix_am
  FIXaer: /fix/fix_aer
  FIXlut: /fix/fix_lut
  FIXorg: /fix/fix_orog
  FIXsfc: /fix/fix_sfc_climo
user:
  ACCOUNT: an_account
data:
  ics_lbcs:
    FV3GFS:
      nemsio: /noaa/fv3gfs/nemsio
      grib2: /noaa/fv3gfs/grib2
    HRRR: /noaa/hrrr
"#;

pub const FIXED_FILES: &str = r#"
fixed_files:
  FIXgsm_FILES_TO_COPY_TO_FIXam:
    - global_hyblev.l65.txt
    - global_o3prdlos.f77
  CYCLEDIR_LINKS_TO_FIXam_FILES_MAPPING:
    - "aerosol.dat | global_climaeropac_global.txt"
    - "global_o3prdlos.f77 | "
  SFC_CLIMO_FIELDS:
    - facsf
    - maximum_snow_albedo
"#;

pub const VALID_PARAM_VALS: &str = r#"
valid_vals_RUN_ENVIR: [nco, community]
valid_vals_MACHINE: [BIG_COMPUTER, HERA]
valid_vals_PREDEF_GRID_NAME: [RRFS_CONUS_25km]
valid_vals_CCPP_PHYS_SUITE: [FV3_GFS_v16, FV3_HRRR]
valid_vals_GRID_GEN_METHOD: [ESGgrid, GFDLgrid]
valid_vals_PREEXISTING_DIR_METHOD: [delete, rename, quit]
valid_vals_DT_SUBHOURLY_POST_MNTS: [0, 1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30]
valid_vals_FV3GFS_FILE_FMT_ICS: [nemsio, grib2, netcdf]
valid_vals_FV3GFS_FILE_FMT_LBCS: [nemsio, grib2, netcdf]
valid_vals_DEBUG: [true, false]
"#;

pub const PREDEF_GRIDS: &str = r#"
RRFS_CONUS_25km:
  GRID_GEN_METHOD: ESGgrid
  ESGgrid_LON_CTR: -97.5
  ESGgrid_LAT_CTR: 38.5
  ESGgrid_DELX: 25000.0
  ESGgrid_DELY: 25000.0
  ESGgrid_NX: 219
  ESGgrid_NY: 131
  ESGgrid_PAZI: 0.0
  ESGgrid_WIDE_HALO_WIDTH: 6
  DT_ATMOS: 40
  LAYOUT_X: 5
  LAYOUT_Y: 2
  BLOCKSIZE: 40
  QUILTING:
    WRTCMP_write_groups: 1
    WRTCMP_write_tasks_per_group: 2
    WRTCMP_output_grid: lambert_conformal
"#;

pub const EXTERNALS: &str = "\
[ufs-weather-model]
protocol = git
repo_url = https://github.com/ufs-community/ufs-weather-model
hash = 1a2b3c4
local_path = sorc/ufs-weather-model
required = True

[externals_description]
schema_version = 1.0.0
";

pub const SUITE_GFS_V16: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<suite name="FV3_GFS_v16" version="1">
  <group name="physics">
    <subcycle loop="1">
      <scheme>GFS_suite_stateout_reset</scheme>
      <scheme>ozphys_2015</scheme>
      <scheme>gfdl_cloud_microphys</scheme>
      <scheme>lsm_noah</scheme>
    </subcycle>
  </group>
</suite>
"#;

pub const SUITE_HRRR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<suite name="FV3_HRRR" version="1">
  <group name="physics">
    <subcycle loop="1">
      <scheme>ozphys_2015</scheme>
      <scheme>mp_thompson</scheme>
      <scheme>lsm_ruc</scheme>
    </subcycle>
  </group>
</suite>
"#;

/// A throwaway installation
pub struct Installation {
    tmp: TempDir,
}

impl Installation {
    /// Lay out the installation and a baseline community-mode user config.
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let install = Self { tmp };
        let home = install.home();

        write(&home.join("ush/config_defaults.yaml"), CONFIG_DEFAULTS);
        write(&home.join("ush/constants.yaml"), CONSTANTS);
        write(&home.join("ush/valid_param_vals.yaml"), VALID_PARAM_VALS);
        write(&home.join("ush/predef_grid_params.yaml"), PREDEF_GRIDS);
        write(&home.join("ush/machine/big_computer.yaml"), MACHINE);
        write(&home.join("parm/fixed_files_mapping.yaml"), FIXED_FILES);
        write(&home.join("Externals.cfg"), EXTERNALS);

        let model = install.model_dir();
        write(
            &model.join("FV3/ccpp/suites/suite_FV3_GFS_v16.xml"),
            SUITE_GFS_V16,
        );
        write(&model.join("FV3/ccpp/suites/suite_FV3_HRRR.xml"), SUITE_HRRR);
        write(&model.join("tests/parm/fd_nems.yaml"), "fields: []\n");

        install.write_user(&[]);
        install
    }

    pub fn home(&self) -> PathBuf {
        self.tmp.path().join("srw")
    }

    pub fn ush_dir(&self) -> PathBuf {
        self.home().join("ush")
    }

    pub fn model_dir(&self) -> PathBuf {
        self.home().join("sorc/ufs-weather-model")
    }

    pub fn expt_basedir(&self) -> PathBuf {
        self.tmp.path().join("expt_dirs")
    }

    pub fn exptdir(&self) -> PathBuf {
        self.expt_basedir().join("test_expt")
    }

    /// Scratch space outside the installation.
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.tmp.path().join("scratch").join(name)
    }

    /// Write `config.yaml`: the baseline settings with `overrides` applied.
    ///
    /// Each override is a `section.KEY` path and a YAML value.
    pub fn write_user(&self, overrides: &[(&str, &str)]) {
        let base = format!(
            "\
user:
  RUN_ENVIR: community
  MACHINE: big_computer
workflow:
  EXPT_BASEDIR: {}
  EXPT_SUBDIR: test_expt
  PREDEF_GRID_NAME: RRFS_CONUS_25km
  CCPP_PHYS_SUITE: FV3_GFS_v16
  FCST_LEN_HRS: 12
",
            self.expt_basedir().display()
        );
        let mut config: serde_yaml::Mapping =
            serde_yaml::from_str(&base).expect("baseline user config");

        for (path, value) in overrides {
            let (section, key) = path.split_once('.').expect("section.KEY override");
            let section_key = serde_yaml::Value::String(section.to_string());
            if !config.contains_key(&section_key) {
                config.insert(
                    section_key.clone(),
                    serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
                );
            }
            let section_map = config
                .get_mut(&section_key)
                .and_then(|s| s.as_mapping_mut())
                .expect("section mapping");
            let value: serde_yaml::Value = serde_yaml::from_str(value).expect("override value");
            section_map.insert(serde_yaml::Value::String(key.to_string()), value);
        }

        let text = serde_yaml::to_string(&config).expect("render user config");
        write(&self.ush_dir().join("config.yaml"), &text);
    }

    /// A setup run with an empty environment and a fixed clock.
    pub fn setup(&self) -> Setup {
        self.setup_with_env(BTreeMap::new())
    }

    pub fn setup_with_env(&self, env: BTreeMap<String, String>) -> Setup {
        Setup::new(self.ush_dir()).with_env(env).with_clock(CLOCK)
    }
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write fixture file");
}
