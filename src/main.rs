//! fcst-setup CLI
//!
//! Entry point for the `fcst-setup` command-line tool.

use clap::{Parser, Subcommand, ValueEnum};
use fcst_setup::config::loader::load_checked_user;
use fcst_setup::emit::{to_json_string, to_shell_string, to_yaml_string};
use fcst_setup::{init_logging, rules, LogConfig, LogFormat, LogLevel, Setup, UshLayout};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "fcst-setup")]
#[command(about = "Resolve and validate a forecast experiment configuration", version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Log format (human, jsonl)
    #[arg(long, global = true, default_value = "human")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full setup and write the variable-definitions file
    Setup {
        /// Directory holding config_defaults.yaml and the user config
        #[arg(long, env = "FCST_SETUP_USH_DIR", default_value = ".")]
        ush_dir: PathBuf,

        /// User config file, relative to the ush directory (default: config.yaml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Print the resolved configuration instead of a summary
        #[arg(long, value_enum)]
        print: Option<PrintFormat>,
    },

    /// Check the user config for unknown or missing keys only
    CheckKeys {
        #[arg(long, env = "FCST_SETUP_USH_DIR", default_value = ".")]
        ush_dir: PathBuf,

        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// List the rule catalog
    Rules {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PrintFormat {
    Shell,
    Yaml,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&LogConfig::new(cli.log_level, cli.log_format));

    match cli.command {
        Commands::Setup {
            ush_dir,
            config,
            print,
        } => run_setup(ush_dir, config, print),
        Commands::CheckKeys { ush_dir, config } => run_check_keys(ush_dir, config),
        Commands::Rules { json } => run_rules(json),
    }
}

fn run_setup(ush_dir: PathBuf, config: Option<PathBuf>, print: Option<PrintFormat>) {
    let mut setup = Setup::new(ush_dir);
    if let Some(config) = config {
        setup = setup.with_user_config(config);
    }

    let resolution = match setup.run() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Setup failed: {}", e);
            process::exit(e.exit_code());
        }
    };

    for warning in &resolution.warnings {
        eprintln!("warning [{}]: {}", warning.rule, warning.message);
    }

    let rendered = match print {
        None => Ok(resolution.summary()),
        Some(PrintFormat::Shell) => Ok(to_shell_string(&resolution.document)),
        Some(PrintFormat::Yaml) => to_yaml_string(&resolution.document).map_err(|e| e.to_string()),
        Some(PrintFormat::Json) => to_json_string(&resolution.document).map_err(|e| e.to_string()),
    };
    match rendered {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_check_keys(ush_dir: PathBuf, config: Option<PathBuf>) {
    let mut layout = UshLayout::new(ush_dir);
    if let Some(config) = config {
        layout = layout.with_user_config(config);
    }

    match load_checked_user(&layout) {
        Ok((_, user)) => {
            println!("User configuration valid: {}", user.source.path.display());
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run_rules(json: bool) {
    let catalog = rules::catalog();

    if json {
        let output: Vec<serde_json::Value> = catalog
            .iter()
            .map(|r| {
                serde_json::json!({
                    "name": r.name,
                    "stage": r.stage,
                    "fields": r.fields,
                })
            })
            .collect();
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    for stage in rules::Stage::ALL {
        println!("{}:", stage);
        for rule in catalog.iter().filter(|r| r.stage == stage) {
            println!("  {:<28} {}", rule.name, rule.fields.join(", "));
        }
    }
}
