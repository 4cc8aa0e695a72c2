pub mod common;
pub mod parser;
pub mod reader;

pub use common::*;
pub use parser::{DestinationSettings, MirrorSettings, ParsedConfig, SourceSettings};

use std::path::Path;

use anyhow::{Context, Result};
use clap::{ArgEnum, Parser};
use parser::parse_config;
use reader::read_config;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(
    name = "repomigrate",
    about = "Mirror Bitbucket Server repositories into a GitHub organisation"
)]
pub struct Args {
    /// Path to the YAML configuration file.
    #[clap(short, long, parse(from_os_str), default_value = "migrate.yaml")]
    pub config: std::path::PathBuf,

    #[clap(long, arg_enum)]
    pub mode: Mode,

    /// Do not push changes or create repositories.
    #[clap(long)]
    pub dry_run: bool,

    #[clap(long, arg_enum, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[clap(rename_all = "snake_case")]
pub enum Mode {
    /// Mirror repositories that are not on disk yet.
    Clone,
    /// Mirror new repositories and fetch into existing ones.
    CloneUpdate,
    /// Create, permission and push every mirror on disk.
    Push,
}

#[derive(ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

pub fn init_logging(level: LogLevel) {
    // HTTP clients are chatty below warn.
    let filter = EnvFilter::new(format!(
        "{},octocrab=warn,reqwest=warn,hyper=warn",
        level.directive()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

pub fn load_config(path: &Path) -> Result<ParsedConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read file `{:?}`", path))?;

    let raw = read_config(&content).with_context(|| format!("could not parse `{:?}`", path))?;
    let parsed = parse_config(raw, std::env::var("PW").ok())?;

    Ok(parsed)
}
