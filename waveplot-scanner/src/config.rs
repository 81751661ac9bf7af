//! Scanner configuration
//!
//! Every setting resolves in the same order: command line (or its environment
//! variable) → TOML config file → compiled default. The editor key has no
//! default; when neither source provides one the user is prompted for it.

use crate::workflow::PipelineConfig;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use waveplot_common::config::{
    first_valid, is_valid_key, TomlConfig, DEFAULT_ANALYSIS_WORKERS, DEFAULT_ENGINE_LIBRARY,
    DEFAULT_EXTENSIONS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_RESULT_CAPACITY, DEFAULT_SERVER_URL,
};

/// Command-line arguments for waveplot-scanner
#[derive(Parser, Debug, Clone)]
#[command(name = "waveplot-scanner")]
#[command(about = "Generate WavePlots for a music collection and upload them")]
#[command(version)]
pub struct CliArgs {
    /// Directory to scan
    pub directory: PathBuf,

    /// WavePlot server base URL
    #[arg(long, env = "WAVEPLOT_SERVER_URL")]
    pub server_url: Option<String>,

    /// Editor key used to authorise uploads
    #[arg(long, env = "WAVEPLOT_EDITOR_KEY", hide_env_values = true)]
    pub editor_key: Option<String>,

    /// Name or path of the libwaveplot shared library
    #[arg(long, env = "WAVEPLOT_ENGINE_LIBRARY")]
    pub engine_library: Option<String>,

    /// Number of analysis workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Seconds a worker waits for new work before exiting
    #[arg(long)]
    pub idle_timeout: Option<u64>,

    /// Config file (defaults to ~/.config/waveplot/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

/// Fully resolved scanner settings
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    pub directory: PathBuf,
    pub server_url: String,
    /// `None` until resolved from CLI/ENV, the config file, or the prompt
    pub editor_key: Option<String>,
    pub engine_library: String,
    pub workers: usize,
    pub idle_timeout: Duration,
    pub result_capacity: usize,
    pub extensions: Vec<String>,
    pub log_level: String,
}

impl ScannerConfig {
    /// Merge command-line arguments over the TOML config
    pub fn resolve(args: &CliArgs, toml: &TomlConfig) -> Self {
        let editor_key = first_valid(&[
            ("command line or environment", args.editor_key.as_deref()),
            ("config file", toml.editor_key.as_deref()),
        ])
        .map(str::to_string);

        let log_level = if args.verbose {
            "debug".to_string()
        } else {
            toml.logging.level.clone()
        };

        Self {
            directory: args.directory.clone(),
            server_url: args
                .server_url
                .clone()
                .or_else(|| toml.server_url.clone())
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            editor_key,
            engine_library: args
                .engine_library
                .clone()
                .or_else(|| toml.engine_library.clone())
                .unwrap_or_else(|| DEFAULT_ENGINE_LIBRARY.to_string()),
            workers: args
                .workers
                .or(toml.analysis_workers)
                .unwrap_or(DEFAULT_ANALYSIS_WORKERS)
                .max(1),
            idle_timeout: Duration::from_secs(
                args.idle_timeout
                    .or(toml.idle_timeout_secs)
                    .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
            ),
            result_capacity: toml.result_capacity.unwrap_or(DEFAULT_RESULT_CAPACITY),
            extensions: toml
                .extensions
                .clone()
                .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()),
            log_level,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.workers,
            idle_timeout: self.idle_timeout,
            result_capacity: self.result_capacity,
            extensions: self.extensions.clone(),
            ..Default::default()
        }
    }
}

/// Ask for the editor key until a non-blank one is entered
///
/// Returns `None` when input ends first.
pub fn prompt_editor_key<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<Option<String>> {
    loop {
        write!(output, "Editor key: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let key = line.trim();
        if is_valid_key(key) {
            return Ok(Some(key.to_string()));
        }
    }
}
