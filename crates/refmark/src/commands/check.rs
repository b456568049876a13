//! `refmark check` command implementation.

use std::path::PathBuf;

use clap::Args;
use refmark_config::{CliSettings, Config};
use refmark_core::RunSummary;

use crate::commands::process::print_summary;
use crate::error::CliError;
use crate::output::Output;
use crate::pipeline;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Path to configuration file (default: auto-discover refmark.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Document source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Inline citation style (overrides config).
    #[arg(long)]
    citestyle: Option<String>,

    /// Bibliography listing style (overrides config).
    #[arg(long)]
    bibstyle: Option<String>,

    /// Converter program for non-CSL-JSON bibliographies (overrides config).
    #[arg(long, env = "REFMARK_CONVERTER")]
    converter: Option<String>,

    /// Disable the on-disk bibliography cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl CheckArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            citestyle: self.citestyle,
            bibstyle: self.bibstyle,
            cache_enabled: self.no_cache.then_some(false),
            converter_program: self.converter,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let processor = pipeline::build_processor(&config)?;
        let documents =
            pipeline::discover_documents(&config, Some(&config.docs_resolved.output_dir))?;
        let processed = processor.process_all(documents)?;

        pipeline::report_problems(&config, &processed, &output);
        let summary = RunSummary::from_documents(&processed);
        print_summary(&output, processed.len(), &summary);

        if summary.has_failures() {
            return Err(CliError::Unresolved(summary.failed));
        }
        Ok(())
    }
}
