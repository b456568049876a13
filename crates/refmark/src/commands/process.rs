//! `refmark process` command implementation.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use refmark_config::{CliSettings, Config};
use refmark_core::RunSummary;

use crate::error::CliError;
use crate::output::Output;
use crate::pipeline;

/// Arguments for the process command.
#[derive(Args)]
pub(crate) struct ProcessArgs {
    /// Path to configuration file (default: auto-discover refmark.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Document source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory for processed documents (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

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

impl ProcessArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            citestyle: self.citestyle,
            bibstyle: self.bibstyle,
            cache_enabled: self.no_cache.then_some(false),
            converter_program: self.converter,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let output_dir = config.docs_resolved.output_dir.clone();

        output.info(&format!(
            "Source: {}",
            config.docs_resolved.source_dir.display()
        ));
        output.info(&format!("Output: {}", output_dir.display()));

        let processor = pipeline::build_processor(&config)?;
        let documents = pipeline::discover_documents(&config, Some(&output_dir))?;
        let processed = processor.process_all(documents)?;

        for document in &processed {
            let target = pipeline::output_path(&config, &output_dir, document.path());
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| CliError::File {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::write(&target, document.text()).map_err(|source| CliError::File {
                path: target.clone(),
                source,
            })?;
            if document.is_modified() {
                output.detail(&format!(
                    "  {}",
                    pipeline::relative_path(&config, document.path()).display()
                ));
            }
        }

        pipeline::report_problems(&config, &processed, &output);
        let summary = RunSummary::from_documents(&processed);
        print_summary(&output, processed.len(), &summary);

        if summary.has_failures() {
            return Err(CliError::Unresolved(summary.failed));
        }
        Ok(())
    }
}

pub(crate) fn print_summary(output: &Output, total: usize, summary: &RunSummary) {
    let line = format!(
        "{total} document(s): {} resolved ({} citations), {} unchanged, {} without bibliography, {} failed",
        summary.resolved, summary.citations, summary.unchanged, summary.unavailable, summary.failed
    );
    if summary.has_failures() {
        output.warning(&line);
    } else {
        output.success(&line);
    }
}
