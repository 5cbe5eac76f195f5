//! Thin CLI argument parsing and dispatch (`SPEC_FULL.md` §0): the command
//! line itself is out of scope per `spec.md` §1, but a minimal `clap`
//! surface exists so the crate builds into an exercisable binary, mirroring
//! `biomcp-cli::cli::{Cli, run}`.

use clap::{Parser, Subcommand};

use crate::engine::Engine;
use crate::entities::validation::GoldStandardFile;
use crate::entities::variant::VariantInput;
use crate::validator;

#[derive(Parser, Debug)]
#[command(
    name = "tumorboard",
    about = "Assess the AMP/ASCO/CAP clinical actionability tier of a somatic point mutation",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assess a single (gene, variant, tumor_type) triple
    Assess {
        /// HUGNC gene symbol, e.g. BRAF
        gene: String,
        /// Protein-level variant, e.g. V600E
        variant: String,
        /// Tumor type, free-form or OncoTree code
        #[arg(long)]
        tumor_type: Option<String>,
    },
    /// Assess every (gene, variant, tumor_type) triple in a JSON array file
    Batch {
        /// Path to a JSON file containing a list of {gene, variant, tumor_type?} objects
        path: String,
    },
    /// Run the validation harness against a gold-standard JSON file
    Validate {
        /// Path to a gold-standard file: a JSON list, or {"entries": [...]}
        path: String,
        /// Maximum number of concurrent assessments (default 3)
        #[arg(long, default_value_t = validator::DEFAULT_MAX_CONCURRENT)]
        max_concurrent: usize,
        /// Print the human-readable report instead of JSON metrics
        #[arg(long)]
        report: bool,
    },
}

/// Dispatches a parsed [`Cli`] invocation and returns the text to print to
/// stdout. Errors propagate as [`crate::error::TumorboardError`] so `main`
/// can map them onto an exit code.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    match cli.command {
        Commands::Assess { gene, variant, tumor_type } => {
            let engine = Engine::new()?;
            let input = VariantInput { gene, variant, tumor_type };
            let assessment = engine.assess_variant(&input).await?;
            Ok(serde_json::to_string_pretty(&assessment)?)
        }
        Commands::Batch { path } => {
            let contents = tokio::fs::read_to_string(&path).await?;
            let inputs: Vec<VariantInput> = serde_json::from_str(&contents)?;
            let engine = Engine::new()?;
            let assessments = engine.batch_assess(&inputs).await;
            Ok(serde_json::to_string_pretty(&assessments)?)
        }
        Commands::Validate { path, max_concurrent, report } => {
            let contents = tokio::fs::read_to_string(&path).await?;
            let gold_file: GoldStandardFile = serde_json::from_str(&contents)?;
            let gold_entries = gold_file.into_entries();
            let engine = Engine::new()?;
            let (_results, metrics) = validator::validate(&engine, &gold_entries, max_concurrent).await;
            if report {
                Ok(metrics.to_report())
            } else {
                Ok(serde_json::to_string_pretty(&metrics)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_assess_subcommand() {
        let cli = Cli::parse_from(["tumorboard", "assess", "BRAF", "V600E", "--tumor-type", "Melanoma"]);
        match cli.command {
            Commands::Assess { gene, variant, tumor_type } => {
                assert_eq!(gene, "BRAF");
                assert_eq!(variant, "V600E");
                assert_eq!(tumor_type.as_deref(), Some("Melanoma"));
            }
            other => panic!("expected Assess, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_validate_subcommand_with_default_concurrency() {
        let cli = Cli::parse_from(["tumorboard", "validate", "gold.json"]);
        match cli.command {
            Commands::Validate { path, max_concurrent, report } => {
                assert_eq!(path, "gold.json");
                assert_eq!(max_concurrent, validator::DEFAULT_MAX_CONCURRENT);
                assert!(!report);
            }
            other => panic!("expected Validate, got {other:?}"),
        }
    }
}
