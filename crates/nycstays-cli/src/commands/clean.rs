use anyhow::Result;
use clap::Args;
use nycstays_core::registry::ArtifactRegistry;
use nycstays_core::steps::{run_basic_cleaning, CleaningRequest};

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Artifact reference of the raw data to clean (e.g. "raw_listings:latest")
    #[arg(long)]
    pub input_artifact: String,
    /// Name for the cleaned output artifact
    #[arg(long)]
    pub output_artifact: String,
    /// Artifact type recorded on the output (free-form, e.g. "clean_data")
    #[arg(long)]
    pub output_type: String,
    /// Human-readable description attached to the output artifact
    #[arg(long)]
    pub output_description: String,
    /// Minimum nightly price to keep (inclusive)
    #[arg(long)]
    pub min_price: f64,
    /// Maximum nightly price to keep (inclusive)
    #[arg(long)]
    pub max_price: f64,
}

pub fn handle_clean(registry: &ArtifactRegistry, args: CleanArgs) -> Result<()> {
    let request = CleaningRequest {
        input_artifact: args.input_artifact,
        output_artifact: args.output_artifact,
        output_type: args.output_type,
        output_description: args.output_description,
        min_price: args.min_price,
        max_price: args.max_price,
        output_dir: std::env::current_dir()?,
    };

    let receipt = run_basic_cleaning(registry, &request)?;

    println!(
        "Published {} ({} of {} rows kept, {} without a review date)",
        receipt.manifest.reference(),
        receipt.summary.rows_out,
        receipt.summary.rows_in,
        receipt.summary.null_review_dates,
    );
    println!("  run:  {}", receipt.run_id);
    println!("  file: {}", receipt.output_path.display());
    Ok(())
}
