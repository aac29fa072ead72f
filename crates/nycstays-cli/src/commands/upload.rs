use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use nycstays_core::registry::ArtifactRegistry;
use nycstays_core::steps::{upload_file, UploadRequest};

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Path of the local CSV file to register
    pub file: PathBuf,
    /// Artifact name to publish under
    #[arg(long)]
    pub name: String,
    /// Artifact type (free-form, e.g. "raw_data")
    #[arg(long)]
    pub artifact_type: String,
    /// Human-readable description
    #[arg(long)]
    pub description: String,
}

pub fn handle_upload(registry: &ArtifactRegistry, args: UploadArgs) -> Result<()> {
    let receipt = upload_file(
        registry,
        &UploadRequest {
            file: args.file,
            name: args.name,
            artifact_type: args.artifact_type,
            description: args.description,
        },
    )?;

    println!(
        "Registered {} ({} bytes) from run {}",
        receipt.manifest.reference(),
        receipt.manifest.size_bytes,
        receipt.run_id
    );
    Ok(())
}
