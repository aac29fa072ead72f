//! Pipeline step orchestration: resolve inputs, transform, publish, and
//! record the run. Fatal errors still leave a `failed` run record behind,
//! but never a registered artifact.

use std::path::PathBuf;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::cleaning::{self, CleaningSummary, PriceBounds};
use crate::dataset;
use crate::error::Result;
use crate::registry::{ArtifactDraft, ArtifactManifest, ArtifactRegistry};
use crate::runs::RunRecord;

#[derive(Debug, Clone)]
pub struct CleaningRequest {
    pub input_artifact: String,
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    pub min_price: f64,
    pub max_price: f64,
    /// Directory the cleaned CSV is written into before publishing.
    pub output_dir: PathBuf,
}

#[derive(Debug)]
pub struct CleaningReceipt {
    pub run_id: Uuid,
    pub manifest: ArtifactManifest,
    pub summary: CleaningSummary,
    pub output_path: PathBuf,
}

/// Run the basic cleaning step end to end against the registry.
pub fn run_basic_cleaning(
    registry: &ArtifactRegistry,
    request: &CleaningRequest,
) -> Result<CleaningReceipt> {
    let parameters = json!({
        "input_artifact": request.input_artifact,
        "output_artifact": request.output_artifact,
        "output_type": request.output_type,
        "output_description": request.output_description,
        "min_price": request.min_price,
        "max_price": request.max_price,
    });
    let mut run = RunRecord::start("basic_cleaning", parameters);

    match clean_and_publish(registry, request, &mut run) {
        Ok(receipt) => {
            run.finish_success(serde_json::to_value(&receipt.summary)?);
            registry.record_run(&run)?;
            Ok(receipt)
        }
        Err(err) => {
            run.finish_failed(err.to_string());
            let _ = registry.record_run(&run);
            Err(err)
        }
    }
}

fn clean_and_publish(
    registry: &ArtifactRegistry,
    request: &CleaningRequest,
    run: &mut RunRecord,
) -> Result<CleaningReceipt> {
    info!(reference = %request.input_artifact, "resolving input artifact");
    let resolved = registry.resolve(&request.input_artifact)?;
    run.use_artifact(resolved.manifest.reference());

    let df = dataset::read_csv(&resolved.path)?;

    info!(
        min_price = request.min_price,
        max_price = request.max_price,
        "dropping price outliers and rows outside the NYC bounding box"
    );
    let bounds = PriceBounds {
        min: request.min_price,
        max: request.max_price,
    };
    let output = cleaning::clean_listings(&df, &bounds)?;
    let summary = output.summary.clone();
    info!(
        rows_in = summary.rows_in,
        rows_out = summary.rows_out,
        null_review_dates = summary.null_review_dates,
        "cleaning finished"
    );

    let output_path = request
        .output_dir
        .join(output_file_name(&request.output_artifact));
    let mut dataframe = output.dataframe;
    dataset::write_csv(&mut dataframe, &output_path)?;

    let draft = ArtifactDraft {
        name: request.output_artifact.clone(),
        artifact_type: request.output_type.clone(),
        description: request.output_description.clone(),
        run_id: Some(run.run_id),
        inputs: run.used_artifacts.clone(),
    };
    let manifest = registry.publish(&draft, &output_path)?;
    run.log_artifact(&manifest);

    Ok(CleaningReceipt {
        run_id: run.run_id,
        manifest,
        summary,
        output_path,
    })
}

fn output_file_name(artifact_name: &str) -> String {
    let base = artifact_name.strip_suffix(".csv").unwrap_or(artifact_name);
    format!("{base}.csv")
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: PathBuf,
    pub name: String,
    pub artifact_type: String,
    pub description: String,
}

#[derive(Debug)]
pub struct UploadReceipt {
    pub run_id: Uuid,
    pub manifest: ArtifactManifest,
}

/// Register a local CSV file as a new artifact version. The header row is
/// sniffed into the run summary so the registry records what columns each
/// raw upload carried.
pub fn upload_file(registry: &ArtifactRegistry, request: &UploadRequest) -> Result<UploadReceipt> {
    let parameters = json!({
        "file": request.file.display().to_string(),
        "name": request.name,
        "artifact_type": request.artifact_type,
        "description": request.description,
    });
    let mut run = RunRecord::start("upload_file", parameters);

    match publish_upload(registry, request, &mut run) {
        Ok(receipt) => {
            registry.record_run(&run)?;
            Ok(receipt)
        }
        Err(err) => {
            run.finish_failed(err.to_string());
            let _ = registry.record_run(&run);
            Err(err)
        }
    }
}

fn publish_upload(
    registry: &ArtifactRegistry,
    request: &UploadRequest,
    run: &mut RunRecord,
) -> Result<UploadReceipt> {
    info!(file = %request.file.display(), name = %request.name, "uploading file to registry");
    let columns = dataset::read_headers(&request.file)?;

    let draft = ArtifactDraft {
        name: request.name.clone(),
        artifact_type: request.artifact_type.clone(),
        description: request.description.clone(),
        run_id: Some(run.run_id),
        inputs: Vec::new(),
    };
    let manifest = registry.publish(&draft, &request.file)?;
    run.log_artifact(&manifest);
    run.finish_success(json!({ "columns": columns }));

    Ok(UploadReceipt {
        run_id: run.run_id,
        manifest,
    })
}
