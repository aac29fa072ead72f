use std::fs;
use std::path::Path;

use tempfile::tempdir;

use nycstays_core::error::PipelineError;
use nycstays_core::registry::ArtifactRegistry;
use nycstays_core::runs::{RunRecord, RunStatus};
use nycstays_core::steps::{run_basic_cleaning, upload_file, CleaningRequest, UploadRequest};

// Seven raw rows: one clean keeper, one too cheap, one geocoded in New
// Jersey, one keeper with no review date, one more keeper, one with a bad
// latitude, one with no price at all.
const RAW_CSV: &str = "\
id,name,price,longitude,latitude,last_review,room_type
1,East Village walkup,150,-73.9,40.7,2019-05-21,Entire home/apt
2,Budget bunk,5,-73.9,40.7,2019-05-21,Shared room
3,Mislabeled Newark loft,150,-75.0,40.7,2019-05-21,Entire home/apt
4,Harbor view,120,-73.95,40.65,,Private room
5,Uptown studio,90,-73.94,40.8,2019-06-02,Entire home/apt
6,Phantom latitude,110,-73.9,42.0,2019-05-21,Private room
7,Unpriced walkup,,-73.9,40.7,2019-05-21,Entire home/apt
";

fn seed_raw_artifact(registry: &ArtifactRegistry, dir: &Path, contents: &str) {
    let raw = dir.join("sample.csv");
    fs::write(&raw, contents).unwrap();
    upload_file(
        registry,
        &UploadRequest {
            file: raw,
            name: "raw_listings".to_string(),
            artifact_type: "raw_data".to_string(),
            description: "unmodified listings export".to_string(),
        },
    )
    .unwrap();
}

fn cleaning_request(output_dir: &Path) -> CleaningRequest {
    CleaningRequest {
        input_artifact: "raw_listings:latest".to_string(),
        output_artifact: "clean_listings".to_string(),
        output_type: "clean_data".to_string(),
        output_description: "price and geography filtered listings".to_string(),
        min_price: 10.0,
        max_price: 200.0,
        output_dir: output_dir.to_path_buf(),
    }
}

#[test]
fn clean_step_end_to_end() {
    let dir = tempdir().unwrap();
    let registry = ArtifactRegistry::open(dir.path().join("registry")).unwrap();
    let workdir = dir.path().join("work");
    fs::create_dir_all(&workdir).unwrap();

    seed_raw_artifact(&registry, dir.path(), RAW_CSV);

    let receipt = run_basic_cleaning(&registry, &cleaning_request(&workdir)).unwrap();

    assert_eq!(receipt.summary.rows_in, 7);
    assert_eq!(receipt.summary.rows_priced, 5);
    assert_eq!(receipt.summary.rows_out, 3);
    assert_eq!(receipt.summary.null_review_dates, 1);

    // Provenance: the manifest names the exact input version and the run.
    assert_eq!(receipt.manifest.reference(), "clean_listings:v1");
    assert_eq!(receipt.manifest.inputs, vec!["raw_listings:v1".to_string()]);
    assert_eq!(receipt.manifest.run_id, Some(receipt.run_id));

    let text = fs::read_to_string(&receipt.output_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,name,price,longitude,latitude,last_review,room_type"
    );
    assert!(text.contains("East Village walkup"));
    assert!(text.contains("2019-05-21"));
    assert!(text.contains("2019-06-02"));
    // The kept row with no review date serializes an empty field.
    assert!(text.contains("Harbor view,120,-73.95,40.65,,Private room"));
    assert!(!text.contains("Budget bunk"));
    assert!(!text.contains("Mislabeled Newark loft"));
    assert!(!text.contains("Phantom latitude"));
    assert!(!text.contains("Unpriced walkup"));

    // The registered payload is the file that was written locally.
    let resolved = registry.resolve("clean_listings:latest").unwrap();
    assert_eq!(
        fs::read(&resolved.path).unwrap(),
        fs::read(&receipt.output_path).unwrap()
    );

    // The run record carries the invocation parameters and the summary.
    let run_path = dir
        .path()
        .join("registry/runs")
        .join(format!("{}.json", receipt.run_id));
    let run: RunRecord = serde_json::from_slice(&fs::read(&run_path).unwrap()).unwrap();
    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.job_type, "basic_cleaning");
    assert_eq!(run.parameters["min_price"], 10.0);
    assert_eq!(run.parameters["output_artifact"], "clean_listings");
    assert_eq!(run.used_artifacts, vec!["raw_listings:v1".to_string()]);
    assert_eq!(run.logged_artifacts, vec!["clean_listings:v1".to_string()]);
    assert_eq!(run.summary.as_ref().unwrap()["rows_out"], 3);
}

#[test]
fn recleaning_the_cleaned_output_is_stable() {
    let dir = tempdir().unwrap();
    let registry = ArtifactRegistry::open(dir.path().join("registry")).unwrap();
    let workdir = dir.path().join("work");
    fs::create_dir_all(&workdir).unwrap();

    seed_raw_artifact(&registry, dir.path(), RAW_CSV);
    let first = run_basic_cleaning(&registry, &cleaning_request(&workdir)).unwrap();

    let mut request = cleaning_request(&workdir);
    request.input_artifact = "clean_listings:latest".to_string();
    request.output_artifact = "reclean_listings".to_string();
    let second = run_basic_cleaning(&registry, &request).unwrap();

    assert_eq!(second.summary.rows_in, first.summary.rows_out);
    assert_eq!(second.summary.rows_out, first.summary.rows_out);
    assert_eq!(
        fs::read_to_string(&second.output_path).unwrap(),
        fs::read_to_string(&first.output_path).unwrap()
    );
}

#[test]
fn missing_column_fails_without_registering_an_artifact() {
    let dir = tempdir().unwrap();
    let registry = ArtifactRegistry::open(dir.path().join("registry")).unwrap();
    let workdir = dir.path().join("work");
    fs::create_dir_all(&workdir).unwrap();

    let headless = "\
id,name,longitude,latitude,last_review
1,East Village walkup,-73.9,40.7,2019-05-21
";
    seed_raw_artifact(&registry, dir.path(), headless);

    let err = run_basic_cleaning(&registry, &cleaning_request(&workdir)).unwrap_err();
    match err {
        PipelineError::MissingColumn(column) => assert_eq!(column, "price"),
        other => panic!("expected MissingColumn, got {other:?}"),
    }

    // Fatal before serialization: no local output, nothing registered.
    assert!(!workdir.join("clean_listings.csv").exists());
    let err = registry.versions("clean_listings").unwrap_err();
    assert!(matches!(err, PipelineError::ArtifactNotFound(_)));

    // The failed run is still on record.
    let failed_runs: Vec<RunRecord> = fs::read_dir(dir.path().join("registry/runs"))
        .unwrap()
        .map(|entry| {
            serde_json::from_slice(&fs::read(entry.unwrap().path()).unwrap()).unwrap()
        })
        .filter(|run: &RunRecord| run.status == RunStatus::Failed)
        .collect();
    assert_eq!(failed_runs.len(), 1);
    assert_eq!(failed_runs[0].job_type, "basic_cleaning");
    assert!(failed_runs[0].error.as_ref().unwrap().contains("price"));
}

#[test]
fn unknown_input_artifact_is_fatal() {
    let dir = tempdir().unwrap();
    let registry = ArtifactRegistry::open(dir.path().join("registry")).unwrap();

    let mut request = cleaning_request(dir.path());
    request.input_artifact = "never_uploaded:latest".to_string();

    let err = run_basic_cleaning(&registry, &request).unwrap_err();
    assert!(matches!(err, PipelineError::ArtifactNotFound(_)));
}
