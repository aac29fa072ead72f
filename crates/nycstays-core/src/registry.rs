//! Filesystem-backed artifact registry: content-addressed payloads under
//! `objects/`, per-version JSON manifests under `artifacts/<name>/`, and run
//! records under `runs/`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::runs::RunRecord;

const OBJECTS_DIR: &str = "objects";
const ARTIFACTS_DIR: &str = "artifacts";
const RUNS_DIR: &str = "runs";

/// A parsed artifact reference: `name`, `name:latest`, or `name:v<N>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub selector: VersionSelector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Version(u32),
}

impl FromStr for ArtifactRef {
    type Err = PipelineError;

    fn from_str(reference: &str) -> Result<Self> {
        let (name, selector) = match reference.split_once(':') {
            None => (reference, VersionSelector::Latest),
            Some((name, "latest")) => (name, VersionSelector::Latest),
            Some((name, tag)) => {
                let version = tag
                    .strip_prefix('v')
                    .and_then(|digits| digits.parse::<u32>().ok())
                    .ok_or_else(|| PipelineError::InvalidReference {
                        reference: reference.to_string(),
                        reason: format!("unrecognized version tag '{tag}'"),
                    })?;
                (name, VersionSelector::Version(version))
            }
        };

        validate_name(name).map_err(|reason| PipelineError::InvalidReference {
            reference: reference.to_string(),
            reason,
        })?;

        Ok(ArtifactRef {
            name: name.to_string(),
            selector,
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selector {
            VersionSelector::Latest => write!(f, "{}:latest", self.name),
            VersionSelector::Version(version) => write!(f, "{}:v{}", self.name, version),
        }
    }
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err("name may only contain alphanumerics, '_', '-' and '.'".to_string());
    }
    if name.starts_with('.') {
        return Err("name may not start with '.'".to_string());
    }
    Ok(())
}

/// Metadata record of one published artifact version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactManifest {
    pub name: String,
    pub version: u32,
    pub artifact_type: String,
    pub description: String,
    pub digest: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub run_id: Option<Uuid>,
    pub inputs: Vec<String>,
}

impl ArtifactManifest {
    pub fn reference(&self) -> String {
        format!("{}:v{}", self.name, self.version)
    }
}

/// Caller-supplied fields for a new artifact version.
#[derive(Debug, Clone)]
pub struct ArtifactDraft {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
    pub run_id: Option<Uuid>,
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub manifest: ArtifactManifest,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    root: PathBuf,
}

impl ArtifactRegistry {
    /// Open a registry at `root`, creating the directory layout if absent.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [OBJECTS_DIR, ARTIFACTS_DIR, RUNS_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(ArtifactRegistry { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a reference to its manifest and local payload path.
    pub fn resolve(&self, reference: &str) -> Result<ResolvedArtifact> {
        let parsed: ArtifactRef = reference.parse()?;
        let version = match parsed.selector {
            VersionSelector::Version(version) => version,
            VersionSelector::Latest => self
                .latest_version(&parsed.name)?
                .ok_or_else(|| PipelineError::ArtifactNotFound(reference.to_string()))?,
        };

        let manifest_path = self.manifest_path(&parsed.name, version);
        if !manifest_path.exists() {
            return Err(PipelineError::ArtifactNotFound(reference.to_string()));
        }

        let manifest: ArtifactManifest =
            serde_json::from_slice(&fs::read(&manifest_path)?)?;

        let path = self.object_path(&manifest.digest);
        if !path.exists() {
            return Err(PipelineError::Registry(format!(
                "payload object {} is missing for {}",
                manifest.digest,
                manifest.reference()
            )));
        }

        Ok(ResolvedArtifact { manifest, path })
    }

    /// Register `file` as the next version of `draft.name`. The payload is
    /// stored content-addressed; identical payloads share one object.
    pub fn publish(&self, draft: &ArtifactDraft, file: &Path) -> Result<ArtifactManifest> {
        validate_name(&draft.name).map_err(|reason| PipelineError::InvalidReference {
            reference: draft.name.clone(),
            reason,
        })?;

        let contents = fs::read(file)?;
        let digest = compute_digest(&contents);

        let object_path = self.object_path(&digest);
        if !object_path.exists() {
            fs::write(&object_path, &contents)?;
        }

        let version = self.latest_version(&draft.name)?.unwrap_or(0) + 1;
        let manifest = ArtifactManifest {
            name: draft.name.clone(),
            version,
            artifact_type: draft.artifact_type.clone(),
            description: draft.description.clone(),
            digest,
            size_bytes: contents.len() as u64,
            created_at: Utc::now(),
            run_id: draft.run_id,
            inputs: draft.inputs.clone(),
        };

        fs::create_dir_all(self.artifact_dir(&draft.name))?;
        let manifest_path = self.manifest_path(&draft.name, version);
        fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;

        info!(
            artifact = %manifest.reference(),
            artifact_type = %manifest.artifact_type,
            size_bytes = manifest.size_bytes,
            "registered artifact version"
        );

        Ok(manifest)
    }

    /// All manifests for one artifact name, oldest version first.
    pub fn versions(&self, name: &str) -> Result<Vec<ArtifactManifest>> {
        let mut versions = self.version_numbers(name)?;
        if versions.is_empty() {
            return Err(PipelineError::ArtifactNotFound(name.to_string()));
        }
        versions.sort_unstable();

        let mut manifests = Vec::with_capacity(versions.len());
        for version in versions {
            let manifest_path = self.manifest_path(name, version);
            manifests.push(serde_json::from_slice(&fs::read(&manifest_path)?)?);
        }
        Ok(manifests)
    }

    /// All artifact names in the registry, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.root.join(ARTIFACTS_DIR))? {
            let entry = entry?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Persist a run record under `runs/<run_id>.json`.
    pub fn record_run(&self, record: &RunRecord) -> Result<PathBuf> {
        let path = self
            .root
            .join(RUNS_DIR)
            .join(format!("{}.json", record.run_id));
        fs::write(&path, serde_json::to_vec_pretty(record)?)?;
        Ok(path)
    }

    fn latest_version(&self, name: &str) -> Result<Option<u32>> {
        Ok(self.version_numbers(name)?.into_iter().max())
    }

    fn version_numbers(&self, name: &str) -> Result<Vec<u32>> {
        let dir = self.artifact_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(version) = file_name
                .to_str()
                .and_then(|n| n.strip_prefix('v'))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|digits| digits.parse::<u32>().ok())
            else {
                continue;
            };
            versions.push(version);
        }
        Ok(versions)
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join(ARTIFACTS_DIR).join(name)
    }

    fn manifest_path(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{version}.json"))
    }

    fn object_path(&self, digest: &str) -> PathBuf {
        self.root.join(OBJECTS_DIR).join(digest)
    }
}

fn compute_digest(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}
