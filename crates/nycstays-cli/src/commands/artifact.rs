use anyhow::Result;
use comfy_table::Table;
use nycstays_core::registry::ArtifactRegistry;

#[derive(clap::Subcommand, Debug)]
pub enum ArtifactCommands {
    /// List artifacts and their latest versions.
    List,
    /// Print the manifest for an artifact reference.
    Show { reference: String },
    /// List every version of one artifact.
    Versions { name: String },
}

/// The main handler for all `nycstays artifact` commands.
pub fn handle_artifact_command(
    registry: &ArtifactRegistry,
    command: ArtifactCommands,
) -> Result<()> {
    match command {
        ArtifactCommands::List => {
            let mut table = Table::new();
            table.set_header(vec!["name", "latest", "type", "size (bytes)", "created"]);
            for name in registry.names()? {
                let manifests = registry.versions(&name)?;
                if let Some(latest) = manifests.last() {
                    table.add_row(vec![
                        latest.name.clone(),
                        format!("v{}", latest.version),
                        latest.artifact_type.clone(),
                        latest.size_bytes.to_string(),
                        latest.created_at.to_rfc3339(),
                    ]);
                }
            }
            println!("{table}");
        }
        ArtifactCommands::Show { reference } => {
            let resolved = registry.resolve(&reference)?;
            println!("{}", serde_json::to_string_pretty(&resolved.manifest)?);
            println!("payload: {}", resolved.path.display());
        }
        ArtifactCommands::Versions { name } => {
            let mut table = Table::new();
            table.set_header(vec!["version", "digest", "run", "description"]);
            for manifest in registry.versions(&name)? {
                table.add_row(vec![
                    format!("v{}", manifest.version),
                    manifest.digest.chars().take(12).collect::<String>(),
                    manifest
                        .run_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    manifest.description.clone(),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
