//! catalog-sync CLI
//!
//! Compares a model catalog document with a database catalog document.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use catalog_sync::utils::logging::init_logging;
use catalog_sync::{ApplyDirection, CatalogSyncClient, Config, NodeId, SyncSession};

/// Diff and synchronize MySQL schema models with database catalogs.
#[derive(Parser)]
#[command(name = "catalog-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, env = "CATALOG_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Model catalog document (YAML or JSON).
    #[arg(short, long)]
    model: PathBuf,

    /// Database catalog document (YAML or JSON).
    #[arg(short, long)]
    database: PathBuf,

    /// Model schemas without a database counterpart to leave out.
    #[arg(long = "skip-schema")]
    skip_schemata: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the diff tree and the raw change tree.
    Diff,

    /// Print the script bringing the database in line with the model.
    Script {
        /// Diff tree nodes (e.g. `0.2`) to leave out of the script.
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Write the script to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a report of what the script would change.
    Report {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Apply the database side onto the model and write the model document.
    Apply {
        /// Where to write the updated model (defaults to the model document).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let path = path.to_str().context("Configuration path is not valid UTF-8")?;
            Ok(catalog_sync::config::load_from_file(path)?)
        }
        None => Ok(Config::default()),
    }
}

fn open_session(client: &CatalogSyncClient, cli: &Cli) -> anyhow::Result<SyncSession> {
    let mut session = client
        .open(&cli.model, &cli.database)
        .context("Failed to load catalog documents")?;
    session.init_diff_tree(&cli.skip_schemata)?;
    Ok(session)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging)?;
    let client = CatalogSyncClient::new(config);
    let mut session = open_session(&client, &cli)?;

    match &cli.command {
        Commands::Diff => {
            if let Some(tree) = session.diff_tree() {
                print!("{}", tree.dump(0));
                match tree.changes() {
                    Some(changes) => print!("{}", changes.dump_log(changes.root(), 0)),
                    None => println!("No differences found."),
                }
            }
        }

        Commands::Script { exclude, output } => {
            for node in exclude {
                session.set_apply_direction(&NodeId::parse(node)?, ApplyDirection::DontApply, true)?;
            }
            let (_session, script) = session.generate_script_in_background().await?;
            match output {
                Some(path) => {
                    std::fs::write(path, &script)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), bytes = script.len(), "Wrote synchronization script");
                }
                None => print!("{}", script),
            }
        }

        Commands::Report { json } => {
            let report = session.generate_diff_tree_report()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }

        Commands::Apply { output } => {
            session.set_apply_direction(&NodeId::root(), ApplyDirection::ApplyToModel, true)?;
            let summary = session.apply_changes_to_model()?;
            info!(
                restored = summary.restored,
                removed = summary.removed,
                modified = summary.modified,
                "Applied database changes to the model"
            );
            let path = output.as_ref().unwrap_or(&cli.model);
            session.set_model_document(path);
            if !session.save_sync_profile()? {
                session
                    .save_model_document()
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_path_from_environment() {
        std::env::set_var("CATALOG_SYNC_CONFIG", "from_env.toml");
        let cli = Cli::try_parse_from(["catalog-sync", "-m", "model.yaml", "-d", "db.yaml", "diff"]);
        std::env::remove_var("CATALOG_SYNC_CONFIG");

        let cli = cli.unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("from_env.toml")));
        assert!(matches!(cli.command, Commands::Diff));
    }
}
