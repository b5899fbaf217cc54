// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BIM-Todo CLI - inspect and clean up the annotation backend.
//!
//! # Commands
//!
//! - `bimtodo models [--filter <text>]` - stored models
//! - `bimtodo managers` - assignable managers
//! - `bimtodo list <model> [--sort ..] [--priority ..] [--manager ..]` - annotations
//! - `bimtodo delete <id>` - delete an annotation
//! - `bimtodo delete-model <id>` - delete a stored model

use anyhow::Context;
use clap::Parser;

use bimtodo_core::{
    filter_models, AnnotationId, AnnotationQueryBuilder, ManagerId, PersistedModelId,
};
use bimtodo_engine::{AnnotationStore, EngineConfig, HttpStore, ModelStore};

mod cli;

use cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,bimtodo=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let mut config = EngineConfig::from_env();
    if let Some(url) = &args.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }

    tracing::debug!(
        api_url = %config.api_url,
        timeout_secs = config.request_timeout_secs,
        "Using backend"
    );
    let store = HttpStore::new(&config).context("failed to create HTTP client")?;

    match args.command {
        Commands::Models { filter } => {
            let all = store.list_names().await.context("failed to list models")?;
            let models = filter_models(&all, filter.as_deref().unwrap_or(""));
            if args.json {
                println!("{}", serde_json::to_string_pretty(&models)?);
            } else {
                for model in models {
                    println!("{:>6}  {}", model.id.0, model.name);
                }
            }
        }
        Commands::Managers => {
            let managers = store.managers().await.context("failed to list managers")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&managers)?);
            } else {
                for manager in &managers {
                    println!("{:>6}  {}", manager.id.0, manager.label());
                }
            }
        }
        Commands::List {
            model,
            sort,
            priority,
            manager,
        } => {
            let query = AnnotationQueryBuilder::build_query(
                PersistedModelId(model),
                sort,
                priority,
                manager.map(ManagerId),
            );
            let records = store
                .list(&query)
                .await
                .with_context(|| format!("failed to list annotations of model {model}"))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    let manager = record
                        .manager_label()
                        .unwrap_or_else(|| format!("manager {}", record.manager_id));
                    println!(
                        "{:>6}  {:<6}  {}  {}  ({manager}, {} element(s))",
                        record.id.0,
                        record.priority.as_str(),
                        record.deadline,
                        record.title,
                        record.flattened_elements().len(),
                    );
                }
                tracing::info!(model, count = records.len(), "Listed annotations");
            }
        }
        Commands::Delete { id } => {
            AnnotationStore::delete(&store, AnnotationId(id))
                .await
                .with_context(|| format!("failed to delete annotation {id}"))?;
            tracing::info!(annotation = id, "Deleted annotation");
        }
        Commands::DeleteModel { id } => {
            ModelStore::delete(&store, PersistedModelId(id))
                .await
                .with_context(|| format!("failed to delete model {id}"))?;
            tracing::info!(model = id, "Deleted model");
        }
    }

    Ok(())
}
