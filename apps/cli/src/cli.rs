// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line arguments.

use bimtodo_core::{Priority, SortKey};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bimtodo", version, about = "BIM-Todo annotation backend client")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(long, global = true, help = "Backend base URL (overrides BIMTODO_API_URL)")]
    pub api_url: Option<String>,
    #[arg(long, global = true, help = "Request timeout in seconds")]
    pub timeout: Option<u64>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List stored models
    Models {
        #[arg(long, help = "Case-insensitive name filter")]
        filter: Option<String>,
    },
    /// List assignable managers
    Managers,
    /// List the annotations of a model
    List {
        model: i64,
        #[arg(long, default_value = "deadline", help = "title, deadline or priority")]
        sort: SortKey,
        #[arg(long, value_delimiter = ',', help = "Comma-separated priorities, e.g. HIGH,MEDIUM")]
        priority: Vec<Priority>,
        #[arg(long, help = "Only annotations assigned to this manager id")]
        manager: Option<i64>,
    },
    /// Delete an annotation
    Delete { id: i64 },
    /// Delete a stored model and its annotations
    DeleteModel { id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_arguments_parse() {
        let cli = Cli::try_parse_from([
            "bimtodo", "--json", "list", "7", "--sort", "priority", "--priority", "high,low",
            "--manager", "3",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::List {
                model,
                sort,
                priority,
                manager,
            } => {
                assert_eq!(model, 7);
                assert_eq!(sort, SortKey::Priority);
                assert_eq!(priority, vec![Priority::High, Priority::Low]);
                assert_eq!(manager, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_sort_key_is_rejected() {
        assert!(Cli::try_parse_from(["bimtodo", "list", "1", "--sort", "size"]).is_err());
    }

    #[test]
    fn delete_model_subcommand_name() {
        let cli = Cli::try_parse_from(["bimtodo", "delete-model", "4"]).unwrap();
        assert!(matches!(cli.command, Commands::DeleteModel { id: 4 }));
    }
}
