//! Library CLI subcommands.
//!
//! The libraries are normally maintained elsewhere; these commands seed and
//! inspect the local copy that validation and name resolution consult.

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use blocktask_core::repository::LibraryRepository;
use blocktask_types::library::{LibraryItem, LibraryKind};

use crate::state::AppState;

/// Library subcommands.
#[derive(Subcommand)]
pub enum LibraryCommand {
    /// List the items of one kind.
    #[command(alias = "ls")]
    List {
        /// object, location or action.
        kind: LibraryKind,
    },

    /// Add or replace an item.
    Add {
        kind: LibraryKind,
        id: i64,
        name: String,

        /// Alternative names matched during resolution.
        #[arg(long = "keyword", short = 'k')]
        keywords: Vec<String>,
    },

    /// Remove an item.
    #[command(alias = "rm")]
    Remove { kind: LibraryKind, id: i64 },

    /// Look a name up the way chat drafts are resolved.
    Resolve { kind: LibraryKind, name: String },
}

/// Handle a library subcommand.
pub async fn handle_library_command(cmd: LibraryCommand, state: &AppState, json: bool, quiet: bool) -> Result<()> {
    match cmd {
        LibraryCommand::List { kind } => list_items(state, kind, json).await,
        LibraryCommand::Add { kind, id, name, keywords } => {
            let item = LibraryItem {
                id,
                name,
                keywords: (!keywords.is_empty()).then_some(keywords),
            };
            state.library.put(kind, &item).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&item)?);
            } else if !quiet {
                println!(
                    "  {} Stored {} {} '{}'",
                    style("✓").green().bold(),
                    kind,
                    style(item.id).dim(),
                    style(&item.name).cyan()
                );
            }
            Ok(())
        }
        LibraryCommand::Remove { kind, id } => {
            if !state.library.delete(kind, id).await? {
                anyhow::bail!("{} {id} not found", kind.label());
            }
            if json {
                println!("{}", serde_json::json!({ "deleted": { "kind": kind, "id": id } }));
            } else if !quiet {
                println!("  {} Removed {kind} {id}", style("✓").green().bold());
            }
            Ok(())
        }
        LibraryCommand::Resolve { kind, name } => {
            let catalog = state.catalog().await?;
            let resolution = catalog.resolve_name(kind, &name);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "id": resolution.id,
                        "name": resolution.name,
                        "keywords": resolution.keywords,
                    }))?
                );
                return Ok(());
            }
            match resolution.id {
                Some(id) => println!(
                    "  {} '{}' resolves to {} {} '{}'",
                    style("✓").green().bold(),
                    name,
                    kind,
                    style(id).dim(),
                    style(&resolution.name).cyan()
                ),
                None => println!(
                    "  {} {} not defined: '{}'",
                    style("!").yellow().bold(),
                    kind.label(),
                    resolution.name
                ),
            }
            Ok(())
        }
    }
}

async fn list_items(state: &AppState, kind: LibraryKind, json: bool) -> Result<()> {
    let items = state.library.list(kind).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!();
        println!(
            "  {} No {kind} items. Add one with: {}",
            style("i").blue().bold(),
            style(format!("btask library add {kind} <id> <name>")).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Keywords").fg(Color::White),
    ]);
    for item in &items {
        table.add_row(vec![
            Cell::new(item.id).fg(Color::DarkGrey),
            Cell::new(&item.name).fg(Color::Cyan),
            Cell::new(item.keywords_joined()),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
