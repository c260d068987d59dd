//! Task program CLI subcommands.
//!
//! Offline conversion between the program document and the editor's wire
//! tree, validation, merging of chat drafts, and the stored task commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use uuid::Uuid;

use blocktask_core::codec::document::{from_value, parse_document, parse_value, to_graphic_value, to_nullable_value};
use blocktask_core::codec::wire::{graph_to_wire, wire_to_graph};
use blocktask_core::codec::{deserialize, serialize};
use blocktask_core::grammar::BlockTypeRegistry;
use blocktask_core::graph::topology::to_dot;
use blocktask_core::graph::{validate, BlockGraph};
use blocktask_core::library::{refresh_program, resolve_program, LibraryCatalog};
use blocktask_core::merge::merge;
use blocktask_core::repository::{TaskFilter, TaskStore};
use blocktask_types::block::{WirePayload, WireWorkspace};
use blocktask_types::config::LayoutDefaults;
use blocktask_types::program::{Program, TaskDocument};
use blocktask_types::task::TaskRecord;
use blocktask_types::warning::Warning;

use crate::state::AppState;

/// Task subcommands.
#[derive(Subcommand)]
pub enum TaskCommand {
    /// Convert a program or editor workspace file (JSON or YAML).
    Convert {
        file: PathBuf,

        /// Output representation.
        #[arg(long, value_enum)]
        to: ConvertTarget,
    },

    /// Report soft warnings for a program or workspace file.
    Validate { file: PathBuf },

    /// Fold an incoming chat draft into a previous one.
    Merge { previous: PathBuf, incoming: PathBuf },

    /// List stored tasks.
    #[command(alias = "ls")]
    List {
        /// Only tasks shared with other operators.
        #[arg(long)]
        shared: bool,

        #[arg(long)]
        limit: Option<i64>,
    },

    /// Print a stored task's program.
    Show {
        id: Uuid,

        /// Print every leaf, unset ones as null.
        #[arg(long)]
        nullable: bool,

        /// Refresh library references to their current names first.
        #[arg(long)]
        refresh: bool,
    },

    /// Store a program or workspace file as a task.
    Save {
        file: PathBuf,

        /// Task name (defaults to the file stem).
        #[arg(long)]
        name: Option<String>,

        /// Overwrite this task instead of creating a new one.
        #[arg(long)]
        id: Option<Uuid>,

        #[arg(long)]
        description: Option<String>,

        /// Share with other operators.
        #[arg(long)]
        shared: bool,

        /// Fill missing library ids by name before storing.
        #[arg(long)]
        resolve: bool,
    },

    /// Delete a stored task.
    #[command(alias = "rm")]
    Delete { id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConvertTarget {
    /// Editor wire tree.
    Graph,
    /// Program document with unset leaves omitted.
    Program,
    /// Program document with every leaf present.
    Nullable,
    /// Graphviz DOT rendering of the block graph.
    Dot,
}

/// What an input file turned out to hold.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskInput {
    Program(Program),
    Wire(WireWorkspace),
}

/// Whether a command needs the task database.
pub fn needs_state(cmd: &TaskCommand) -> bool {
    !matches!(cmd, TaskCommand::Convert { .. } | TaskCommand::Merge { .. })
}

/// Handle a task subcommand.
pub async fn handle_task_command(
    cmd: TaskCommand,
    state: Option<&AppState>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let registry = Arc::new(BlockTypeRegistry::standard());
    let layout = state.map(|s| s.config.layout).unwrap_or_default();
    let require = || state.context("task database is not available");

    match cmd {
        TaskCommand::Convert { file, to } => {
            let input = read_input(&file).await?;
            let (value, warnings) = convert(&input, to, registry, &layout)?;
            print_warnings(&warnings, quiet);
            match value {
                serde_json::Value::String(dot) => println!("{dot}"),
                other => println!("{}", serde_json::to_string_pretty(&other)?),
            }
            Ok(())
        }
        TaskCommand::Validate { file } => {
            let state = require()?;
            let input = read_input(&file).await?;
            let catalog = state.catalog().await?;
            let graph = into_graph(&input, registry, &layout);
            let warnings = validate(&graph, Some(&catalog));
            show_warnings(&warnings, json)
        }
        TaskCommand::Merge { previous, incoming } => {
            let previous = read_document(&previous).await?;
            let incoming = read_document(&incoming).await?;
            let merged = merge(&previous, &incoming);
            tracing::info!("merged chat drafts");
            println!("{}", serde_json::to_string_pretty(&to_nullable_value(&merged.into())?)?);
            Ok(())
        }
        TaskCommand::List { shared, limit } => list_tasks(require()?, shared, limit, json).await,
        TaskCommand::Show { id, nullable, refresh } => {
            show_task(require()?, id, nullable, refresh).await
        }
        TaskCommand::Save { file, name, id, description, shared, resolve } => {
            let state = require()?;
            let input = read_input(&file).await?;
            let options = SaveOptions { name, id, description, shared, resolve };
            save_task(state, &file, &input, options, registry, json, quiet).await
        }
        TaskCommand::Delete { id } => {
            let state = require()?;
            if !state.tasks.delete(&id).await? {
                anyhow::bail!("task {id} not found");
            }
            if json {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else if !quiet {
                println!("  {} Deleted task {}", style("✓").green().bold(), style(id).cyan());
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Input handling
// ---------------------------------------------------------------------------

/// Read a program document or editor workspace from JSON or YAML text.
///
/// A top-level `blocks` or `kind` key marks a workspace (or a single root
/// node); anything else is read as a program document.
pub fn parse_input(text: &str) -> Result<TaskInput> {
    let value = parse_value(text)?;
    let is_wire = value
        .as_object()
        .is_some_and(|o| o.contains_key("blocks") || o.contains_key("kind"));
    if is_wire {
        let payload: WirePayload = serde_json::from_value(value).context("invalid block workspace")?;
        Ok(TaskInput::Wire(payload.into()))
    } else {
        Ok(TaskInput::Program(from_value(value)?.program))
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))
}

async fn read_input(path: &Path) -> Result<TaskInput> {
    parse_input(&read_text(path).await?).with_context(|| format!("cannot parse {}", path.display()))
}

async fn read_document(path: &Path) -> Result<Program> {
    let text = read_text(path).await?;
    let document = parse_document(&text).with_context(|| format!("cannot parse {}", path.display()))?;
    Ok(document.program)
}

fn into_graph(input: &TaskInput, registry: Arc<BlockTypeRegistry>, layout: &LayoutDefaults) -> BlockGraph {
    match input {
        TaskInput::Program(program) => deserialize(program, registry, layout),
        TaskInput::Wire(workspace) => wire_to_graph(workspace, registry, layout),
    }
}

/// Convert `input` into `target`, returning the document and the warnings
/// found along the way.
pub fn convert(
    input: &TaskInput,
    target: ConvertTarget,
    registry: Arc<BlockTypeRegistry>,
    layout: &LayoutDefaults,
) -> Result<(serde_json::Value, Vec<Warning>)> {
    let graph = into_graph(input, registry, layout);
    let warnings = validate(&graph, None);
    let program = || match input {
        TaskInput::Program(program) => program.clone(),
        TaskInput::Wire(_) => serialize(&graph),
    };

    let value = match target {
        ConvertTarget::Graph => serde_json::to_value(graph_to_wire(&graph))?,
        ConvertTarget::Program => to_graphic_value(&program().into())?,
        ConvertTarget::Nullable => to_nullable_value(&program().into())?,
        ConvertTarget::Dot => serde_json::Value::String(to_dot(&graph)),
    };
    Ok((value, warnings))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_warnings(warnings: &[Warning], quiet: bool) {
    if quiet {
        return;
    }
    for warning in warnings {
        eprintln!("  {} {}", style("!").yellow().bold(), warning);
    }
}

fn show_warnings(warnings: &[Warning], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(warnings)?);
        return Ok(());
    }

    if warnings.is_empty() {
        println!();
        println!("  {} No warnings", style("✓").green().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Block").fg(Color::White),
        Cell::new("Warning").fg(Color::White),
    ]);
    for warning in warnings {
        let block = warning.block.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string());
        table.add_row(vec![Cell::new(block).fg(Color::DarkGrey), Cell::new(warning.message()).fg(Color::Yellow)]);
    }

    println!();
    println!("{table}");
    println!();
    println!("  {} warning(s); warnings never block saving", style(warnings.len()).yellow().bold());
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Stored tasks
// ---------------------------------------------------------------------------

async fn list_tasks(state: &AppState, shared: bool, limit: Option<i64>, json: bool) -> Result<()> {
    let tasks = state
        .tasks
        .list(Some(TaskFilter {
            shared_only: shared,
            limit,
            ..Default::default()
        }))
        .await?;

    if json {
        let rows: Vec<_> = tasks
            .iter()
            .map(|t| {
                serde_json::json!({
                    "id": t.id,
                    "name": t.name,
                    "description": t.description,
                    "shared": t.shared,
                    "updated_at": t.updated_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!();
        println!(
            "  {} No tasks found. Store one with: {}",
            style("i").blue().bold(),
            style("btask task save <file>").yellow()
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
        Cell::new("Shared").fg(Color::White),
        Cell::new("Description").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);
    for task in &tasks {
        let shared = if task.shared {
            Cell::new("● yes").fg(Color::Green)
        } else {
            Cell::new("○ no").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(task.id).fg(Color::DarkGrey),
            Cell::new(&task.name).fg(Color::Cyan),
            shared,
            Cell::new(task.description.as_deref().unwrap_or("")),
            Cell::new(task.updated_at.format("%Y-%m-%d %H:%M")),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

async fn show_task(state: &AppState, id: Uuid, nullable: bool, refresh: bool) -> Result<()> {
    let record = state
        .tasks
        .get(&id)
        .await?
        .with_context(|| format!("task {id} not found"))?;

    let program = if refresh {
        let catalog: LibraryCatalog = state.catalog().await?;
        refresh_program(&record.program, &catalog)
    } else {
        record.program
    };

    let document: TaskDocument = program.into();
    let value = if nullable {
        to_nullable_value(&document)?
    } else {
        to_graphic_value(&document)?
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

struct SaveOptions {
    name: Option<String>,
    id: Option<Uuid>,
    description: Option<String>,
    shared: bool,
    resolve: bool,
}

async fn save_task(
    state: &AppState,
    file: &Path,
    input: &TaskInput,
    options: SaveOptions,
    registry: Arc<BlockTypeRegistry>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let graph = into_graph(input, registry, &state.config.layout);
    let catalog = state.catalog().await?;
    let warnings = validate(&graph, Some(&catalog));

    let mut program = match input {
        TaskInput::Program(program) => program.clone(),
        TaskInput::Wire(_) => serialize(&graph),
    };
    if options.resolve {
        program = resolve_program(&program, &catalog);
    }

    let existing = match options.id {
        Some(id) => state.tasks.get(&id).await?,
        None => None,
    };
    let default_name = || {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    };
    let mut record = match existing {
        Some(record) => record,
        None => {
            let mut record = TaskRecord::new(default_name());
            if let Some(id) = options.id {
                record.id = id;
            }
            record
        }
    };
    if let Some(name) = options.name {
        record.name = name;
    }
    if options.description.is_some() {
        record.description = options.description;
    }
    record.shared = record.shared || options.shared;
    record.program = program;
    record.updated_at = Utc::now();

    state.tasks.put(&record).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "id": record.id,
                "name": record.name,
                "warnings": warnings,
            }))?
        );
        return Ok(());
    }

    print_warnings(&warnings, quiet);
    if !quiet {
        println!(
            "  {} Saved '{}' as {}",
            style("✓").green().bold(),
            style(&record.name).cyan(),
            style(record.id).dim()
        );
    }
    Ok(())
}
