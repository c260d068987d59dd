//! Grammar and schema output.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};

use blocktask_core::chat::{program_schema, turn_schema};
use blocktask_core::grammar::BlockTypeRegistry;

use crate::cli::SchemaKind;
use crate::http::handlers::grammar::{describe, BlockTypeView};

fn inputs_label(view: &BlockTypeView) -> String {
    view.inputs
        .iter()
        .map(|socket| {
            let accepts: Vec<&str> = socket.accepts.iter().map(|k| k.as_str()).collect();
            let required = if socket.required { "*" } else { "" };
            format!("{}{required} <- {}", socket.name, accepts.join(" | "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn fields_label(view: &BlockTypeView) -> String {
    view.fields
        .iter()
        .map(|field| match &field.default {
            Some(default) => format!("{}: {} = {default}", field.name, field.ty),
            None => format!("{}: {}", field.name, field.ty),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print the block type registry.
pub fn show_grammar(registry: &BlockTypeRegistry, json: bool) -> Result<()> {
    let views = describe(registry);

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Block").fg(Color::White),
        Cell::new("Category").fg(Color::White),
        Cell::new("Root").fg(Color::White),
        Cell::new("Inputs").fg(Color::White),
        Cell::new("Fields").fg(Color::White),
    ]);
    for view in &views {
        let category = serde_json::to_value(view.category)?
            .as_str()
            .unwrap_or_default()
            .to_string();
        table.add_row(vec![
            Cell::new(view.kind).fg(Color::Cyan),
            Cell::new(category),
            Cell::new(if view.root { "yes" } else { "" }).fg(Color::Green),
            Cell::new(inputs_label(view)),
            Cell::new(fields_label(view)),
        ]);
    }

    println!();
    println!("{table}");
    println!("  * required input");
    println!();
    Ok(())
}

/// Print a JSON Schema.
pub fn show_schema(which: SchemaKind) -> Result<()> {
    let schema = match which {
        SchemaKind::Turn => turn_schema()?,
        SchemaKind::Program => program_schema()?,
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
