use crate::config::StoreConfig;
use crate::dump::dump_tables;
use crate::error::{Result, StoreError};
use crate::filter::{Condition, parse_literal, parse_row};
use crate::models::{ColumnSpec, Value, format_row};
use crate::store::TableStore;
use std::io;

/// Handle the tables command
pub fn handle_tables(config: &StoreConfig) -> Result<()> {
    let store = TableStore::open(config)?;

    if store.table_names().is_empty() {
        println!("No tables.");
    }
    for name in store.table_names() {
        println!("{name}");
    }

    Ok(())
}

/// Handle the create command
pub fn handle_create(config: &StoreConfig, table: &str, columns: &[ColumnSpec]) -> Result<()> {
    let mut store = TableStore::open(config)?;
    store.create_table(table, columns)?;

    println!("Created table {table}");
    for column in columns {
        println!("  - {} {}", column.name, column.type_name.to_uppercase());
    }

    Ok(())
}

/// Handle the insert command
pub fn handle_insert(config: &StoreConfig, table: &str, rows: &[String]) -> Result<()> {
    let mut store = TableStore::open(config)?;

    let rows = rows.iter().map(|r| parse_row(r)).collect::<Vec<_>>();
    let inserted = store.insert_rows(table, &rows)?;

    println!("Inserted {inserted} row(s) into {table}");

    Ok(())
}

/// Handle the delete command
pub fn handle_delete(config: &StoreConfig, table: &str, condition: Option<&str>) -> Result<()> {
    let mut store = TableStore::open(config)?;

    let condition = parse_condition(condition)?;
    let deleted = store.delete_rows(table, condition.as_ref())?;

    println!("Deleted {deleted} row(s) from {table}");

    Ok(())
}

/// Handle the update command
pub fn handle_update(
    config: &StoreConfig,
    table: &str,
    assignments: &[String],
    condition: Option<&str>,
) -> Result<()> {
    let mut store = TableStore::open(config)?;

    let assignments = assignments
        .iter()
        .map(|a| parse_assignment(a))
        .collect::<Result<Vec<_>>>()?;
    let condition = parse_condition(condition)?;
    let updated = store.update_rows(table, assignments, condition.as_ref())?;

    println!("Updated {updated} row(s) in {table}");

    Ok(())
}

/// Handle the columns command
pub fn handle_columns(config: &StoreConfig, table: &str) -> Result<()> {
    let store = TableStore::open(config)?;

    for name in store.column_names(table)? {
        println!("{name}");
    }

    Ok(())
}

/// Handle the select command
pub fn handle_select(
    config: &StoreConfig,
    table: &str,
    columns: Option<&[String]>,
    condition: Option<&str>,
    json: bool,
) -> Result<()> {
    let store = TableStore::open(config)?;

    let columns = columns.map(|cols| cols.iter().map(|c| c.trim()).collect::<Vec<_>>());
    let condition = parse_condition(condition)?;
    let rows = store.fetch_rows(table, columns.as_deref(), condition.as_ref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        println!("{}", format_row(row));
    }

    Ok(())
}

/// Handle the dump command
pub fn handle_dump(config: &StoreConfig) -> Result<()> {
    let store = TableStore::open(config)?;
    let stdout = io::stdout();
    dump_tables(&store, &mut stdout.lock())
}

// ==================== Helpers ====================

fn parse_condition(condition: Option<&str>) -> Result<Option<Condition>> {
    condition.map(str::parse).transpose()
}

fn parse_assignment(text: &str) -> Result<(String, Value)> {
    match text.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), parse_literal(value)))
        }
        _ => Err(StoreError::InvalidFilter(format!(
            "invalid assignment `{text}`, expected column=value"
        ))),
    }
}
