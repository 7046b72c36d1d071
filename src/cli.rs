use crate::config::DEFAULT_DB_NAME;
use crate::models::ColumnSpec;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tablestore")]
#[command(about = "Convenience front end for a SQLite table store")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Directory holding the database file
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Database file name (must look like `name.db`)
    #[arg(long, global = true, default_value = DEFAULT_DB_NAME)]
    pub db: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List known tables
    Tables,

    /// Create a table
    Create {
        /// Table name
        table: String,
        /// Columns as name:TYPE, e.g. age:INTEGER
        #[arg(required = true)]
        columns: Vec<ColumnSpec>,
    },

    /// Insert rows into a table
    Insert {
        /// Table name
        table: String,
        /// Comma-separated values for one row, e.g. "'Ana', 30" (repeatable)
        #[arg(long = "row", required = true)]
        rows: Vec<String>,
    },

    /// Delete rows (all rows when --where is omitted)
    Delete {
        /// Table name
        table: String,
        /// Filter, e.g. "age > 26 AND name = 'Ana'"
        #[arg(long = "where")]
        condition: Option<String>,
    },

    /// Update rows matching a filter
    Update {
        /// Table name
        table: String,
        /// Assignment as column=value (repeatable)
        #[arg(long = "set", required = true)]
        assignments: Vec<String>,
        /// Filter, required
        #[arg(long = "where")]
        condition: Option<String>,
    },

    /// Show the column names of a table
    Columns {
        /// Table name
        table: String,
    },

    /// Fetch rows from a table
    Select {
        /// Table name
        table: String,
        /// Comma-separated subset of columns
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
        /// Filter, e.g. "age > 26"
        #[arg(long = "where")]
        condition: Option<String>,
        /// Print rows as JSON arrays
        #[arg(long)]
        json: bool,
    },

    /// Print every table and its rows
    Dump,
}
