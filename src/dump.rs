use crate::error::Result;
use crate::models::format_row;
use crate::store::TableStore;
use std::io::Write;

const SEPARATOR_WIDTH: usize = 100;

/// Write every known table and its rows to `out`, in the order the store
/// knows them.
pub fn dump_tables<W: Write>(store: &TableStore, out: &mut W) -> Result<()> {
    let separator = "-".repeat(SEPARATOR_WIDTH);
    for table in store.table_names() {
        writeln!(out, "{separator}")?;
        writeln!(out, "Table {table}")?;
        writeln!(out, "{separator}")?;
        for row in store.fetch_rows(table, None, None)? {
            writeln!(out, "{}", format_row(&row))?;
        }
    }
    Ok(())
}
