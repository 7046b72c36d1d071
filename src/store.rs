use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::filter::{Condition, quote_ident};
use crate::models::{ColumnSpec, Row, Value};
use rusqlite::{Connection, params_from_iter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// A facade over one SQLite database file.
///
/// The store remembers the names of the tables it knows about: the ones
/// present when it was opened plus the ones created through it. That list is
/// never re-read from the engine, so tables added or dropped by another
/// process stay invisible (or stale) until the file is reopened.
///
/// Conditions and values are always bound as parameters and identifiers are
/// quoted. Column type names passed to [`TableStore::create_table`] are the
/// only caller text that reaches the SQL verbatim, and they are restricted to
/// a small character set first.
pub struct TableStore {
    conn: Connection,
    path: Option<PathBuf>,
    table_names: Vec<String>,
}

impl TableStore {
    /// Open (or create) the database file described by `config`
    #[instrument(skip_all, fields(dir = %config.dir.display(), name = %config.name))]
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.validate()?;
        let conn = Connection::open(&path)?;
        let store = Self::with_connection(conn, Some(path))?;
        info!(
            "Connected to {} ({} tables)",
            config.name,
            store.table_names.len()
        );
        Ok(store)
    }

    /// Open `name` inside directory `dir`
    pub fn open_at<P: AsRef<Path>>(dir: P, name: &str) -> Result<Self> {
        Self::open(&StoreConfig::new(dir, name))
    }

    /// Open an in-memory database, mostly useful for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        debug!("Opened in-memory store");
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        let table_names = load_table_names(&conn)?;
        Ok(TableStore {
            conn,
            path,
            table_names,
        })
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Known table names, in catalog order followed by creation order
    pub fn table_names(&self) -> &[String] {
        &self.table_names
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.table_names.iter().any(|t| t == name)
    }

    /// Close the connection, reporting any error the engine raises while doing so
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Db(e))
    }

    // ==================== Schema Operations ====================

    /// Create `name` with the given columns, in order.
    ///
    /// Type names are upper-cased. Fails with [`StoreError::AlreadyExists`]
    /// when the name is already known, and with [`StoreError::Schema`] when
    /// the column list is unusable or the engine rejects the statement.
    #[instrument(skip(self, columns), fields(column_count = columns.len()))]
    pub fn create_table(&mut self, name: &str, columns: &[ColumnSpec]) -> Result<()> {
        if self.table_exists(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        validate_columns(name, columns)?;

        let defs = columns
            .iter()
            .map(|c| {
                format!(
                    "{} {}",
                    quote_ident(&c.name),
                    c.type_name.trim().to_uppercase()
                )
            })
            .collect::<Vec<_>>();
        let sql = format!("CREATE TABLE {} ({})", quote_ident(name), defs.join(", "));

        debug!("CREATE TABLE SQL: {}", sql);
        self.conn
            .execute(&sql, [])
            .map_err(|e| StoreError::Schema {
                table: name.to_string(),
                reason: e.to_string(),
            })?;

        self.table_names.push(name.to_string());
        info!("Table {} created", name);
        Ok(())
    }

    /// Column names of `table`, read from the engine on every call
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        self.require_table(table)?;
        // Preparing is enough to learn the result columns; nothing is stepped.
        let stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
        Ok(stmt.column_names().into_iter().map(String::from).collect())
    }

    // ==================== Row Operations ====================

    /// Insert every row of `rows` into `table`.
    ///
    /// The batch is all-or-nothing: arities are checked before anything is
    /// written, and the inserts share one transaction that is rolled back if
    /// any of them fails. Returns the number of inserted rows.
    #[instrument(skip(self, rows), fields(row_count = rows.len()))]
    pub fn insert_rows(&mut self, table: &str, rows: &[Row]) -> Result<usize> {
        let expected = self.column_names(table)?.len();

        for (index, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(StoreError::Shape {
                    table: table.to_string(),
                    index,
                    expected,
                    actual: row.len(),
                });
            }
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let placeholders = (1..=expected)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("INSERT INTO {} VALUES ({placeholders})", quote_ident(table));
        debug!("INSERT SQL: {}", sql);

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        info!("Inserted {} rows into {}", rows.len(), table);
        Ok(rows.len())
    }

    /// Delete the rows of `table` matching `condition`, or every row when
    /// there is no condition. Returns the number of deleted rows.
    #[instrument(skip(self, condition))]
    pub fn delete_rows(&mut self, table: &str, condition: Option<&Condition>) -> Result<usize> {
        self.require_table(table)?;
        let condition = condition.filter(|c| !c.is_empty());
        if let Some(c) = condition {
            self.check_columns(table, c.columns())?;
        }

        let mut params = Vec::new();
        let sql = match condition {
            Some(c) => format!(
                "DELETE FROM {} WHERE {}",
                quote_ident(table),
                c.to_sql(&mut params)
            ),
            None => format!("DELETE FROM {}", quote_ident(table)),
        };
        debug!("DELETE SQL: {}", sql);

        let deleted = self
            .conn
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(|e| engine_error(condition.is_some(), e))?;

        info!("Deleted {} rows from {}", deleted, table);
        Ok(deleted)
    }

    /// Set `assignments` on the rows of `table` matching `condition`.
    ///
    /// Updating every row is not allowed: a missing or empty condition fails
    /// with [`StoreError::MissingCondition`] before anything runs. Returns
    /// the number of updated rows.
    #[instrument(skip(self, assignments, condition))]
    pub fn update_rows<I, C, V>(
        &mut self,
        table: &str,
        assignments: I,
        condition: Option<&Condition>,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<Value>,
    {
        self.require_table(table)?;
        let condition = match condition {
            Some(c) if !c.is_empty() => c,
            _ => return Err(StoreError::MissingCondition(table.to_string())),
        };

        let assignments = assignments
            .into_iter()
            .map(|(column, value)| (column.into(), value.into()))
            .collect::<Vec<(String, Value)>>();
        if assignments.is_empty() {
            return Err(StoreError::NoAssignments(table.to_string()));
        }
        self.check_columns(
            table,
            assignments
                .iter()
                .map(|(column, _)| column.as_str())
                .chain(condition.columns()),
        )?;

        let mut params = Vec::with_capacity(assignments.len());
        let set = assignments
            .into_iter()
            .map(|(column, value)| {
                params.push(value);
                format!("{} = ?{}", quote_ident(&column), params.len())
            })
            .collect::<Vec<_>>()
            .join(", ");
        let filter = condition.to_sql(&mut params);
        let sql = format!("UPDATE {} SET {set} WHERE {filter}", quote_ident(table));
        debug!("UPDATE SQL: {}", sql);

        let updated = self
            .conn
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(|e| engine_error(true, e))?;

        info!("Updated {} rows in {}", updated, table);
        Ok(updated)
    }

    /// Fetch rows from `table`.
    ///
    /// `columns` selects a subset (all columns when `None` or empty) and
    /// `condition` filters. Every referenced column must exist, otherwise
    /// [`StoreError::UnknownColumn`] is returned without running the query.
    #[instrument(skip(self, columns, condition))]
    pub fn fetch_rows(
        &self,
        table: &str,
        columns: Option<&[&str]>,
        condition: Option<&Condition>,
    ) -> Result<Vec<Row>> {
        self.require_table(table)?;
        let columns = columns.filter(|c| !c.is_empty());
        let condition = condition.filter(|c| !c.is_empty());

        let referenced = columns
            .into_iter()
            .flatten()
            .copied()
            .chain(condition.into_iter().flat_map(|c| c.columns()))
            .collect::<Vec<_>>();
        if !referenced.is_empty() {
            self.check_columns(table, referenced)?;
        }

        let select = match columns {
            Some(cols) => cols
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            None => "*".to_string(),
        };
        let mut params = Vec::new();
        let sql = match condition {
            Some(c) => format!(
                "SELECT {select} FROM {} WHERE {}",
                quote_ident(table),
                c.to_sql(&mut params)
            ),
            None => format!("SELECT {select} FROM {}", quote_ident(table)),
        };
        debug!("SELECT SQL: {}", sql);

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| engine_error(condition.is_some(), e))?;
        let width = stmt.column_count();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Row>>()
        })?;

        let rows = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Fetched {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    // ==================== Helpers ====================

    fn require_table(&self, table: &str) -> Result<()> {
        if self.table_exists(table) {
            Ok(())
        } else {
            Err(StoreError::NotFound(table.to_string()))
        }
    }

    /// SQLite resolves column names case-insensitively, so this does too
    fn check_columns<'a>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let known = self.column_names(table)?;
        for column in columns {
            if !known.iter().any(|k| k.eq_ignore_ascii_case(column)) {
                return Err(StoreError::UnknownColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn load_table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'",
    )?;
    let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
    names
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| e.into())
}

fn validate_columns(table: &str, columns: &[ColumnSpec]) -> Result<()> {
    let invalid = |reason: String| StoreError::Schema {
        table: table.to_string(),
        reason,
    };

    if table.trim().is_empty() {
        return Err(invalid("table name is empty".to_string()));
    }
    if columns.is_empty() {
        return Err(invalid("a table needs at least one column".to_string()));
    }

    let mut seen: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        if column.name.trim().is_empty() {
            return Err(invalid("column name is empty".to_string()));
        }
        let lowered = column.name.to_lowercase();
        if seen.contains(&lowered) {
            return Err(invalid(format!("duplicate column `{}`", column.name)));
        }
        seen.push(lowered);

        let type_name = column.type_name.trim();
        if type_name.is_empty() || !is_single_type(type_name) {
            return Err(invalid(format!(
                "invalid type `{}` for column `{}`",
                column.type_name, column.name
            )));
        }
    }
    Ok(())
}

/// A type name is words, optionally followed by one balanced group such as
/// `DECIMAL(10, 2)`. Commas outside the group would start another column.
fn is_single_type(type_name: &str) -> bool {
    let mut depth = 0u32;
    for c in type_name.chars() {
        match c {
            '(' if depth == 0 => depth += 1,
            ')' if depth == 1 => depth -= 1,
            ',' if depth == 1 => {}
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | ' ') => {}
            _ => return false,
        }
    }
    depth == 0
}

/// Engine errors on a statement carrying a caller condition are reported as
/// filter errors; everything else stays a database error.
fn engine_error(has_condition: bool, e: rusqlite::Error) -> StoreError {
    if has_condition {
        StoreError::InvalidFilter(e.to_string())
    } else {
        StoreError::Db(e)
    }
}
