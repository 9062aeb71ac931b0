//! DuckDB storage backend
//!
//! Tables get a sequence-backed surrogate key. Values are bound as
//! parameters; dates travel as ISO text and are cast on the way in.

use super::backend::StorageBackend;
use crate::coerce::Coercer;
use crate::error::{Error, Result};
use crate::schema::ScalarKind;
use crate::table::{
    ColumnDefinition, ColumnModifier, ConstraintKind, TableConstraint, TableDefinition,
};
use crate::types::{Record, Value, DATETIME_ISO_FORMAT};
use chrono::NaiveDate;
use duckdb::types::{TimeUnit, Value as DbValue};
use duckdb::Connection;
use std::collections::BTreeSet;

/// Location string that opens a transient in-memory database
pub const MEMORY_LOCATION: &str = ":memory:";

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Storage backend writing to a DuckDB database
pub struct DuckDbBackend {
    /// DuckDB connection
    conn: Connection,
    /// File path or `:memory:`
    location: String,
}

impl DuckDbBackend {
    /// Open a database file, creating it if needed
    pub fn open(location: &str) -> Result<Self> {
        let conn = if location == MEMORY_LOCATION {
            Connection::open_in_memory()
        } else {
            Connection::open(location)
        }
        .map_err(|e| Error::config(format!("Failed to open DuckDB database '{location}': {e}")))?;

        tracing::debug!(location, "Opened DuckDB connection");

        Ok(Self {
            conn,
            location: location.to_string(),
        })
    }

    /// Open a transient in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(MEMORY_LOCATION)
    }

    /// Where this backend stores its data
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Test database connection
    pub fn check_connection(&self) -> Result<()> {
        self.conn
            .execute_batch("SELECT 1")
            .map_err(|e| Error::config(format!("Connection check failed: {e}")))
    }

    /// Column names of a table in declaration order
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name FROM information_schema.columns
             WHERE table_schema = 'main' AND table_name = ?
             ORDER BY ordinal_position",
        )?;

        let columns = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        if columns.is_empty() {
            return Err(Error::TableNotFound {
                table: table.to_string(),
            });
        }
        Ok(columns)
    }

    /// Number of rows stored in a table
    pub fn row_count(&self, table: &str) -> Result<usize> {
        let query = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self
            .conn
            .query_row(&query, [], |row| row.get(0))
            .map_err(|e| map_error(table, e))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Read every row of a table, ordered by its first column
    pub fn select_all(&self, table: &str) -> Result<Vec<Record>> {
        let columns = self.columns(table)?;
        let query = format!(
            "SELECT {} FROM {} ORDER BY 1",
            ident_list(&columns),
            quote_ident(table)
        );
        tracing::debug!("Executing query: {}", query);

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt
            .query_map([], |row| {
                let mut record = Record::with_capacity(columns.len());
                for (i, name) in columns.iter().enumerate() {
                    let value: DbValue = row.get(i)?;
                    record.insert(name.clone(), from_db_value(value));
                }
                Ok(record)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Tables holding a foreign key into `table`
    pub fn dependents(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name, constraint_text FROM duckdb_constraints()
             WHERE constraint_type = 'FOREIGN KEY' AND schema_name = 'main'",
        )?;

        let constraints = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut dependents: Vec<String> = constraints
            .into_iter()
            .filter(|(name, text)| {
                !name.eq_ignore_ascii_case(table)
                    && referenced_table(text).is_some_and(|r| r.eq_ignore_ascii_case(table))
            })
            .map(|(name, _)| name)
            .collect();
        dependents.sort();
        dependents.dedup();
        Ok(dependents)
    }
}

/// Key and uniqueness constraints as DuckDB reports them
#[derive(Debug, Clone, PartialEq)]
enum StoredConstraint {
    PrimaryKey(Vec<String>),
    Unique(Vec<String>),
    ForeignKey {
        columns: Vec<String>,
        table: String,
        references: Vec<String>,
    },
}

impl DuckDbBackend {
    /// Primary key, unique and foreign key constraints of a table
    fn stored_constraints(&self, table: &str) -> Result<Vec<StoredConstraint>> {
        let mut stmt = self.conn.prepare(
            "SELECT constraint_type, constraint_text, constraint_column_names
             FROM duckdb_constraints()
             WHERE schema_name = 'main' AND table_name = ?
               AND constraint_type IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY')
             ORDER BY constraint_index",
        )?;

        let rows = stmt
            .query_map([table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, DbValue>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut constraints = Vec::with_capacity(rows.len());
        for (kind, text, names) in rows {
            let DbValue::List(names) = names else {
                continue;
            };
            let columns: Vec<String> = names
                .into_iter()
                .filter_map(|name| match name {
                    DbValue::Text(name) => Some(name),
                    _ => None,
                })
                .collect();

            let constraint = match kind.as_str() {
                "PRIMARY KEY" => StoredConstraint::PrimaryKey(columns),
                "UNIQUE" => StoredConstraint::Unique(columns),
                _ => match references_clause(&text) {
                    Some((parent, references)) => StoredConstraint::ForeignKey {
                        columns,
                        table: parent,
                        references,
                    },
                    None => {
                        tracing::debug!(table, constraint = %text, "Skipping unreadable foreign key");
                        continue;
                    }
                },
            };
            if !constraints.contains(&constraint) {
                constraints.push(constraint);
            }
        }
        Ok(constraints)
    }
}

impl StorageBackend for DuckDbBackend {
    fn connect(location: &str) -> Result<Self> {
        Self::open(location)
    }

    fn reflect(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables
             WHERE table_schema = 'main' AND table_type = 'BASE TABLE'",
        )?;

        let tables = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<BTreeSet<String>, _>>()?;

        Ok(tables)
    }

    fn describe(&self, table: &str) -> Result<TableDefinition> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name, data_type, is_nullable, column_default
             FROM information_schema.columns
             WHERE table_schema = 'main' AND table_name = ?
             ORDER BY ordinal_position",
        )?;

        let stored = stmt
            .query_map([table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if stored.is_empty() {
            return Err(Error::TableNotFound {
                table: table.to_string(),
            });
        }

        let stored_constraints = self.stored_constraints(table)?;
        let primary_key = stored_constraints
            .iter()
            .find_map(|c| match c {
                StoredConstraint::PrimaryKey(columns) if columns.len() == 1 => {
                    Some(columns[0].clone())
                }
                _ => None,
            })
            .ok_or_else(|| {
                Error::invalid_input(format!("table '{table}' has no single-column primary key"))
            })?;

        let mut columns = Vec::with_capacity(stored.len());
        for (name, data_type, nullable, default) in stored {
            let kind = kind_for_sql_type(&data_type);
            let mut column = ColumnDefinition::new(name, kind);

            if column.name == primary_key {
                columns.push(column.with_modifier(ColumnModifier::PrimaryKey));
                continue;
            }

            if nullable == "NO" {
                column = column.with_modifier(ColumnModifier::NotNull);
            }
            let single = [column.name.clone()];
            if stored_constraints
                .iter()
                .any(|c| matches!(c, StoredConstraint::Unique(cols) if cols[..] == single[..]))
            {
                column = column.with_modifier(ColumnModifier::Unique);
            }
            if let Some(text) = default.as_deref() {
                match parse_default(text, kind) {
                    Some(value) => column = column.with_modifier(ColumnModifier::Default(value)),
                    None => {
                        tracing::debug!(table, column = %column.name, default = text, "Skipping default");
                    }
                }
            }
            let reference = stored_constraints.iter().find_map(|c| match c {
                StoredConstraint::ForeignKey {
                    columns,
                    table: parent,
                    references,
                } if columns[..] == single[..] && references.len() == 1 => {
                    Some(ColumnModifier::References {
                        table: parent.clone(),
                        column: references[0].clone(),
                    })
                }
                _ => None,
            });
            if let Some(reference) = reference {
                column = column.with_modifier(reference);
            }
            columns.push(column);
        }

        let constraints = stored_constraints
            .into_iter()
            .filter_map(|c| match c {
                StoredConstraint::Unique(columns) if columns.len() > 1 => {
                    Some(TableConstraint::unique(columns))
                }
                StoredConstraint::ForeignKey {
                    columns,
                    table: parent,
                    references,
                } if columns.len() > 1 || references.len() != 1 => {
                    Some(TableConstraint::foreign_key(columns, parent, references))
                }
                _ => None,
            })
            .collect();

        Ok(TableDefinition {
            name: table.to_string(),
            primary_key,
            columns,
            constraints,
        })
    }

    fn execute_ddl(&mut self, table: &TableDefinition) -> Result<()> {
        for statement in create_table_sql(table) {
            tracing::debug!("Executing DDL: {}", statement);
            self.conn
                .execute_batch(&statement)
                .map_err(|e| map_error(&table.name, e))?;
        }
        Ok(())
    }

    fn execute_insert(&mut self, table: &str, record: &Record) -> Result<()> {
        let query = insert_sql(table, record);
        let params: Vec<DbValue> = record.values().map(to_db_value).collect();

        self.conn
            .execute(&query, duckdb::params_from_iter(params))
            .map_err(|e| map_error(table, e))?;
        Ok(())
    }

    fn drop_table(&mut self, table: &str, cascade: bool) -> Result<()> {
        if cascade {
            for dependent in self.dependents(table)? {
                self.drop_table(&dependent, true)?;
            }
        }

        let query = format!("DROP TABLE IF EXISTS {}", quote_ident(table));
        tracing::debug!("Executing DDL: {}", query);
        self.conn
            .execute_batch(&query)
            .map_err(|e| map_error(table, e))?;

        self.conn
            .execute_batch(&format!(
                "DROP SEQUENCE IF EXISTS {}",
                quote_ident(&sequence_name(table))
            ))
            .map_err(|e| map_error(table, e))
    }
}

// ============================================================================
// SQL rendering
// ============================================================================

/// Quote an identifier, doubling embedded quotes
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn ident_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| quote_ident(name.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Table named by the REFERENCES clause of a foreign key definition
fn referenced_table(constraint_text: &str) -> Option<String> {
    references_clause(constraint_text).map(|(table, _)| table)
}

/// Table and columns named by the REFERENCES clause of a foreign key
fn references_clause(constraint_text: &str) -> Option<(String, Vec<String>)> {
    const KEYWORD: &str = "REFERENCES ";
    let start = constraint_text.to_ascii_uppercase().find(KEYWORD)? + KEYWORD.len();
    let (path, rest) = split_identifiers(constraint_text.get(start..)?, '.', '(')?;
    let table = path.into_iter().last().filter(|name| !name.is_empty())?;
    let (columns, _) = split_identifiers(rest, ',', ')')?;
    Some((table, columns))
}

/// Read `separator`-delimited identifiers up to an unquoted `end`
///
/// Quoted identifiers keep dots, commas and spaces; unquoted whitespace is
/// skipped. Returns the identifiers and the text after `end`.
fn split_identifiers(text: &str, separator: char, end: char) -> Option<(Vec<String>, &str)> {
    let mut names = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' if quoted && chars.peek().is_some_and(|(_, next)| *next == '"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if quoted => current.push(c),
            c if c == end => {
                names.push(current);
                return Some((names, text.get(i + c.len_utf8()..)?));
            }
            c if c == separator => names.push(std::mem::take(&mut current)),
            c if c.is_whitespace() => {}
            c => current.push(c),
        }
    }
    None
}

/// Sequence feeding a table's surrogate key
pub(crate) fn sequence_name(table: &str) -> String {
    format!("{table}_pk_seq")
}

/// DuckDB column type for a storage kind
pub(crate) fn sql_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Boolean => "BOOLEAN",
        ScalarKind::Integer => "BIGINT",
        ScalarKind::Float => "DOUBLE",
        ScalarKind::Date => "DATE",
        ScalarKind::DateTime => "TIMESTAMP",
        ScalarKind::String | ScalarKind::Null => "VARCHAR",
    }
}

/// Storage kind for a DuckDB column type, as reported by the catalog
pub(crate) fn kind_for_sql_type(data_type: &str) -> ScalarKind {
    let upper = data_type.trim().to_ascii_uppercase();
    match upper.as_str() {
        "BOOLEAN" | "BOOL" => ScalarKind::Boolean,
        "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "HUGEINT" | "UTINYINT" | "USMALLINT"
        | "UINTEGER" | "UBIGINT" => ScalarKind::Integer,
        "FLOAT" | "REAL" | "DOUBLE" => ScalarKind::Float,
        "DATE" => ScalarKind::Date,
        t if t.starts_with("DECIMAL") => ScalarKind::Float,
        t if t.starts_with("TIMESTAMP") => ScalarKind::DateTime,
        _ => ScalarKind::String,
    }
}

/// Read back a DEFAULT expression as a value of `kind`
///
/// Handles plain literals, optionally wrapped in a CAST or followed by a
/// `::TYPE` suffix. Anything else (function calls, expressions) yields
/// `None`.
pub(crate) fn parse_default(expression: &str, kind: ScalarKind) -> Option<Value> {
    let mut text = expression.trim();
    if text.len() > 5 && text[..5].eq_ignore_ascii_case("CAST(") && text.ends_with(')') {
        let inner = &text[5..text.len() - 1];
        let split = inner.to_ascii_uppercase().rfind(" AS ")?;
        text = inner[..split].trim();
    } else if let Some(split) = text.rfind("::") {
        if text[..split].ends_with('\'') {
            text = text[..split].trim();
        }
    }
    if text.eq_ignore_ascii_case("NULL") {
        return None;
    }

    let literal = match text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None if text.contains('(') => return None,
        None => text.to_string(),
    };

    if kind == ScalarKind::Boolean {
        return match literal.to_ascii_lowercase().as_str() {
            "true" | "t" => Some(Value::Boolean(true)),
            "false" | "f" => Some(Value::Boolean(false)),
            _ => None,
        };
    }

    Coercer::new()
        .with_date_format("%Y-%m-%d")
        .with_datetime_format("%Y-%m-%d %H:%M:%S%.f")
        .coerce_one(&Value::String(literal), kind)
        .ok()
}

/// Render a value as a SQL literal, for DEFAULT clauses
pub(crate) fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Boolean(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(x) if x.is_finite() => format!("{x:?}"),
        Value::Float(x) => format!("CAST({} AS DOUBLE)", quote_literal(&x.to_string())),
        Value::Date(_) => format!("DATE {}", quote_literal(&value.to_string())),
        Value::DateTime(_) => format!("TIMESTAMP {}", quote_literal(&value.to_string())),
        Value::String(_) | Value::List(_) | Value::Object(_) => {
            quote_literal(&value.to_string())
        }
    }
}

fn column_sql(table: &TableDefinition, column: &ColumnDefinition) -> String {
    let mut parts = vec![quote_ident(&column.name), sql_type(column.kind).to_string()];

    if column.name == table.primary_key {
        parts.push("PRIMARY KEY".to_string());
        parts.push(format!(
            "DEFAULT nextval({})",
            quote_literal(&quote_ident(&sequence_name(&table.name)))
        ));
        return parts.join(" ");
    }

    if column.is_not_null() {
        parts.push("NOT NULL".to_string());
    }
    if column.is_unique() {
        parts.push("UNIQUE".to_string());
    }
    if let Some(default) = column.default_value() {
        parts.push(format!("DEFAULT {}", sql_literal(default)));
    }
    parts.join(" ")
}

/// Statements creating a table and its key sequence, both idempotent
pub(crate) fn create_table_sql(table: &TableDefinition) -> Vec<String> {
    let mut definitions: Vec<String> = table
        .columns
        .iter()
        .map(|column| column_sql(table, column))
        .collect();

    for constraint in &table.constraints {
        if constraint.kind == ConstraintKind::Unique {
            definitions.push(format!("UNIQUE ({})", ident_list(&constraint.columns)));
        }
    }

    for (columns, parent, parent_columns) in table.foreign_keys() {
        definitions.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            ident_list(&columns),
            quote_ident(parent),
            ident_list(&parent_columns)
        ));
    }

    vec![
        format!(
            "CREATE SEQUENCE IF NOT EXISTS {} START 1",
            quote_ident(&sequence_name(&table.name))
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&table.name),
            definitions.join(", ")
        ),
    ]
}

/// Parameterized insert for the columns present in `record`
pub(crate) fn insert_sql(table: &str, record: &Record) -> String {
    if record.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
    }

    let columns: Vec<&str> = record.keys().map(String::as_str).collect();
    let placeholders: Vec<&str> = record
        .values()
        .map(|value| match value {
            Value::Date(_) => "CAST(? AS DATE)",
            Value::DateTime(_) => "CAST(? AS TIMESTAMP)",
            _ => "?",
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        ident_list(&columns),
        placeholders.join(", ")
    )
}

// ============================================================================
// Value conversion
// ============================================================================

fn to_db_value(value: &Value) -> DbValue {
    match value {
        Value::Null => DbValue::Null,
        Value::Boolean(b) => DbValue::Boolean(*b),
        Value::Integer(i) => DbValue::BigInt(*i),
        Value::Float(x) => DbValue::Double(*x),
        Value::String(s) => DbValue::Text(s.clone()),
        Value::Date(d) => DbValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::DateTime(dt) => DbValue::Text(dt.format(DATETIME_ISO_FORMAT).to_string()),
        Value::List(_) | Value::Object(_) => DbValue::Text(value.to_string()),
    }
}

/// Convert a DuckDB value read back from a table
fn from_db_value(value: DbValue) -> Value {
    match value {
        DbValue::Null => Value::Null,
        DbValue::Boolean(b) => Value::Boolean(b),
        DbValue::TinyInt(i) => Value::Integer(i.into()),
        DbValue::SmallInt(i) => Value::Integer(i.into()),
        DbValue::Int(i) => Value::Integer(i.into()),
        DbValue::BigInt(i) => Value::Integer(i),
        DbValue::UTinyInt(i) => Value::Integer(i.into()),
        DbValue::USmallInt(i) => Value::Integer(i.into()),
        DbValue::UInt(i) => Value::Integer(i.into()),
        DbValue::UBigInt(i) => i64::try_from(i).map_or(Value::String(i.to_string()), Value::Integer),
        DbValue::HugeInt(i) => i64::try_from(i).map_or(Value::String(i.to_string()), Value::Integer),
        DbValue::Float(f) => Value::Float(f64::from(f)),
        DbValue::Double(f) => Value::Float(f),
        DbValue::Text(s) => Value::String(s),
        DbValue::Timestamp(unit, t) => {
            let micros = match unit {
                TimeUnit::Second => t.saturating_mul(1_000_000),
                TimeUnit::Millisecond => t.saturating_mul(1_000),
                TimeUnit::Microsecond => t,
                TimeUnit::Nanosecond => t / 1_000,
            };
            let secs = micros.div_euclid(1_000_000);
            let nsecs = (micros.rem_euclid(1_000_000) * 1_000) as u32;
            chrono::DateTime::from_timestamp(secs, nsecs)
                .map_or(Value::Integer(t), |dt| Value::DateTime(dt.naive_utc()))
        }
        DbValue::Date32(d) => NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_DAYS_FROM_CE)
            .map_or(Value::Integer(d.into()), Value::Date),
        other => Value::String(format!("{other:?}")),
    }
}

/// Classify a DuckDB failure by what the message says went wrong
fn map_error(table: &str, err: duckdb::Error) -> Error {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if lower.contains("foreign key") || lower.contains("main key table") {
        Error::referential(table, message)
    } else if lower.contains("table with name") && lower.contains("does not exist") {
        Error::TableNotFound {
            table: table.to_string(),
        }
    } else if lower.contains("constraint") || lower.contains("duplicate key") {
        Error::constraint(table, message)
    } else {
        Error::Database(err)
    }
}
