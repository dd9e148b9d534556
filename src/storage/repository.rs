//! Row-level operations on record tables
//!
//! Statements are built from each kind's static field list, so every column
//! name that reaches SQL comes from `Record::FIELDS`.

use anyhow::{Context, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};

use crate::items::{FieldValue, Kind, Record};

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            FieldValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            FieldValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        })
    }
}

impl FromSql for FieldValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(FieldValue::Null),
            ValueRef::Integer(v) => Ok(FieldValue::Integer(v)),
            ValueRef::Real(v) => Ok(FieldValue::Real(v)),
            ValueRef::Text(v) => Ok(FieldValue::Text(String::from_utf8_lossy(v).into_owned())),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// `a = ?1 AND b = ?2`, numbering placeholders from `first`
fn filter_clause(key: &[&str], first: usize) -> String {
    key.iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ?{}", col, first + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Values of the key fields of `record`, in key order
pub fn key_values<R: Record>(record: &R, key: &[&str]) -> Vec<FieldValue> {
    key.iter()
        .map(|field| record.value_of(field).unwrap_or(FieldValue::Null))
        .collect()
}

/// Repository for record rows, bound to a connection or an open transaction
pub struct RecordRepository<'c> {
    conn: &'c Connection,
}

impl<'c> RecordRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==================== Write Operations ====================

    /// Insert `record` as a new row
    pub fn insert<R: Record>(&self, record: &R) -> Result<()> {
        let table = R::KIND.table();
        let placeholders = (1..=R::FIELDS.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            R::FIELDS.join(", "),
            placeholders
        );

        self.conn
            .execute(&sql, params_from_iter(record.values()))
            .with_context(|| format!("Failed to insert into {}", table))?;
        Ok(())
    }

    /// Overwrite the row matching `key` with the values of `record`
    ///
    /// Every column is written, so null fields on `record` clear the stored
    /// value. Returns the number of rows touched.
    pub fn update<R: Record>(&self, record: &R, key: &[&str]) -> Result<usize> {
        let table = R::KIND.table();
        let assignments = R::FIELDS
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ?{}", col, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            assignments,
            filter_clause(key, R::FIELDS.len() + 1)
        );

        let mut params = record.values();
        params.extend(key_values(record, key));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(params))
            .with_context(|| format!("Failed to update {}", table))?;
        Ok(changed)
    }

    // ==================== Query Operations ====================

    /// Check if a row of `kind` matches every `key` column
    pub fn exists(&self, kind: Kind, key: &[&str], values: &[FieldValue]) -> Result<bool> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} LIMIT 1",
            kind.table(),
            filter_clause(key, 1)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let found = stmt
            .exists(params_from_iter(values))
            .with_context(|| format!("Failed to query {}", kind.table()))?;
        Ok(found)
    }

    /// Get row count for a kind
    pub fn count(&self, kind: Kind) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Get every row of a kind in rowid order, columns in field order
    pub fn fetch_all(&self, kind: Kind) -> Result<Vec<Vec<FieldValue>>> {
        let fields = kind.fields();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY rowid",
            fields.join(", "),
            kind.table()
        ))?;

        let rows = stmt
            .query_map([], |row| {
                (0..fields.len())
                    .map(|i| row.get::<_, FieldValue>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
