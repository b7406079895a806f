//! Strategy traits resolved per database.
//!
//! # Design Patterns
//!
//! - **Strategy**: [`Dialect`] implementations provide interchangeable SQL
//!   syntax rules and value handling per vendor and version
//! - **Template Method**: default methods define shared query skeletons that
//!   dialects override where their syntax differs

use std::fmt;

use crate::error::{MigrateError, Result};
use crate::value::ValueDispatcher;

use super::info::DatabaseInfo;

/// Vendor- and version-specific behavior for one database.
///
/// Selected at runtime from the connection's observed metadata through a
/// [`Resolver`](super::Resolver).
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Get the dialect identifier (e.g., "mssql", "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name, etc.).
    ///
    /// - MSSQL: `[identifier]`
    /// - PostgreSQL: `"identifier"`
    /// - MySQL: `` `identifier` ``
    fn quote_ident(&self, name: &str) -> String;

    /// Get a parameter placeholder for the given 1-based index.
    fn param_placeholder(&self, index: usize) -> String;

    /// Whether `ROW_NUMBER() OVER (...)` is available.
    fn supports_row_number(&self) -> bool {
        true
    }

    /// Converter between this database's typed values and portable variants.
    fn value_dispatcher(&self) -> &ValueDispatcher;

    /// Quoted `schema.table`, or just the table without a schema.
    fn qualify_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) if !schema.is_empty() => {
                format!("{}.{}", self.quote_ident(schema), self.quote_ident(table))
            }
            _ => self.quote_ident(table),
        }
    }

    /// Build a SELECT query for extracting rows.
    fn build_select_query(&self, opts: &SelectQueryOptions) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}",
            select_list(self, &opts.columns),
            self.qualify_table(opts.schema.as_deref(), &opts.table)
        );
        push_conditions(self, opts, &mut sql);
        if let Some(ref pk) = opts.pk_col {
            sql.push_str(&format!(" ORDER BY {}", self.quote_ident(pk)));
        }
        if let Some(limit) = opts.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }

    /// Wrap a query to return rows `start_row..=end_row` (1-based) in `pk_col` order.
    ///
    /// Falls back to LIMIT/OFFSET when window functions are unavailable.
    fn build_row_number_query(
        &self,
        inner_query: &str,
        pk_col: &str,
        start_row: i64,
        end_row: i64,
    ) -> String {
        if !self.supports_row_number() {
            return format!(
                "SELECT * FROM ({}) AS __inner ORDER BY {} LIMIT {} OFFSET {}",
                inner_query,
                self.quote_ident(pk_col),
                (end_row - start_row + 1).max(0),
                (start_row - 1).max(0)
            );
        }
        format!(
            r#"WITH numbered AS (
    SELECT *, ROW_NUMBER() OVER (ORDER BY {}) AS __rn
    FROM ({}) AS __inner
)
SELECT * FROM numbered WHERE __rn >= {} AND __rn <= {}"#,
            self.quote_ident(pk_col),
            inner_query,
            start_row,
            end_row
        )
    }
}

/// Comma-separated quoted column list, or `*`.
pub(crate) fn select_list<D: Dialect + ?Sized>(dialect: &D, columns: &[String]) -> String {
    if columns.is_empty() {
        "*".to_string()
    } else {
        columns
            .iter()
            .map(|c| dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Append keyset bounds and the custom filter as a WHERE clause.
pub(crate) fn push_conditions<D: Dialect + ?Sized>(
    dialect: &D,
    opts: &SelectQueryOptions,
    sql: &mut String,
) {
    let mut conditions = Vec::new();

    // Keyset pagination
    if let (Some(pk), Some(min_pk)) = (&opts.pk_col, opts.min_pk) {
        conditions.push(format!("{} > {}", dialect.quote_ident(pk), min_pk));
    }
    if let (Some(pk), Some(max_pk)) = (&opts.pk_col, opts.max_pk) {
        conditions.push(format!("{} <= {}", dialect.quote_ident(pk), max_pk));
    }

    // Custom WHERE clause
    if let Some(ref where_clause) = opts.where_clause {
        if !where_clause.is_empty() {
            conditions.push(format!("({})", where_clause));
        }
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
}

/// Options for building a SELECT query.
#[derive(Debug, Clone, Default)]
pub struct SelectQueryOptions {
    /// Schema name; unqualified when unset.
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Columns to select.
    pub columns: Vec<String>,
    /// Primary key column (for ordering).
    pub pk_col: Option<String>,
    /// Minimum PK value (exclusive).
    pub min_pk: Option<i64>,
    /// Maximum PK value (inclusive).
    pub max_pk: Option<i64>,
    /// Additional WHERE clause.
    pub where_clause: Option<String>,
    /// Row limit (for batch reads).
    pub limit: Option<usize>,
}

impl SelectQueryOptions {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }
}

/// Product metadata of a live connection.
///
/// Implemented by the driver layer. Dialect selection always goes through
/// [`database_info`](ConnectionMetadata::database_info), never through a
/// user-declared hint.
pub trait ConnectionMetadata {
    fn product_name(&self) -> Result<String>;

    fn product_version(&self) -> Result<String>;

    fn major_version(&self) -> Result<i32>;

    fn minor_version(&self) -> Result<i32>;

    /// Fully populated identity of the connected database.
    fn database_info(&self) -> Result<DatabaseInfo> {
        Ok(DatabaseInfo::observed(
            self.product_name()?,
            self.product_version()?,
            self.major_version()?,
            self.minor_version()?,
        ))
    }
}

/// A complete [`DatabaseInfo`] can stand in for a connection, e.g. when
/// inspecting a backup offline.
impl ConnectionMetadata for DatabaseInfo {
    fn product_name(&self) -> Result<String> {
        self.product_name.clone().ok_or_else(|| incomplete(self, "product_name"))
    }

    fn product_version(&self) -> Result<String> {
        self.product_version
            .clone()
            .ok_or_else(|| incomplete(self, "product_version"))
    }

    fn major_version(&self) -> Result<i32> {
        self.major_version.ok_or_else(|| incomplete(self, "major_version"))
    }

    fn minor_version(&self) -> Result<i32> {
        self.minor_version.ok_or_else(|| incomplete(self, "minor_version"))
    }
}

fn incomplete(info: &DatabaseInfo, field: &str) -> MigrateError {
    MigrateError::Config(format!(
        "database metadata {} is missing {}",
        info, field
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct AnsiDialect {
        dispatcher: ValueDispatcher,
        window_functions: bool,
    }

    impl Dialect for AnsiDialect {
        fn name(&self) -> &str {
            "ansi"
        }

        fn quote_ident(&self, name: &str) -> String {
            format!("\"{}\"", name.replace('"', "\"\""))
        }

        fn param_placeholder(&self, _index: usize) -> String {
            "?".to_string()
        }

        fn supports_row_number(&self) -> bool {
            self.window_functions
        }

        fn value_dispatcher(&self) -> &ValueDispatcher {
            &self.dispatcher
        }
    }

    #[test]
    fn test_default_select_query() {
        let dialect = AnsiDialect::default();
        let opts = SelectQueryOptions {
            schema: Some("sales".into()),
            columns: vec!["id".into(), "name".into()],
            pk_col: Some("id".into()),
            min_pk: Some(10),
            max_pk: Some(20),
            where_clause: Some("active = 1".into()),
            limit: Some(5),
            ..SelectQueryOptions::new("orders")
        };
        assert_eq!(
            dialect.build_select_query(&opts),
            r#"SELECT "id", "name" FROM "sales"."orders" WHERE "id" > 10 AND "id" <= 20 AND (active = 1) ORDER BY "id" LIMIT 5"#
        );
        assert_eq!(
            dialect.build_select_query(&SelectQueryOptions::new("t")),
            r#"SELECT * FROM "t""#
        );
    }

    #[test]
    fn test_row_number_fallback() {
        let modern = AnsiDialect {
            window_functions: true,
            ..Default::default()
        };
        assert!(modern
            .build_row_number_query("SELECT * FROM t", "id", 11, 20)
            .contains("ROW_NUMBER() OVER (ORDER BY \"id\")"));

        let legacy = AnsiDialect::default();
        assert_eq!(
            legacy.build_row_number_query("SELECT * FROM t", "id", 11, 20),
            r#"SELECT * FROM (SELECT * FROM t) AS __inner ORDER BY "id" LIMIT 10 OFFSET 10"#
        );
    }

    #[test]
    fn test_database_info_as_metadata() {
        let info = DatabaseInfo::observed("PostgreSQL", "16.2", 16, 2);
        assert_eq!(info.database_info().unwrap(), info);

        let partial = DatabaseInfo::new("PostgreSQL");
        assert!(matches!(
            partial.database_info(),
            Err(MigrateError::Config(_))
        ));
    }
}
