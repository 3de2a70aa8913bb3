//! Request types for the lint/fix API.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::linter::config::LintConfig;
#[cfg(feature = "templating")]
use crate::templater::TemplateConfig;

/// A request to lint or fix one SQL file.
///
/// This is the convenience entry point that runs the bundled templater and
/// reference parser before handing the tree to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LintRequest {
    /// The SQL source to lint (UTF-8 string, multi-statement supported)
    pub sql: String,

    /// SQL dialect
    #[serde(default)]
    pub dialect: Dialect,

    /// Optional source name (file path or script identifier) for logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,

    /// Linter configuration; defaults enable every bundled rule
    #[serde(default)]
    pub config: LintConfig,

    /// Optional template preprocessing configuration
    #[cfg(feature = "templating")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_config: Option<TemplateConfig>,
}

impl LintRequest {
    /// A request for plain (untemplated) SQL with default configuration.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            dialect: Dialect::Generic,
            source_name: None,
            config: LintConfig::default(),
            #[cfg(feature = "templating")]
            template_config: None,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_config(mut self, config: LintConfig) -> Self {
        self.config = config;
        self
    }

    #[cfg(feature = "templating")]
    pub fn with_template(mut self, template_config: TemplateConfig) -> Self {
        self.template_config = Some(template_config);
        self
    }
}

/// SQL dialect used by the reference parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Generic,
    Ansi,
    Bigquery,
    Clickhouse,
    Databricks,
    Duckdb,
    Hive,
    Mssql,
    Mysql,
    Postgres,
    Redshift,
    Snowflake,
    Sqlite,
}

impl Dialect {
    pub fn to_sqlparser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        use sqlparser::dialect::{
            AnsiDialect, BigQueryDialect, ClickHouseDialect, DatabricksDialect, DuckDbDialect,
            GenericDialect, HiveDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
            RedshiftSqlDialect, SQLiteDialect, SnowflakeDialect,
        };
        match self {
            Self::Generic => Box::new(GenericDialect {}),
            Self::Ansi => Box::new(AnsiDialect {}),
            Self::Bigquery => Box::new(BigQueryDialect {}),
            Self::Clickhouse => Box::new(ClickHouseDialect {}),
            Self::Databricks => Box::new(DatabricksDialect {}),
            Self::Duckdb => Box::new(DuckDbDialect {}),
            Self::Hive => Box::new(HiveDialect {}),
            Self::Mssql => Box::new(MsSqlDialect {}),
            Self::Mysql => Box::new(MySqlDialect {}),
            Self::Postgres => Box::new(PostgreSqlDialect {}),
            Self::Redshift => Box::new(RedshiftSqlDialect {}),
            Self::Snowflake => Box::new(SnowflakeDialect {}),
            Self::Sqlite => Box::new(SQLiteDialect {}),
        }
    }
}
