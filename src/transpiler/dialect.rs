use serde::{Deserialize, Serialize};

use crate::transpiler::sql::postgres::PostgresGenerator;
use crate::transpiler::sql::sqlserver::SqlServerGenerator;
use crate::transpiler::traits::SqlGenerator;

/// Supported SQL Dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Microsoft SQL Server (T-SQL)
    #[default]
    #[value(name = "sqlserver", alias = "mssql")]
    SqlServer,
    /// PostgreSQL
    #[value(name = "postgres", alias = "pg")]
    Postgres,
}

impl Dialect {
    pub fn generator(&self) -> Box<dyn SqlGenerator> {
        match self {
            Dialect::SqlServer => Box::new(SqlServerGenerator),
            Dialect::Postgres => Box::new(PostgresGenerator),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::SqlServer => "sqlserver",
            Dialect::Postgres => "postgres",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "postgres" | "pg" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(format!("unknown dialect: {}", other)),
        }
    }
}
