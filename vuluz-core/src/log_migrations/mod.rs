//! Event log database migrations
//!
//! Same scheme as the session migrations but applied to logs.duckdb,
//! which keeps its own `sys_migrations` table.

/// Log migrations in application order. Format: (filename, sql_content)
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
