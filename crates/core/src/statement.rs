//! BACKUP / RESTORE statement assembly.
//!
//! Identifiers and addresses are spliced in as given. Nothing here quotes or
//! validates them, so names containing quotes or semicolons will produce a
//! broken statement.

use std::fmt;

use crate::error::ConfigError;

pub const DEFAULT_IGNORED_DATABASES: [&str; 3] =
    ["system", "information_schema", "INFORMATION_SCHEMA"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Backup,
    Restore,
}

impl Operation {
    fn keyword(&self) -> &'static str {
        match self {
            Operation::Backup => "BACKUP",
            Operation::Restore => "RESTORE",
        }
    }

    fn direction(&self) -> &'static str {
        match self {
            Operation::Backup => "TO",
            Operation::Restore => "FROM",
        }
    }
}

/// What a statement covers. Exactly one scope per statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Table(String),
    Dictionary(String),
    Database(String),
    TemporaryTable(String),
    View(String),
    AllExceptDatabases(Vec<String>),
}

impl Scope {
    /// Everything except the given databases. An empty list is refused so a
    /// misconfiguration cannot silently include system schemas.
    pub fn all_except<I, S>(ignored: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ignored: Vec<String> = ignored.into_iter().map(Into::into).collect();
        if ignored.is_empty() {
            return Err(ConfigError::EmptyIgnoredDatabases);
        }
        Ok(Scope::AllExceptDatabases(ignored))
    }

    pub fn default_all() -> Self {
        Scope::AllExceptDatabases(DEFAULT_IGNORED_DATABASES.iter().map(|s| s.to_string()).collect())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Table(name) => write!(f, "TABLE {name}"),
            Scope::Dictionary(name) => write!(f, "DICTIONARY {name}"),
            Scope::Database(name) => write!(f, "DATABASE {name}"),
            Scope::TemporaryTable(name) => write!(f, "TEMPORARY TABLE {name}"),
            Scope::View(name) => write!(f, "VIEW {name}"),
            Scope::AllExceptDatabases(ignored) => {
                write!(f, "ALL EXCEPT DATABASES {}", ignored.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Statement {
    operation: Operation,
    scope: Scope,
    target: String,
    base: Option<String>,
    overwrite: bool,
}

impl Statement {
    pub fn backup(scope: Scope, target: impl Into<String>) -> Self {
        Self::new(Operation::Backup, scope, target)
    }

    pub fn restore(scope: Scope, target: impl Into<String>) -> Self {
        Self::new(Operation::Restore, scope, target)
    }

    pub fn new(operation: Operation, scope: Scope, target: impl Into<String>) -> Self {
        Self {
            operation,
            scope,
            target: target.into(),
            base: None,
            overwrite: false,
        }
    }

    /// Declares the base backup address (`SETTINGS base_backup = ...`).
    pub fn base(mut self, address: Option<String>) -> Self {
        self.base = address;
        self
    }

    /// Allows restoring into non-empty tables. Ignored for BACKUP.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Validates the statement and renders it.
    pub fn build(&self) -> Result<String, ConfigError> {
        if matches!(&self.scope, Scope::AllExceptDatabases(ignored) if ignored.is_empty()) {
            return Err(ConfigError::EmptyIgnoredDatabases);
        }

        let mut query = format!(
            "{} {} {} {}",
            self.operation.keyword(),
            self.scope,
            self.operation.direction(),
            self.target
        );

        let mut settings = Vec::new();
        if let Some(base) = &self.base {
            settings.push(format!("base_backup = {base}"));
        }
        if self.overwrite && self.operation == Operation::Restore {
            settings.push("allow_non_empty_tables = true".to_owned());
        }
        if !settings.is_empty() {
            query.push_str(" SETTINGS ");
            query.push_str(&settings.join(", "));
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_all_with_defaults() {
        let sql = Statement::backup(Scope::default_all(), "File('a.zip')")
            .build()
            .expect("valid");
        assert_eq!(
            sql,
            "BACKUP ALL EXCEPT DATABASES system, information_schema, INFORMATION_SCHEMA TO File('a.zip')"
        );
    }

    #[test]
    fn empty_ignore_list_is_a_config_error() {
        assert_eq!(
            Scope::all_except(Vec::<String>::new()).unwrap_err(),
            ConfigError::EmptyIgnoredDatabases
        );
        let err = Statement::backup(Scope::AllExceptDatabases(Vec::new()), "File('a.zip')")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyIgnoredDatabases);
    }

    #[test]
    fn base_backup_yields_single_settings_clause() {
        let sql = Statement::backup(Scope::all_except(["system"]).expect("scope"), "File('b.zip')")
            .base(Some("File('a.zip')".to_owned()))
            .overwrite(true)
            .build()
            .expect("valid");
        assert_eq!(
            sql,
            "BACKUP ALL EXCEPT DATABASES system TO File('b.zip') SETTINGS base_backup = File('a.zip')"
        );
        assert_eq!(sql.matches("SETTINGS").count(), 1);
    }

    #[test]
    fn restore_settings_share_one_clause() {
        let sql = Statement::restore(Scope::Table("db.t".to_owned()), "Disk('d', 'b')")
            .base(Some("Disk('d', 'a')".to_owned()))
            .overwrite(true)
            .build()
            .expect("valid");
        assert_eq!(
            sql,
            "RESTORE TABLE db.t FROM Disk('d', 'b') SETTINGS base_backup = Disk('d', 'a'), allow_non_empty_tables = true"
        );
    }

    #[test]
    fn renders_named_scopes() {
        let cases = [
            (Scope::Dictionary("db.d".to_owned()), "RESTORE DICTIONARY db.d FROM x"),
            (Scope::Database("db".to_owned()), "RESTORE DATABASE db FROM x"),
            (Scope::TemporaryTable("tmp".to_owned()), "RESTORE TEMPORARY TABLE tmp FROM x"),
            (Scope::View("db.v".to_owned()), "RESTORE VIEW db.v FROM x"),
        ];
        for (scope, expected) in cases {
            assert_eq!(Statement::restore(scope, "x").build().expect("valid"), expected);
        }
    }
}
