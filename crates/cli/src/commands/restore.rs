use anyhow::{bail, Result};
use clickhouse_backup_core::{Artifact, BackupTarget, ChainEntry, Scope, Statement};
use owo_colors::OwoColorize;

use super::{list, App};
use crate::cli::RestoreArgs;

const BACKUP_DOCS: &str = "https://clickhouse.com/docs/en/operations/backup";

/// Prints RESTORE statements for the named backup. Nothing is executed.
pub fn run(app: &App, args: &RestoreArgs) -> Result<()> {
    let Some(entry) = app.chains.find(&args.file) else {
        eprintln!("{}", format!("No match for {}! Check the name!\n", args.file).red().bold());
        if !app.chains.is_empty() {
            eprintln!("{}", list::render(&app.chains, &app.config_folder));
        }
        bail!("backup {} not found", args.file);
    };

    let statements = statements(&app.settings.target, &app.settings.scope, &entry, args)?;
    println!(
        "{}",
        "Execute one of the following queries in clickhouse-client to restore the backup.\n".green()
    );
    for (title, sql) in statements {
        println!("{}", format!("{title}:").yellow());
        println!("{}\n", sql.green());
    }
    println!("{}", format!("Check the ClickHouse documentation for more information:\nDocs: {BACKUP_DOCS}").yellow());
    Ok(())
}

/// Titled RESTORE statements: the one requested via `--table`/`--database`/
/// `--overwrite`, or a set of common variants when none of those is given.
pub fn statements(
    target: &BackupTarget,
    default_scope: &Scope,
    entry: &ChainEntry<'_>,
    args: &RestoreArgs,
) -> Result<Vec<(String, String)>> {
    let source = target.address(&entry.name());
    let base = entry.base().map(|b| target.address(&b.name()));
    let render = |scope: Scope, overwrite: bool| {
        Statement::restore(scope, source.clone())
            .base(base.clone())
            .overwrite(overwrite)
            .build()
    };

    let requested = match (&args.table, &args.database) {
        (Some(table), _) => Some(Scope::Table(table.clone())),
        (None, Some(database)) => Some(Scope::Database(database.clone())),
        (None, None) if args.overwrite => Some(default_scope.clone()),
        (None, None) => None,
    };
    if let Some(scope) = requested {
        return Ok(vec![("Restore".to_owned(), render(scope, args.overwrite)?)]);
    }

    let table = || Scope::Table("database.table".to_owned());
    let examples = [
        ("Restore all databases except the ignored ones", default_scope.clone(), false),
        ("Force restore all databases and overwrite existing data", default_scope.clone(), true),
        ("Restore a specific table", table(), false),
        ("Force restore a specific table", table(), true),
        (
            "Restore a specific table to a new table",
            Scope::Table("database.table AS database.new_table".to_owned()),
            false,
        ),
    ];
    let rendered = examples
        .into_iter()
        .map(|(title, scope, overwrite)| render(scope, overwrite).map(|sql| (title.to_owned(), sql)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered)
}
