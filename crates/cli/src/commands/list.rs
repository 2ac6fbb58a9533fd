use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Result};
use clickhouse_backup_core::{Artifact, ChainMap};
use owo_colors::OwoColorize;

use super::App;

pub fn run(app: &App) -> Result<()> {
    if app.chains.is_empty() {
        bail!("no backups found in {}; create a backup first", app.repo.location());
    }
    println!("{}", render(&app.chains, &app.config_folder));
    Ok(())
}

/// Chains oldest first, each with its incrementals, followed by the restore
/// hint for the newest artifact.
pub fn render(chains: &ChainMap, config_folder: &Path) -> String {
    let mut out = format!("{}\n", "Listing backups:".green().bold());
    let mut newest = None;

    for full in chains.iter() {
        newest = Some(full.name());
        let _ = writeln!(
            out,
            "{}",
            format!("{} @ {}", full.name(), full.timestamp().display_long()).cyan()
        );
        if full.incrementals().is_empty() {
            let _ = writeln!(out, "\t{}", "No incremental backups.".red());
        } else {
            let _ = writeln!(out, "\t{}", "Incremental backups:".bright_green());
        }
        for inc in full.incrementals() {
            newest = Some(inc.name());
            let _ = writeln!(
                out,
                "\t\t{}",
                format!("{} @ {}", inc.name(), inc.timestamp().display_long()).yellow()
            );
        }
        out.push('\n');
    }

    if let Some(newest) = newest {
        out.push_str(
            "To get the restore statement for a backup call the restore command with its name.\n\
             E.g. for the newest one:\n",
        );
        let _ = write!(
            out,
            "{}",
            format!(
                "clickhouse-backup -c {} restore -f {newest}",
                config_folder.display()
            )
            .green()
        );
    }
    out
}
