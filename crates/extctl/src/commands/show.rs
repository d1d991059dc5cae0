//! Show command

use anyhow::{Context as _, Result};
use extctl_core::Context;
use extctl_extensions::{display_name, scan, DirManifestResolver};
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

use super::open_store;
use crate::cli::ShowArgs;
use crate::output;

const COMMIT_WIDTH: usize = 7;

/// One declared or untracked extension
#[derive(Debug, Tabled, Serialize)]
struct ExtensionRow {
    id: String,
    name: String,
    source: String,
    commit: String,
    status: String,
}

/// List declared extensions with their on-disk status, then untracked ones
pub fn run(ctx: &Context, args: ShowArgs) -> Result<()> {
    let store = open_store(ctx)?;
    let extensions_dir = ctx.paths.extensions_dir.as_std_path();
    let resolver = DirManifestResolver::new(extensions_dir);

    let mut on_disk: BTreeMap<_, _> = scan(extensions_dir)
        .with_context(|| format!("Failed to scan {}", ctx.paths.extensions_dir))?
        .into_iter()
        .map(|ext| (ext.id.clone(), ext))
        .collect();

    let mut rows = Vec::with_capacity(store.len() + on_disk.len());
    for (id, record) in store.iter() {
        let status = if on_disk.remove(id).is_some() {
            "installed"
        } else {
            "missing"
        };
        let source = match &record.git_ref {
            Some(reference) => format!("{}#{}", record.url, reference),
            None => record.url.clone(),
        };
        rows.push(ExtensionRow {
            id: id.to_string(),
            name: display_name(&resolver, id),
            source,
            commit: short_commit(record.commit.as_deref()),
            status: status.to_string(),
        });
    }

    for (id, ext) in on_disk {
        rows.push(ExtensionRow {
            id: id.to_string(),
            name: ext
                .manifest
                .map(|m| m.name)
                .unwrap_or_else(|| id.to_string()),
            source: "-".to_string(),
            commit: "-".to_string(),
            status: "untracked".to_string(),
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        output::info("No extensions installed");
    } else {
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }

    Ok(())
}

fn short_commit(commit: Option<&str>) -> String {
    match commit {
        Some(commit) => commit.chars().take(COMMIT_WIDTH).collect(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_commit() {
        assert_eq!(short_commit(Some("4f1c2e0d9a")), "4f1c2e0");
        assert_eq!(short_commit(Some("abc")), "abc");
        assert_eq!(short_commit(None), "-");
    }
}
