// src/update/installers.rs

//! Installer entry reconciliation
//!
//! Pairs old installer records with entries, applies the entry overrides
//! onto a copy of the matched record and runs the metadata orchestrator on
//! the result.

use super::entry::{describe_identity, InstallerEntry, ReconcileMode};
use super::metadata;
use super::ReconcileContext;
use crate::error::{Error, Result};
use crate::manifest::FieldMap;
use tracing::{debug, info, warn};

/// Fields that describe one specific installer file and never survive a
/// template copy
pub const VOLATILE_FIELDS: &[&str] = &["InstallerSha256", "ReleaseDate"];

/// Reconcile `old_installers` against `entries`
///
/// Run-cache downloads touched by this call are released on success and
/// on failure.
pub fn reconcile_installers(
    ctx: &mut ReconcileContext<'_>,
    mode: ReconcileMode,
    old_installers: &[FieldMap],
    entries: &[InstallerEntry],
) -> Result<Vec<FieldMap>> {
    if entries.is_empty() {
        info!("No installer entries, keeping {} installers", old_installers.len());
        return Ok(old_installers.to_vec());
    }

    let result = match mode {
        ReconcileMode::Update => update_installers(ctx, old_installers, entries),
        ReconcileMode::Replace => replace_installers(ctx, old_installers, entries),
    };

    ctx.release_touched();
    result
}

/// Every old installer is updated by the last entry that matches it
fn update_installers(
    ctx: &mut ReconcileContext<'_>,
    old_installers: &[FieldMap],
    entries: &[InstallerEntry],
) -> Result<Vec<FieldMap>> {
    let mut results: Vec<FieldMap> = Vec::with_capacity(old_installers.len());

    for old in old_installers {
        let entry = entries
            .iter()
            .rev()
            .find(|entry| entry.matches(old))
            .ok_or_else(|| Error::UnmatchedInstaller(describe_identity(old)))?;

        debug!("Updating installer {} from entry {}", describe_identity(old), entry.describe());
        let installer = apply_entry(ctx, old, entry)?;
        let installer = metadata::resolve(ctx, installer, old, entry, &results)?;
        results.push(installer);
    }

    Ok(results)
}

/// Every entry produces one installer, templated on the first old
/// installer it matches
fn replace_installers(
    ctx: &mut ReconcileContext<'_>,
    old_installers: &[FieldMap],
    entries: &[InstallerEntry],
) -> Result<Vec<FieldMap>> {
    let mut results: Vec<FieldMap> = Vec::with_capacity(entries.len());

    for entry in entries {
        let template = old_installers
            .iter()
            .find(|old| entry.matches(old))
            .ok_or_else(|| Error::UnmatchedEntry(entry.describe()))?;

        debug!("Replacing with entry {} templated on {}", entry.describe(), describe_identity(template));
        let installer = apply_entry(ctx, template, entry)?;
        let installer = metadata::resolve(ctx, installer, template, entry, &results)?;
        results.push(installer);
    }

    Ok(results)
}

/// Copy the template, drop volatile fields and write the entry's fields
///
/// Values failing validation are discarded with a warning.
pub(crate) fn apply_entry(ctx: &ReconcileContext<'_>, template: &FieldMap, entry: &InstallerEntry) -> Result<FieldMap> {
    let mut installer = template.clone();
    for key in VOLATILE_FIELDS {
        installer.remove(key);
    }

    for (key, value) in entry.applicable_fields() {
        let schema = ctx
            .schema
            .installer_field(key)
            .ok_or_else(|| Error::UnrecognizedKey(key.to_string()))?;

        match ctx.validator.validate(value, schema) {
            Ok(()) => {
                installer.insert(key, value.clone());
            }
            Err(e) => warn!("Discarding invalid {} '{}': {}", key, value, e),
        }
    }

    Ok(installer)
}
