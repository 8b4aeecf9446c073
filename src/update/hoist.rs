// src/update/hoist.rs

//! Key-level hoisting between the installer manifest and its installers
//!
//! Fields such as `InstallerType` or `InstallerSwitches` may be written
//! once at manifest level or repeated on every installer. Reconciliation
//! works on fully expanded installers (push) and the result is folded back
//! (pull) so shared values are written once.

use crate::manifest::canonical::{all_equal, structurally_equal};
use crate::manifest::{FieldMap, Value};
use tracing::debug;

/// Copy manifest-level fields onto every installer that lacks them
///
/// Installer values win; when both sides are mappings the push descends
/// (up to `max_depth` levels) and fills in only the missing sub-keys. The
/// manifest key is removed only when every installer ends up carrying each
/// part of it. Otherwise, or when there are no installers, it stays.
pub fn push_to_installer_level(
    manifest: &mut FieldMap,
    installers: &mut [FieldMap],
    allowed_keys: &[&str],
    max_depth: usize,
) {
    if installers.is_empty() || max_depth == 0 {
        return;
    }

    for key in allowed_keys {
        let Some(value) = manifest.get(key).cloned() else {
            continue;
        };

        let mut covered = true;
        for installer in installers.iter_mut() {
            covered &= push_value(installer, key, &value, max_depth);
        }

        if covered {
            manifest.remove(key);
        } else {
            debug!("Keeping {} at manifest level, some installers do not carry all of it", key);
        }
    }
}

/// Push `value` under `key`; returns whether `target` now carries every
/// part of it
fn push_value(target: &mut FieldMap, key: &str, value: &Value, depth: usize) -> bool {
    match (target.get_mut(key), value) {
        (None, _) => {
            target.insert(key, value.clone());
            true
        }
        (Some(Value::Map(existing)), Value::Map(defaults)) if depth > 1 => {
            let mut covered = true;
            for (sub_key, sub_value) in defaults.iter() {
                covered &= push_value(existing, sub_key, sub_value, depth - 1);
            }
            covered
        }
        (Some(Value::Map(existing)), Value::Map(defaults)) => defaults.keys().all(|sub_key| existing.contains_key(sub_key)),
        (Some(_), _) => true,
    }
}

/// Lift fields every installer shares onto the manifest
///
/// A key moves only when every installer defines it with structurally
/// equal values. When every installer holds a mapping under the key but
/// the mappings differ, the same rule is applied per sub-key (up to
/// `max_depth` levels), merging into the manifest-level mapping.
pub fn pull_to_manifest_level(
    installers: &mut [FieldMap],
    manifest: &mut FieldMap,
    allowed_keys: &[&str],
    max_depth: usize,
) {
    if installers.is_empty() || max_depth == 0 {
        return;
    }

    let mut targets: Vec<&mut FieldMap> = installers.iter_mut().collect();
    let keys: Vec<String> = allowed_keys.iter().map(|key| key.to_string()).collect();
    pull_fields(&mut targets, manifest, &keys, max_depth);
}

fn pull_fields(installers: &mut [&mut FieldMap], target: &mut FieldMap, keys: &[String], depth: usize) {
    for key in keys {
        if !installers.iter().all(|installer| installer.contains_key(key)) {
            continue;
        }

        // A value kept at this level by the push is never overwritten
        let held = target.get(key);
        let shared_value = installers.first().and_then(|installer| installer.get(key));
        if held.zip(shared_value).is_some_and(|(held, shared)| !structurally_equal(held, shared))
            && all_equal(installers.iter().filter_map(|installer| installer.get(key)))
        {
            continue;
        }

        if all_equal(installers.iter().filter_map(|installer| installer.get(key))) {
            let mut value = None;
            for installer in installers.iter_mut() {
                value = installer.remove(key);
            }
            if let Some(value) = value {
                target.insert(key.as_str(), value);
            }
            continue;
        }

        let all_maps = installers
            .iter()
            .all(|installer| matches!(installer.get(key), Some(Value::Map(_))));
        if !all_maps || depth <= 1 || target.get(key).is_some_and(|held| held.as_map().is_none()) {
            continue;
        }

        let mut shared = match target.get(key) {
            Some(Value::Map(existing)) => existing.clone(),
            _ => FieldMap::new(),
        };

        {
            let sub_keys: Vec<String> = installers
                .first()
                .and_then(|installer| installer.get(key))
                .and_then(Value::as_map)
                .map(|first| first.keys().map(str::to_string).collect())
                .unwrap_or_default();

            let mut nested: Vec<&mut FieldMap> = installers
                .iter_mut()
                .filter_map(|installer| installer.get_mut(key).and_then(Value::as_map_mut))
                .collect();
            pull_fields(&mut nested, &mut shared, &sub_keys, depth - 1);
        }

        for installer in installers.iter_mut() {
            if installer.get(key).and_then(Value::as_map).is_some_and(FieldMap::is_empty) {
                installer.remove(key);
            }
        }

        if !shared.is_empty() {
            target.insert(key.as_str(), shared);
        }
    }
}
