// src/lib.rs

//! Manifold
//!
//! Synthesizes the manifest set of a new package version from the previous
//! one and a sparse list of update instructions, then refreshes the
//! file-derived fields (hashes, product codes, Apps & Features data, MSIX
//! identity) from the installer binaries themselves.
//!
//! # Architecture
//!
//! - Manifests: dynamic field bags (`manifest::Value`) checked against a schema
//! - Hoisting: shared installer fields live once at manifest level
//! - Reconciliation: installer entries matched by Query or identity fields
//! - Introspection: Burn bundles, MSIX packages and MSI databases read in place,
//!   never executed

pub mod config;
pub mod download;
mod error;
pub mod installers;
pub mod manifest;
pub mod update;

pub use config::Config;
pub use error::{Error, Result};
pub use manifest::{Manifest, ManifestSet, ManifestType};
pub use update::{InstallerEntry, LocaleEntry, ManifestUpdater, Query, ReconcileMode, UpdateInstructions};
