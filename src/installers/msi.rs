// src/installers/msi.rs

//! MSI metadata source
//!
//! The core treats MSI property extraction as a black box behind
//! `MsiMetadataSource`. `MsiDatabase` reads the Property table directly
//! from the compound file with the `msi` crate.

use super::traits::InstallerIdentity;
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

pub const PRODUCT_CODE: &str = "ProductCode";
pub const UPGRADE_CODE: &str = "UpgradeCode";
pub const PRODUCT_NAME: &str = "ProductName";
pub const PRODUCT_VERSION: &str = "ProductVersion";

/// Reads properties of an MSI database
pub trait MsiMetadataSource {
    /// Value of a property from the Property table; `None` when absent
    fn read_property(&self, path: &Path, property: &str) -> Result<Option<String>>;

    /// ProductCode, UpgradeCode, ProductName and ProductVersion
    fn read_identity(&self, path: &Path) -> Result<InstallerIdentity> {
        Ok(InstallerIdentity {
            product_code: self.read_property(path, PRODUCT_CODE)?,
            upgrade_code: self.read_property(path, UPGRADE_CODE)?,
            display_name: self.read_property(path, PRODUCT_NAME)?,
            display_version: self.read_property(path, PRODUCT_VERSION)?,
        })
    }
}

/// Property table reader backed by the `msi` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct MsiDatabase;

impl MsiDatabase {
    pub fn new() -> Self {
        Self
    }
}

impl MsiMetadataSource for MsiDatabase {
    fn read_property(&self, path: &Path, property: &str) -> Result<Option<String>> {
        debug!("Reading MSI property {} from {}", property, path.display());

        let mut package = msi::open(path)
            .map_err(|e| Error::ParseError(format!("Failed to open MSI {}: {}", path.display(), e)))?;

        if !package.has_table("Property") {
            return Ok(None);
        }

        let rows = package
            .select_rows(msi::Select::table("Property"))
            .map_err(|e| Error::ParseError(format!("Failed to read Property table: {}", e)))?;

        for row in rows {
            if row["Property"].as_str() == Some(property) {
                return Ok(row["Value"].as_str().map(str::to_string));
            }
        }

        Ok(None)
    }
}
