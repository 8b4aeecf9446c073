// src/installers/traits.rs

//! Common traits for installer format readers

use crate::error::Result;
use std::path::Path;

/// Identity facts recovered from an installer file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallerIdentity {
    pub product_code: Option<String>,
    pub upgrade_code: Option<String>,
    pub display_name: Option<String>,
    pub display_version: Option<String>,
}

/// Common interface for installer formats that are parsed directly
pub trait InstallerFormat {
    /// Parse an installer file from the given path
    fn parse(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Identity facts of the installer
    fn identity(&self) -> &InstallerIdentity;

    /// Product code as written to Apps and Features
    fn product_code(&self) -> Option<&str> {
        self.identity().product_code.as_deref()
    }

    /// Upgrade code shared by all versions of the product
    fn upgrade_code(&self) -> Option<&str> {
        self.identity().upgrade_code.as_deref()
    }

    /// Display name as written to Apps and Features
    fn display_name(&self) -> Option<&str> {
        self.identity().display_name.as_deref()
    }

    /// Display version as written to Apps and Features
    fn display_version(&self) -> Option<&str> {
        self.identity().display_version.as_deref()
    }
}
