// src/manifest/mod.rs

//! Manifest sets
//!
//! A package version is described by three kinds of documents sharing a
//! package identifier and version:
//! - the version manifest (routing and default-locale pointer)
//! - at most one installer manifest (installer records plus shared defaults)
//! - locale manifests (one default plus per-locale overlays)

pub mod canonical;
pub mod schema;
pub mod validate;
pub mod value;

pub use schema::{FieldSchema, SchemaProvider, WingetSchema};
pub use validate::{SchemaValidator, ValidationError, Validator};
pub use value::{FieldMap, Value};

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Kind of manifest document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestType {
    Version,
    Installer,
    DefaultLocale,
    Locale,
}

impl ManifestType {
    pub fn as_str(&self) -> &str {
        match self {
            ManifestType::Version => "version",
            ManifestType::Installer => "installer",
            ManifestType::DefaultLocale => "defaultLocale",
            ManifestType::Locale => "locale",
        }
    }
}

impl FromStr for ManifestType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "version" => Ok(ManifestType::Version),
            "installer" => Ok(ManifestType::Installer),
            "defaultLocale" => Ok(ManifestType::DefaultLocale),
            "locale" => Ok(ManifestType::Locale),
            _ => Err(Error::UnknownManifestType(s.to_string())),
        }
    }
}

/// One manifest document
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub manifest_type: ManifestType,
    pub fields: FieldMap,
}

impl Manifest {
    pub fn new(manifest_type: ManifestType, fields: FieldMap) -> Self {
        Self { manifest_type, fields }
    }

    /// Build a manifest from a parsed document, using its ManifestType field
    pub fn from_fields(fields: FieldMap) -> Result<Self> {
        let manifest_type = fields
            .get_str("ManifestType")
            .ok_or_else(|| Error::UnknownManifestType("<missing>".to_string()))?
            .parse()?;
        Ok(Self { manifest_type, fields })
    }

    /// Parse a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let fields = FieldMap::from_yaml(content)?;
        Self::from_fields(fields)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.fields)?)
    }

    pub fn package_identifier(&self) -> Option<&str> {
        self.fields.get_str("PackageIdentifier")
    }

    /// Locale tag of a locale manifest
    pub fn locale(&self) -> Option<&str> {
        self.fields.get_str("PackageLocale")
    }

    /// Conventional file name of this document
    pub fn file_name(&self) -> String {
        let id = self.package_identifier().unwrap_or("manifest");
        match self.manifest_type {
            ManifestType::Version => format!("{}.yaml", id),
            ManifestType::Installer => format!("{}.installer.yaml", id),
            ManifestType::DefaultLocale | ManifestType::Locale => {
                format!("{}.locale.{}.yaml", id, self.locale().unwrap_or("und"))
            }
        }
    }

    /// Installer records of an installer manifest
    pub fn installers(&self) -> Vec<FieldMap> {
        self.fields
            .get("Installers")
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_map).cloned().collect())
            .unwrap_or_default()
    }

    /// Order fields (and installer record fields) the way the schema lists them
    pub fn sort_keys(&mut self, schema: &dyn SchemaProvider) {
        self.fields.sort_by_key_order(schema.ordered_keys(self.manifest_type));
        if let Some(items) = self.fields.get_mut("Installers").and_then(Value::as_list_mut) {
            for item in items.iter_mut() {
                if let Some(installer) = item.as_map_mut() {
                    installer.sort_by_key_order(schema.installer_keys());
                }
            }
        }
    }
}

/// The version/installer/locale document triple for one package version
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestSet {
    pub version: Manifest,
    pub installer: Option<Manifest>,
    pub locales: Vec<Manifest>,
}

impl ManifestSet {
    /// Group documents into a set, enforcing the set invariants
    pub fn from_manifests(manifests: Vec<Manifest>) -> Result<Self> {
        let mut version = None;
        let mut installer = None;
        let mut locales: Vec<Manifest> = Vec::new();

        for manifest in manifests {
            match manifest.manifest_type {
                ManifestType::Version => {
                    if version.replace(manifest).is_some() {
                        return Err(Error::MultipleVersionManifests);
                    }
                }
                ManifestType::Installer => {
                    if installer.replace(manifest).is_some() {
                        return Err(Error::MultipleInstallerManifests);
                    }
                }
                ManifestType::DefaultLocale | ManifestType::Locale => {
                    let tag = manifest.locale().unwrap_or_default().to_string();
                    if locales
                        .iter()
                        .any(|existing| existing.locale().unwrap_or_default().eq_ignore_ascii_case(&tag))
                    {
                        return Err(Error::DuplicateLocale(tag));
                    }
                    locales.push(manifest);
                }
            }
        }

        Ok(Self {
            version: version.ok_or(Error::MissingVersionManifest)?,
            installer,
            locales,
        })
    }

    /// Read every `.yaml` document in a directory
    pub fn read_dir(dir: &Path) -> Result<Self> {
        let mut manifests = Vec::new();
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            })
            .collect();
        paths.sort();

        for path in paths {
            debug!("Reading manifest: {}", path.display());
            let content = fs::read_to_string(&path)?;
            manifests.push(Manifest::from_yaml(&content)?);
        }

        Self::from_manifests(manifests)
    }

    /// Write every document into a directory using conventional file names
    pub fn write_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        for manifest in self.manifests() {
            let path = dir.join(manifest.file_name());
            debug!("Writing manifest: {}", path.display());
            fs::write(&path, manifest.to_yaml()?)?;
        }
        Ok(())
    }

    pub fn manifests(&self) -> impl Iterator<Item = &Manifest> {
        std::iter::once(&self.version)
            .chain(self.installer.iter())
            .chain(self.locales.iter())
    }

    pub fn manifests_mut(&mut self) -> impl Iterator<Item = &mut Manifest> {
        std::iter::once(&mut self.version)
            .chain(self.installer.iter_mut())
            .chain(self.locales.iter_mut())
    }

    /// Default locale tag named by the version manifest
    pub fn default_locale_tag(&self) -> Option<&str> {
        self.version.fields.get_str("DefaultLocale")
    }

    /// Locale manifest with the given tag (case-insensitive)
    pub fn locale_mut(&mut self, tag: &str) -> Option<&mut Manifest> {
        self.locales
            .iter_mut()
            .find(|m| m.locale().is_some_and(|l| l.eq_ignore_ascii_case(tag)))
    }

    /// The default locale manifest
    pub fn default_locale_mut(&mut self) -> Option<&mut Manifest> {
        let index = self
            .locales
            .iter()
            .position(|m| m.manifest_type == ManifestType::DefaultLocale)?;
        self.locales.get_mut(index)
    }
}
