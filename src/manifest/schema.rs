// src/manifest/schema.rs

//! Manifest schema lookup
//!
//! The core consumes schema definitions rather than authoring them. A
//! `SchemaProvider` answers two questions: which keys are legal (and in what
//! order they are written), and what a legal value for a key looks like.
//! `WingetSchema` is the built-in provider for manifest schema 1.10.0.

use super::ManifestType;
use std::collections::HashMap;

/// JSON-schema style type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Array,
    Object,
}

/// String formats checked beyond the pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// `YYYY-MM-DD`
    Date,
}

/// Definition of a single field
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub pattern: Option<&'static str>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub enum_values: Option<&'static [&'static str]>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub format: Option<FieldFormat>,
    pub items: Option<Box<FieldSchema>>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
}

impl FieldSchema {
    fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            pattern: None,
            min_length: None,
            max_length: None,
            enum_values: None,
            minimum: None,
            maximum: None,
            format: None,
            items: None,
            max_items: None,
            unique_items: false,
        }
    }

    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::of(FieldType::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    pub fn object() -> Self {
        Self::of(FieldType::Object)
    }

    pub fn array(items: FieldSchema) -> Self {
        Self {
            items: Some(Box::new(items)),
            unique_items: true,
            ..Self::of(FieldType::Array)
        }
    }

    pub fn pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.minimum = Some(min);
        self.maximum = Some(max);
        self
    }

    pub fn format(mut self, format: FieldFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }
}

/// Source of field definitions and key ordering
pub trait SchemaProvider {
    /// Definition of an installer-level (or installer-manifest root) field
    fn installer_field(&self, key: &str) -> Option<&FieldSchema>;

    /// Definition of a locale manifest field
    fn locale_field(&self, key: &str) -> Option<&FieldSchema>;

    /// Legal keys of a manifest, in serialization order
    fn ordered_keys(&self, manifest_type: ManifestType) -> &[&'static str];

    /// Legal keys of an installer record, in serialization order
    fn installer_keys(&self) -> &[&'static str];

    /// Keys that may live either at installer-manifest level or on each
    /// installer
    fn hoistable_keys(&self) -> Vec<&'static str> {
        let root = self.ordered_keys(ManifestType::Installer);
        self.installer_keys()
            .iter()
            .filter(|key| root.contains(key))
            .copied()
            .collect()
    }
}

const ARCHITECTURES: &[&str] = &["x86", "x64", "arm", "arm64", "neutral"];
const INSTALLER_TYPES: &[&str] = &[
    "msix", "msi", "appx", "exe", "zip", "inno", "nullsoft", "wix", "burn", "pwa", "portable", "font",
];
const NESTED_INSTALLER_TYPES: &[&str] = &[
    "msix", "msi", "appx", "exe", "inno", "nullsoft", "wix", "burn", "portable", "font",
];
const SCOPES: &[&str] = &["user", "machine"];
const PLATFORMS: &[&str] = &["Windows.Desktop", "Windows.Universal"];
const INSTALL_MODES: &[&str] = &["interactive", "silent", "silentWithProgress"];
const UPGRADE_BEHAVIORS: &[&str] = &["install", "uninstallPrevious", "deny"];
const ELEVATION_REQUIREMENTS: &[&str] = &["elevationRequired", "elevationProhibited", "elevatesSelf"];
const REPAIR_BEHAVIORS: &[&str] = &["modify", "uninstaller", "installer"];
const UNSUPPORTED_ARGUMENTS: &[&str] = &["log", "location"];
const UNSUPPORTED_ARCHITECTURES: &[&str] = &["x86", "x64", "arm", "arm64"];

const LOCALE_PATTERN: &str = r"^([a-zA-Z]{2,3}|[iI]-[a-zA-Z]+|[xX]-[a-zA-Z]{1,8})(-[a-zA-Z]{1,8})*$";
const SHA256_PATTERN: &str = r"^[A-Fa-f0-9]{64}$";
const URL_PATTERN: &str = r"^([Hh][Tt][Tt][Pp][Ss]?)://.+$";
const VERSION_PATTERN: &str = r"^(0|[1-9]\d{0,4})(\.(0|[1-9]\d{0,4})){0,3}$";
const FAMILY_NAME_PATTERN: &str = r"^[A-Za-z0-9][-\.A-Za-z0-9]+_[A-Za-z0-9]{13}$";
const IDENTIFIER_PATTERN: &str = r#"^[^\.\s\\/:\*\?"<>\|\x01-\x1f]{1,32}(\.[^\.\s\\/:\*\?"<>\|\x01-\x1f]{1,32}){1,7}$"#;
const PACKAGE_VERSION_PATTERN: &str = r#"^[^\\/:\*\?"<>\|\x01-\x1f]+$"#;
const FILE_EXTENSION_PATTERN: &str = r#"^[^\\/:\*\?"<>\|\x01-\x1f]+$"#;
const COMMAND_PATTERN: &str = r"^\S+$";
const PROTOCOL_PATTERN: &str = r"^[a-z][-a-z0-9\.\+]*$";
const TAG_PATTERN: &str = r"^\S+$";

const VERSION_KEYS: &[&str] = &[
    "PackageIdentifier",
    "PackageVersion",
    "DefaultLocale",
    "ManifestType",
    "ManifestVersion",
];

const INSTALLER_ROOT_KEYS: &[&str] = &[
    "PackageIdentifier",
    "PackageVersion",
    "Channel",
    "InstallerLocale",
    "Platform",
    "MinimumOSVersion",
    "InstallerType",
    "NestedInstallerType",
    "NestedInstallerFiles",
    "Scope",
    "InstallModes",
    "InstallerSwitches",
    "InstallerSuccessCodes",
    "ExpectedReturnCodes",
    "UpgradeBehavior",
    "Commands",
    "Protocols",
    "FileExtensions",
    "Dependencies",
    "PackageFamilyName",
    "ProductCode",
    "Capabilities",
    "RestrictedCapabilities",
    "Markets",
    "InstallerAbortsTerminal",
    "ReleaseDate",
    "InstallLocationRequired",
    "RequireExplicitUpgrade",
    "DisplayInstallWarnings",
    "UnsupportedOSArchitectures",
    "UnsupportedArguments",
    "AppsAndFeaturesEntries",
    "ElevationRequirement",
    "InstallationMetadata",
    "DownloadCommandProhibited",
    "RepairBehavior",
    "ArchiveBinariesDependOnPath",
    "Authentication",
    "Installers",
    "ManifestType",
    "ManifestVersion",
];

const INSTALLER_KEYS: &[&str] = &[
    "InstallerLocale",
    "Platform",
    "MinimumOSVersion",
    "Architecture",
    "InstallerType",
    "NestedInstallerType",
    "NestedInstallerFiles",
    "Scope",
    "InstallerUrl",
    "InstallerSha256",
    "SignatureSha256",
    "InstallModes",
    "InstallerSwitches",
    "InstallerSuccessCodes",
    "ExpectedReturnCodes",
    "UpgradeBehavior",
    "Commands",
    "Protocols",
    "FileExtensions",
    "Dependencies",
    "PackageFamilyName",
    "ProductCode",
    "Capabilities",
    "RestrictedCapabilities",
    "Markets",
    "InstallerAbortsTerminal",
    "ReleaseDate",
    "InstallLocationRequired",
    "RequireExplicitUpgrade",
    "DisplayInstallWarnings",
    "UnsupportedOSArchitectures",
    "UnsupportedArguments",
    "AppsAndFeaturesEntries",
    "ElevationRequirement",
    "InstallationMetadata",
    "DownloadCommandProhibited",
    "RepairBehavior",
    "ArchiveBinariesDependOnPath",
    "Authentication",
];

const LOCALE_KEYS: &[&str] = &[
    "PackageIdentifier",
    "PackageVersion",
    "PackageLocale",
    "Publisher",
    "PublisherUrl",
    "PublisherSupportUrl",
    "PrivacyUrl",
    "Author",
    "PackageName",
    "PackageUrl",
    "License",
    "LicenseUrl",
    "Copyright",
    "CopyrightUrl",
    "ShortDescription",
    "Description",
    "Moniker",
    "Tags",
    "Agreements",
    "ReleaseNotes",
    "ReleaseNotesUrl",
    "PurchaseUrl",
    "InstallationNotes",
    "Documentations",
    "Icons",
    "ManifestType",
    "ManifestVersion",
];

/// Built-in schema for manifest schema 1.10.0
pub struct WingetSchema {
    installer_fields: HashMap<&'static str, FieldSchema>,
    locale_fields: HashMap<&'static str, FieldSchema>,
}

impl WingetSchema {
    pub fn new() -> Self {
        Self {
            installer_fields: Self::installer_definitions(),
            locale_fields: Self::locale_definitions(),
        }
    }

    fn installer_definitions() -> HashMap<&'static str, FieldSchema> {
        use FieldSchema as F;

        let url = || F::string().pattern(URL_PATTERN).length(0, 2048);
        let sha256 = || F::string().pattern(SHA256_PATTERN);

        HashMap::from([
            ("PackageIdentifier", F::string().pattern(IDENTIFIER_PATTERN).length(0, 128)),
            ("PackageVersion", F::string().pattern(PACKAGE_VERSION_PATTERN).length(1, 128)),
            ("Channel", F::string().length(1, 16)),
            ("InstallerLocale", F::string().pattern(LOCALE_PATTERN).length(0, 20)),
            ("Platform", F::array(F::string().one_of(PLATFORMS)).max_items(2)),
            ("MinimumOSVersion", F::string().pattern(VERSION_PATTERN)),
            ("Architecture", F::string().one_of(ARCHITECTURES)),
            ("InstallerType", F::string().one_of(INSTALLER_TYPES)),
            ("NestedInstallerType", F::string().one_of(NESTED_INSTALLER_TYPES)),
            ("NestedInstallerFiles", F::array(F::object()).max_items(1024)),
            ("Scope", F::string().one_of(SCOPES)),
            ("InstallerUrl", url()),
            ("InstallerSha256", sha256()),
            ("SignatureSha256", sha256()),
            ("InstallModes", F::array(F::string().one_of(INSTALL_MODES)).max_items(3)),
            ("InstallerSwitches", F::object()),
            (
                "InstallerSuccessCodes",
                F::array(F::integer().range(i32::MIN as i64, u32::MAX as i64)).max_items(16),
            ),
            ("ExpectedReturnCodes", F::array(F::object()).max_items(128)),
            ("UpgradeBehavior", F::string().one_of(UPGRADE_BEHAVIORS)),
            ("Commands", F::array(F::string().pattern(COMMAND_PATTERN).length(1, 40)).max_items(16)),
            ("Protocols", F::array(F::string().pattern(PROTOCOL_PATTERN).length(0, 2048)).max_items(64)),
            (
                "FileExtensions",
                F::array(F::string().pattern(FILE_EXTENSION_PATTERN).length(0, 64)).max_items(512),
            ),
            ("Dependencies", F::object()),
            ("PackageFamilyName", F::string().pattern(FAMILY_NAME_PATTERN).length(0, 255)),
            ("ProductCode", F::string().length(1, 255)),
            ("Capabilities", F::array(F::string().length(1, 40)).max_items(1000)),
            ("RestrictedCapabilities", F::array(F::string().length(1, 40)).max_items(1000)),
            ("Markets", F::object()),
            ("InstallerAbortsTerminal", F::boolean()),
            ("ReleaseDate", F::string().format(FieldFormat::Date)),
            ("InstallLocationRequired", F::boolean()),
            ("RequireExplicitUpgrade", F::boolean()),
            ("DisplayInstallWarnings", F::boolean()),
            (
                "UnsupportedOSArchitectures",
                F::array(F::string().one_of(UNSUPPORTED_ARCHITECTURES)).max_items(4),
            ),
            ("UnsupportedArguments", F::array(F::string().one_of(UNSUPPORTED_ARGUMENTS)).max_items(2)),
            ("AppsAndFeaturesEntries", F::array(F::object()).max_items(128)),
            ("ElevationRequirement", F::string().one_of(ELEVATION_REQUIREMENTS)),
            ("InstallationMetadata", F::object()),
            ("DownloadCommandProhibited", F::boolean()),
            ("RepairBehavior", F::string().one_of(REPAIR_BEHAVIORS)),
            ("ArchiveBinariesDependOnPath", F::boolean()),
            ("Authentication", F::object()),
        ])
    }

    fn locale_definitions() -> HashMap<&'static str, FieldSchema> {
        use FieldSchema as F;

        let url = || F::string().pattern(URL_PATTERN).length(0, 2048);

        HashMap::from([
            ("PackageLocale", F::string().pattern(LOCALE_PATTERN).length(0, 20)),
            ("Publisher", F::string().length(2, 256)),
            ("PublisherUrl", url()),
            ("PublisherSupportUrl", url()),
            ("PrivacyUrl", url()),
            ("Author", F::string().length(2, 256)),
            ("PackageName", F::string().length(2, 256)),
            ("PackageUrl", url()),
            ("License", F::string().length(3, 512)),
            ("LicenseUrl", url()),
            ("Copyright", F::string().length(3, 512)),
            ("CopyrightUrl", url()),
            ("ShortDescription", F::string().length(3, 256)),
            ("Description", F::string().length(3, 10000)),
            ("Moniker", F::string().pattern(TAG_PATTERN).length(1, 40)),
            ("Tags", F::array(F::string().pattern(TAG_PATTERN).length(1, 40)).max_items(16)),
            ("Agreements", F::array(F::object()).max_items(128)),
            ("ReleaseNotes", F::string().length(1, 10000)),
            ("ReleaseNotesUrl", url()),
            ("PurchaseUrl", url()),
            ("InstallationNotes", F::string().length(1, 10000)),
            ("Documentations", F::array(F::object()).max_items(256)),
            ("Icons", F::array(F::object()).max_items(1024)),
        ])
    }
}

impl Default for WingetSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaProvider for WingetSchema {
    fn installer_field(&self, key: &str) -> Option<&FieldSchema> {
        self.installer_fields.get(key)
    }

    fn locale_field(&self, key: &str) -> Option<&FieldSchema> {
        self.locale_fields.get(key)
    }

    fn ordered_keys(&self, manifest_type: ManifestType) -> &[&'static str] {
        match manifest_type {
            ManifestType::Version => VERSION_KEYS,
            ManifestType::Installer => INSTALLER_ROOT_KEYS,
            ManifestType::DefaultLocale | ManifestType::Locale => LOCALE_KEYS,
        }
    }

    fn installer_keys(&self) -> &[&'static str] {
        INSTALLER_KEYS
    }
}
