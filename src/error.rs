// src/error.rs

use thiserror::Error;

/// Core error types for Manifold
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container errors (MSIX/APPX packages, archive installers)
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML errors from Burn or Appx manifests
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// YAML (de)serialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Download failures (after the user agent retry)
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Malformed document or unexpected data
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A field key that the manifest schema does not know
    #[error("Unrecognized key '{0}'")]
    UnrecognizedKey(String),

    /// The Query of an installer entry is not a mapping
    #[error("Invalid Query: {0}")]
    InvalidQuery(String),

    /// No installer entry matched an existing installer (update mode)
    #[error("No installer entry matches installer {0}")]
    UnmatchedInstaller(String),

    /// No existing installer matched an installer entry (replace mode)
    #[error("No installer matches the entry with Query {0}")]
    UnmatchedEntry(String),

    /// More than one version manifest in a manifest set
    #[error("Manifest set contains more than one version manifest")]
    MultipleVersionManifests,

    /// More than one installer manifest in a manifest set
    #[error("Manifest set contains more than one installer manifest")]
    MultipleInstallerManifests,

    /// No version manifest in a manifest set
    #[error("Manifest set has no version manifest")]
    MissingVersionManifest,

    /// Two locale manifests with the same locale tag
    #[error("Locale manifest '{0}' appears more than once")]
    DuplicateLocale(String),

    /// A locale entry names a locale the manifest set does not have
    #[error("No locale manifest for '{0}'")]
    UnknownLocale(String),

    /// A manifest document without a usable ManifestType
    #[error("Unknown manifest type: {0}")]
    UnknownManifestType(String),

    /// An expected value could not be recovered from an installer file
    #[error("Failed to extract {field} from {path}")]
    ExtractionFailed { field: String, path: String },

    /// The file is not a PE image
    #[error("Not a PE file: {0}")]
    NotPeFile(String),

    /// The PE image has no .wixburn section
    #[error("Not a Burn bundle: no .wixburn section")]
    NotBurnBundle,

    /// The .wixburn section is smaller than the fixed header
    #[error("Burn section too small: {0} bytes")]
    BurnSectionTooSmall(u32),

    /// The .wixburn section carries the wrong magic number
    #[error("Invalid Burn section magic: {0:#010x}")]
    InvalidBurnMagic(u32),

    /// The .wixburn section version is not supported
    #[error("Unsupported Burn section version: {0}")]
    UnsupportedBurnVersion(u32),

    /// Only cabinet containers (format 1) are supported
    #[error("Unsupported Burn container format: {0}")]
    UnsupportedContainerFormat(u32),

    /// The declared container count does not fit in the section
    #[error("Burn section declares {count} containers but only has room for {capacity}")]
    BurnContainerOverflow { count: u32, capacity: u32 },

    /// The bundle has no UX container
    #[error("Burn bundle has no UX container")]
    MissingUxContainer,

    /// A UX payload was requested that the bundle does not carry
    #[error("UX payload not found: {0}")]
    UxPayloadNotFound(String),

    /// Neither AppxManifest.xml nor AppxBundleManifest.xml found
    #[error("No Appx manifest found in {0}")]
    MsixManifestMissing(String),

    /// The package is not signed
    #[error("No AppxSignature.p7x found in {0}")]
    MsixSignatureMissing(String),
}

/// Result type alias using Manifold's Error type
pub type Result<T> = std::result::Result<T, Error>;
