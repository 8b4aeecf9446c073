// src/installers/msix.rs

//! MSIX/APPX package reader
//!
//! Packages and bundles are zip containers. Identity comes from the
//! `Identity` element of the package (or bundle) manifest; the signature
//! hash is taken over the `AppxSignature.p7x` entry.

use super::first_element;
use super::traits::{InstallerFormat, InstallerIdentity};
use super::decode_xml;
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

pub const APPX_MANIFEST: &str = "AppxManifest.xml";
pub const APPX_BUNDLE_MANIFEST: &str = "AppxMetadata/AppxBundleManifest.xml";
pub const APPX_SIGNATURE: &str = "AppxSignature.p7x";

/// Alphabet of the publisher hash; no `i`, `l`, `o` or `u`
const PUBLISHER_HASH_ALPHABET: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

/// Identity of an MSIX package or bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsixIdentity {
    pub name: String,
    pub publisher: String,
    pub version: String,
}

impl MsixIdentity {
    pub fn family_name(&self) -> String {
        family_name(&self.name, &self.publisher)
    }
}

/// 13-character publisher hash used in package family names
///
/// SHA-256 over the UTF-16LE publisher, first 8 bytes read as 64 bits,
/// padded with one zero bit to 65, then encoded 5 bits per character.
pub fn publisher_hash(publisher: &str) -> String {
    let utf16: Vec<u8> = publisher.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let digest = Sha256::digest(&utf16);

    let mut bits: String = digest[..8].iter().map(|byte| format!("{:08b}", byte)).collect();
    bits.push('0');

    bits.as_bytes()
        .chunks(5)
        .map(|group| {
            let index = group.iter().fold(0usize, |acc, bit| (acc << 1) | (bit - b'0') as usize);
            PUBLISHER_HASH_ALPHABET[index] as char
        })
        .collect()
}

/// `{name}_{publisher hash}`
pub fn family_name(name: &str, publisher: &str) -> String {
    format!("{}_{}", name, publisher_hash(publisher))
}

fn open_package(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

fn read_entry(archive: &mut ZipArchive<BufReader<File>>, name: &str) -> Result<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            Ok(Some(content))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read the package manifest, or the bundle manifest for bundles
pub fn read_manifest(path: &Path) -> Result<String> {
    let mut archive = open_package(path)?;

    for name in [APPX_MANIFEST, APPX_BUNDLE_MANIFEST] {
        if let Some(content) = read_entry(&mut archive, name)? {
            debug!("Read {} from {}", name, path.display());
            return Ok(decode_xml(&content));
        }
    }

    Err(Error::MsixManifestMissing(path.display().to_string()))
}

/// Parse the `Identity` element of a manifest document
pub fn parse_identity(manifest: &str) -> Result<MsixIdentity> {
    let attrs = first_element(manifest, "Identity")?
        .ok_or_else(|| Error::ParseError("Identity element not found in Appx manifest".to_string()))?;

    let get = |key: &str| {
        attrs
            .get(key)
            .cloned()
            .ok_or_else(|| Error::ParseError(format!("Identity element has no {} attribute", key)))
    };

    Ok(MsixIdentity {
        name: get("Name")?,
        publisher: get("Publisher")?,
        version: get("Version")?,
    })
}

pub fn read_identity(path: &Path) -> Result<MsixIdentity> {
    parse_identity(&read_manifest(path)?)
}

pub fn read_family_name(path: &Path) -> Result<String> {
    Ok(read_identity(path)?.family_name())
}

pub fn read_product_version(path: &Path) -> Result<String> {
    Ok(read_identity(path)?.version)
}

/// Uppercase hex SHA-256 of the signature entry
pub fn read_signature_hash(path: &Path) -> Result<String> {
    let mut archive = open_package(path)?;
    let signature = read_entry(&mut archive, APPX_SIGNATURE)?
        .ok_or_else(|| Error::MsixSignatureMissing(path.display().to_string()))?;
    Ok(hex::encode_upper(Sha256::digest(&signature)))
}

/// A parsed MSIX/APPX package or bundle
#[derive(Debug, Clone)]
pub struct MsixPackage {
    msix: MsixIdentity,
    identity: InstallerIdentity,
}

impl MsixPackage {
    pub fn msix_identity(&self) -> &MsixIdentity {
        &self.msix
    }

    pub fn family_name(&self) -> String {
        self.msix.family_name()
    }
}

impl InstallerFormat for MsixPackage {
    fn parse(path: &Path) -> Result<Self> {
        debug!("Parsing MSIX package: {}", path.display());
        let msix = read_identity(path)?;
        let identity = InstallerIdentity {
            product_code: None,
            upgrade_code: None,
            display_name: Some(msix.name.clone()),
            display_version: Some(msix.version.clone()),
        };
        Ok(Self { msix, identity })
    }

    fn identity(&self) -> &InstallerIdentity {
        &self.identity
    }
}
