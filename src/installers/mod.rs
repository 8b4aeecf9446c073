// src/installers/mod.rs

//! Installer format support for Manifold
//!
//! Readers that recover identity and version facts from installer files
//! without running them:
//! - Burn bundles (PE `.wixburn` section and the embedded UX cabinet)
//! - MSIX/APPX packages and bundles (zip container)
//! - MSI databases (through the `MsiMetadataSource` trait)

pub mod burn;
pub mod msi;
pub mod msix;
pub mod pe;
pub mod traits;

pub use burn::{BundleInfo, BurnBundle};
pub use msi::{MsiDatabase, MsiMetadataSource};
pub use msix::{MsixIdentity, MsixPackage};
pub use traits::{InstallerFormat, InstallerIdentity};

use crate::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// Decode an XML document stored as UTF-8 or UTF-16LE, dropping any BOM
pub(crate) fn decode_xml(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Attributes of an element, keyed by local name
pub(crate) fn attributes(element: &BytesStart) -> HashMap<String, String> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
            (key, value)
        })
        .collect()
}

/// Attributes of every element named `local_name`, in document order, each
/// paired with the local names of its ancestors
pub(crate) fn find_elements(xml: &str, local_name: &str) -> Result<Vec<(Vec<String>, HashMap<String, String>)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut found = Vec::new();
    let mut ancestors: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == local_name {
                    found.push((ancestors.clone(), attributes(&e)));
                }
                ancestors.push(name);
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == local_name.as_bytes() {
                    found.push((ancestors.clone(), attributes(&e)));
                }
            }
            Event::End(_) => {
                ancestors.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(found)
}

/// Attributes of the first element named `local_name`
pub(crate) fn first_element(xml: &str, local_name: &str) -> Result<Option<HashMap<String, String>>> {
    Ok(find_elements(xml, local_name)?.into_iter().next().map(|(_, attrs)| attrs))
}
