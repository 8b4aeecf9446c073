// src/installers/burn.rs

//! WiX Burn bundle reader
//!
//! A Burn bootstrapper is a PE image with a `.wixburn` section describing the
//! attached containers. The first container (the UX container) is a cabinet
//! appended right after the engine stub; it holds the burn manifest (entry
//! `0`) and the bootstrapper application payloads.

use super::traits::{InstallerFormat, InstallerIdentity};
use super::{decode_xml, find_elements, first_element, pe};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

pub const BURN_SECTION_NAME: &[u8; 8] = b".wixburn";
pub const BURN_SECTION_MAGIC: u32 = 0x00F1_4300;
pub const BURN_SECTION_VERSION: u32 = 2;
pub const CONTAINER_FORMAT_CABINET: u32 = 1;

/// Offset of the container size array inside the section
const CONTAINER_SIZES_OFFSET: usize = 48;
/// Fixed header plus one container slot
pub const BURN_SECTION_MIN_SIZE: u32 = CONTAINER_SIZES_OFFSET as u32 + 4;

/// Cabinet entry holding the burn manifest
const MANIFEST_ENTRY: &str = "0";
/// UX payload written by the WiX standard bootstrapper application
pub const BA_DATA_FILE: &str = "BootstrapperApplicationData.xml";

/// Contents of the `.wixburn` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    /// Bundle code, formatted as a registry GUID (`{XXXXXXXX-...}`)
    pub bundle_code: String,
    pub version: u32,
    /// Size of the engine stub; the UX container starts at this offset
    pub stub_size: u32,
    pub original_checksum: u32,
    pub original_signature_offset: u32,
    pub original_signature_size: u32,
    pub container_format: u32,
    pub container_sizes: Vec<u32>,
}

impl BundleInfo {
    pub fn container_count(&self) -> usize {
        self.container_sizes.len()
    }

    /// Size of the UX container, if the bundle has one
    pub fn ux_container_size(&self) -> Option<u32> {
        self.container_sizes.first().copied()
    }

    /// Byte range of the signature the bundle carried before it was
    /// detached and reattached
    pub fn original_signature(&self) -> Option<(u32, u32)> {
        (self.original_signature_size > 0)
            .then_some((self.original_signature_offset, self.original_signature_size))
    }
}

/// Format a little-endian Windows GUID as `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`
pub fn format_guid(bytes: &[u8; 16]) -> String {
    let data1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let data2 = u16::from_le_bytes([bytes[4], bytes[5]]);
    let data3 = u16::from_le_bytes([bytes[6], bytes[7]]);
    format!(
        "{{{:08X}-{:04X}-{:04X}-{}-{}}}",
        data1,
        data2,
        data3,
        hex::encode_upper(&bytes[8..10]),
        hex::encode_upper(&bytes[10..16])
    )
}

fn u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// Validate the fixed section header; returns the declared container count
fn parse_section_header(header: &[u8; CONTAINER_SIZES_OFFSET], declared_size: u32) -> Result<u32> {
    let magic = u32_at(header, 0);
    if magic != BURN_SECTION_MAGIC {
        return Err(Error::InvalidBurnMagic(magic));
    }

    let version = u32_at(header, 4);
    if version != BURN_SECTION_VERSION {
        return Err(Error::UnsupportedBurnVersion(version));
    }

    let container_format = u32_at(header, 40);
    if container_format != CONTAINER_FORMAT_CABINET {
        return Err(Error::UnsupportedContainerFormat(container_format));
    }

    let count = u32_at(header, 44);
    let capacity = (declared_size - CONTAINER_SIZES_OFFSET as u32) / 4;
    if count > capacity {
        return Err(Error::BurnContainerOverflow { count, capacity });
    }
    Ok(count)
}

/// Locate and parse the `.wixburn` section
///
/// Only the fixed header and the declared container slots are read. The
/// reader is left positioned somewhere inside the file; it is not closed.
pub fn read_bundle_info<R: Read + Seek>(reader: &mut R) -> Result<BundleInfo> {
    let section = pe::find_section(reader, BURN_SECTION_NAME)?.ok_or(Error::NotBurnBundle)?;

    if section.size_of_raw_data < BURN_SECTION_MIN_SIZE {
        return Err(Error::BurnSectionTooSmall(section.size_of_raw_data));
    }

    let stream_len = reader.seek(SeekFrom::End(0))?;
    let section_end = section.pointer_to_raw_data as u64 + section.size_of_raw_data as u64;
    if section_end > stream_len {
        return Err(Error::ParseError(format!(
            "Burn section ends at {} but the file is {} bytes",
            section_end, stream_len
        )));
    }

    reader.seek(SeekFrom::Start(section.pointer_to_raw_data as u64))?;
    let mut header = [0u8; CONTAINER_SIZES_OFFSET];
    reader.read_exact(&mut header)?;
    let count = parse_section_header(&header, section.size_of_raw_data)?;

    let mut slots = vec![0u8; count as usize * 4];
    reader.read_exact(&mut slots)?;
    let container_sizes = slots
        .chunks_exact(4)
        .map(|slot| u32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]))
        .collect();

    let mut guid = [0u8; 16];
    guid.copy_from_slice(&header[8..24]);

    let info = BundleInfo {
        bundle_code: format_guid(&guid),
        version: u32_at(&header, 4),
        stub_size: u32_at(&header, 24),
        original_checksum: u32_at(&header, 28),
        original_signature_offset: u32_at(&header, 32),
        original_signature_size: u32_at(&header, 36),
        container_format: u32_at(&header, 40),
        container_sizes,
    };
    debug!(
        "Burn bundle {}: stub {} bytes, {} containers",
        info.bundle_code,
        info.stub_size,
        info.container_count()
    );
    Ok(info)
}

/// Copy the UX container into a fresh temporary cabinet file
///
/// The file is removed when the returned handle is dropped.
pub fn extract_stub<R: Read + Seek>(reader: &mut R) -> Result<NamedTempFile> {
    let info = read_bundle_info(reader)?;
    let ux_size = info.ux_container_size().ok_or(Error::MissingUxContainer)?;

    reader.seek(SeekFrom::Start(info.stub_size as u64))?;
    let mut stub = NamedTempFile::new()?;
    let copied = io::copy(&mut (&mut *reader).take(ux_size as u64), stub.as_file_mut())?;
    if copied != ux_size as u64 {
        return Err(Error::ParseError(format!(
            "UX container truncated: expected {} bytes, found {}",
            ux_size, copied
        )));
    }

    debug!("Extracted {} byte UX container to {}", ux_size, stub.path().display());
    Ok(stub)
}

fn open_cabinet(stub_path: &Path) -> Result<cab::Cabinet<File>> {
    let file = File::open(stub_path)?;
    Ok(cab::Cabinet::new(file)?)
}

fn read_cab_entry(cabinet: &mut cab::Cabinet<File>, name: &str) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    cabinet.read_file(name)?.read_to_end(&mut content)?;
    Ok(content)
}

/// Read the burn manifest from an already extracted UX container
pub fn read_manifest_from_stub(stub_path: &Path) -> Result<String> {
    let mut cabinet = open_cabinet(stub_path)?;
    let content = read_cab_entry(&mut cabinet, MANIFEST_ENTRY)?;
    Ok(decode_xml(&content))
}

/// Read the burn manifest of a bundle
pub fn read_manifest<R: Read + Seek>(reader: &mut R) -> Result<String> {
    let stub = extract_stub(reader)?;
    read_manifest_from_stub(stub.path())
}

/// A bootstrapper application payload from the UX container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UxPayload {
    /// Name the payload is installed under (`FilePath` in the manifest)
    pub file_path: String,
    /// Cabinet entry name (`SourcePath` in the manifest)
    pub source_path: String,
    pub content: Vec<u8>,
}

/// `(FilePath, SourcePath)` of every UX payload listed in a burn manifest
pub fn ux_payload_entries(manifest: &str) -> Result<Vec<(String, String)>> {
    Ok(find_elements(manifest, "Payload")?
        .into_iter()
        .filter(|(ancestors, _)| ancestors.last().is_some_and(|parent| parent == "UX"))
        .filter_map(|(_, mut attrs)| Some((attrs.remove("FilePath")?, attrs.remove("SourcePath")?)))
        .collect())
}

/// Read UX payloads from an extracted UX container; all of them when `name`
/// is `None`, otherwise only the payload installed as `name`
pub fn read_ux_payloads_from_stub(stub_path: &Path, name: Option<&str>) -> Result<Vec<UxPayload>> {
    let mut cabinet = open_cabinet(stub_path)?;
    let manifest = decode_xml(&read_cab_entry(&mut cabinet, MANIFEST_ENTRY)?);

    let mut payloads = Vec::new();
    for (file_path, source_path) in ux_payload_entries(&manifest)? {
        if name.is_some_and(|wanted| !wanted.eq_ignore_ascii_case(&file_path)) {
            continue;
        }
        let content = read_cab_entry(&mut cabinet, &source_path)?;
        payloads.push(UxPayload {
            file_path,
            source_path,
            content,
        });
    }

    if let Some(wanted) = name {
        if payloads.is_empty() {
            return Err(Error::UxPayloadNotFound(wanted.to_string()));
        }
    }

    Ok(payloads)
}

/// Read UX payloads of a bundle
pub fn read_ux_payloads<R: Read + Seek>(reader: &mut R, name: Option<&str>) -> Result<Vec<UxPayload>> {
    let stub = extract_stub(reader)?;
    read_ux_payloads_from_stub(stub.path(), name)
}

/// Identity facts from the bootstrapper application data
/// (`WixBundleProperties`)
fn identity_from_ba_data(ba_data: &str) -> Result<InstallerIdentity> {
    let props = first_element(ba_data, "WixBundleProperties")?.unwrap_or_default();
    Ok(InstallerIdentity {
        upgrade_code: props.get("UpgradeCode").cloned(),
        display_name: props.get("DisplayName").cloned(),
        ..Default::default()
    })
}

/// Identity facts from the raw burn manifest
fn identity_from_manifest(manifest: &str) -> Result<InstallerIdentity> {
    let upgrade_code = find_elements(manifest, "RelatedBundle")?
        .into_iter()
        .map(|(_, attrs)| attrs)
        .find(|attrs| attrs.get("Action").is_some_and(|a| a.eq_ignore_ascii_case("Upgrade")))
        .and_then(|attrs| attrs.get("Code").or_else(|| attrs.get("Id")).cloned());

    let registration = first_element(manifest, "Registration")?.unwrap_or_default();
    let arp = first_element(manifest, "Arp")?.unwrap_or_default();

    Ok(InstallerIdentity {
        product_code: None,
        upgrade_code,
        display_name: arp.get("DisplayName").cloned(),
        display_version: arp
            .get("DisplayVersion")
            .or_else(|| registration.get("Version"))
            .cloned(),
    })
}

/// Resolve bundle identity: structured BA data first, raw manifest second
///
/// The product code is always the bundle code from the `.wixburn` section.
pub fn resolve_identity(info: &BundleInfo, manifest: &str, ba_data: Option<&str>) -> Result<InstallerIdentity> {
    let from_manifest = identity_from_manifest(manifest)?;
    let from_ba = match ba_data {
        Some(data) => identity_from_ba_data(data)?,
        None => InstallerIdentity::default(),
    };

    Ok(InstallerIdentity {
        product_code: Some(info.bundle_code.clone()),
        upgrade_code: from_ba.upgrade_code.or(from_manifest.upgrade_code),
        display_name: from_ba.display_name.or(from_manifest.display_name),
        display_version: from_manifest.display_version,
    })
}

/// A parsed Burn bundle
#[derive(Debug, Clone)]
pub struct BurnBundle {
    info: BundleInfo,
    manifest: String,
    identity: InstallerIdentity,
}

impl BurnBundle {
    /// Parse a bundle from an open stream; the stream stays open
    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let info = read_bundle_info(reader)?;
        let stub = extract_stub(reader)?;
        let manifest = read_manifest_from_stub(stub.path())?;

        let ba_data = match read_ux_payloads_from_stub(stub.path(), Some(BA_DATA_FILE)) {
            Ok(mut payloads) => payloads.pop().map(|p| decode_xml(&p.content)),
            Err(e) => {
                debug!("No bootstrapper application data: {}", e);
                None
            }
        };

        let identity = resolve_identity(&info, &manifest, ba_data.as_deref())?;
        Ok(Self {
            info,
            manifest,
            identity,
        })
    }

    pub fn info(&self) -> &BundleInfo {
        &self.info
    }

    pub fn manifest(&self) -> &str {
        &self.manifest
    }
}

impl InstallerFormat for BurnBundle {
    fn parse(path: &Path) -> Result<Self> {
        debug!("Parsing Burn bundle: {}", path.display());
        let mut file = File::open(path)?;
        Self::from_reader(&mut file)
    }

    fn identity(&self) -> &InstallerIdentity {
        &self.identity
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::installers::pe::tests::build_pe;
    use std::io::{Cursor, Write};

    pub(crate) const BUNDLE_GUID: [u8; 16] = [
        0x78, 0x56, 0x34, 0x12, 0x34, 0x12, 0x78, 0x56, 0x9A, 0xBC, 0xDE, 0xF0, 0x12, 0x34, 0x56, 0x78,
    ];

    pub(crate) const MANIFEST_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<BurnManifest xmlns="http://schemas.microsoft.com/wix/2008/Burn">
  <UX>
    <Payload Id="WixStandardBootstrapperApplication" FilePath="wixstdba.dll" SourcePath="u0" />
    <Payload Id="BAData" FilePath="BootstrapperApplicationData.xml" SourcePath="u1" />
  </UX>
  <RelatedBundle Id="{AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE}" Action="Detect" />
  <RelatedBundle Id="{11111111-2222-3333-4444-555555555555}" Action="Upgrade" />
  <Registration Id="{12345678-1234-5678-9ABC-DEF012345678}" ExecutableName="setup.exe" PerMachine="yes" Version="2.4.1.0">
    <Arp Register="yes" DisplayName="Contoso Suite" DisplayVersion="2.4.1" Publisher="Contoso" />
  </Registration>
</BurnManifest>"#;

    pub(crate) const BA_DATA_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<BootstrapperApplicationData xmlns="http://schemas.microsoft.com/wix/2010/BootstrapperApplicationData">
  <WixBundleProperties DisplayName="Contoso Suite (x64)" LogPathVariable="WixBundleLog" Compressed="yes" Id="{12345678-1234-5678-9ABC-DEF012345678}" UpgradeCode="{99999999-8888-7777-6666-555555555555}" PerMachine="yes" />
</BootstrapperApplicationData>"#;

    pub(crate) fn build_cab(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = cab::CabinetBuilder::new();
        {
            let folder = builder.add_folder(cab::CompressionType::None);
            for (name, _) in files {
                folder.add_file(*name);
            }
        }
        let mut writer = builder.build(Cursor::new(Vec::new())).unwrap();
        let mut index = 0;
        while let Some(mut file_writer) = writer.next_file().unwrap() {
            file_writer.write_all(files[index].1).unwrap();
            index += 1;
        }
        writer.finish().unwrap().into_inner()
    }

    pub(crate) fn burn_section(magic: u32, version: u32, format: u32, containers: &[u32], slots: usize) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&magic.to_le_bytes());
        data.extend_from_slice(&version.to_le_bytes());
        data.extend_from_slice(&BUNDLE_GUID);
        data.extend_from_slice(&0u32.to_le_bytes()); // stub size, patched later
        data.extend_from_slice(&0xDEADu32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&format.to_le_bytes());
        data.extend_from_slice(&(containers.len() as u32).to_le_bytes());
        for i in 0..slots {
            let size = containers.get(i).copied().unwrap_or(0);
            data.extend_from_slice(&size.to_le_bytes());
        }
        data
    }

    /// A complete bundle: PE image, `.wixburn` section, UX cabinet appended
    pub(crate) fn build_bundle(ba_data: Option<&str>) -> Vec<u8> {
        let mut files: Vec<(&str, &[u8])> = vec![("0", MANIFEST_XML.as_bytes()), ("u0", b"MZ fake dll")];
        if let Some(data) = ba_data {
            files.push(("u1", data.as_bytes()));
        }
        let cab = build_cab(&files);

        let section = burn_section(
            BURN_SECTION_MAGIC,
            BURN_SECTION_VERSION,
            CONTAINER_FORMAT_CABINET,
            &[cab.len() as u32],
            2,
        );
        let stub_len = build_pe(&[(b".text\0\0\0", vec![0x90; 32]), (BURN_SECTION_NAME, section.clone())], &[]).len();

        let mut section = section;
        section[24..28].copy_from_slice(&(stub_len as u32).to_le_bytes());
        build_pe(&[(b".text\0\0\0", vec![0x90; 32]), (BURN_SECTION_NAME, section)], &cab)
    }

    #[test]
    fn test_format_guid() {
        assert_eq!(format_guid(&BUNDLE_GUID), "{12345678-1234-5678-9ABC-DEF012345678}");
    }

    #[test]
    fn test_read_bundle_info() {
        let image = build_bundle(Some(BA_DATA_XML));
        let info = read_bundle_info(&mut Cursor::new(image)).unwrap();

        assert_eq!(info.bundle_code, "{12345678-1234-5678-9ABC-DEF012345678}");
        assert_eq!(info.version, BURN_SECTION_VERSION);
        assert_eq!(info.original_checksum, 0xDEAD);
        assert_eq!(info.container_count(), 1);
        assert!(info.original_signature().is_none());
    }

    #[test]
    fn test_read_manifest_and_payloads() {
        let image = build_bundle(Some(BA_DATA_XML));
        let mut cursor = Cursor::new(image);

        let manifest = read_manifest(&mut cursor).unwrap();
        assert!(manifest.contains("<BurnManifest"));

        let payloads = read_ux_payloads(&mut cursor, None).unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].file_path, "wixstdba.dll");

        let ba = read_ux_payloads(&mut cursor, Some(BA_DATA_FILE)).unwrap();
        assert_eq!(ba.len(), 1);
        assert_eq!(ba[0].source_path, "u1");

        let missing = read_ux_payloads(&mut cursor, Some("theme.xml"));
        assert!(matches!(missing, Err(Error::UxPayloadNotFound(_))));
    }

    #[test]
    fn test_identity_prefers_ba_data() {
        let image = build_bundle(Some(BA_DATA_XML));
        let bundle = BurnBundle::from_reader(&mut Cursor::new(image)).unwrap();

        assert_eq!(bundle.product_code(), Some("{12345678-1234-5678-9ABC-DEF012345678}"));
        assert_eq!(bundle.upgrade_code(), Some("{99999999-8888-7777-6666-555555555555}"));
        assert_eq!(bundle.display_name(), Some("Contoso Suite (x64)"));
        assert_eq!(bundle.display_version(), Some("2.4.1"));
    }

    #[test]
    fn test_identity_falls_back_to_manifest() {
        let image = build_bundle(None);
        let bundle = BurnBundle::from_reader(&mut Cursor::new(image)).unwrap();

        assert_eq!(bundle.upgrade_code(), Some("{11111111-2222-3333-4444-555555555555}"));
        assert_eq!(bundle.display_name(), Some("Contoso Suite"));
    }

    #[test]
    fn test_product_code_is_the_section_bundle_code() {
        let mut info = read_bundle_info(&mut Cursor::new(build_bundle(None))).unwrap();
        info.bundle_code = "{0F0F0F0F-0000-0000-0000-000000000000}".to_string();

        // Registration and BA data carry a different Id; neither wins
        let identity = resolve_identity(&info, MANIFEST_XML, Some(BA_DATA_XML)).unwrap();
        assert_eq!(identity.product_code.as_deref(), Some("{0F0F0F0F-0000-0000-0000-000000000000}"));
        assert!(identity_from_manifest(MANIFEST_XML).unwrap().product_code.is_none());
        assert!(identity_from_ba_data(BA_DATA_XML).unwrap().product_code.is_none());
    }

    #[test]
    fn test_related_bundle_code_attribute() {
        let manifest = r#"<BurnManifest><RelatedBundle Code="{0000AAAA-0000-0000-0000-000000000000}" Action="Upgrade"/><Registration Code="{X}" Version="5.0.0"/></BurnManifest>"#;
        let identity = identity_from_manifest(manifest).unwrap();
        assert_eq!(identity.upgrade_code.as_deref(), Some("{0000AAAA-0000-0000-0000-000000000000}"));
        assert_eq!(identity.display_version.as_deref(), Some("5.0.0"));
    }

    #[test]
    fn test_pe_without_burn_section() {
        let image = build_pe(&[(b".text\0\0\0", vec![0x90; 8])], &[]);
        let result = read_bundle_info(&mut Cursor::new(image));
        assert!(matches!(result, Err(Error::NotBurnBundle)));
    }

    #[test]
    fn test_wrong_magic_and_version() {
        let bad_magic = burn_section(0x1234_5678, BURN_SECTION_VERSION, 1, &[0], 1);
        let image = build_pe(&[(BURN_SECTION_NAME, bad_magic)], &[]);
        assert!(matches!(
            read_bundle_info(&mut Cursor::new(image)),
            Err(Error::InvalidBurnMagic(0x1234_5678))
        ));

        let bad_version = burn_section(BURN_SECTION_MAGIC, 3, 1, &[0], 1);
        let image = build_pe(&[(BURN_SECTION_NAME, bad_version)], &[]);
        assert!(matches!(
            read_bundle_info(&mut Cursor::new(image)),
            Err(Error::UnsupportedBurnVersion(3))
        ));
    }

    #[test]
    fn test_container_guards() {
        let bad_format = burn_section(BURN_SECTION_MAGIC, BURN_SECTION_VERSION, 2, &[0], 1);
        let image = build_pe(&[(BURN_SECTION_NAME, bad_format)], &[]);
        assert!(matches!(
            read_bundle_info(&mut Cursor::new(image)),
            Err(Error::UnsupportedContainerFormat(2))
        ));

        // Three containers declared, room for one
        let overflow = burn_section(BURN_SECTION_MAGIC, BURN_SECTION_VERSION, 1, &[1, 2, 3], 1);
        let image = build_pe(&[(BURN_SECTION_NAME, overflow)], &[]);
        assert!(matches!(
            read_bundle_info(&mut Cursor::new(image)),
            Err(Error::BurnContainerOverflow { count: 3, capacity: 1 })
        ));

        let image = build_pe(&[(BURN_SECTION_NAME, vec![0u8; 16])], &[]);
        assert!(matches!(
            read_bundle_info(&mut Cursor::new(image)),
            Err(Error::BurnSectionTooSmall(16))
        ));
    }

    #[test]
    fn test_section_size_beyond_file_is_rejected() {
        let section = burn_section(BURN_SECTION_MAGIC, BURN_SECTION_VERSION, 1, &[64], 1);
        let mut image = build_pe(&[(BURN_SECTION_NAME, section)], &[]);

        // SizeOfRawData of the only section header
        let size_field = 0x80 + 24 + 0xE0 + 16;
        image[size_field..size_field + 4].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());

        let result = read_bundle_info(&mut Cursor::new(image));
        assert!(matches!(result, Err(Error::ParseError(msg)) if msg.contains("Burn section ends")));
    }

    #[test]
    fn test_caller_stream_stays_usable() {
        let image = build_bundle(Some(BA_DATA_XML));
        let mut cursor = Cursor::new(image);
        read_manifest(&mut cursor).unwrap();
        // Still ours to use
        cursor.seek(SeekFrom::Start(0)).unwrap();
        let mut magic = [0u8; 2];
        cursor.read_exact(&mut magic).unwrap();
        assert_eq!(&magic, b"MZ");
    }
}
