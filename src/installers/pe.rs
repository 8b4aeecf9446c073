// src/installers/pe.rs

//! PE/COFF header walk
//!
//! The DOS, COFF and optional headers and the section table are parsed with
//! goblin from a bounded prefix of the file; section contents are left to
//! the caller.

use crate::error::{Error, Result};
use goblin::pe::header::{Header, SIZEOF_COFF_HEADER, SIZEOF_PE_MAGIC};
use goblin::pe::section_table::SectionTable;
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Headers and section table must sit within this many leading bytes
pub const HEADER_PREFIX_LIMIT: u64 = 64 * 1024;

pub const IMAGE_FILE_MACHINE_I386: u16 = 0x014C;
pub const IMAGE_FILE_MACHINE_ARMNT: u16 = 0x01C4;
pub const IMAGE_FILE_MACHINE_AMD64: u16 = 0x8664;
pub const IMAGE_FILE_MACHINE_ARM64: u16 = 0xAA64;
pub const IMAGE_FILE_MACHINE_ARM64EC: u16 = 0xA641;

const SUPPORTED_MACHINES: [u16; 5] = [
    IMAGE_FILE_MACHINE_I386,
    IMAGE_FILE_MACHINE_ARMNT,
    IMAGE_FILE_MACHINE_AMD64,
    IMAGE_FILE_MACHINE_ARM64,
    IMAGE_FILE_MACHINE_ARM64EC,
];

/// Machine type and section table of a PE image
#[derive(Debug, Clone)]
pub struct PeHeaders {
    pub machine: u16,
    pub sections: Vec<SectionTable>,
}

impl PeHeaders {
    /// Section whose 8-byte name equals `name`
    pub fn section(&self, name: &[u8; 8]) -> Option<&SectionTable> {
        self.sections.iter().find(|section| &section.name == name)
    }
}

/// Read and verify the PE headers
pub fn read_headers<R: Read + Seek>(reader: &mut R) -> Result<PeHeaders> {
    reader.seek(SeekFrom::Start(0))?;
    let mut prefix = Vec::new();
    (&mut *reader).take(HEADER_PREFIX_LIMIT).read_to_end(&mut prefix)?;

    let header = Header::parse(&prefix).map_err(|e| Error::NotPeFile(e.to_string()))?;
    let coff = header.coff_header;

    if !SUPPORTED_MACHINES.contains(&coff.machine) {
        return Err(Error::NotPeFile(format!("unsupported machine type {:#06x}", coff.machine)));
    }
    if coff.number_of_sections == 0 {
        return Err(Error::NotPeFile("no sections".to_string()));
    }

    let mut offset = header.dos_header.pe_pointer as usize
        + SIZEOF_PE_MAGIC
        + SIZEOF_COFF_HEADER
        + coff.size_of_optional_header as usize;
    let sections = coff
        .sections(&prefix, &mut offset)
        .map_err(|e| Error::NotPeFile(format!("unreadable section table: {}", e)))?;

    debug!(
        "PE headers: machine {:#06x}, {} sections, optional header {} bytes",
        coff.machine,
        sections.len(),
        coff.size_of_optional_header
    );

    Ok(PeHeaders {
        machine: coff.machine,
        sections,
    })
}

/// Locate a section by its 8-byte name
pub fn find_section<R: Read + Seek>(reader: &mut R, name: &[u8; 8]) -> Result<Option<SectionTable>> {
    let headers = read_headers(reader)?;
    Ok(headers.section(name).cloned())
}
