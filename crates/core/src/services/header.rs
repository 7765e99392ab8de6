//! Structural header collaborator: format tag from magic bytes and declared
//! executable sections from the object parser.

use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use goblin::elf::section_header::{SHF_EXECINSTR, SHT_NOBITS};
use goblin::pe::section_table::{IMAGE_SCN_CNT_CODE, IMAGE_SCN_MEM_EXECUTE};
use goblin::{elf, pe, Object};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::analysis::alien::SectionMap;
use crate::model::Interval;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse object header of {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Recognized structural header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderKind {
    #[serde(rename = "ELF")]
    Elf,
    #[serde(rename = "PE")]
    Pe,
}

impl HeaderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HeaderKind::Elf => "ELF",
            HeaderKind::Pe => "PE",
        }
    }

    /// Classify the first bytes of a file.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x7f, b'E', b'L', b'F']) {
            Some(HeaderKind::Elf)
        } else if bytes.len() >= 4 && bytes.starts_with(b"MZ") {
            Some(HeaderKind::Pe)
        } else {
            None
        }
    }
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header tag of the file at `path`, `None` when unrecognized.
pub fn detect_header(path: &Path) -> Result<Option<HeaderKind>, HeaderError> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path).map_err(|source| io_error(path, source))?;
    let mut filled = 0;
    while filled < magic.len() {
        let n = file.read(&mut magic[filled..]).map_err(|source| io_error(path, source))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(HeaderKind::from_magic(&magic[..filled]))
}

/// Executable sections declared by the object header, mapped to file offsets.
///
/// Formats other than ELF and PE yield an empty map. Sections without file
/// backing (`.bss`-like) are skipped.
pub fn executable_sections(path: &Path) -> Result<SectionMap, HeaderError> {
    let bytes = fs::read(path).map_err(|source| io_error(path, source))?;
    let sections = match Object::parse(&bytes) {
        Ok(Object::Elf(elf)) => elf_sections(&elf),
        Ok(Object::PE(pe)) => pe_sections(&pe),
        Ok(_) => SectionMap::new(),
        Err(e) if HeaderKind::from_magic(&bytes).is_some() => {
            return Err(HeaderError::Parse { path: path.to_path_buf(), message: e.to_string() })
        }
        Err(_) => SectionMap::new(),
    };
    debug!(path = %path.display(), sections = sections.len(), "collected executable sections");
    Ok(sections)
}

fn elf_sections(elf: &elf::Elf) -> SectionMap {
    let mut map = SectionMap::new();
    for sh in &elf.section_headers {
        if sh.sh_flags & u64::from(SHF_EXECINSTR) == 0 || sh.sh_type == SHT_NOBITS {
            continue;
        }
        let end = sh.sh_offset.saturating_add(sh.sh_size);
        let Some(interval) = Interval::checked(sh.sh_offset, end) else {
            continue;
        };
        let name = elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("").to_string();
        map.entry(name).or_default().push(interval);
    }
    map
}

fn pe_sections(pe: &pe::PE) -> SectionMap {
    let mut map = SectionMap::new();
    for sec in &pe.sections {
        if sec.characteristics & (IMAGE_SCN_MEM_EXECUTE | IMAGE_SCN_CNT_CODE) == 0 {
            continue;
        }
        let raw = u64::from(sec.size_of_raw_data);
        let size = match u64::from(sec.virtual_size) {
            0 => raw,
            virtual_size => virtual_size.min(raw),
        };
        let start = u64::from(sec.pointer_to_raw_data);
        let Some(interval) = Interval::checked(start, start.saturating_add(size)) else {
            continue;
        };
        let name = sec.name().unwrap_or_default().to_string();
        map.entry(name).or_default().push(interval);
    }
    map
}

fn io_error(path: &Path, source: std::io::Error) -> HeaderError {
    HeaderError::Io { path: path.to_path_buf(), source }
}
