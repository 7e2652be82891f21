//! KMZ packaging: a ZIP archive with `doc.kml` as its first entry followed
//! by the images the document references.
//!
//! Entries are raw-deflated when that saves space and stored otherwise.
//! Timestamps are fixed at the DOS epoch so identical inputs give identical
//! archives.

use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::document::KmlDocument;
use crate::error::{KmlError, KmlResult};

pub const DOC_ENTRY: &str = "doc.kml";

const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIR_SIG: u32 = 0x0605_4b50;
const VERSION: u16 = 20;
/// General purpose flag bit 11: names are UTF-8.
const FLAG_UTF8: u16 = 0x0800;
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;
/// 1980-01-01 in DOS date format.
const DOS_DATE: u16 = (1 << 5) | 1;

struct Entry {
    name: String,
    data: Vec<u8>,
}

/// In-memory KMZ archive.
pub struct KmzArchive {
    entries: Vec<Entry>,
}

impl KmzArchive {
    pub fn new(document: &KmlDocument) -> Self {
        Self {
            entries: vec![Entry {
                name: DOC_ENTRY.to_string(),
                data: document.to_xml().into_bytes(),
            }],
        }
    }

    /// Add a file under a relative archive name.
    pub fn add_file(&mut self, name: impl Into<String>, data: Vec<u8>) -> KmlResult<()> {
        let name = name.into();
        if name.is_empty()
            || name.starts_with('/')
            || name.contains('\\')
            || name.split('/').any(|part| part == "..")
        {
            return Err(KmlError::InvalidEntry(format!("bad entry name '{}'", name)));
        }
        if self.entries.iter().any(|e| e.name == name) {
            return Err(KmlError::InvalidEntry(format!("duplicate entry '{}'", name)));
        }
        self.entries.push(Entry { name, data });
        Ok(())
    }

    /// Add an image from disk under its file name.
    pub fn add_path(&mut self, path: &Path) -> KmlResult<String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| KmlError::InvalidEntry(format!("no file name in {}", path.display())))?
            .to_string();
        let data = std::fs::read(path)?;
        self.add_file(name.clone(), data)?;
        Ok(name)
    }

    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn to_bytes(&self) -> KmlResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let offset = out.len() as u32;
            let crc = crc32fast::hash(&entry.data);
            let deflated = deflate(&entry.data)?;
            let (method, payload) = if deflated.len() < entry.data.len() {
                (METHOD_DEFLATED, deflated.as_slice())
            } else {
                (METHOD_STORED, entry.data.as_slice())
            };
            let name = entry.name.as_bytes();

            put_u32(&mut out, LOCAL_HEADER_SIG);
            put_u16(&mut out, VERSION);
            put_u16(&mut out, FLAG_UTF8);
            put_u16(&mut out, method);
            put_u16(&mut out, 0); // time
            put_u16(&mut out, DOS_DATE);
            put_u32(&mut out, crc);
            put_u32(&mut out, payload.len() as u32);
            put_u32(&mut out, entry.data.len() as u32);
            put_u16(&mut out, name.len() as u16);
            put_u16(&mut out, 0); // extra length
            out.extend_from_slice(name);
            out.extend_from_slice(payload);

            put_u32(&mut central, CENTRAL_HEADER_SIG);
            put_u16(&mut central, VERSION); // made by
            put_u16(&mut central, VERSION); // needed
            put_u16(&mut central, FLAG_UTF8);
            put_u16(&mut central, method);
            put_u16(&mut central, 0);
            put_u16(&mut central, DOS_DATE);
            put_u32(&mut central, crc);
            put_u32(&mut central, payload.len() as u32);
            put_u32(&mut central, entry.data.len() as u32);
            put_u16(&mut central, name.len() as u16);
            put_u16(&mut central, 0); // extra
            put_u16(&mut central, 0); // comment
            put_u16(&mut central, 0); // disk number
            put_u16(&mut central, 0); // internal attributes
            put_u32(&mut central, 0); // external attributes
            put_u32(&mut central, offset);
            central.extend_from_slice(name);
        }

        let central_offset = out.len() as u32;
        out.extend_from_slice(&central);

        let count = self.entries.len() as u16;
        put_u32(&mut out, END_OF_CENTRAL_DIR_SIG);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        put_u16(&mut out, count);
        put_u16(&mut out, count);
        put_u32(&mut out, central.len() as u32);
        put_u32(&mut out, central_offset);
        put_u16(&mut out, 0); // comment length

        Ok(out)
    }

    /// Write the archive atomically, creating parent directories.
    pub fn write(&self, path: &Path) -> KmlResult<()> {
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes)?;
        info!(
            path = %path.display(),
            entries = self.entries.len(),
            bytes = bytes.len(),
            "Wrote KMZ"
        );
        Ok(())
    }
}

/// Write a plain `.kml` file.
pub fn save_kml(document: &KmlDocument, path: &Path) -> KmlResult<()> {
    write_atomic(path, document.to_xml().as_bytes())?;
    debug!(path = %path.display(), features = document.features.len(), "Wrote KML");
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> KmlResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = std::path::PathBuf::from(partial);

    std::fs::write(&partial, bytes)?;
    if let Err(e) = std::fs::rename(&partial, path) {
        let _ = std::fs::remove_file(&partial);
        return Err(e.into());
    }
    Ok(())
}

fn deflate(data: &[u8]) -> KmlResult<Vec<u8>> {
    let mut encoder =
        flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}
