use crate::error::Error;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, error, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ARCHIVE_EXTENSION: &str = "zip";

const BUFFER_SIZE: usize = 64 * 1024;

/// Byte-order mark of the UTF-16BE entry encoding.
const UTF16_BOM: [u8; 2] = [0xFE, 0xFF];

/// Whether an entry was opened or dropped as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStart {
    Started,
    Duplicate,
}

/// A zip container bound to one output file. Entries are UTF-16BE text.
pub struct ArchiveAssembler {
    zip: ZipWriter<BufWriter<File>>,
    options: SimpleFileOptions,
    names: HashSet<String>,
    open_entry: Option<String>,
}

impl ArchiveAssembler {
    pub fn create(path: &Path) -> Result<Self, Error> {
        let file = File::create(path)?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        Ok(Self {
            zip: ZipWriter::new(BufWriter::with_capacity(BUFFER_SIZE, file)),
            options,
            names: HashSet::new(),
            open_entry: None,
        })
    }

    /// Open a streaming entry. A name already present in the archive is not
    /// written again: the collision is logged and `Duplicate` returned.
    pub fn begin_entry(&mut self, name: &str) -> Result<EntryStart, Error> {
        self.end_entry()?;
        if !self.names.insert(name.to_string()) {
            warn!("Duplicate zip entry {}. Wrong report configuration.", name);
            return Ok(EntryStart::Duplicate);
        }
        self.zip.start_file(name, self.options).map_err(|e| {
            error!("Error compressing report file {}: {}", name, e);
            e
        })?;
        self.zip.write_all(&UTF16_BOM)?;
        self.open_entry = Some(name.to_string());
        Ok(EntryStart::Started)
    }

    /// Append text to the open entry.
    pub fn write_text(&mut self, text: &str) -> Result<(), Error> {
        if self.open_entry.is_none() {
            return Err(Error::Other("No archive entry is open".to_string()));
        }
        self.zip.write_all(&encode_utf16be(text))?;
        Ok(())
    }

    pub fn end_entry(&mut self) -> Result<(), Error> {
        if let Some(name) = self.open_entry.take() {
            self.zip.flush()?;
            debug!("Closed zip entry {}", name);
        }
        Ok(())
    }

    /// Write a complete entry in one call.
    pub fn write_whole_entry(&mut self, name: &str, text: &str) -> Result<EntryStart, Error> {
        let start = self.begin_entry(name)?;
        if start == EntryStart::Started {
            self.write_text(text)?;
            self.end_entry()?;
        }
        Ok(start)
    }

    pub fn entry_count(&self) -> usize {
        self.names.len()
    }

    /// Write the central directory and flush the file.
    pub fn finish(mut self) -> Result<(), Error> {
        self.end_entry()?;
        let mut inner = self.zip.finish()?;
        inner.flush()?;
        Ok(())
    }
}

/// Run `f` against a fresh archive at `path`. The container is closed on every
/// exit path; a failed build also removes the partial file.
pub fn with_archive<T, F>(path: &Path, f: F) -> Result<T, Error>
where
    F: FnOnce(&mut ArchiveAssembler) -> Result<T, Error>,
{
    let mut archive = ArchiveAssembler::create(path)?;
    let result = f(&mut archive).and_then(|value| archive.finish().map(|()| value));
    discard_on_error(path, result)
}

/// Remove the file at `path` when `result` is an error.
fn discard_on_error<T>(path: &Path, result: Result<T, Error>) -> Result<T, Error> {
    if result.is_err() {
        if let Err(err) = fs::remove_file(path) {
            debug!("Could not remove partial archive {}: {}", path.display(), err);
        }
    }
    result
}

pub fn encode_utf16be(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|unit| unit.to_be_bytes()).collect()
}
