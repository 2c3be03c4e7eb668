//! Packaging the assembled index into a single portable zip artifact.
//!
//! The archive holds exactly two entries with fixed names: the index in its
//! native binary layout and the combined docstore payload. The names are a
//! compatibility contract with downstream loaders, so they never vary with
//! input file names. Writes are staged to a sibling temp file and renamed
//! into place only on full success; a failed run leaves nothing at the
//! destination.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::index::assembler::AssembledIndex;
use crate::index::docstore::StorePayload;
use crate::index::flat::FlatIndex;
use crate::types::RagPackError;

/// Archive entry holding the serialized similarity index.
pub const INDEX_ENTRY: &str = "index.flat";
/// Archive entry holding the combined docstore and ordinal mapping.
pub const DOCSTORE_ENTRY: &str = "index.docstore.json";

/// Writes assembled indexes to a zip archive at a fixed destination.
#[derive(Clone, Debug)]
pub struct ArtifactWriter {
    destination: PathBuf,
}

impl ArtifactWriter {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Serializes and packages the index, returning the final artifact path.
    pub fn write(&self, assembled: &AssembledIndex) -> Result<PathBuf, RagPackError> {
        let index_bytes = assembled.index.to_bytes();
        let payload_bytes = assembled.payload.to_json()?;

        if let Some(parent) = self.destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Stage next to the destination so the final rename stays on one
        // filesystem and is atomic.
        let staging = self.staging_path();
        if let Err(err) = write_zip(&staging, &index_bytes, &payload_bytes) {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }
        if let Err(err) = fs::rename(&staging, &self.destination) {
            let _ = fs::remove_file(&staging);
            return Err(RagPackError::Serialization(format!(
                "failed to finalize artifact: {err}"
            )));
        }

        Ok(self.destination.clone())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .destination
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "artifact.zip".into());
        name.push(".tmp");
        self.destination.with_file_name(name)
    }
}

fn write_zip(path: &Path, index_bytes: &[u8], payload_bytes: &[u8]) -> Result<(), RagPackError> {
    let file = File::create(path)
        .map_err(|err| RagPackError::Serialization(format!("cannot create archive: {err}")))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    writer
        .start_file(INDEX_ENTRY, options)
        .and_then(|_| writer.write_all(index_bytes).map_err(Into::into))
        .and_then(|_| writer.start_file(DOCSTORE_ENTRY, options))
        .and_then(|_| writer.write_all(payload_bytes).map_err(Into::into))
        .map_err(|err| RagPackError::Serialization(err.to_string()))?;

    writer
        .finish()
        .map_err(|err| RagPackError::Serialization(err.to_string()))?;
    Ok(())
}

/// A loaded artifact: the companion loader contract used by downstream
/// consumers and by round-trip tests.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    pub index: FlatIndex,
    pub payload: StorePayload,
}

impl Artifact {
    /// Opens a zip produced by [`ArtifactWriter::write`] and validates the
    /// ordinal -> chunk id -> docstore bijection before handing it back.
    pub fn load(path: &Path) -> Result<Self, RagPackError> {
        let file = File::open(path)
            .map_err(|err| RagPackError::Serialization(format!("cannot open artifact: {err}")))?;
        let mut archive = ZipArchive::new(file)
            .map_err(|err| RagPackError::Serialization(format!("not a zip archive: {err}")))?;

        let index_bytes = read_entry(&mut archive, INDEX_ENTRY)?;
        let payload_bytes = read_entry(&mut archive, DOCSTORE_ENTRY)?;

        let index = FlatIndex::read_from(&mut index_bytes.as_slice())?;
        let payload = StorePayload::from_json(&payload_bytes)?;
        payload.validate(index.len())?;

        Ok(Self { index, payload })
    }
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Vec<u8>, RagPackError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|err| RagPackError::Serialization(format!("missing entry '{name}': {err}")))?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|err| RagPackError::Serialization(format!("cannot read entry '{name}': {err}")))?;
    Ok(bytes)
}
