use crate::error::EngineError;
use flate2::{bufread::GzDecoder, write::GzEncoder, Compression};
use log::debug;
use srtm::TileId;
use std::{
    fs::{self, File},
    io::{BufReader, Read, Write},
    path::{Path, PathBuf},
};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Local tile file collaborator.
///
/// Tiles live in one flat directory as `<id>.hgt` (raw big-endian
/// samples) or `<id>.hgt.gz`; reads always hand back decompressed
/// bytes. Downloaded tiles are persisted compressed unless the payload
/// already is.
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: PathBuf) -> Result<Self, EngineError> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn raw_path(&self, id: TileId) -> PathBuf {
        self.dir.join(format!("{id}.hgt"))
    }

    fn gz_path(&self, id: TileId) -> PathBuf {
        self.dir.join(format!("{id}.hgt.gz"))
    }

    /// Whether a file for `id` exists in either encoding.
    pub fn exists(&self, id: TileId) -> bool {
        self.raw_path(id).exists() || self.gz_path(id).exists()
    }

    /// Reads and, if needed, decompresses the tile file for `id`.
    pub fn read(&self, id: TileId) -> Result<Vec<u8>, EngineError> {
        let raw_path = self.raw_path(id);
        if raw_path.exists() {
            debug!("reading {raw_path:?}");
            return Ok(fs::read(raw_path)?);
        }
        let gz_path = self.gz_path(id);
        debug!("reading {gz_path:?}");
        let mut rdr = GzDecoder::new(BufReader::new(File::open(gz_path)?));
        let mut bytes = Vec::new();
        rdr.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Persists downloaded tile bytes for `id`.
    ///
    /// Payloads that are already gzip are stored as-is; anything else is
    /// compressed. Writes go through a temp file so a crashed write
    /// never leaves a plausible-looking partial tile behind.
    pub fn write(&self, id: TileId, bytes: &[u8]) -> Result<(), EngineError> {
        let path = self.gz_path(id);
        let tmp_path = path.with_extension("tmp");
        if bytes.starts_with(&GZIP_MAGIC) {
            fs::write(&tmp_path, bytes)?;
        } else {
            let mut wtr = GzEncoder::new(File::create(&tmp_path)?, Compression::default());
            wtr.write_all(bytes)?;
            wtr.try_finish()?;
        }
        fs::rename(tmp_path, path)?;
        Ok(())
    }
}
