//! Zstd-compressed NDJSON readers/writers for checkpoint artifacts.

use crate::util::{create_with_backoff, open_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder;
use zstd::stream::write::Encoder;

const ZSTD_LEVEL: i32 = 3;

/// Buffered NDJSON writer over a zstd stream. Create it on a temporary path
/// and promote with [`finish_atomic`](Self::finish_atomic) so a concurrent
/// reader never observes a half-written artifact.
pub struct ZstdNdjsonWriter {
    path: PathBuf,
    enc: Option<Encoder<'static, BufWriter<File>>>,
}

impl ZstdNdjsonWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let f = create_with_backoff(path, 16, 50)
            .with_context(|| format!("create {}", path.display()))?;
        let enc = Encoder::new(BufWriter::new(f), ZSTD_LEVEL)?;
        Ok(Self { path: path.to_path_buf(), enc: Some(enc) })
    }

    /// Write one record line. The `\n` terminator is appended here.
    pub fn write_line(&mut self, s: &str) -> Result<()> {
        if let Some(enc) = &mut self.enc {
            enc.write_all(s.as_bytes())?;
            enc.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Flush the zstd frame and atomically promote the temp file to `final_path`.
    pub fn finish_atomic(mut self, final_path: &Path) -> Result<()> {
        if let Some(enc) = self.enc.take() {
            let mut w = enc.finish().with_context(|| format!("finish {}", self.path.display()))?;
            w.flush()?;
        }
        replace_file_atomic_backoff(&self.path, final_path)
    }
}

/// Line-by-line reader for zstd NDJSON artifacts. Skips empty lines.
pub struct ZstdNdjsonReader {
    rdr: BufReader<Decoder<'static, BufReader<File>>>,
}

impl ZstdNdjsonReader {
    pub fn open(path: &Path) -> Result<Self> {
        let f = open_with_backoff(path, 16, 50)
            .with_context(|| format!("open {}", path.display()))?;
        Ok(Self { rdr: BufReader::new(Decoder::new(f)?) })
    }

    /// Read the next non-empty line into `buf`; returns false on EOF.
    pub fn read_line(&mut self, buf: &mut String) -> Result<bool> {
        loop {
            buf.clear();
            if self.rdr.read_line(buf)? == 0 {
                return Ok(false);
            }
            while buf.ends_with('\n') || buf.ends_with('\r') {
                buf.pop();
            }
            if !buf.is_empty() {
                return Ok(true);
            }
        }
    }
}
