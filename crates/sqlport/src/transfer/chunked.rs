//! Chunked row-set output.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ChunkingConfig, FormatOptions};
use crate::core::{Chunk, Row, RowSet};
use crate::error::Result;
use crate::format::{Format, RowWriter};

/// Chunk file name: `<row set>.<n>.<ext>`, numbered from zero.
pub fn chunk_file_name(row_set: &str, index: usize, extension: &str) -> String {
    format!("{}.{}.{}", row_set, index, extension)
}

struct OpenChunk {
    name: String,
    writer: Box<dyn RowWriter>,
    rows: u64,
}

/// Writes one row set into numbered chunk files in a directory.
///
/// A new chunk is started on the first row after a limit was reached, so a
/// finished row set never ends with an empty chunk. A row set without rows
/// still gets one chunk holding just the header.
pub struct ChunkedWriter {
    dir: PathBuf,
    format: Arc<dyn Format>,
    options: FormatOptions,
    limits: ChunkingConfig,
    row_set: RowSet,
    current: Option<OpenChunk>,
}

impl ChunkedWriter {
    /// Start writing `row_set` into `dir`. Existing chunks on `row_set` are
    /// discarded.
    pub fn new(
        dir: impl AsRef<Path>,
        mut row_set: RowSet,
        format: Arc<dyn Format>,
        options: &FormatOptions,
        limits: &ChunkingConfig,
    ) -> Self {
        row_set.chunks.clear();
        row_set.row_count = 0;
        Self {
            dir: dir.as_ref().to_path_buf(),
            format,
            options: options.clone(),
            limits: limits.clone(),
            row_set,
            current: None,
        }
    }

    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        if self.current.is_none() {
            self.current = Some(self.open_chunk()?);
        }
        let full = match self.current.as_mut() {
            Some(chunk) => {
                chunk.writer.write_row(row)?;
                chunk.rows += 1;
                self.limits.max_rows.is_some_and(|max| chunk.rows >= max)
                    || self
                        .limits
                        .max_bytes
                        .is_some_and(|max| chunk.writer.bytes_written() >= max)
            }
            None => false,
        };
        if full {
            self.close_chunk()?;
        }
        Ok(())
    }

    /// Metadata accumulated so far; only closed chunks are listed.
    pub fn row_set(&self) -> &RowSet {
        &self.row_set
    }

    /// Close the last chunk and return the completed metadata.
    pub fn finish(mut self) -> Result<RowSet> {
        if self.current.is_none() && self.row_set.chunks.is_empty() {
            self.current = Some(self.open_chunk()?);
        }
        self.close_chunk()?;
        info!(
            "{}: wrote {} rows in {} {} chunk(s)",
            self.row_set.name,
            self.row_set.row_count,
            self.row_set.chunks.len(),
            self.format.name()
        );
        Ok(self.row_set)
    }

    fn open_chunk(&self) -> Result<OpenChunk> {
        let name = chunk_file_name(
            &self.row_set.name,
            self.row_set.chunks.len(),
            self.format.extension(),
        );
        let file = File::create(self.dir.join(&name))?;
        debug!("{}: opened chunk {}", self.row_set.name, name);
        let writer = self
            .format
            .writer(Box::new(file), &self.row_set.columns, &self.options)?;
        Ok(OpenChunk {
            name,
            writer,
            rows: 0,
        })
    }

    fn close_chunk(&mut self) -> Result<()> {
        let Some(chunk) = self.current.take() else {
            return Ok(());
        };
        let bytes = chunk.writer.finish()?;
        debug!(
            "{}: closed chunk {} ({} rows, {} bytes)",
            self.row_set.name, chunk.name, chunk.rows, bytes
        );
        self.row_set.add_chunk(Chunk {
            name: chunk.name,
            row_count: chunk.rows,
        });
        Ok(())
    }
}
