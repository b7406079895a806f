//! Row transfer between column accesses and backup streams.
//!
//! This module connects the value dispatcher to the codecs:
//! - [`TransferEngine`] dumps source rows into a [`ChunkedWriter`] and loads
//!   backed-up rows into target column accesses
//! - [`ChunkedWriter`] splits a row set into numbered chunk files
//! - [`convert_rowset`] re-encodes a backed-up row set in another format
//!
//! Cancellation is cooperative: the shared flag is checked between rows,
//! never in the middle of one.

mod chunked;
mod convert;

pub use chunked::{chunk_file_name, ChunkedWriter};
pub use convert::{convert_rowset, same_file};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::Config;
use crate::core::{Column, ColumnAccess, Row, RowSet, ValueOptions};
use crate::dialect::DialectSession;
use crate::error::{MigrateError, Result};
use crate::format::RowReader;
use crate::value::ValueDispatcher;

/// Statistics from a dump or load.
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// Rows transferred.
    pub rows: u64,

    /// NULL values among those rows.
    pub nulls: u64,

    pub elapsed: Duration,

    /// Whether the stream was drained completely.
    pub completed: bool,
}

/// Moves rows between column accesses and codecs for one dialect.
pub struct TransferEngine {
    dispatcher: ValueDispatcher,
    options: ValueOptions,
    cancel: Option<Arc<AtomicBool>>,
    rows_transferred: AtomicU64,
    /// Optional shared counter for real-time progress reporting.
    progress_counter: Option<Arc<AtomicU64>>,
}

impl TransferEngine {
    pub fn new(dispatcher: ValueDispatcher, options: ValueOptions) -> Self {
        Self {
            dispatcher,
            options,
            cancel: None,
            rows_transferred: AtomicU64::new(0),
            progress_counter: None,
        }
    }

    /// Engine using the session dialect's dispatcher and the configured
    /// value options.
    pub fn for_session(session: &DialectSession, config: &Config) -> Self {
        Self::new(
            session.dialect().value_dispatcher().clone(),
            config.value_options(),
        )
    }

    /// Observe an external abort signal between rows.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Set a shared progress counter for real-time row tracking.
    pub fn with_progress_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.progress_counter = Some(counter);
        self
    }

    /// Get the total rows transferred so far.
    pub fn rows_transferred(&self) -> u64 {
        self.rows_transferred.load(Ordering::Relaxed)
    }

    /// Row-set metadata for a table, with each column's variant kind.
    pub fn describe(&self, name: &str, columns: &[Column]) -> Result<RowSet> {
        let kinds = columns
            .iter()
            .map(|c| self.dispatcher.classify(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(RowSet::from_columns(name, columns.iter().zip(kinds)))
    }

    /// Reduce one source row to variants.
    pub fn encode_row<A: ColumnAccess>(&self, cells: &[A]) -> Result<Row> {
        cells
            .iter()
            .map(|cell| {
                let value = cell.get_value(&self.options)?;
                self.dispatcher.to_variant(&value, cell.column(), &self.options)
            })
            .collect()
    }

    /// Rebuild typed values from `row` into the target cells.
    pub fn decode_row<A: ColumnAccess>(&self, row: &Row, cells: &mut [A]) -> Result<()> {
        if row.len() != cells.len() {
            return Err(MigrateError::Config(format!(
                "row has {} values but the target has {} columns",
                row.len(),
                cells.len()
            )));
        }
        for (variant, cell) in row.iter().zip(cells.iter_mut()) {
            let value = self
                .dispatcher
                .from_variant(variant.as_ref(), cell.column(), &self.options)?;
            cell.set_value(value, &self.options)?;
        }
        Ok(())
    }

    /// Write every source row to `sink`, then close it.
    ///
    /// `rows` yields one set of cells per source row, in source order. The
    /// sink is finished even if the cancel flag is raised, so completed
    /// chunks stay readable.
    pub fn dump<I, A>(&self, rows: I, mut sink: ChunkedWriter) -> Result<(RowSet, TransferStats)>
    where
        I: IntoIterator<Item = Result<Vec<A>>>,
        A: ColumnAccess,
    {
        let name = sink.row_set().name.clone();
        info!("{}: starting dump", name);
        let start = Instant::now();
        let mut stats = TransferStats::default();

        for cells in rows {
            if self.is_cancelled() {
                sink.finish()?;
                info!("{}: dump cancelled after {} rows", name, stats.rows);
                return Err(MigrateError::Cancelled);
            }
            let row = self.encode_row(&cells?)?;
            stats.nulls += row.iter().filter(|v| v.is_none()).count() as u64;
            sink.write_row(&row)?;
            stats.rows += 1;
            self.record_row();
        }

        let row_set = sink.finish()?;
        stats.elapsed = start.elapsed();
        stats.completed = true;
        info!(
            "{}: dumped {} rows in {:?}",
            name, stats.rows, stats.elapsed
        );
        Ok((row_set, stats))
    }

    /// Read every row from `reader`, decode it into `cells` and hand the
    /// populated cells to `insert`.
    pub fn load<A, F>(
        &self,
        reader: &mut dyn RowReader,
        cells: &mut [A],
        mut insert: F,
    ) -> Result<TransferStats>
    where
        A: ColumnAccess,
        F: FnMut(&mut [A]) -> Result<()>,
    {
        let start = Instant::now();
        let mut stats = TransferStats::default();

        loop {
            if self.is_cancelled() {
                info!("load cancelled after {} rows", stats.rows);
                return Err(MigrateError::Cancelled);
            }
            let Some(row) = reader.read_row()? else {
                break;
            };
            stats.nulls += row.iter().filter(|v| v.is_none()).count() as u64;
            self.decode_row(&row, cells)?;
            insert(cells)?;
            stats.rows += 1;
            self.record_row();
        }

        stats.elapsed = start.elapsed();
        stats.completed = true;
        debug!("loaded {} rows in {:?}", stats.rows, stats.elapsed);
        Ok(stats)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn record_row(&self) {
        self.rows_transferred.fetch_add(1, Ordering::Relaxed);
        if let Some(ref counter) = self.progress_counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}
