//! CSV serializer
//!
//! Renders rows against a [`ColumnSchema`]: one header row, then one record per
//! row with fields in schema order. Output uses `\n` line endings and quotes
//! only where needed.

use csv::{Terminator, Writer, WriterBuilder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::{ColumnSchema, CsvGenerationError, CsvResult, CsvRow};

/// A written export file must be larger than this many bytes.
pub const MIN_FILE_SIZE_BYTES: u64 = 15;

const DEFAULT_BUFFER_SIZE: usize = 8192;

fn writer_builder() -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder.terminator(Terminator::Any(b'\n'));
    builder
}

fn write_records<W, R>(writer: &mut Writer<W>, rows: &[R], schema: &ColumnSchema) -> CsvResult<()>
where
    W: Write,
    R: CsvRow,
{
    writer
        .write_record(schema.iter().map(|column| column.header))
        .map_err(|e| CsvGenerationError::CsvError(format!("Failed to write header: {}", e)))?;

    for (index, row) in rows.iter().enumerate() {
        let record: Vec<String> = schema
            .iter()
            .map(|column| row.field(column.field).map(|cell| cell.into_owned()).unwrap_or_default())
            .collect();

        writer
            .write_record(&record)
            .map_err(|e| CsvGenerationError::CsvError(format!("Failed to write row {}: {}", index + 1, e)))?;
    }

    Ok(())
}

/// Render rows to CSV bytes in memory.
///
/// On failure no partial output is returned.
pub fn render<R: CsvRow>(rows: &[R], schema: &ColumnSchema) -> CsvResult<Vec<u8>> {
    let mut writer = writer_builder().from_writer(Vec::new());

    let result = write_records(&mut writer, rows, schema).and_then(|()| {
        writer
            .into_inner()
            .map_err(|e| CsvGenerationError::IoError(format!("Failed to flush CSV writer: {}", e.error())))
    });

    match result {
        Ok(bytes) => {
            debug!(rows = rows.len(), bytes = bytes.len(), "CSV rendered in memory");
            Ok(bytes)
        }
        Err(e) => {
            error!("CSV generation failed: {}", e);
            Err(e)
        }
    }
}

/// Render rows to a file at `path`, then verify the file.
///
/// Parent directories are created as needed. If writing fails or the file does
/// not pass [`verify_integrity`], the file is removed.
pub fn render_to_path<R: CsvRow>(rows: &[R], schema: &ColumnSchema, path: impl AsRef<Path>) -> CsvResult<PathBuf> {
    let path = path.as_ref();
    info!("Writing CSV export: path={}", path.display());

    if let Err(e) = write_file(rows, schema, path) {
        error!("CSV generation failed: {}", e);
        remove_partial(path);
        return Err(e);
    }

    let size = verify_integrity(path, MIN_FILE_SIZE_BYTES)?;
    info!(rows = rows.len(), bytes = size, "CSV export written: path={}", path.display());
    Ok(path.to_path_buf())
}

fn write_file<R: CsvRow>(rows: &[R], schema: &ColumnSchema, path: &Path) -> CsvResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| CsvGenerationError::IoError(format!("Failed to create directory: {}", e)))?;
    }

    let file = File::create(path)
        .map_err(|e| CsvGenerationError::IoError(format!("Failed to create file: {}", e)))?;

    let mut writer = writer_builder().from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));
    write_records(&mut writer, rows, schema)?;

    let buf_writer = writer
        .into_inner()
        .map_err(|e| CsvGenerationError::IoError(format!("Failed to get inner writer: {}", e.error())))?;

    let file = buf_writer
        .into_inner()
        .map_err(|e| CsvGenerationError::IoError(format!("Failed to get file handle: {}", e.error())))?;

    file.sync_all()
        .map_err(|e| CsvGenerationError::IoError(format!("Failed to sync file: {}", e)))
}

/// Check that `path` exists and is larger than `min_size` bytes.
///
/// Returns the file size. A file that fails the check is deleted.
pub fn verify_integrity(path: &Path, min_size: u64) -> CsvResult<u64> {
    let size = std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);

    if size > min_size {
        return Ok(size);
    }

    error!(
        size,
        min_size,
        "CSV integrity check failed: path={}",
        path.display()
    );
    remove_partial(path);

    Err(CsvGenerationError::IntegrityError {
        path: path.to_path_buf(),
        size,
        min_size,
    })
}

fn remove_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove partial CSV file {}: {}", path.display(), e);
        }
    }
}
