//! Conversion orchestration
//!
//! Resolves each conversion task into one of three modes and drives the row
//! writer over every source row:
//!
//! - **single-file**: one DBC/DBF file, one Parquet artifact
//! - **fan-out**: a directory, one artifact per eligible file
//! - **combine**: a directory, one artifact under a union schema
//!
//! Tasks are immutable records validated at construction. Processing is
//! strictly sequential — tasks in order, files in order, rows one at a
//! time — and the first fatal error halts the task set. Artifacts already
//! committed for earlier files stay on disk.

use crate::dbc;
use crate::dbf::{DbfReader, DbfSchema, FieldDescriptor};
use crate::error::{Result, TaskError};
use crate::parquet::{target_schema, ParquetSink, RowWriter, WriterConfig};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix appended to a source file name to derive its artifact name.
pub const PARQUET_EXTENSION: &str = ".parquet";

/// Rows between progress callback invocations.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Progress callback: current source file and rows written to the open artifact.
pub type ProgressCallback = Box<dyn Fn(&Path, u64) + Send>;

/// One immutable conversion task.
///
/// Input/output kinds and the combine flag are validated here, before any
/// conversion I/O happens.
#[derive(Debug, Clone)]
pub struct ConvertTask {
    input: PathBuf,
    output: Option<PathBuf>,
    schema_name: Option<String>,
    combine: bool,
}

/// Resolved processing mode for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    SingleFile,
    FanOut,
    Combine,
}

impl ConvertTask {
    /// Validate and create a task.
    ///
    /// `output` of `None` means: next to the input file for single files,
    /// the input directory itself for fan-out. Combine always needs a
    /// concrete output file path.
    pub fn new(
        input: PathBuf,
        output: Option<PathBuf>,
        schema_name: Option<String>,
        combine: bool,
    ) -> std::result::Result<Self, TaskError> {
        let meta = fs::metadata(&input).map_err(|_| TaskError::InputNotFound {
            path: input.clone(),
        })?;

        if combine {
            if !meta.is_dir() {
                return Err(TaskError::CombineRequiresDirectory { path: input });
            }
            match &output {
                None => return Err(TaskError::CombineRequiresFileOutput),
                Some(path) if path.is_dir() => return Err(TaskError::CombineRequiresFileOutput),
                Some(_) => {}
            }
        } else if meta.is_dir() {
            if let Some(out) = &output {
                if out.is_file() {
                    return Err(TaskError::FanOutRequiresDirectoryOutput {
                        input,
                        output: out.clone(),
                    });
                }
            }
        }

        Ok(Self {
            input,
            output,
            schema_name,
            combine,
        })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    pub fn combine(&self) -> bool {
        self.combine
    }

    /// Resolve the processing mode against the filesystem.
    pub fn mode(&self) -> std::result::Result<TaskMode, TaskError> {
        let meta = fs::metadata(&self.input).map_err(|_| TaskError::InputNotFound {
            path: self.input.clone(),
        })?;
        Ok(match (meta.is_dir(), self.combine) {
            (false, _) => TaskMode::SingleFile,
            (true, false) => TaskMode::FanOut,
            (true, true) => TaskMode::Combine,
        })
    }
}

/// Statistics from a conversion run.
#[derive(Debug, Clone, Default)]
pub struct ConvertStats {
    /// Number of Parquet artifacts committed
    pub files_converted: u32,
    /// Total rows across all artifacts
    pub rows_converted: u64,
    /// Total artifact bytes on disk
    pub bytes_written: u64,
    /// Committed artifact paths, in completion order
    pub artifacts: Vec<PathBuf>,
}

impl ConvertStats {
    fn add_artifact(&mut self, path: &Path, rows: u64) {
        self.files_converted += 1;
        self.rows_converted += rows;
        self.bytes_written += fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        self.artifacts.push(path.to_path_buf());
    }
}

/// Drives a set of conversion tasks, one at a time.
pub struct Converter {
    tasks: Vec<ConvertTask>,
    writer_config: WriterConfig,
}

impl Converter {
    pub fn new(writer_config: WriterConfig) -> Self {
        Self {
            tasks: Vec::new(),
            writer_config,
        }
    }

    /// Queue a task. Tasks run in insertion order.
    pub fn add_task(&mut self, task: ConvertTask) -> &mut Self {
        self.tasks.push(task);
        self
    }

    /// Run all queued tasks.
    pub fn convert(&self) -> Result<ConvertStats> {
        self.convert_with_progress(None)
    }

    /// Run all queued tasks, reporting row counts through `progress`.
    pub fn convert_with_progress(&self, progress: Option<ProgressCallback>) -> Result<ConvertStats> {
        let mut stats = ConvertStats::default();
        for task in &self.tasks {
            self.run_task(task, &mut stats, progress.as_ref())?;
        }
        Ok(stats)
    }

    fn run_task(
        &self,
        task: &ConvertTask,
        stats: &mut ConvertStats,
        progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        match task.mode()? {
            TaskMode::SingleFile => {
                let output = resolve_file_output(task.input(), task.output());
                self.convert_file(task.input(), &output, task.schema_name(), stats, progress)
            }
            TaskMode::FanOut => {
                let inputs = eligible_files(task.input())?;
                if inputs.is_empty() {
                    warn!("no eligible DBC/DBF files in {}", task.input().display());
                    return Ok(());
                }
                let out_dir = task.output().unwrap_or(task.input());
                for input in &inputs {
                    let output = artifact_in_dir(out_dir, input);
                    self.convert_file(input, &output, task.schema_name(), stats, progress)?;
                }
                Ok(())
            }
            TaskMode::Combine => self.convert_combining(task, stats, progress),
        }
    }

    fn convert_file(
        &self,
        input: &Path,
        output: &Path,
        schema_name: Option<&str>,
        stats: &mut ConvertStats,
        progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        info!(
            "File conversion started - {} => {}",
            input.display(),
            output.display()
        );

        let mut reader = open_reader(input, schema_name)?;
        let target = target_schema(reader.schema())?;
        let row_writer = RowWriter::new(reader.schema())?;

        let sources = vec![file_name_string(input)];
        let mut sink = ParquetSink::create(output, target, &self.writer_config, &sources)?;
        let rows = write_rows(&mut reader, &row_writer, &mut sink, input, 0, progress)?;
        sink.close()?;

        info!("Write finished - {rows} row(s) converted");
        stats.add_artifact(output, rows);
        Ok(())
    }

    fn convert_combining(
        &self,
        task: &ConvertTask,
        stats: &mut ConvertStats,
        progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        let inputs = eligible_files(task.input())?;
        if inputs.is_empty() {
            warn!("no eligible DBC/DBF files in {}", task.input().display());
            return Ok(());
        }
        let output = task.output().ok_or(TaskError::CombineRequiresFileOutput)?;

        // Pre-scan every file's schema before any writing starts.
        let mut readers = Vec::with_capacity(inputs.len());
        for input in &inputs {
            readers.push(open_reader(input, task.schema_name())?);
        }

        let union = union_schema(
            readers.iter().map(|r| r.schema().as_ref()),
            task.schema_name().unwrap_or(DbfSchema::DEFAULT_NAME),
        );
        let target = target_schema(&union)?;
        let row_writer = RowWriter::new(&union)?;

        let sources: Vec<String> = inputs.iter().map(|p| file_name_string(p)).collect();
        let mut sink = ParquetSink::create(output, target, &self.writer_config, &sources)?;

        let mut total = 0u64;
        for (input, reader) in inputs.iter().zip(readers.iter_mut()) {
            info!(
                "File conversion started - {} => {}",
                input.display(),
                output.display()
            );
            total += write_rows(reader, &row_writer, &mut sink, input, total, progress)?;
        }
        sink.close()?;

        info!("Write finished - {total} row(s) converted");
        stats.add_artifact(output, total);
        Ok(())
    }
}

/// Merge schemas into one superset schema, first-seen field wins.
///
/// Field order is first-seen order across the input list. A later schema
/// redefining an existing name is diagnosed but silently discarded, so rows
/// from later files are encoded under the first file's definition.
pub fn union_schema<'a>(
    schemas: impl IntoIterator<Item = &'a DbfSchema>,
    name: &str,
) -> DbfSchema {
    let mut fields: Vec<FieldDescriptor> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for schema in schemas {
        for field in &schema.fields {
            match index.get(&field.name) {
                None => {
                    index.insert(field.name.clone(), fields.len());
                    fields.push(field.clone());
                }
                Some(&first) => {
                    let kept = &fields[first];
                    if kept != field {
                        warn!(
                            field = %field.name,
                            kept = %describe_field(kept),
                            ignored = %describe_field(field),
                            "conflicting field redefinition ignored; keeping the first-seen definition"
                        );
                    }
                }
            }
        }
    }

    DbfSchema::new(Some(name), fields)
}

fn describe_field(field: &FieldDescriptor) -> String {
    format!(
        "{} ({}, {})",
        field.field_type, field.length, field.decimal_count
    )
}

/// Open a source file as a DBF reader, decompressing DBC containers first.
fn open_reader(input: &Path, schema_name: Option<&str>) -> Result<DbfReader<Box<dyn Read>>> {
    let stream: Box<dyn Read> = if is_compressed(input) {
        debug!("{} is compressed, decompressing", input.display());
        let (bytes, dstats) = dbc::decompress(input)?;
        debug!(
            "decompressed {} bytes to {} bytes in {:?}",
            dstats.input_size, dstats.output_size, dstats.elapsed
        );
        Box::new(Cursor::new(bytes))
    } else {
        Box::new(BufReader::new(File::open(input)?))
    };
    Ok(DbfReader::new(stream, schema_name)?)
}

/// Stream every row of `reader` into `sink`.
fn write_rows(
    reader: &mut DbfReader<Box<dyn Read>>,
    row_writer: &RowWriter,
    sink: &mut ParquetSink<File>,
    source: &Path,
    rows_base: u64,
    progress: Option<&ProgressCallback>,
) -> Result<u64> {
    let mut rows = 0u64;
    while let Some(row) = reader.next_row()? {
        row_writer.write(&row, sink)?;
        rows += 1;
        if rows % PROGRESS_INTERVAL == 0 {
            if let Some(callback) = progress {
                callback(source, rows_base + rows);
            }
        }
    }
    if let Some(callback) = progress {
        callback(source, rows_base + rows);
    }
    Ok(rows)
}

/// Files a directory scan converts: regular files with a `.dbc` or `.dbf`
/// extension, any case, subdirectories not visited. Sorted by name so runs
/// are deterministic across platforms.
pub(crate) fn eligible_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_supported_file(path: &Path) -> bool {
    has_extension(path, "dbc") || has_extension(path, "dbf")
}

pub(crate) fn is_compressed(path: &Path) -> bool {
    has_extension(path, "dbc")
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Output path for a single-file task: explicit file path, a name inside an
/// output directory, or `<input>.parquet` next to the input.
fn resolve_file_output(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        None => append_extension(input),
        Some(dir) if dir.is_dir() => artifact_in_dir(dir, input),
        Some(path) => path.to_path_buf(),
    }
}

fn append_extension(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(PARQUET_EXTENSION);
    PathBuf::from(name)
}

fn artifact_in_dir(dir: &Path, input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(PARQUET_EXTENSION);
    dir.join(name)
}

fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
