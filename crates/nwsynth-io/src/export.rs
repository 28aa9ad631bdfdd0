//! Export collaborator: persists named frames.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Context, Result};
use polars::prelude::*;
#[cfg(feature = "parquet")]
use polars::prelude::ParquetWriter;
use serde::{Deserialize, Serialize};
use tracing::debug;

use nwsynth_core::{SynthError, SynthResult};

/// Writes named tables somewhere.
pub trait Exporter: Send + Sync {
    /// Persist `frame` under `name`. An error means nothing usable was written.
    fn write(&self, frame: &mut DataFrame, name: &str) -> SynthResult<()>;
}

/// File format of a [`FileExporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }

    /// Format of a table file, from its extension.
    pub fn of_path(path: &Path) -> Option<Self> {
        let extension = path.extension().and_then(OsStr::to_str)?;
        [OutputFormat::Parquet, OutputFormat::Csv]
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(extension))
    }

    fn encode(self, frame: &mut DataFrame, file: &mut File) -> Result<()> {
        match self {
            #[cfg(feature = "parquet")]
            OutputFormat::Parquet => ParquetWriter::new(file)
                .finish(frame)
                .map(|_| ())
                .context("encoding parquet"),
            #[cfg(not(feature = "parquet"))]
            OutputFormat::Parquet => Err(anyhow::anyhow!(
                "built without parquet support; export with --format csv"
            )),
            OutputFormat::Csv => CsvWriter::new(file).finish(frame).context("encoding csv"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parquet" => Ok(OutputFormat::Parquet),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(SynthError::Config(format!(
                "unsupported output format '{other}'; use parquet or csv"
            ))),
        }
    }
}

/// Staging directory under the export directory.
const STAGING_DIR: &str = ".staging";

/// Writes `<directory>/<name>.<ext>`. Each table is encoded under
/// [`STAGING_DIR`] and renamed into place, so a failed export leaves no
/// partial table behind.
#[derive(Debug, Clone)]
pub struct FileExporter {
    directory: PathBuf,
    format: OutputFormat,
}

impl FileExporter {
    pub fn new(directory: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            directory: directory.into(),
            format,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn file_name(&self, name: &str) -> String {
        format!("{name}.{}", self.format.extension())
    }

    /// Final path of a named output.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(self.file_name(name))
    }

    fn staged_path(&self, name: &str) -> PathBuf {
        self.directory.join(STAGING_DIR).join(self.file_name(name))
    }

    fn write_staged(&self, frame: &mut DataFrame, name: &str) -> Result<PathBuf> {
        let staged = self.staged_path(name);
        let staging = self.directory.join(STAGING_DIR);
        fs::create_dir_all(&staging)
            .with_context(|| format!("creating staging directory {}", staging.display()))?;
        let encoded = File::create(&staged)
            .with_context(|| format!("creating {}", staged.display()))
            .and_then(|mut file| self.format.encode(frame, &mut file));
        if let Err(err) = encoded {
            let _ = fs::remove_file(&staged);
            return Err(err);
        }
        let output = self.path_for(name);
        fs::rename(&staged, &output)
            .with_context(|| format!("moving {} into {}", staged.display(), output.display()))?;
        // Only succeeds once nothing else is staged.
        let _ = fs::remove_dir(&staging);
        Ok(output)
    }
}

impl Exporter for FileExporter {
    fn write(&self, frame: &mut DataFrame, name: &str) -> SynthResult<()> {
        let output = self
            .write_staged(frame, name)
            .map_err(|err| SynthError::Export(format!("{name}: {err:#}")))?;
        debug!(name, rows = frame.height(), path = %output.display(), "exported table");
        Ok(())
    }
}

/// Keeps every written frame in memory, keyed by name.
#[derive(Debug, Default)]
pub struct MemoryExporter {
    frames: Mutex<BTreeMap<String, DataFrame>>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<DataFrame> {
        self.frames.lock().ok()?.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.frames
            .lock()
            .map(|frames| frames.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Exporter for MemoryExporter {
    fn write(&self, frame: &mut DataFrame, name: &str) -> SynthResult<()> {
        let mut frames = self
            .frames
            .lock()
            .map_err(|_| SynthError::Export("memory exporter lock poisoned".into()))?;
        frames.insert(name.to_string(), frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::read_frame;
    use tempfile::tempdir;

    fn frame() -> DataFrame {
        df![
            "stage" => &[1i64, 2],
            "value" => &[1.5f64, 2.5],
        ]
        .unwrap()
    }

    #[test]
    fn csv_exports_land_in_place_and_read_back() {
        let dir = tempdir().unwrap();
        let exporter = FileExporter::new(dir.path().join("out"), OutputFormat::Csv);
        exporter.write(&mut frame(), "CMO_SBM").unwrap();
        let path = exporter.path_for("CMO_SBM");
        assert!(path.exists());
        assert!(!exporter.staged_path("CMO_SBM").exists());
        assert!(!dir.path().join("out").join(STAGING_DIR).exists());
        let back = read_frame(&path).unwrap();
        assert_eq!(back.height(), 2);
    }

    #[cfg(feature = "parquet")]
    #[test]
    fn parquet_exports_read_back() {
        let dir = tempdir().unwrap();
        let exporter = FileExporter::new(dir.path(), OutputFormat::Parquet);
        exporter.write(&mut frame(), "METADATA_OPERATION").unwrap();
        let back = read_frame(&exporter.path_for("METADATA_OPERATION")).unwrap();
        assert_eq!(back.get_column_names(), vec!["stage", "value"]);
    }

    #[test]
    fn memory_exporter_keeps_frames() {
        let exporter = MemoryExporter::new();
        exporter.write(&mut frame(), "A").unwrap();
        exporter.write(&mut frame(), "B").unwrap();
        assert_eq!(exporter.names(), vec!["A", "B"]);
        assert_eq!(exporter.get("A").map(|f| f.height()), Some(2));
        assert!(exporter.get("C").is_none());
    }

    #[test]
    fn formats_parse() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xlsx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn formats_follow_file_extensions() {
        assert_eq!(OutputFormat::of_path(Path::new("out/CMO_SBM.CSV")), Some(OutputFormat::Csv));
        assert_eq!(
            OutputFormat::of_path(Path::new("registry/case.parquet")),
            Some(OutputFormat::Parquet)
        );
        assert_eq!(OutputFormat::of_path(Path::new("deck/hidr.dat")), None);
        assert_eq!(OutputFormat::of_path(Path::new("outputs/sin")), None);
    }

    #[test]
    fn failed_exports_leave_no_table_behind() {
        let dir = tempdir().unwrap();
        let exporter = FileExporter::new(dir.path(), OutputFormat::Csv);
        // A directory where the staged file should go makes creation fail.
        fs::create_dir_all(exporter.staged_path("CMO_SBM")).unwrap();
        let err = exporter.write(&mut frame(), "CMO_SBM").unwrap_err();
        assert!(matches!(err, SynthError::Export(ref msg) if msg.starts_with("CMO_SBM")));
        assert!(!exporter.path_for("CMO_SBM").exists());
    }
}
