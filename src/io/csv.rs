use crate::config::{Column, ColumnMapping};
use crate::error::{ConvertError, Result, WaypointError};
use crate::waypoint::Waypoint;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

// Why a single CSV row was rejected. Never fatal.
#[derive(Debug, Error)]
enum RowError {
    #[error("column {index} missing, row has {len} fields")]
    MissingColumn { index: usize, len: usize },

    #[error(transparent)]
    Coordinate(#[from] WaypointError),
}

// Waypoints read from a CSV file plus row accounting.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CsvParse {
    pub waypoints: Vec<Waypoint>,
    /// Non-blank rows considered, after any skipped first row.
    pub total_rows: usize,
    /// Considered rows that did not yield a waypoint.
    pub error_rows: usize,
}

/// Reads waypoints from a CSV file laid out by a [`ColumnMapping`].
#[derive(Debug, Clone)]
pub struct CsvReader {
    path: PathBuf,
    mapping: ColumnMapping,
    skip_first: bool,
}

impl CsvReader {
    pub fn new(
        path: impl AsRef<Path>,
        mapping: Option<ColumnMapping>,
        skip_first: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConvertError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        Ok(CsvReader {
            path: path.to_path_buf(),
            mapping: mapping.unwrap_or_default(),
            skip_first,
        })
    }

    pub fn parse(&self) -> Result<CsvParse> {
        info!(path = %self.path.display(), "Parsing CSV");

        let rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|source| self.csv_error(source))?;

        parse_records(rdr, &self.mapping, self.skip_first)
            .map_err(|source| self.csv_error(source))
    }

    fn csv_error(&self, source: csv::Error) -> ConvertError {
        ConvertError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

// Row loop shared by file and in-memory readers.
fn parse_records<R: Read>(
    mut rdr: csv::Reader<R>,
    mapping: &ColumnMapping,
    skip_first: bool,
) -> csv::Result<CsvParse> {
    let mut records = rdr.records();
    if skip_first && records.next().transpose()?.is_some() {
        debug!("Skipped first row");
    }

    let mut parsed = CsvParse::default();
    for result in records {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        parsed.total_rows += 1;
        match waypoint_from_record(&record, mapping) {
            Ok(waypoint) => parsed.waypoints.push(waypoint),
            Err(e) => {
                parsed.error_rows += 1;
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                debug!(line, row = ?record, "Skipping row: {}", e);
            }
        }
    }

    Ok(parsed)
}

fn waypoint_from_record(
    record: &StringRecord,
    mapping: &ColumnMapping,
) -> std::result::Result<Waypoint, RowError> {
    let cell = |index: usize| {
        record.get(index).ok_or(RowError::MissingColumn {
            index,
            len: record.len(),
        })
    };
    let text = |column: Column| -> std::result::Result<Option<String>, RowError> {
        match column {
            Column::Index(index) => Ok(Some(cell(index)?.to_string())),
            Column::Skip => Ok(None),
        }
    };

    let waypoint = Waypoint::from_text(cell(mapping.lat)?, cell(mapping.lon)?)?;
    Ok(waypoint
        .with_name(text(mapping.name)?)
        .with_description(text(mapping.desc)?))
}

/// Writes waypoints to a CSV file, one row per waypoint, no header.
#[derive(Debug, Clone)]
pub struct CsvWriter {
    path: PathBuf,
    mapping: ColumnMapping,
}

impl CsvWriter {
    pub fn new(path: impl AsRef<Path>, mapping: Option<ColumnMapping>) -> Result<Self> {
        let mapping = mapping.unwrap_or_default();
        mapping.check_row_layout()?;

        Ok(CsvWriter {
            path: path.as_ref().to_path_buf(),
            mapping,
        })
    }

    pub fn generate(&self, waypoints: &[Waypoint]) -> Result<usize> {
        info!(path = %self.path.display(), "Generating CSV");

        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .map_err(|source| self.csv_error(source))?;

        let mut total = 0;
        for waypoint in waypoints {
            wtr.write_record(self.build_row(waypoint))
                .map_err(|source| self.csv_error(source))?;
            total += 1;
        }

        wtr.flush().map_err(|source| ConvertError::Io {
            path: self.path.clone(),
            source,
        })?;

        Ok(total)
    }

    // Layout was checked in `new`, so every cell is assigned exactly once.
    fn build_row(&self, waypoint: &Waypoint) -> Vec<String> {
        let mut row = vec![String::new(); self.mapping.row_width()];

        row[self.mapping.lat] = waypoint.latitude().to_string();
        row[self.mapping.lon] = waypoint.longitude().to_string();

        if let Column::Index(index) = self.mapping.name {
            row[index] = waypoint.name().unwrap_or_default().to_string();
        }
        if let Column::Index(index) = self.mapping.desc {
            row[index] = waypoint.description().unwrap_or_default().to_string();
        }

        row
    }

    fn csv_error(&self, source: csv::Error) -> ConvertError {
        ConvertError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}
