//! Lossless conversion of GPS waypoints between CSV and GPX.
//!
//! Any reader can feed any writer through a `Vec<Waypoint>`:
//!
//! ```no_run
//! use waypoint_convert::{ColumnMapping, CsvReader, GpxWriter};
//!
//! let mapping: ColumnMapping = "lat:1,lon:0,name:skip,desc:2".parse()?;
//! let parsed = CsvReader::new("spots.csv", Some(mapping), true)?.parse()?;
//! println!("{} rows, {} with errors", parsed.total_rows, parsed.error_rows);
//! GpxWriter::new("spots.gpx").generate(&parsed.waypoints)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod prompt;
pub mod waypoint;

pub use config::{Column, ColumnMapping, Field};
pub use error::{ConvertError, MappingError, MarkupError, WaypointError};
pub use io::csv::{CsvParse, CsvReader, CsvWriter};
pub use io::gpx::{GpxReader, GpxWriter};
pub use waypoint::Waypoint;
