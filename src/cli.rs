use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;
use waypoint_convert::ColumnMapping;

/// Convert GPS waypoints between CSV and GPX
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -q for warnings only)
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a CSV file into a GPX document
    CsvToGpx {
        /// CSV file to read
        input: PathBuf,

        /// GPX file to write
        output: PathBuf,

        /// Column layout, e.g. "lat:1,lon:0,name:skip,desc:2"
        #[arg(short, long)]
        mapping: Option<ColumnMapping>,

        /// Treat the first row as a header and skip it
        #[arg(short, long)]
        skip_first: bool,

        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Convert a GPX document into a CSV file
    GpxToCsv {
        /// GPX file to read
        input: PathBuf,

        /// CSV file to write
        output: PathBuf,

        /// Column layout, e.g. "lat:0,lon:1,name:2,desc:skip"
        #[arg(short, long)]
        mapping: Option<ColumnMapping>,

        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

pub fn get_args() -> Args {
    Args::parse()
}
