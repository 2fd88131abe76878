use anyhow::{Context, Result, bail};
use std::io::{self, IsTerminal};
use std::path::Path;
use waypoint_convert::logging::{LogConfig, init_logging};
use waypoint_convert::prompt::{Answer, confirm};
use waypoint_convert::{ColumnMapping, CsvReader, CsvWriter, GpxReader, GpxWriter};

mod cli;

use cli::{Args, Command, get_args};

fn main() -> Result<()> {
    let args = get_args();
    init_logging(&log_config(&args)).context("Failed to initialize logging")?;

    match args.command {
        Command::CsvToGpx {
            input,
            output,
            mapping,
            skip_first,
            yes,
        } => csv_to_gpx(&input, &output, mapping, skip_first, yes),
        Command::GpxToCsv {
            input,
            output,
            mapping,
            yes,
        } => gpx_to_csv(&input, &output, mapping, yes),
    }
}

fn log_config(args: &Args) -> LogConfig {
    LogConfig {
        level_filter: args.verbosity.tracing_level_filter(),
        use_env_filter: !args.verbosity.is_present(),
        with_ansi: io::stderr().is_terminal(),
    }
}

fn csv_to_gpx(
    input: &Path,
    output: &Path,
    mapping: Option<ColumnMapping>,
    skip_first: bool,
    yes: bool,
) -> Result<()> {
    let reader = CsvReader::new(input, mapping, skip_first)?;
    ensure_writable(output, yes)?;

    let parsed = reader
        .parse()
        .with_context(|| format!("Failed to read waypoints from {:?}", input))?;

    println!("Rows processed: {}", parsed.total_rows);
    println!("Rows with errors: {}", parsed.error_rows);

    if parsed.error_rows > 0 && !yes {
        let question = format!(
            "{} of {} rows could not be parsed. Continue with the remaining waypoints?",
            parsed.error_rows, parsed.total_rows
        );
        if !confirm(&question, Some(Answer::Yes))? {
            bail!("Conversion cancelled");
        }
    }

    let total = GpxWriter::new(output)
        .generate(&parsed.waypoints)
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!("Wrote {} waypoints to {}", total, output.display());
    Ok(())
}

fn gpx_to_csv(input: &Path, output: &Path, mapping: Option<ColumnMapping>, yes: bool) -> Result<()> {
    let reader = GpxReader::new(input)?;
    let writer = CsvWriter::new(output, mapping)?;
    ensure_writable(output, yes)?;

    let waypoints = reader
        .parse()
        .with_context(|| format!("Failed to read waypoints from {:?}", input))?;
    println!("Waypoints found: {}", waypoints.len());

    let total = writer
        .generate(&waypoints)
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!("Wrote {} waypoints to {}", total, output.display());
    Ok(())
}

// Asks before replacing an existing output file.
fn ensure_writable(output: &Path, yes: bool) -> Result<()> {
    if yes || !output.exists() {
        return Ok(());
    }

    let question = format!("{} already exists. Overwrite?", output.display());
    if !confirm(&question, Some(Answer::No))? {
        bail!("Not overwriting {}", output.display());
    }
    Ok(())
}
