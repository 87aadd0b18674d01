use clap::Parser;
use log::{info, warn};
use skainet::{
    program_logger, DataMerger, HttpSource, MapView, MessageStore, SkaiNetResult, DEFAULT_API_URL,
};
use std::{
    fmt::{self, Display},
    path::PathBuf,
};

/*-------------------------------------------------------------------------------------------------
 *                                     Command Line Options
 *-----------------------------------------------------------------------------------------------*/

///
/// Export the incident map into a KML file.
///
/// This program fetches the current messages once, merges them with the seed data, and writes the
/// points or clusters for the chosen zoom level as KML.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "exportkml")]
#[clap(author, version, about)]
struct ExportKmlOptionsInit {
    /// The base URL of the message server API.
    #[clap(short, long)]
    #[clap(env = "SKAINET_API_URL")]
    #[clap(default_value = DEFAULT_API_URL)]
    api_url: String,

    /// A directory of seed data files to merge with the live messages.
    #[clap(short, long)]
    #[clap(env = "SKAINET_SEED_DIR")]
    seed_dir: Option<PathBuf>,

    /// The map zoom level to export.
    #[clap(short, long)]
    #[clap(default_value_t = 9)]
    zoom: i32,

    /// The path to a KML file to produce from this run.
    ///
    /// If this is not specified, then the program will create "skainet_z<zoom>.kml" in the current
    /// directory.
    #[clap(short, long)]
    kml_file: Option<PathBuf>,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Debug)]
struct ExportKmlOptionsChecked {
    api_url: String,
    seed_dir: Option<PathBuf>,
    zoom: i32,
    kml_file: PathBuf,
    verbose: bool,
}

impl Display for ExportKmlOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "      Server: {}", self.api_url)?;
        match self.seed_dir {
            Some(ref dir) => writeln!(f, "   Seed data: {}", dir.display())?,
            None => writeln!(f, "   Seed data: none")?,
        }
        writeln!(f, "        Zoom: {}", self.zoom)?;
        writeln!(f, "  Output KML: {}", self.kml_file.display())?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
fn parse_args() -> SkaiNetResult<ExportKmlOptionsChecked> {
    let ExportKmlOptionsInit {
        api_url,
        seed_dir,
        zoom,
        kml_file,
        verbose,
    } = ExportKmlOptionsInit::parse();

    let kml_file = kml_file.unwrap_or_else(|| PathBuf::from(format!("skainet_z{}.kml", zoom)));

    Ok(ExportKmlOptionsChecked {
        api_url,
        seed_dir,
        zoom,
        kml_file,
        verbose,
    })
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> SkaiNetResult<()> {
    let opts = parse_args()?;

    program_logger("exportkml", opts.verbose).init()?;

    if opts.verbose {
        info!("{}", opts);
    }

    let store = MessageStore::new(HttpSource::new(&opts.api_url)?);
    if let Err(err) = store.fetch_all() {
        warn!("Exporting without live data: {}", err);
    }

    let merger = match opts.seed_dir {
        Some(ref dir) => DataMerger::from_seed_dir(dir.clone()),
        None => DataMerger::without_seed(),
    };

    let points = merger.merge(&store.snapshot());
    let view = MapView::build(points, opts.zoom);

    view.save_kml(&opts.kml_file)?;

    info!(
        "Wrote {} {} ({} incidents) to {}",
        view.len(),
        view.mode(),
        view.incident_count(),
        opts.kml_file.display()
    );

    Ok(())
}
