use clap::Parser;
use crossbeam_channel::bounded;
use log::{info, warn};
use skainet::{
    program_logger, Cluster, DataMerger, HttpSource, MapView, Message, MessageStore, Poller,
    SkaiNetResult, DEFAULT_API_URL, DEFAULT_POLL_INTERVAL,
};
use std::{
    cmp::Reverse,
    fmt::{self, Display},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

/*-------------------------------------------------------------------------------------------------
 *                                     Command Line Options
 *-----------------------------------------------------------------------------------------------*/

///
/// Watch the live message feed and summarize it as the map would show it.
///
/// This program polls the server, merges the live messages with the seed data, and logs the
/// clusters (or points) for the chosen zoom level after every poll.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "monitor")]
#[clap(author, version, about)]
struct MonitorOptionsInit {
    /// The base URL of the message server API.
    #[clap(short, long)]
    #[clap(env = "SKAINET_API_URL")]
    #[clap(default_value = DEFAULT_API_URL)]
    api_url: String,

    /// A directory of seed data files to merge with the live messages.
    ///
    /// If this is not specified, then the program will check for it in the "SKAINET_SEED_DIR"
    /// environment variable. With neither, only live messages are shown.
    #[clap(short, long)]
    #[clap(env = "SKAINET_SEED_DIR")]
    seed_dir: Option<PathBuf>,

    /// The map zoom level to summarize for.
    #[clap(short, long)]
    #[clap(default_value_t = 9)]
    zoom: i32,

    /// Milliseconds between polls of the server.
    #[clap(short, long)]
    #[clap(default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    interval_ms: u64,

    /// Stop after this many polls. Runs until killed if not specified.
    #[clap(short, long)]
    cycles: Option<usize>,

    /// How many of the largest clusters to list after each poll.
    #[clap(short, long)]
    #[clap(default_value_t = 5)]
    top: usize,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Debug)]
struct MonitorOptionsChecked {
    api_url: String,
    seed_dir: Option<PathBuf>,
    zoom: i32,
    interval: Duration,
    cycles: Option<usize>,
    top: usize,
    verbose: bool,
}

impl Display for MonitorOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "      Server: {}", self.api_url)?;
        match self.seed_dir {
            Some(ref dir) => writeln!(f, "   Seed data: {}", dir.display())?,
            None => writeln!(f, "   Seed data: none")?,
        }
        writeln!(f, "        Zoom: {}", self.zoom)?;
        writeln!(f, "    Interval: {} ms", self.interval.as_millis())?;
        match self.cycles {
            Some(cycles) => writeln!(f, "      Cycles: {}", cycles)?,
            None => writeln!(f, "      Cycles: unlimited")?,
        }
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
fn parse_args() -> SkaiNetResult<MonitorOptionsChecked> {
    let MonitorOptionsInit {
        api_url,
        seed_dir,
        zoom,
        interval_ms,
        cycles,
        top,
        verbose,
    } = MonitorOptionsInit::parse();

    if interval_ms == 0 {
        return Err("The poll interval must be greater than zero.".into());
    }

    Ok(MonitorOptionsChecked {
        api_url,
        seed_dir,
        zoom,
        interval: Duration::from_millis(interval_ms),
        cycles,
        top,
        verbose,
    })
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> SkaiNetResult<()> {
    let opts = parse_args()?;

    program_logger("monitor", opts.verbose).init()?;

    if opts.verbose {
        info!("{}", opts);
    }

    let merger = match opts.seed_dir {
        Some(ref dir) => DataMerger::from_seed_dir(dir.clone()),
        None => DataMerger::without_seed(),
    };
    info!("{} seed points available", merger.seed().len());

    let store = Arc::new(MessageStore::new(HttpSource::new(&opts.api_url)?));

    // Hand each poll's snapshot to the main thread. If the main thread is still busy with the last
    // one, this one is dropped; the next poll will bring a fresher one anyway.
    let (to_main, from_poller) = bounded::<(Vec<Message>, Option<String>)>(1);
    let poller = Poller::start_with(store, opts.interval, move |store| {
        let _ = to_main.try_send((store.snapshot(), store.error()));
    })?;

    let mut cycles = 0;
    for (live, error) in from_poller.iter() {
        if let Some(error) = error {
            warn!("Server problem, showing the last good data: {}", error);
        }

        let points = merger.merge(&live);
        let view = MapView::build(points, opts.zoom);

        summarize(&view, live.len(), opts.top);

        cycles += 1;
        if opts.cycles.map_or(false, |max| cycles >= max) {
            break;
        }
    }

    poller.stop();

    Ok(())
}

fn summarize(view: &MapView, live_count: usize, top: usize) {
    info!(
        "{} live messages, {} incidents on the map as {} {}",
        live_count,
        view.incident_count(),
        view.len(),
        view.mode()
    );

    if let MapView::Clusters(clusters) = view {
        let mut biggest: Vec<&Cluster> = clusters.iter().collect();
        biggest.sort_by_key(|c| Reverse(c.count()));

        for cluster in biggest.into_iter().take(top) {
            info!("    {}", cluster);
        }
    }
}
