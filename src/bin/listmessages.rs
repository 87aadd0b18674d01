use chrono::Utc;
use clap::Parser;
use log::info;
use skainet::{
    default_export_name, program_logger, save_json, FilterKind, HttpSource, MessageFilter,
    MessageStats, MessageStore, SkaiNetResult, Urgency, DEFAULT_API_URL,
};
use std::{
    fmt::{self, Display},
    path::PathBuf,
};

/*-------------------------------------------------------------------------------------------------
 *                                     Command Line Options
 *-----------------------------------------------------------------------------------------------*/

///
/// List the messages currently held by the server.
///
/// Unlike the map, this shows messages with no location too. Messages can be narrowed down by a
/// search term, by whether they have a sender name or a location, and by urgency.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "listmessages")]
#[clap(author, version, about)]
struct ListOptionsInit {
    /// The base URL of the message server API.
    #[clap(short, long)]
    #[clap(env = "SKAINET_API_URL")]
    #[clap(default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Only show messages containing this text in the message, sender, node, or id.
    #[clap(short, long)]
    #[clap(default_value = "")]
    search: String,

    /// Which messages to show: all, withName, withoutName, or withGPS.
    #[clap(short, long)]
    #[clap(default_value = "all")]
    filter: FilterKind,

    /// Only show messages with this urgency: HIGH, MEDIUM, LOW, or NONE.
    #[clap(short, long)]
    #[clap(parse(try_from_str=parse_urgency))]
    urgency: Option<Urgency>,

    /// Save the full message list as JSON.
    #[clap(short, long)]
    export: bool,

    /// Where to save the export.
    ///
    /// If this is not specified, then the program will create "disaster_messages_<date>.json" in
    /// the current directory.
    #[clap(long)]
    export_file: Option<PathBuf>,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

fn parse_urgency(urgency: &str) -> Result<Urgency, String> {
    urgency
        .to_uppercase()
        .parse::<Urgency>()
        .map_err(|_| format!("Argument is not a valid urgency: {}", urgency))
}

#[derive(Debug)]
struct ListOptionsChecked {
    api_url: String,
    filter: MessageFilter,
    export_file: Option<PathBuf>,
    verbose: bool,
}

impl Display for ListOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "   Server: {}", self.api_url)?;
        writeln!(f, "   Search: {:?}", self.filter.search)?;
        writeln!(f, "   Filter: {:?}", self.filter.kind)?;
        match self.filter.urgency {
            Some(urgency) => writeln!(f, "  Urgency: {}", urgency)?,
            None => writeln!(f, "  Urgency: any")?,
        }
        if let Some(ref export_file) = self.export_file {
            writeln!(f, "   Export: {}", export_file.display())?;
        }
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
fn parse_args() -> SkaiNetResult<ListOptionsChecked> {
    let ListOptionsInit {
        api_url,
        search,
        filter,
        urgency,
        export,
        export_file,
        verbose,
    } = ListOptionsInit::parse();

    let export_file = match (export, export_file) {
        (_, Some(path)) => Some(path),
        (true, None) => Some(default_export_name(Utc::now())),
        (false, None) => None,
    };

    Ok(ListOptionsChecked {
        api_url,
        filter: MessageFilter {
            search,
            kind: filter,
            urgency,
        },
        export_file,
        verbose,
    })
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> SkaiNetResult<()> {
    let opts = parse_args()?;

    program_logger("listmessages", opts.verbose).init()?;

    if opts.verbose {
        info!("{}", opts);
    }

    let store = MessageStore::new(HttpSource::new(&opts.api_url)?);
    store.fetch_all()?;

    let messages = store.snapshot();
    let shown = opts.filter.apply(&messages);

    for msg in &shown {
        println!("{}", msg);
    }

    println!();
    println!("Showing {} of {} messages", shown.len(), messages.len());
    println!("{}", MessageStats::from_messages(shown.iter().copied()));

    if let Some(ref export_file) = opts.export_file {
        save_json(&messages, export_file)?;
        info!(
            "Exported {} messages to {}",
            messages.len(),
            export_file.display()
        );
    }

    Ok(())
}
