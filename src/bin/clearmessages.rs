use clap::Parser;
use log::info;
use skainet::{program_logger, HttpSource, MessageStore, SkaiNetResult, DEFAULT_API_URL};

///
/// Clear the server's messages, or mark a single message as rescued.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "clearmessages")]
#[clap(author, version, about)]
struct ClearOptions {
    /// The base URL of the message server API.
    #[clap(short, long)]
    #[clap(env = "SKAINET_API_URL")]
    #[clap(default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Mark this log id as rescued instead of clearing everything.
    #[clap(short, long)]
    rescued: Option<String>,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> SkaiNetResult<()> {
    let opts = ClearOptions::parse();

    program_logger("clearmessages", opts.verbose).init()?;

    let store = MessageStore::new(HttpSource::new(&opts.api_url)?);

    match opts.rescued {
        // Acknowledging never fails from the caller's point of view, problems only get logged.
        Some(ref log_id) => store.acknowledge(log_id),
        None => {
            store.clear_all()?;
            info!("Server messages cleared.");
        }
    }

    Ok(())
}
