/*!
 * Combine the seed data with the live buffer into the set of points for the map.
 */
use crate::{
    message::{Message, MessageKey},
    seed::SeedDataset,
};
use log::debug;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashSet as HashSet;
use std::path::PathBuf;

type SeedLoader = Box<dyn Fn() -> SeedDataset + Send + Sync>;

/**
 * Produces the geospatial working set from the seed data and a snapshot of the live buffer.
 *
 * The seed is loaded the first time it is needed and then kept for the life of the merger.
 */
pub struct DataMerger {
    loader: SeedLoader,
    seed: OnceCell<SeedDataset>,
}

impl DataMerger {
    /// A merger that only ever passes through live data.
    pub fn without_seed() -> Self {
        Self::with_seed(SeedDataset::empty())
    }

    /// Use an already loaded seed dataset.
    pub fn with_seed(seed: SeedDataset) -> Self {
        DataMerger {
            loader: Box::new(SeedDataset::empty),
            seed: OnceCell::with_value(seed),
        }
    }

    /// Load the seed from the given tier files on first use.
    pub fn from_seed_files(paths: Vec<PathBuf>) -> Self {
        Self::with_loader(move || SeedDataset::load_files(&paths))
    }

    /// Load the seed from every json file in `dir` on first use.
    pub fn from_seed_dir(dir: PathBuf) -> Self {
        Self::with_loader(move || match SeedDataset::load_dir(&dir) {
            Ok(seed) => seed,
            Err(err) => {
                log::warn!("No seed data loaded: {}", err);
                SeedDataset::empty()
            }
        })
    }

    fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> SeedDataset + Send + Sync + 'static,
    {
        DataMerger {
            loader: Box::new(loader),
            seed: OnceCell::new(),
        }
    }

    /// The seed data, loading it if this is the first time it's been asked for.
    pub fn seed(&self) -> &SeedDataset {
        self.seed.get_or_init(|| (self.loader)())
    }

    /// Merge the seed with a snapshot of the live buffer.
    pub fn merge(&self, live: &[Message]) -> Vec<Message> {
        merge_messages(self.seed().messages(), live)
    }
}

/**
 * Combine seed and live messages into one deduplicated set of plottable points.
 *
 * Live messages without a location are left out. Seed messages come first and the first message
 * seen with a given (source node, message id) wins, so a seed record shadows a live one with the
 * same key.
 */
pub fn merge_messages(seed: &[Message], live: &[Message]) -> Vec<Message> {
    let mut seen: HashSet<MessageKey> = HashSet::default();
    let mut merged = Vec::with_capacity(seed.len() + live.len());

    let candidates = seed.iter().chain(live.iter().filter(|m| m.is_geolocated()));

    for msg in candidates {
        if !msg.is_geolocated() {
            continue;
        }

        if seen.insert(msg.key()) {
            merged.push(msg.clone());
        }
    }

    debug!(
        "merged {} seed and {} live messages into {} points",
        seed.len(),
        live.len(),
        merged.len()
    );

    merged
}
