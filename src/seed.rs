/*!
 * Static seed datasets.
 *
 * Seed files use the same `{ "logs": [...] }` layout as the server and are split into one file per
 * urgency tier. They populate the map when there is little or no live traffic.
 */
use crate::{
    error::SkaiNetError,
    message::{decode_message_log, Message},
    SkaiNetResult,
};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/** The urgency tier a seed file belongs to, recognized from its file name. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeedTier {
    High,
    Medium,
    Low,
    /// A seed file that doesn't name a tier. These load after the named tiers.
    Other,
}

impl SeedTier {
    /// Get the string used to recognize the tier in a file name.
    pub fn name(&self) -> &'static str {
        match self {
            SeedTier::High => "high",
            SeedTier::Medium => "medium",
            SeedTier::Low => "low",
            SeedTier::Other => "other",
        }
    }

    /**
     * Find the tier named in a file name.
     *
     * The name is split into words on '_', '-', '.' and spaces, and a tier only matches a whole
     * word, so "disaster_logs_low_urgency.json" is Low but "yellow_zone.json" is not.
     */
    pub fn from_file_name(fname: &str) -> SeedTier {
        let fname = fname.to_lowercase();
        let words: Vec<&str> = fname
            .split(|c: char| matches!(c, '_' | '-' | '.' | ' '))
            .collect();

        for tier in [SeedTier::High, SeedTier::Medium, SeedTier::Low] {
            if words.contains(&tier.name()) {
                return tier;
            }
        }

        SeedTier::Other
    }
}

/**
 * Seed records that can be plotted.
 *
 * Records without a usable location are counted and dropped while loading, the map has nowhere to
 * put them.
 */
#[derive(Debug, Clone, Default)]
pub struct SeedDataset {
    messages: Vec<Message>,
    skipped: usize,
}

impl SeedDataset {
    /// A dataset with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dataset from already parsed messages.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut dataset = Self::empty();
        dataset.extend(messages);
        dataset
    }

    /**
     * Load every `*.json` file found below `dir`.
     *
     * Files are loaded tier by tier, high urgency first, then by name.
     */
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> SkaiNetResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            warn!("Not a directory: {}", dir.display());
            return Err(Box::new(SkaiNetError {
                msg: "seed directory does not exist",
            }));
        }

        let mut files: Vec<(SeedTier, PathBuf)> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|res| res.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
            .map(|path| {
                let fname = path
                    .file_name()
                    .map(|f| f.to_string_lossy().to_string())
                    .unwrap_or_default();
                (SeedTier::from_file_name(&fname), path)
            })
            .collect();

        files.sort();

        let paths: Vec<PathBuf> = files.into_iter().map(|(_tier, path)| path).collect();
        Ok(Self::load_files(&paths))
    }

    /**
     * Load the given seed files in order.
     *
     * A file that is missing or can't be parsed is logged and skipped, it never stops the rest from
     * loading.
     */
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut dataset = Self::empty();

        for path in paths {
            let path = path.as_ref();

            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!("Unable to read seed file {}: {}", path.display(), err);
                    continue;
                }
            };

            let messages = match decode_message_log(&bytes) {
                Ok(messages) => messages,
                Err(err) => {
                    warn!("Unable to parse seed file {}: {}", path.display(), err);
                    continue;
                }
            };

            let before = dataset.len();
            let skipped_before = dataset.skipped;
            dataset.extend(messages);

            info!(
                "Loaded {} seed records from {} ({} without a location)",
                dataset.len() - before,
                path.display(),
                dataset.skipped - skipped_before
            );
        }

        dataset
    }

    fn extend(&mut self, messages: Vec<Message>) {
        for msg in messages {
            if msg.is_geolocated() {
                self.messages.push(msg);
            } else {
                debug!(
                    "skipping seed record {}/{} without a location",
                    msg.source_node(),
                    msg.message_id()
                );
                self.skipped += 1;
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// How many records were dropped for lacking a location.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
