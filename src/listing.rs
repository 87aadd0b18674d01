/*!
 * Non-map views of the live buffer: filtering, counting, and exporting.
 *
 * Unlike the map, listings keep messages that have no location.
 */
use crate::{
    message::{Message, MessageLog, Urgency},
    SkaiNetResult,
};
use chrono::{DateTime, Utc};
use std::{
    fmt::{self, Display},
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    str::FromStr,
};

/** Which messages a listing shows, beyond search and urgency. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    All,
    WithName,
    WithoutName,
    WithGps,
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(FilterKind::All),
            "withname" | "with-name" => Ok(FilterKind::WithName),
            "withoutname" | "without-name" => Ok(FilterKind::WithoutName),
            "withgps" | "with-gps" => Ok(FilterKind::WithGps),
            _ => Err(format!("not a valid filter: {}", s)),
        }
    }
}

impl Default for FilterKind {
    fn default() -> Self {
        FilterKind::All
    }
}

/** A listing filter. The default matches everything. */
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Text to look for, an empty string matches everything.
    pub search: String,
    pub kind: FilterKind,
    /// Only show this urgency, if set.
    pub urgency: Option<Urgency>,
}

impl MessageFilter {
    /**
     * Check a message against the filter.
     *
     * The search is case-insensitive against the text and sender name, and a plain substring match
     * against the source node and message id.
     */
    pub fn matches(&self, msg: &Message) -> bool {
        self.matches_search(msg) && self.matches_kind(msg) && self.matches_urgency(msg)
    }

    fn matches_search(&self, msg: &Message) -> bool {
        if self.search.is_empty() {
            return true;
        }

        let needle = self.search.to_lowercase();

        msg.text().to_lowercase().contains(&needle)
            || (msg.has_sender_name() && msg.sender_name().to_lowercase().contains(&needle))
            || msg.source_node().contains(&self.search)
            || msg.message_id().contains(&self.search)
    }

    fn matches_kind(&self, msg: &Message) -> bool {
        match self.kind {
            FilterKind::All => true,
            FilterKind::WithName => msg.has_sender_name(),
            FilterKind::WithoutName => !msg.has_sender_name(),
            FilterKind::WithGps => msg.is_geolocated(),
        }
    }

    fn matches_urgency(&self, msg: &Message) -> bool {
        self.urgency.map_or(true, |u| msg.urgency() == u)
    }

    /// The messages that pass the filter, in their original order.
    pub fn apply<'a>(&self, messages: &'a [Message]) -> Vec<&'a Message> {
        messages.iter().filter(|m| self.matches(m)).collect()
    }
}

/** Summary counts for a set of messages. */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageStats {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub none: usize,
    pub with_gps: usize,
}

impl MessageStats {
    pub fn from_messages<'a, I>(messages: I) -> Self
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let mut stats = MessageStats::default();

        for msg in messages {
            stats.total += 1;
            match msg.urgency() {
                Urgency::High => stats.high += 1,
                Urgency::Medium => stats.medium += 1,
                Urgency::Low => stats.low += 1,
                Urgency::None => stats.none += 1,
            }
            if msg.is_geolocated() {
                stats.with_gps += 1;
            }
        }

        stats
    }
}

impl Display for MessageStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "   Total: {:>5}", self.total)?;
        writeln!(f, "    High: {:>5}", self.high)?;
        writeln!(f, "  Medium: {:>5}", self.medium)?;
        writeln!(f, "     Low: {:>5}", self.low)?;
        writeln!(f, "    None: {:>5}", self.none)?;
        write!(f, "With GPS: {:>5}", self.with_gps)
    }
}

/// The default name for an export made at `now`, e.g. "disaster_messages_2024-03-01.json".
pub fn default_export_name(now: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!("disaster_messages_{}.json", now.format("%Y-%m-%d")))
}

/// Write messages as pretty printed JSON in the `{ "logs": [...] }` layout.
pub fn save_json<P: AsRef<Path>>(messages: &[Message], path: P) -> SkaiNetResult<()> {
    let f = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(f), &MessageLog::from_messages(messages))?;
    Ok(())
}
