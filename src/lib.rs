/*!
 * Tools for turning a live feed of geotagged disaster-response messages into a map.
 *
 * Messages are pulled from the server into a bounded [MessageStore], merged with static seed data
 * by a [DataMerger], and summarized for a zoom level as a [MapView] of either individual points or
 * [Cluster]s.
 */
pub use cluster::{
    cluster_radius, Classification, Cluster, MapSummary, MapView, MarkerSummary, UrgencyCounts,
    POINT_ZOOM_THRESHOLD,
};
pub use error::{RemoteError, SkaiNetError, SkaiNetResult};
pub use geo::{great_circle_distance, planar_distance, Coord};
pub use kml::{KmlFile, KmlWriter, Placemark};
pub use listing::{default_export_name, save_json, FilterKind, MessageFilter, MessageStats};
pub use logging::program_logger;
pub use merge::{merge_messages, DataMerger};
pub use message::{decode_message_log, Message, MessageLog, MessageRecord, Urgency};
pub use remote::{HttpSource, RemoteSource, DEFAULT_API_URL};
pub use seed::{SeedDataset, SeedTier};
pub use store::{MessageStore, Poller, DEFAULT_POLL_INTERVAL, MAX_BUFFERED_MESSAGES};

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod cluster;
mod error;
mod geo;
mod kml;
mod listing;
mod logging;
mod merge;
mod message;
mod remote;
mod seed;
mod store;
