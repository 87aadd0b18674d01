/*!
 * Types and functions for working with clusters.
 *
 * A cluster describes the aggregate properties of a group of nearby geolocated Messages: where
 * they are centered, how many there are, and which urgency dominates. Clusters are rebuilt from
 * scratch every time the data or the zoom level changes.
 */

pub use cluster::{Classification, Cluster, UrgencyCounts};
pub use map_view::{cluster_radius, MapSummary, MapView, MarkerSummary, POINT_ZOOM_THRESHOLD};

mod cluster;
mod map_view;
