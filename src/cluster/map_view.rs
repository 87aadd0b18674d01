use crate::{
    cluster::{Classification, Cluster, UrgencyCounts},
    geo::Coord,
    kml::{escape, KmlFile, KmlWriter, Placemark},
    message::{Message, Urgency},
    SkaiNetResult,
};
use log::debug;
use serde::Serialize;
use std::{collections::BTreeMap, fmt::Write, path::Path};

/// At this zoom level and above every point is shown on its own.
pub const POINT_ZOOM_THRESHOLD: i32 = 14;

/**
 * The clustering radius, in degrees, for a zoom level.
 *
 * #Returns
 * None when the zoom is at or above POINT_ZOOM_THRESHOLD, where points are never clustered.
 */
pub fn cluster_radius(zoom: i32) -> Option<f64> {
    match zoom {
        z if z >= POINT_ZOOM_THRESHOLD => None,
        z if z < 10 => Some(0.1),
        z if z < 12 => Some(0.03),
        _ => Some(0.005),
    }
}

/**
 * What the map should draw at a given zoom: either every point, or clusters of them.
 */
#[derive(Debug, Clone)]
pub enum MapView {
    Points(Vec<Message>),
    Clusters(Vec<Cluster>),
}

impl MapView {
    /**
     * Build the view for a set of located points at a zoom level.
     *
     * At high zoom the points pass through untouched. Otherwise they are grouped with the radius
     * from `cluster_radius`. Points without a location can't be drawn and are dropped in both
     * modes.
     */
    pub fn build(points: Vec<Message>, zoom: i32) -> Self {
        let view = match cluster_radius(zoom) {
            None => MapView::Points(points.into_iter().filter(Message::is_geolocated).collect()),
            Some(radius) => MapView::Clusters(Cluster::from_points(points, radius)),
        };

        debug!("zoom {} -> {} {}", zoom, view.len(), view.mode());

        view
    }

    /// "points" or "clusters".
    pub fn mode(&self) -> &'static str {
        match self {
            MapView::Points(_) => "points",
            MapView::Clusters(_) => "clusters",
        }
    }

    /// The number of markers to draw.
    pub fn len(&self) -> usize {
        match self {
            MapView::Points(pnts) => pnts.len(),
            MapView::Clusters(clusters) => clusters.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of incidents represented, regardless of mode.
    pub fn incident_count(&self) -> usize {
        match self {
            MapView::Points(pnts) => pnts.len(),
            MapView::Clusters(clusters) => clusters.iter().map(Cluster::count).sum(),
        }
    }

    /// A serializable summary of the view for handing to a renderer.
    pub fn summary(&self) -> MapSummary {
        let items = match self {
            MapView::Points(pnts) => pnts
                .iter()
                .filter_map(|m| {
                    let counts: UrgencyCounts = std::iter::once(m).collect();
                    Some(MarkerSummary::new(m.coordinates()?, 1, counts))
                })
                .collect(),
            MapView::Clusters(clusters) => clusters
                .iter()
                .map(|c| MarkerSummary::new(c.centroid(), c.count(), c.urgency_counts()))
                .collect(),
        };

        MapSummary {
            mode: self.mode(),
            items,
        }
    }

    /// Save the view as a KML file.
    pub fn save_kml<P: AsRef<Path>>(&self, path: P) -> SkaiNetResult<()> {
        let mut kml = KmlFile::new(path)?;
        self.write_kml(&mut kml)?;
        kml.finish()
    }

    /**
     * Write the view's styles and placemarks into an already started KML document.
     *
     * Individual points are named after their sender, clusters become "<label> Zone" placemarks
     * with a breakdown of the urgency counts.
     */
    pub fn write_kml<K: KmlWriter>(&self, kml: &mut K) -> SkaiNetResult<()> {
        for class in [
            Classification::Critical,
            Classification::Warning,
            Classification::Low,
            Classification::Info,
        ] {
            kml.write_marker_style(class.label(), class.color())?;
        }

        kml.start_folder(self.mode())?;

        match self {
            MapView::Points(pnts) => {
                for msg in pnts {
                    let position = match msg.coordinates() {
                        Some(coord) => coord,
                        None => continue,
                    };

                    kml.write_placemark(&Placemark {
                        name: msg.sender_name(),
                        description: &point_description(msg),
                        style_id: Classification::from(msg.urgency()).label(),
                        position,
                    })?;
                }
            }
            MapView::Clusters(clusters) => {
                for cluster in clusters {
                    let class = cluster.classification();

                    kml.write_placemark(&Placemark {
                        name: &format!("{} Zone", class.label()),
                        description: &cluster_description(cluster),
                        style_id: class.label(),
                        position: cluster.centroid(),
                    })?;
                }
            }
        }

        kml.finish_folder()
    }
}

fn point_description(msg: &Message) -> String {
    let mut desc = String::with_capacity(256);

    let _ = writeln!(&mut desc, "<h3>{} ({})</h3>", escape(msg.sender_name()), msg.urgency());
    let _ = writeln!(&mut desc, "<p>{}</p>", escape(msg.text()));
    let _ = write!(
        &mut desc,
        "<p>Node {} via {}, message {}</p>",
        escape(msg.source_node()),
        escape(msg.current_node()),
        escape(msg.message_id())
    );

    desc
}

fn cluster_description(cluster: &Cluster) -> String {
    let counts = cluster.urgency_counts();
    let plural = if cluster.count() > 1 { "s" } else { "" };

    let mut desc = String::with_capacity(256);

    let _ = writeln!(
        &mut desc,
        "<h3>{} incident{} in this area</h3>",
        cluster.count(),
        plural
    );
    let _ = writeln!(
        &mut desc,
        "<p>High: {} Medium: {} Low: {} None: {}</p>",
        counts.get(Urgency::High),
        counts.get(Urgency::Medium),
        counts.get(Urgency::Low),
        counts.get(Urgency::None)
    );
    let _ = write!(
        &mut desc,
        "<p>Center: {:.4}, {:.4}</p>",
        cluster.centroid().latitude,
        cluster.centroid().longitude
    );

    desc
}

/// `{ mode, items }` as handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct MapSummary {
    pub mode: &'static str,
    pub items: Vec<MarkerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerSummary {
    pub latitude: f64,
    pub longitude: f64,
    pub count: usize,
    pub urgency_counts: BTreeMap<&'static str, usize>,
    pub label: &'static str,
    pub color: &'static str,
}

impl MarkerSummary {
    fn new(position: Coord, count: usize, counts: UrgencyCounts) -> Self {
        let classification: Classification = counts.majority();

        MarkerSummary {
            latitude: position.latitude,
            longitude: position.longitude,
            count,
            urgency_counts: counts.iter().map(|(u, n)| (u.name(), n)).collect(),
            label: classification.label(),
            color: classification.color(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::Urgency;

    fn pnt(id: &str, lat: f64, lon: f64) -> Message {
        Message::new("n", "n", id).with_coordinates(lat, lon)
    }

    #[test]
    fn test_cluster_radius_table() {
        assert_eq!(cluster_radius(0), Some(0.1));
        assert_eq!(cluster_radius(9), Some(0.1));
        assert_eq!(cluster_radius(10), Some(0.03));
        assert_eq!(cluster_radius(11), Some(0.03));
        assert_eq!(cluster_radius(12), Some(0.005));
        assert_eq!(cluster_radius(13), Some(0.005));
        assert_eq!(cluster_radius(14), None);
        assert_eq!(cluster_radius(18), None);
    }

    #[test]
    fn test_high_zoom_passthrough() {
        let points: Vec<Message> = (0..5).map(|i| pnt(&i.to_string(), 0.0, 0.0)).collect();

        match MapView::build(points.clone(), 14) {
            MapView::Points(out) => assert_eq!(out, points),
            other => panic!("expected points, got {}", other.mode()),
        }
    }

    #[test]
    fn test_low_zoom_clusters() {
        let points = vec![pnt("a", 0.0, 0.0), pnt("b", 0.0, 0.099), pnt("c", 0.0, 0.5)];

        let view = MapView::build(points, 9);
        assert_eq!(view.mode(), "clusters");
        assert_eq!(view.len(), 2);
        assert_eq!(view.incident_count(), 3);

        // The same points no longer group at a closer zoom.
        let points = vec![pnt("a", 0.0, 0.0), pnt("b", 0.0, 0.099), pnt("c", 0.0, 0.5)];
        assert_eq!(MapView::build(points, 12).len(), 3);
    }

    #[test]
    fn test_summary() {
        let points = vec![
            pnt("a", 0.0, 0.0).with_urgency(Urgency::High),
            pnt("b", 0.0, 0.01).with_urgency(Urgency::Medium),
            pnt("c", 0.0, 0.02).with_urgency(Urgency::Medium),
        ];

        let summary = MapView::build(points, 5).summary();
        assert_eq!(summary.mode, "clusters");
        assert_eq!(summary.items.len(), 1);

        let item = &summary.items[0];
        assert_eq!(item.count, 3);
        assert_eq!(item.label, "Warning");
        assert_eq!(item.urgency_counts["MEDIUM"], 2);
        assert_eq!(item.urgency_counts["NONE"], 0);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["items"][0]["color"], "#f59e0b");
    }

    #[test]
    fn test_write_kml() {
        let points = vec![
            pnt("a", 10.0, 20.0).with_urgency(Urgency::High),
            pnt("b", 10.0, 20.01).with_urgency(Urgency::High),
            pnt("c", 40.0, 50.0).with_urgency(Urgency::Low),
        ];

        let mut buf: Vec<u8> = vec![];
        MapView::build(points.clone(), 9).write_kml(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("<name>Critical Zone</name>"));
        assert!(text.contains("<name>Low Zone</name>"));
        assert!(text.contains("2 incidents in this area"));
        assert!(text.contains("<styleUrl>#Critical</styleUrl>"));

        let mut buf: Vec<u8> = vec![];
        MapView::build(points, 15).write_kml(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text.matches("<Placemark>").count(), 3);
        assert!(text.contains("<name>Unknown</name>"));
    }
}
