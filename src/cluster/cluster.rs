use crate::{
    geo::{great_circle_distance, planar_distance, Coord},
    message::{Message, Urgency},
};
use std::fmt::{self, Display};
use strum::IntoEnumIterator;

/** The summary level shown for a marker or cluster. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Critical,
    Warning,
    Low,
    Info,
}

impl Classification {
    /// The label shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            Classification::Critical => "Critical",
            Classification::Warning => "Warning",
            Classification::Low => "Low",
            Classification::Info => "Info",
        }
    }

    /// Color token for the marker, as a CSS hex string.
    pub fn color(self) -> &'static str {
        match self {
            Classification::Critical => "#ef4444",
            Classification::Warning => "#f59e0b",
            Classification::Low => "#10b981",
            Classification::Info => "#3b82f6",
        }
    }
}

impl From<Urgency> for Classification {
    fn from(urgency: Urgency) -> Self {
        match urgency {
            Urgency::High => Classification::Critical,
            Urgency::Medium => Classification::Warning,
            Urgency::Low => Classification::Low,
            Urgency::None => Classification::Info,
        }
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.label())
    }
}

/** How many members of a group fall in each urgency level. */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrgencyCounts([usize; 4]);

impl UrgencyCounts {
    pub fn new(high: usize, medium: usize, low: usize, none: usize) -> Self {
        UrgencyCounts([high, medium, low, none])
    }

    pub fn get(&self, urgency: Urgency) -> usize {
        self.0[urgency.index()]
    }

    pub fn increment(&mut self, urgency: Urgency) {
        self.0[urgency.index()] += 1;
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Each urgency level with its count, HIGH first.
    pub fn iter(&self) -> impl Iterator<Item = (Urgency, usize)> + '_ {
        Urgency::iter().map(move |u| (u, self.get(u)))
    }

    /**
     * Pick the classification by majority vote.
     *
     * The level with the highest non-zero count wins. Ties go to the more urgent level, and NONE
     * (or no members at all) is reported as Info.
     */
    pub fn majority(&self) -> Classification {
        let max = self.0.iter().copied().max().unwrap_or(0);
        if max == 0 {
            return Classification::Info;
        }

        Urgency::iter()
            .find(|&u| self.get(u) == max)
            .map(Classification::from)
            .unwrap_or(Classification::Info)
    }
}

impl<'a> FromIterator<&'a Message> for UrgencyCounts {
    fn from_iter<I: IntoIterator<Item = &'a Message>>(iter: I) -> Self {
        let mut counts = UrgencyCounts::default();
        for msg in iter {
            counts.increment(msg.urgency());
        }
        counts
    }
}

/**
 * The aggregate properties of a group of nearby Messages.
 *
 * Every member has a location, and there is always at least one member.
 */
#[derive(Clone, Debug)]
pub struct Cluster {
    /// Average latitude and longitude of the members.
    centroid: Coord,
    /// The members, in the order they were gathered.
    members: Vec<Message>,
    urgency_counts: UrgencyCounts,
}

impl Cluster {
    /**
     * Group located Messages into clusters.
     *
     * This is a greedy single pass. Each point not yet claimed starts a new cluster, and every
     * unclaimed point after it whose distance to that first point is strictly less than `radius`
     * joins. Distance is measured in raw degrees, treating latitude and longitude as a flat plane,
     * and always to the point that started the cluster rather than to its center.
     *
     * #Arguments
     * points - Messages to group. Any without a location are dropped.
     * radius - the join distance in degrees.
     *
     * #Returns
     * The clusters, in the order their first member appeared.
     */
    pub fn from_points(points: Vec<Message>, radius: f64) -> Vec<Self> {
        let mut points: Vec<Option<(Coord, Message)>> = points
            .into_iter()
            .filter_map(|m| m.coordinates().map(|c| Some((c, m))))
            .collect();

        let mut clusters: Vec<Self> = vec![];

        for i in 0..points.len() {
            let (seed_coord, seed_msg) = match points[i].take() {
                Some(pnt) => pnt,
                None => continue,
            };

            let mut members = vec![seed_msg];
            let mut coords = vec![seed_coord];

            for j in (i + 1)..points.len() {
                let in_cluster = match &points[j] {
                    Some((coord, _)) => planar_distance(seed_coord, *coord) < radius,
                    None => false,
                };

                if in_cluster {
                    if let Some((coord, msg)) = points[j].take() {
                        coords.push(coord);
                        members.push(msg);
                    }
                }
            }

            clusters.push(Self::from_members(members, &coords));
        }

        clusters
    }

    fn from_members(members: Vec<Message>, coords: &[Coord]) -> Self {
        let count = coords.len() as f64;
        let (lat_sum, lon_sum) = coords.iter().fold((0.0, 0.0), |(lat, lon), c| {
            (lat + c.latitude, lon + c.longitude)
        });

        let urgency_counts = members.iter().collect();

        Cluster {
            centroid: Coord::new(lat_sum / count, lon_sum / count),
            members,
            urgency_counts,
        }
    }

    /// The unweighted average location of the members.
    pub fn centroid(&self) -> Coord {
        self.centroid
    }

    pub fn members(&self) -> &[Message] {
        &self.members
    }

    /// The number of Messages in this cluster.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn urgency_counts(&self) -> UrgencyCounts {
        self.urgency_counts
    }

    /// The majority urgency of the members.
    pub fn classification(&self) -> Classification {
        self.urgency_counts.majority()
    }

    /// Marker diameter in pixels, growing with the member count up to a cap.
    pub fn marker_size(&self) -> usize {
        usize::min(60, 20 + 2 * self.count())
    }

    /// The distance from the centroid to the farthest member in kilometers.
    pub fn radius_km(&self) -> f64 {
        self.members
            .iter()
            .filter_map(Message::coordinates)
            .map(|c| great_circle_distance(self.centroid, c))
            .fold(0.0, f64::max)
    }
}

impl Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let counts = self.urgency_counts;
        write!(
            f,
            "{:>8} zone at {} - {:>3} incidents (H:{} M:{} L:{} N:{}) radius {:.1} km",
            self.classification().label(),
            self.centroid,
            self.count(),
            counts.get(Urgency::High),
            counts.get(Urgency::Medium),
            counts.get(Urgency::Low),
            counts.get(Urgency::None),
            self.radius_km()
        )
    }
}
