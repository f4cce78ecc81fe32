use foundation::coord::LatLng;
use foundation::handles::Generation;
use serde::{Deserialize, Serialize};

use crate::palette::MarkerColor;
use crate::popup::PopupContent;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupId(pub u64);

/// Opaque marker object handed out by the clustering capability.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MarkerKey(pub u64);

/// Opaque cluster glyph handed out by the clustering capability.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClusterKey(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// At or above this zoom every marker is shown individually.
    pub disable_clustering_at_zoom: f64,
    /// Maximum distance (screen pixels) between a cluster and its members.
    pub max_cluster_radius_px: f64,
    pub spiderfy_distance_multiplier: f64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            disable_clustering_at_zoom: 10.0,
            max_cluster_radius_px: 80.0,
            spiderfy_distance_multiplier: 1.5,
        }
    }
}

/// Everything the clustering capability needs to place one marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerDescriptor {
    /// Index into the filtered set this marker was built from.
    pub index: usize,
    #[serde(serialize_with = "serialize_generation")]
    pub generation: Generation,
    #[serde(serialize_with = "serialize_latlng")]
    pub position: LatLng,
    pub color: MarkerColor,
    pub popup: PopupContent,
    pub popup_offset_px: [f64; 2],
}

fn serialize_generation<S: serde::Serializer>(g: &Generation, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(g.get())
}

fn serialize_latlng<S: serde::Serializer>(p: &LatLng, s: S) -> Result<S::Ok, S::Error> {
    [p.lat, p.lng].serialize(s)
}

/// The external clustering capability, as far as marker bookkeeping goes.
///
/// Implementations own rendering, grouping and hit-testing. Marker and
/// cluster clicks come back to the engine as [`MarkerKey`]s/[`ClusterKey`]s.
pub trait ClusterLayer {
    fn add_group(&mut self, options: &ClusterOptions) -> GroupId;
    /// Removes the group and every marker registered in it.
    fn remove_group(&mut self, group: GroupId);
    fn add_marker(&mut self, group: GroupId, marker: &MarkerDescriptor) -> MarkerKey;
    /// Fits the viewport to the cluster's members.
    fn zoom_to_cluster(&mut self, cluster: ClusterKey);
    /// Fans the cluster's members out in place.
    fn spiderfy(&mut self, cluster: ClusterKey);
}
