use std::collections::BTreeMap;

use foundation::bounds::LatLngBounds;
use foundation::coord::LatLng;
use foundation::math::{WorldPx, project};

use crate::layer::{ClusterOptions, MarkerKey};

/// One rendered glyph: either a lone marker or a group of nearby ones.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCluster {
    /// Members in ascending key order.
    pub members: Vec<MarkerKey>,
    pub bounds: LatLngBounds,
}

impl GridCluster {
    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }

    pub fn center(&self) -> LatLng {
        self.bounds.center()
    }
}

struct Building {
    seed: WorldPx,
    members: Vec<MarkerKey>,
    bounds: LatLngBounds,
}

/// Greedy grid clustering in screen space.
///
/// A reference stand-in for the external clustering capability. Markers are
/// visited in ascending key order; each joins the first cluster whose seed is
/// within `max_cluster_radius_px` at `zoom` (searching its own and the eight
/// neighbouring grid cells), otherwise it seeds a new cluster. At or above
/// `disable_clustering_at_zoom` every marker stands alone.
///
/// Ordering contract:
/// - Clusters are returned in order of their seed marker's key.
pub fn cluster_markers(
    markers: &[(MarkerKey, LatLng)],
    zoom: f64,
    options: &ClusterOptions,
) -> Vec<GridCluster> {
    let mut sorted: Vec<(MarkerKey, LatLng)> = markers.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    if zoom >= options.disable_clustering_at_zoom || options.max_cluster_radius_px <= 0.0 {
        return sorted
            .into_iter()
            .map(|(key, p)| GridCluster {
                members: vec![key],
                bounds: LatLngBounds::from_point(p),
            })
            .collect();
    }

    let radius = options.max_cluster_radius_px;
    let radius_sq = radius * radius;
    let mut building: Vec<Building> = Vec::new();
    let mut cells: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();

    for (key, p) in sorted {
        let px = project(p, zoom);
        let cell = ((px.x / radius).floor() as i64, (px.y / radius).floor() as i64);

        // Lowest-numbered cluster within range wins, so results are stable.
        let mut joined: Option<usize> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(candidates) = cells.get(&(cell.0 + dx, cell.1 + dy)) else {
                    continue;
                };
                for &ci in candidates {
                    if building[ci].seed.distance_sq(px) <= radius_sq
                        && joined.is_none_or(|j| ci < j)
                    {
                        joined = Some(ci);
                    }
                }
            }
        }

        match joined {
            Some(ci) => {
                building[ci].members.push(key);
                building[ci].bounds.extend(p);
            }
            None => {
                cells.entry(cell).or_default().push(building.len());
                building.push(Building {
                    seed: px,
                    members: vec![key],
                    bounds: LatLngBounds::from_point(p),
                });
            }
        }
    }

    building
        .into_iter()
        .map(|b| GridCluster {
            members: b.members,
            bounds: b.bounds,
        })
        .collect()
}
