use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use focus::{FilterPanel, ListView, MapView, RowPlacement, Views};
use foundation::bounds::LatLngBounds;
use foundation::coord::LatLng;
use foundation::math::project;
use foundation::time::Millis;
use markers::grid::{GridCluster, cluster_markers};
use markers::{ClusterKey, ClusterLayer, ClusterOptions, GroupId, MarkerDescriptor, MarkerKey};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::engine::{Engine, Surface};

/// One command issued by the engine to a view or to the clustering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    AddGroup { group: GroupId },
    RemoveGroup { group: GroupId },
    AddMarker { group: GroupId, marker: MarkerKey, index: usize, color: String },
    ZoomToCluster { cluster: ClusterKey, zoom: f64 },
    Spiderfy { cluster: ClusterKey },
    SetView { center: [f64; 2], zoom: f64 },
    FlyTo { center: [f64; 2], zoom: f64, duration_ms: u64 },
    OpenPopup { marker: MarkerKey },
    ClosePopup { marker: MarkerKey },
    ExpandRow { index: Option<usize> },
    SetScrollTop { offset: f64 },
    ScrollIntoView { index: usize },
    CollapsePanel,
}

pub type CommandLog = Rc<RefCell<Vec<Command>>>;

fn pair(p: LatLng) -> [f64; 2] {
    [p.lat, p.lng]
}

/// Geometry of the simulated host.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessOptions {
    pub viewport_px: [f64; 2],
    /// Highest zoom the simulated tile layer offers.
    pub map_max_zoom: f64,
    pub row_height_px: f64,
    pub list_top_px: f64,
    /// List rows live outside any scroll container.
    pub detached_list: bool,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            viewport_px: [1024.0, 768.0],
            map_max_zoom: 18.0,
            row_height_px: 72.0,
            list_top_px: 0.0,
            detached_list: false,
        }
    }
}

#[derive(Debug)]
struct PlacedMarker {
    group: GroupId,
    index: usize,
    position: LatLng,
}

/// In-memory map: viewport, popups and marker groups.
///
/// Popups behave like a typical web map: at most one is open, opening one
/// closes the other, and every close is reported back as a notification the
/// host must deliver with [`HeadlessSurface::deliver_popup_closes`].
#[derive(Debug)]
pub struct HeadlessMap {
    log: CommandLog,
    zoom: f64,
    center: LatLng,
    viewport_px: [f64; 2],
    max_zoom: f64,
    next_id: u64,
    groups: BTreeMap<GroupId, ClusterOptions>,
    markers: BTreeMap<MarkerKey, PlacedMarker>,
    open_popup: Option<MarkerKey>,
    popup_closes: Vec<MarkerKey>,
}

impl HeadlessMap {
    pub fn popup_marker(&self) -> Option<MarkerKey> {
        self.open_popup
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// The user dismisses the open popup.
    pub fn user_close_popup(&mut self) -> Option<MarkerKey> {
        let key = self.open_popup.take()?;
        self.popup_closes.push(key);
        Some(key)
    }

    pub fn take_popup_closes(&mut self) -> Vec<MarkerKey> {
        std::mem::take(&mut self.popup_closes)
    }

    /// Clusters as currently rendered, across all groups.
    pub fn clusters(&self) -> Vec<GridCluster> {
        let mut out = Vec::new();
        for (group, options) in &self.groups {
            let members: Vec<(MarkerKey, LatLng)> = self
                .markers
                .iter()
                .filter(|(_, m)| m.group == *group)
                .map(|(k, m)| (*k, m.position))
                .collect();
            out.extend(cluster_markers(&members, self.zoom, options));
        }
        out
    }

    /// Key of the rendered glyph containing `marker`.
    ///
    /// A cluster is keyed by its seed, the lowest member key.
    pub fn cluster_of(&self, marker: MarkerKey) -> Option<(ClusterKey, GridCluster)> {
        self.clusters()
            .into_iter()
            .find(|c| c.members.contains(&marker))
            .map(|c| (ClusterKey(c.members[0].0), c))
    }

    fn find_cluster(&self, cluster: ClusterKey) -> Option<GridCluster> {
        self.clusters()
            .into_iter()
            .find(|c| c.members.first().is_some_and(|k| k.0 == cluster.0))
    }

    /// Highest integer zoom at which `bounds` still fits the viewport.
    fn fit_zoom(&self, bounds: &LatLngBounds) -> f64 {
        let [width, height] = self.viewport_px;
        let mut z = self.zoom.floor();
        while z + 1.0 <= self.max_zoom {
            let sw = project(bounds.south_west, z + 1.0);
            let ne = project(bounds.north_east, z + 1.0);
            if (ne.x - sw.x).abs() > width || (sw.y - ne.y).abs() > height {
                break;
            }
            z += 1.0;
        }
        z
    }

    fn record(&self, command: Command) {
        self.log.borrow_mut().push(command);
    }
}

impl MapView for HeadlessMap {
    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn center(&self) -> LatLng {
        self.center
    }

    fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center = center;
        self.zoom = zoom;
        self.record(Command::SetView {
            center: pair(center),
            zoom,
        });
    }

    // Animations complete instantly; the engine tracks the nominal duration.
    fn fly_to(&mut self, center: LatLng, zoom: f64, duration_ms: u64) {
        self.center = center;
        self.zoom = zoom;
        self.record(Command::FlyTo {
            center: pair(center),
            zoom,
            duration_ms,
        });
    }

    fn open_popup(&mut self, marker: MarkerKey) {
        if !self.markers.contains_key(&marker) {
            return;
        }
        if let Some(previous) = self.open_popup.replace(marker)
            && previous != marker
        {
            self.popup_closes.push(previous);
        }
        self.record(Command::OpenPopup { marker });
    }

    fn close_popup(&mut self, marker: MarkerKey) {
        self.record(Command::ClosePopup { marker });
        if self.open_popup == Some(marker) {
            self.open_popup = None;
            self.popup_closes.push(marker);
        }
    }
}

impl ClusterLayer for HeadlessMap {
    fn add_group(&mut self, options: &ClusterOptions) -> GroupId {
        self.next_id += 1;
        let group = GroupId(self.next_id);
        self.groups.insert(group, options.clone());
        self.record(Command::AddGroup { group });
        group
    }

    fn remove_group(&mut self, group: GroupId) {
        if self.groups.remove(&group).is_none() {
            return;
        }
        self.markers.retain(|_, m| m.group != group);
        if let Some(open) = self.open_popup
            && !self.markers.contains_key(&open)
        {
            self.open_popup = None;
            self.popup_closes.push(open);
        }
        self.record(Command::RemoveGroup { group });
    }

    fn add_marker(&mut self, group: GroupId, marker: &MarkerDescriptor) -> MarkerKey {
        self.next_id += 1;
        let key = MarkerKey(self.next_id);
        self.markers.insert(
            key,
            PlacedMarker {
                group,
                index: marker.index,
                position: marker.position,
            },
        );
        self.record(Command::AddMarker {
            group,
            marker: key,
            index: marker.index,
            color: marker.color.as_str().to_string(),
        });
        key
    }

    fn zoom_to_cluster(&mut self, cluster: ClusterKey) {
        let Some(found) = self.find_cluster(cluster) else {
            return;
        };
        let zoom = self.fit_zoom(&found.bounds);
        self.center = found.center();
        self.zoom = zoom;
        self.record(Command::ZoomToCluster { cluster, zoom });
    }

    fn spiderfy(&mut self, cluster: ClusterKey) {
        self.record(Command::Spiderfy { cluster });
    }
}

/// In-memory result list.
#[derive(Debug)]
pub struct HeadlessList {
    log: CommandLog,
    expanded: Option<usize>,
    scroll_top: f64,
    row_height_px: f64,
    top_px: f64,
    detached: bool,
}

impl HeadlessList {
    pub fn expanded(&self) -> Option<usize> {
        self.expanded
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }
}

impl ListView for HeadlessList {
    fn expand_row(&mut self, index: Option<usize>) {
        self.expanded = index;
        self.log.borrow_mut().push(Command::ExpandRow { index });
    }

    fn row_placement(&self, index: usize) -> Option<RowPlacement> {
        if self.detached {
            return Some(RowPlacement::Detached);
        }
        Some(RowPlacement::Scrollable {
            container_top: self.top_px,
            row_top: self.top_px + index as f64 * self.row_height_px,
        })
    }

    fn set_scroll_top(&mut self, offset: f64) {
        self.scroll_top = offset;
        self.log.borrow_mut().push(Command::SetScrollTop { offset });
    }

    fn scroll_into_view(&mut self, index: usize) {
        self.log.borrow_mut().push(Command::ScrollIntoView { index });
    }
}

#[derive(Debug)]
pub struct HeadlessPanel {
    log: CommandLog,
    expanded: bool,
}

impl HeadlessPanel {
    /// The user opens the filter panel.
    pub fn expand(&mut self) {
        self.expanded = true;
    }
}

impl FilterPanel for HeadlessPanel {
    fn is_expanded(&self) -> bool {
        self.expanded
    }

    fn collapse(&mut self) {
        if self.expanded {
            self.expanded = false;
            self.log.borrow_mut().push(Command::CollapsePanel);
        }
    }
}

/// Reference host: every view in memory, every command recorded in order.
#[derive(Debug)]
pub struct HeadlessSurface {
    log: CommandLog,
    pub map: HeadlessMap,
    pub list: HeadlessList,
    pub panel: HeadlessPanel,
}

impl HeadlessSurface {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_options(config, HeadlessOptions::default())
    }

    pub fn with_options(config: &EngineConfig, options: HeadlessOptions) -> Self {
        let log = CommandLog::default();
        Self {
            map: HeadlessMap {
                log: Rc::clone(&log),
                zoom: config.default_zoom(),
                center: config.default_center(),
                viewport_px: options.viewport_px,
                max_zoom: options.map_max_zoom,
                next_id: 0,
                groups: BTreeMap::new(),
                markers: BTreeMap::new(),
                open_popup: None,
                popup_closes: Vec::new(),
            },
            list: HeadlessList {
                log: Rc::clone(&log),
                expanded: None,
                scroll_top: 0.0,
                row_height_px: options.row_height_px,
                top_px: options.list_top_px,
                detached: options.detached_list,
            },
            panel: HeadlessPanel {
                log: Rc::clone(&log),
                expanded: false,
            },
            log,
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.log.borrow().clone()
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    /// Feeds queued popup-close notifications back into the engine until the
    /// map has none left.
    pub fn deliver_popup_closes(&mut self, engine: &mut Engine, now: Millis) -> usize {
        let mut delivered = 0;
        loop {
            let closes = self.map.take_popup_closes();
            if closes.is_empty() {
                return delivered;
            }
            for key in closes {
                engine.popup_closed(now, key, self);
                delivered += 1;
            }
        }
    }

    /// Marker of the placed entity at `index` in the engine's current set.
    pub fn marker_at(&self, engine: &Engine, index: usize) -> Option<MarkerKey> {
        let table = engine.markers().table();
        table.get(table.generation(), index).map(|h| h.key)
    }

    /// Index recorded on the marker when it was added.
    pub fn index_of_marker(&self, key: MarkerKey) -> Option<usize> {
        self.map.markers.get(&key).map(|m| m.index)
    }
}

impl Surface for HeadlessSurface {
    fn layer(&mut self) -> &mut dyn ClusterLayer {
        &mut self.map
    }

    fn views(&mut self) -> Views<'_> {
        Views {
            map: &mut self.map,
            list: &mut self.list,
            panel: &mut self.panel,
        }
    }
}
