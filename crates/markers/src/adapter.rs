use directory::FilteredSet;
use foundation::handles::Generation;
use foundation::time::Millis;
use runtime::event_bus::{Event, EventBus};
use serde::Serialize;
use tracing::{debug, warn};

use crate::handles::{HandleTable, MarkerHandle, MarkerSlot};
use crate::layer::{ClusterKey, ClusterLayer, ClusterOptions, GroupId, MarkerDescriptor, MarkerKey};
use crate::palette::DepartmentPalette;
use crate::popup::PopupContent;

/// Notifications for the focus owner. The adapter never resolves focus itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MarkerEvent {
    Clicked { index: usize, generation: Generation },
}

/// What a cluster click did.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterAction {
    ZoomToBounds,
    Spiderfy,
}

/// Decides how a cluster click is handled at the current zoom.
///
/// Zooming cannot separate members once the map is at its maximum zoom, so
/// the cluster is fanned out in place instead.
pub fn cluster_click_action(zoom: f64, max_zoom: f64) -> ClusterAction {
    if zoom >= max_zoom {
        ClusterAction::Spiderfy
    } else {
        ClusterAction::ZoomToBounds
    }
}

/// Mirrors a [`FilteredSet`] into the clustering capability.
///
/// Owns the marker group and the index -> marker handle table. Every rebuild
/// tears the previous group down and registers a fresh one; nothing is
/// patched in place, because both positions and the index space shift
/// between filtered sets.
#[derive(Debug)]
pub struct SpatialClusterAdapter {
    options: ClusterOptions,
    palette: DepartmentPalette,
    popup_offset_px: [f64; 2],
    group: Option<GroupId>,
    table: HandleTable,
    descriptors: Vec<MarkerDescriptor>,
    events: EventBus<MarkerEvent>,
}

impl SpatialClusterAdapter {
    pub fn new(options: ClusterOptions, palette: DepartmentPalette, popup_offset_px: [f64; 2]) -> Self {
        Self {
            options,
            palette,
            popup_offset_px,
            group: None,
            table: HandleTable::default(),
            descriptors: Vec::new(),
            events: EventBus::new(),
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn table(&self) -> &HandleTable {
        &self.table
    }

    /// Descriptors of every placed marker, in index order.
    pub fn descriptors(&self) -> &[MarkerDescriptor] {
        &self.descriptors
    }

    pub fn handle(&self, generation: Generation, index: usize) -> Option<&MarkerHandle> {
        self.table.get(generation, index)
    }

    /// Marker key -> index in the current generation.
    pub fn resolve(&self, key: MarkerKey) -> Option<usize> {
        self.table.index_of(key)
    }

    pub fn rebuild<L>(&mut self, set: &FilteredSet, layer: &mut L)
    where
        L: ClusterLayer + ?Sized,
    {
        if let Some(old) = self.group.take() {
            layer.remove_group(old);
        }
        let group = layer.add_group(&self.options);
        self.group = Some(group);

        let generation = set.generation();
        let mut table = HandleTable::new(generation);
        let mut descriptors = Vec::with_capacity(set.len());
        let mut unplaced = 0usize;

        for (index, entity) in set.iter() {
            let Some(position) = entity.coordinate() else {
                debug!(index, name = %entity.name, "entity has no usable coordinate; not placed");
                unplaced += 1;
                table.push(MarkerSlot::Unplaced);
                continue;
            };
            let descriptor = MarkerDescriptor {
                index,
                generation,
                position,
                color: self.palette.color_for(entity).clone(),
                popup: PopupContent::from_entity(entity),
                popup_offset_px: self.popup_offset_px,
            };
            let key = layer.add_marker(group, &descriptor);
            table.push(MarkerSlot::Placed(MarkerHandle { key, position }));
            descriptors.push(descriptor);
        }

        if unplaced > 0 {
            warn!(%generation, unplaced, "entities left off the map for missing coordinates");
        }

        self.table = table;
        self.descriptors = descriptors;
        // Queued clicks name indices of the previous generation.
        self.events.clear();
        debug!(
            %generation,
            listed = self.table.len(),
            placed = self.table.placed_count(),
            "rebuilt marker group"
        );
    }

    /// Translates a marker click into a [`MarkerEvent::Clicked`].
    ///
    /// Keys that do not belong to the current generation are ignored.
    pub fn marker_clicked(&mut self, now: Millis, key: MarkerKey) -> Option<usize> {
        let index = self.table.index_of(key)?;
        self.events.emit(
            now,
            MarkerEvent::Clicked {
                index,
                generation: self.table.generation(),
            },
        );
        Some(index)
    }

    pub fn drain_events(&mut self) -> Vec<Event<MarkerEvent>> {
        self.events.drain()
    }

    pub fn on_cluster_click<L>(
        &mut self,
        cluster: ClusterKey,
        zoom: f64,
        max_zoom: f64,
        layer: &mut L,
    ) -> ClusterAction
    where
        L: ClusterLayer + ?Sized,
    {
        let action = cluster_click_action(zoom, max_zoom);
        match action {
            ClusterAction::Spiderfy => layer.spiderfy(cluster),
            ClusterAction::ZoomToBounds => layer.zoom_to_cluster(cluster),
        }
        debug!(?cluster, zoom, ?action, "cluster clicked");
        action
    }

    /// Removes the marker group and forgets every handle and queued event.
    pub fn teardown<L>(&mut self, layer: &mut L)
    where
        L: ClusterLayer + ?Sized,
    {
        if let Some(group) = self.group.take() {
            layer.remove_group(group);
        }
        self.table = HandleTable::default();
        self.descriptors.clear();
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{ClusterAction, MarkerEvent, SpatialClusterAdapter, cluster_click_action};
    use crate::handles::MarkerSlot;
    use crate::layer::{ClusterKey, ClusterLayer, ClusterOptions, GroupId, MarkerDescriptor, MarkerKey};
    use crate::palette::DepartmentPalette;
    use directory::{Entity, FilterEngine, PredicateState};
    use foundation::time::Millis;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct RecordingLayer {
        next: u64,
        groups: BTreeMap<GroupId, Vec<MarkerKey>>,
        log: Vec<String>,
    }

    impl ClusterLayer for RecordingLayer {
        fn add_group(&mut self, _options: &ClusterOptions) -> GroupId {
            self.next += 1;
            let id = GroupId(self.next);
            self.groups.insert(id, Vec::new());
            self.log.push(format!("add_group {}", id.0));
            id
        }

        fn remove_group(&mut self, group: GroupId) {
            self.groups.remove(&group);
            self.log.push(format!("remove_group {}", group.0));
        }

        fn add_marker(&mut self, group: GroupId, _marker: &MarkerDescriptor) -> MarkerKey {
            self.next += 1;
            let key = MarkerKey(self.next);
            self.groups.get_mut(&group).expect("live group").push(key);
            key
        }

        fn zoom_to_cluster(&mut self, cluster: ClusterKey) {
            self.log.push(format!("zoom_to_cluster {}", cluster.0));
        }

        fn spiderfy(&mut self, cluster: ClusterKey) {
            self.log.push(format!("spiderfy {}", cluster.0));
        }
    }

    fn entities() -> Vec<Entity> {
        vec![
            Entity::new("John Doe").with_departments(["Department A"]).at(37.7749, -122.4194),
            Entity::new("Nowhere").with_departments(["Department B"]),
            Entity::new("Sarah Williams").with_departments(["Department D"]).at(30.2672, -97.7431),
        ]
    }

    fn adapter() -> SpatialClusterAdapter {
        SpatialClusterAdapter::new(ClusterOptions::default(), DepartmentPalette::reference(), [0.0, -25.0])
    }

    #[test]
    fn rebuild_covers_every_index_and_skips_missing_coordinates() {
        let engine = FilterEngine::new(entities(), &PredicateState::default(), 300);
        let set = engine.current();
        let mut layer = RecordingLayer::default();
        let mut a = adapter();

        a.rebuild(set, &mut layer);
        assert_eq!(a.table().indices(), 0..set.len());
        assert_eq!(a.table().slot(set.generation(), 1), Some(&MarkerSlot::Unplaced));
        assert_eq!(a.descriptors().len(), 2);
        assert_eq!(a.descriptors()[1].index, 2);
        assert_eq!(a.descriptors()[1].color.as_str(), "#ed2222");
        assert_eq!(layer.groups.values().next().map(Vec::len), Some(2));
    }

    #[test]
    fn rebuild_replaces_the_previous_group_and_is_idempotent() {
        let engine = FilterEngine::new(entities(), &PredicateState::default(), 300);
        let set = engine.current();
        let mut layer = RecordingLayer::default();
        let mut a = adapter();

        a.rebuild(set, &mut layer);
        let first = a.descriptors().to_vec();
        a.rebuild(set, &mut layer);

        assert_eq!(a.descriptors(), first.as_slice());
        assert_eq!(layer.groups.len(), 1);
        assert_eq!(layer.log, vec!["add_group 1", "remove_group 1", "add_group 4"]);
    }

    #[test]
    fn no_stale_index_survives_a_rebuild() {
        let mut engine = FilterEngine::new(entities(), &PredicateState::default(), 300);
        let mut layer = RecordingLayer::default();
        let mut a = adapter();
        a.rebuild(engine.current(), &mut layer);
        let old_generation = engine.current().generation();
        let old_key = a.handle(old_generation, 2).map(|h| h.key).unwrap();

        let narrowed = PredicateState {
            search_text: "sarah".into(),
            ..Default::default()
        };
        engine.request(Millis(0));
        let set = engine.poll(Millis(300), &narrowed).expect("published").clone();
        a.rebuild(&set, &mut layer);

        assert_eq!(a.table().indices(), 0..1);
        assert!(a.handle(old_generation, 0).is_none());
        assert!(a.resolve(old_key).is_none());
        assert!(a.handle(set.generation(), 0).is_some());
    }

    #[test]
    fn marker_click_emits_event_for_current_generation_only() {
        let engine = FilterEngine::new(entities(), &PredicateState::default(), 300);
        let set = engine.current();
        let mut layer = RecordingLayer::default();
        let mut a = adapter();
        a.rebuild(set, &mut layer);

        let key = a.handle(set.generation(), 2).unwrap().key;
        assert_eq!(a.marker_clicked(Millis(5), key), Some(2));
        assert_eq!(a.marker_clicked(Millis(6), MarkerKey(999)), None);

        let events: Vec<MarkerEvent> = a.drain_events().into_iter().map(|e| e.payload).collect();
        assert_eq!(
            events,
            vec![MarkerEvent::Clicked {
                index: 2,
                generation: set.generation()
            }]
        );
    }

    #[test]
    fn cluster_click_spiderfies_only_at_max_zoom() {
        assert_eq!(cluster_click_action(12.0, 13.0), ClusterAction::ZoomToBounds);
        assert_eq!(cluster_click_action(13.0, 13.0), ClusterAction::Spiderfy);

        let mut layer = RecordingLayer::default();
        let mut a = adapter();
        a.on_cluster_click(ClusterKey(7), 5.0, 13.0, &mut layer);
        a.on_cluster_click(ClusterKey(8), 13.0, 13.0, &mut layer);
        assert_eq!(layer.log, vec!["zoom_to_cluster 7", "spiderfy 8"]);
    }

    #[test]
    fn teardown_removes_group_and_handles() {
        let engine = FilterEngine::new(entities(), &PredicateState::default(), 300);
        let mut layer = RecordingLayer::default();
        let mut a = adapter();
        a.rebuild(engine.current(), &mut layer);
        a.teardown(&mut layer);

        assert!(layer.groups.is_empty());
        assert!(a.group().is_none());
        assert!(a.table().is_empty());
        assert!(a.descriptors().is_empty());
    }
}
