use std::collections::BTreeSet;

use directory::source::EntitySource;
use directory::{Entity, FilterEngine, FilteredSet, PredicateState, PredicateStore};
use focus::{Focus, FocusController, FocusState, Views};
use foundation::handles::Generation;
use foundation::time::Millis;
use markers::{
    ClusterAction, ClusterKey, ClusterLayer, MarkerEvent, MarkerKey, SpatialClusterAdapter,
};
use runtime::subscribers::SubscriptionId;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Everything the engine drives on the host side: the clustering
/// capability plus the map, list and filter-panel views.
pub trait Surface {
    fn layer(&mut self) -> &mut dyn ClusterLayer;
    fn views(&mut self) -> Views<'_>;
}

/// Serializable summary of the engine's observable state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub generation: u64,
    pub result_count: usize,
    pub placed_count: usize,
    /// Names of the filtered entities, in list order.
    pub results: Vec<String>,
    pub predicates: PredicateState,
    pub focus: Focus,
    pub previous_zoom: Option<f64>,
    pub transition_in_flight: bool,
    pub filter_pending: bool,
}

/// Wires predicates, filtering, marker mirroring and focus together.
///
/// Host callbacks are turned into calls on this type, each stamped with the
/// host clock. Deferred work (the filter debounce, the re-entrancy flag,
/// transition windows) only advances in [`Engine::tick`].
///
/// Ordering contract:
/// - A new filtered set is mirrored into markers before focus is invalidated,
///   and both happen before any later click is processed.
/// - Marker clicks are queued by the adapter and drained into the focus
///   controller in arrival order.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    predicates: PredicateStore,
    filter: FilterEngine,
    markers: SpatialClusterAdapter,
    focus: FocusController,
    active: bool,
}

impl Engine {
    pub fn new<S>(config: EngineConfig, entities: Vec<Entity>, surface: &mut S) -> Self
    where
        S: Surface + ?Sized,
    {
        let predicates = PredicateStore::new();
        let filter = FilterEngine::new(entities, predicates.state(), config.debounce_ms);
        let mut markers = SpatialClusterAdapter::new(
            config.clustering.clone(),
            config.palette.clone(),
            config.popup_offset_px,
        );
        markers.rebuild(filter.current(), surface.layer());
        let focus = FocusController::new(config.focus.clone(), filter.current().generation());
        info!(
            entities = filter.collection().len(),
            placed = markers.table().placed_count(),
            "engine ready"
        );
        Self {
            config,
            predicates,
            filter,
            markers,
            focus,
            active: true,
        }
    }

    pub fn load<S>(
        config: EngineConfig,
        source: &dyn EntitySource,
        surface: &mut S,
    ) -> Result<Self, EngineError>
    where
        S: Surface + ?Sized,
    {
        let entities = source.load()?;
        Ok(Self::new(config, entities, surface))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn predicates(&self) -> &PredicateState {
        self.predicates.state()
    }

    pub fn filtered(&self) -> &FilteredSet {
        self.filter.current()
    }

    pub fn collection(&self) -> &[Entity] {
        self.filter.collection()
    }

    pub fn markers(&self) -> &SpatialClusterAdapter {
        &self.markers
    }

    pub fn focus(&self) -> Focus {
        self.focus.focus()
    }

    pub fn focus_state(&self) -> FocusState {
        self.focus.state()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let set = self.filter.current();
        let state = self.focus.state();
        EngineSnapshot {
            generation: set.generation().get(),
            result_count: set.len(),
            placed_count: self.markers.table().placed_count(),
            results: set.iter().map(|(_, e)| e.name.clone()).collect(),
            predicates: self.predicates.state().clone(),
            focus: state.focus(),
            previous_zoom: state.previous_zoom,
            transition_in_flight: state.transition_in_flight,
            filter_pending: self.filter.is_pending(),
        }
    }

    pub fn subscribe_predicates(
        &mut self,
        f: impl FnMut(&PredicateState) + 'static,
    ) -> SubscriptionId {
        self.predicates.subscribe(f)
    }

    pub fn subscribe_filtered(&mut self, f: impl FnMut(&FilteredSet) + 'static) -> SubscriptionId {
        self.filter.subscribe(f)
    }

    pub fn set_search_text(&mut self, now: Millis, text: &str) {
        if !self.active {
            return;
        }
        self.predicates.set_search_text(text);
        self.filter.request(now);
    }

    pub fn set_selected_categories(&mut self, now: Millis, categories: BTreeSet<String>) {
        if !self.active {
            return;
        }
        self.predicates.set_selected_categories(categories);
        self.panel_edit(now);
    }

    pub fn set_selected_departments(&mut self, now: Millis, departments: BTreeSet<String>) {
        if !self.active {
            return;
        }
        self.predicates.set_selected_departments(departments);
        self.panel_edit(now);
    }

    pub fn toggle_department(&mut self, now: Millis, department: &str) {
        if !self.active {
            return;
        }
        self.predicates.toggle_department(department);
        self.panel_edit(now);
    }

    pub fn clear_departments(&mut self, now: Millis) {
        if !self.active {
            return;
        }
        self.predicates.clear_departments();
        self.panel_edit(now);
    }

    pub fn clear_categories(&mut self, now: Millis) {
        if !self.active {
            return;
        }
        self.predicates.clear_categories();
        self.panel_edit(now);
    }

    /// Predicate edits made from inside the filter panel.
    fn panel_edit(&mut self, now: Millis) {
        self.focus.suppress_panel_collapse(now);
        self.filter.request(now);
    }

    /// Whether the filter panel's own close routine may run right now.
    pub fn panel_may_auto_collapse(&self, now: Millis) -> bool {
        self.active && self.focus.panel_may_collapse(now)
    }

    pub fn set_menu_open(&mut self, open: bool) {
        self.focus.set_menu_open(open);
    }

    /// Advances deferred work to `now`.
    ///
    /// Returns the generation of a newly published filtered set, if any.
    pub fn tick<S>(&mut self, now: Millis, surface: &mut S) -> Option<Generation>
    where
        S: Surface + ?Sized,
    {
        if !self.active {
            return None;
        }
        let published = match self.filter.poll(now, self.predicates.state()) {
            Some(set) => {
                self.markers.rebuild(set, surface.layer());
                self.focus
                    .filtered_set_changed(set.generation(), &mut surface.views());
                Some(set.generation())
            }
            None => None,
        };
        self.focus.tick(now);
        published
    }

    /// Swaps in a freshly loaded collection; always yields a new generation.
    pub fn replace_collection<S>(&mut self, entities: Vec<Entity>, surface: &mut S) -> Generation
    where
        S: Surface + ?Sized,
    {
        let set = self
            .filter
            .replace_collection(entities, self.predicates.state());
        self.markers.rebuild(set, surface.layer());
        self.focus
            .filtered_set_changed(set.generation(), &mut surface.views());
        set.generation()
    }

    pub fn reload<S>(
        &mut self,
        source: &dyn EntitySource,
        surface: &mut S,
    ) -> Result<Generation, EngineError>
    where
        S: Surface + ?Sized,
    {
        let entities = source.load()?;
        Ok(self.replace_collection(entities, surface))
    }

    pub fn marker_clicked<S>(&mut self, now: Millis, key: MarkerKey, surface: &mut S)
    where
        S: Surface + ?Sized,
    {
        if !self.active {
            return;
        }
        if self.markers.marker_clicked(now, key).is_none() {
            debug!(?key, "click on a marker outside the current generation");
        }
        for event in self.markers.drain_events() {
            let MarkerEvent::Clicked { index, generation } = event.payload;
            self.focus.marker_clicked(
                event.at,
                index,
                generation,
                self.markers.table(),
                &mut surface.views(),
            );
        }
    }

    pub fn row_clicked<S>(&mut self, now: Millis, index: usize, surface: &mut S)
    where
        S: Surface + ?Sized,
    {
        if !self.active {
            return;
        }
        self.focus
            .row_clicked(now, index, self.markers.table(), &mut surface.views());
    }

    pub fn cluster_clicked<S>(
        &mut self,
        cluster: ClusterKey,
        surface: &mut S,
    ) -> Option<ClusterAction>
    where
        S: Surface + ?Sized,
    {
        if !self.active {
            return None;
        }
        let (zoom, max_zoom) = {
            let views = surface.views();
            (views.map.zoom(), views.map.max_zoom())
        };
        Some(
            self.markers
                .on_cluster_click(cluster, zoom, max_zoom, surface.layer()),
        )
    }

    /// Popup-close notification from the map, user- or system-initiated.
    pub fn popup_closed<S>(&mut self, now: Millis, key: MarkerKey, surface: &mut S)
    where
        S: Surface + ?Sized,
    {
        if !self.active {
            return;
        }
        let Some(index) = self.markers.resolve(key) else {
            return;
        };
        let generation = self.markers.table().generation();
        self.focus.popup_closed(
            now,
            index,
            generation,
            self.markers.table(),
            &mut surface.views(),
        );
    }

    /// Releases the marker group, cancels every timer and drops subscribers.
    /// Every later call is a no-op.
    pub fn teardown<S>(&mut self, surface: &mut S)
    where
        S: Surface + ?Sized,
    {
        if !self.active {
            return;
        }
        self.filter.teardown();
        self.predicates.clear_subscribers();
        self.markers.teardown(surface.layer());
        self.focus.teardown();
        self.active = false;
        info!("engine torn down");
    }
}
