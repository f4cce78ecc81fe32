use foundation::coord::LatLng;
use foundation::handles::Generation;
use foundation::time::Millis;
use markers::{HandleTable, MarkerHandle, MarkerSlot};
use runtime::deferred::Deferred;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::panel::PanelGuard;
use crate::state::{Focus, FocusState};
use crate::view::{RowPlacement, Views};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Zoom flown to when an entity gains focus.
    pub max_zoom: f64,
    /// Zoom restored on zoom-out when none was captured.
    pub default_zoom: f64,
    pub fly_duration_ms: u64,
    /// How long a self-inflicted popup close stays recognizable.
    pub system_close_window_ms: u64,
    /// Northward shift of the fly target while the compact menu overlay is open.
    pub menu_open_lat_offset: f64,
    pub panel_suppress_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            max_zoom: 13.0,
            default_zoom: 5.0,
            fly_duration_ms: 300,
            system_close_window_ms: 500,
            menu_open_lat_offset: 0.0015,
            panel_suppress_ms: crate::panel::DEFAULT_PANEL_SUPPRESS_MS,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClickSource {
    Marker,
    Row,
}

/// Single owner of "which entity is focused".
///
/// Consumes clicks from both the map and the list and answers with viewport,
/// popup and list commands. Side effects of one transition are issued in a
/// fixed order: filter panel, viewport, popup, row expansion, row scroll.
///
/// Indices are only accepted together with the filtered-set generation they
/// came from; anything else is treated as stale and dropped.
#[derive(Debug)]
pub struct FocusController {
    config: FocusConfig,
    generation: Generation,
    index: Option<usize>,
    previous_zoom: Option<f64>,
    /// Pending while a fly animation is nominally running.
    transition: Deferred<()>,
    /// Index whose next popup close was caused by the controller itself.
    system_close: Deferred<usize>,
    panel_guard: PanelGuard,
    menu_open: bool,
    active: bool,
}

impl FocusController {
    pub fn new(config: FocusConfig, generation: Generation) -> Self {
        let panel_guard = PanelGuard::new(config.panel_suppress_ms);
        Self {
            config,
            generation,
            index: None,
            previous_zoom: None,
            transition: Deferred::new(),
            system_close: Deferred::new(),
            panel_guard,
            menu_open: false,
            active: true,
        }
    }

    pub fn config(&self) -> &FocusConfig {
        &self.config
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn focus(&self) -> Focus {
        match self.index {
            Some(i) => Focus::Focused(i),
            None => Focus::Idle,
        }
    }

    pub fn state(&self) -> FocusState {
        FocusState {
            index: self.index,
            previous_zoom: self.previous_zoom,
            transition_in_flight: self.transition.is_pending(),
        }
    }

    pub fn set_menu_open(&mut self, open: bool) {
        self.menu_open = open;
    }

    /// Called for every predicate-changing interaction inside the panel.
    pub fn suppress_panel_collapse(&mut self, now: Millis) {
        self.panel_guard.suppress(now);
    }

    /// Checked by the panel's own close routine.
    pub fn panel_may_collapse(&self, now: Millis) -> bool {
        self.panel_guard.allows_collapse(now)
    }

    /// True while a popup close for `index` is known to be self-inflicted.
    pub fn is_system_close(&self, index: usize, now: Millis) -> bool {
        self.system_close.peek() == Some(&index)
            && self.system_close.due_at().is_some_and(|due| now < due)
    }

    pub fn marker_clicked(
        &mut self,
        now: Millis,
        index: usize,
        generation: Generation,
        targets: &HandleTable,
        views: &mut Views<'_>,
    ) {
        self.click(now, index, generation, ClickSource::Marker, targets, views);
    }

    /// Row indices always refer to the list currently rendered from `targets`.
    pub fn row_clicked(
        &mut self,
        now: Millis,
        index: usize,
        targets: &HandleTable,
        views: &mut Views<'_>,
    ) {
        self.click(now, index, targets.generation(), ClickSource::Row, targets, views);
    }

    fn click(
        &mut self,
        now: Millis,
        index: usize,
        generation: Generation,
        source: ClickSource,
        targets: &HandleTable,
        views: &mut Views<'_>,
    ) {
        if !self.active {
            return;
        }
        if !self.accepts(generation, index, targets) {
            debug!(?source, index, %generation, current = %self.generation, "stale click ignored");
            self.invalidate_if_dangling(targets);
            return;
        }

        self.collapse_panel(now, views);

        if self.index == Some(index) {
            debug!(?source, index, "focused entity clicked again; zooming out");
            self.zoom_out(now, index, targets, views);
        } else {
            debug!(?source, index, from = ?self.index, "focusing entity");
            self.zoom_in(now, index, targets, views);
        }
    }

    /// Handles a popup-close notification from the map surface.
    pub fn popup_closed(
        &mut self,
        now: Millis,
        index: usize,
        generation: Generation,
        targets: &HandleTable,
        views: &mut Views<'_>,
    ) {
        if !self.active || generation != self.generation {
            return;
        }
        if self.is_system_close(index, now) {
            // Each zoom-out produces exactly one close; later ones are the user's.
            self.system_close.cancel();
            debug!(index, "self-inflicted popup close ignored");
            return;
        }
        if self.index != Some(index) {
            return;
        }
        debug!(index, "popup closed externally; zooming out");
        self.zoom_out(now, index, targets, views);
    }

    /// A new filtered set invalidates focus without animating anything.
    ///
    /// The list is collapsed so no row stays expanded at an index that now
    /// names a different entity; the map is left where it is.
    pub fn filtered_set_changed(&mut self, generation: Generation, views: &mut Views<'_>) {
        if generation == self.generation {
            return;
        }
        if let Some(index) = self.index.take() {
            debug!(index, from = %self.generation, to = %generation, "focus invalidated by new filtered set");
            views.list.expand_row(None);
        }
        self.generation = generation;
        self.previous_zoom = None;
        // Both timers belong to transitions on the old group.
        self.system_close.cancel();
        self.transition.cancel();
    }

    /// Expires the re-entrancy flag, the transition window and the panel guard.
    pub fn tick(&mut self, now: Millis) {
        if let Some(index) = self.system_close.take_due(now) {
            debug!(index, "system close flag expired");
        }
        if self.transition.take_due(now).is_some() {
            debug!("focus transition settled");
        }
        self.panel_guard.tick(now);
    }

    /// Cancels every timer and drops focus; later events are ignored.
    pub fn teardown(&mut self) {
        self.transition.cancel();
        self.system_close.cancel();
        self.panel_guard.cancel();
        self.index = None;
        self.previous_zoom = None;
        self.active = false;
    }

    fn accepts(&self, generation: Generation, index: usize, targets: &HandleTable) -> bool {
        generation == self.generation
            && targets.generation() == self.generation
            && index < targets.len()
    }

    fn invalidate_if_dangling(&mut self, targets: &HandleTable) {
        let dangling = match self.index {
            Some(i) => targets.generation() != self.generation || i >= targets.len(),
            None => false,
        };
        if dangling {
            self.index = None;
            self.previous_zoom = None;
        }
    }

    fn collapse_panel(&mut self, now: Millis, views: &mut Views<'_>) {
        if views.panel.is_expanded() && self.panel_guard.allows_collapse(now) {
            views.panel.collapse();
        }
    }

    fn placed(&self, index: usize, targets: &HandleTable) -> Option<MarkerHandle> {
        match targets.slot(self.generation, index)? {
            MarkerSlot::Placed(h) => Some(*h),
            MarkerSlot::Unplaced => None,
        }
    }

    fn fly_target(&self, position: LatLng) -> LatLng {
        if self.menu_open {
            position.offset_lat(self.config.menu_open_lat_offset)
        } else {
            position
        }
    }

    fn zoom_in(&mut self, now: Millis, index: usize, targets: &HandleTable, views: &mut Views<'_>) {
        let zoom = views.map.zoom();
        self.previous_zoom = Some(zoom);
        self.index = Some(index);
        // A close arriving from here on is not the previous zoom-out's.
        self.system_close.cancel();

        if let Some(handle) = self.placed(index, targets) {
            let target = self.fly_target(handle.position);
            views.map.set_view(target, zoom);
            views.map.fly_to(target, self.config.max_zoom, self.config.fly_duration_ms);
            self.transition.schedule(now, self.config.fly_duration_ms, ());
            views.map.open_popup(handle.key);
        }

        views.list.expand_row(Some(index));
        match views.list.row_placement(index) {
            Some(RowPlacement::Scrollable {
                container_top,
                row_top,
            }) => views.list.set_scroll_top(row_top - container_top),
            Some(RowPlacement::Detached) => views.list.scroll_into_view(index),
            None => {}
        }
    }

    fn zoom_out(&mut self, now: Millis, index: usize, targets: &HandleTable, views: &mut Views<'_>) {
        let zoom = self.previous_zoom.take().unwrap_or(self.config.default_zoom);
        self.index = None;

        if let Some(handle) = self.placed(index, targets) {
            // Flag first: the close below comes back as a popup-close event.
            self.system_close
                .schedule(now, self.config.system_close_window_ms, index);
            views.map.close_popup(handle.key);
            views
                .map
                .fly_to(handle.position, zoom, self.config.fly_duration_ms);
            self.transition.schedule(now, self.config.fly_duration_ms, ());
        }

        views.list.expand_row(None);
    }
}
