use foundation::coord::LatLng;
use markers::MarkerKey;

/// Viewport and popup control of the map surface.
pub trait MapView {
    fn zoom(&self) -> f64;
    fn center(&self) -> LatLng;
    /// Highest zoom the map surface can show.
    fn max_zoom(&self) -> f64;
    /// Moves the viewport without animation.
    fn set_view(&mut self, center: LatLng, zoom: f64);
    fn fly_to(&mut self, center: LatLng, zoom: f64, duration_ms: u64);
    fn open_popup(&mut self, marker: MarkerKey);
    /// Closing a popup makes the surface report a popup-close event later,
    /// exactly as a user-initiated close would.
    fn close_popup(&mut self, marker: MarkerKey);
}

/// Where a list row sits, as measured by the list view.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RowPlacement {
    /// The row lives inside a scrollable container; offsets are from the
    /// top of the document.
    Scrollable { container_top: f64, row_top: f64 },
    /// No scrollable ancestor; the page itself has to scroll.
    Detached,
}

/// The companion list of filtered entities.
pub trait ListView {
    /// Expands the row at `index`, collapsing every other row; `None`
    /// collapses all rows.
    fn expand_row(&mut self, index: Option<usize>);
    /// `None` if no row element is registered for `index`.
    fn row_placement(&self, index: usize) -> Option<RowPlacement>;
    /// Sets the container's scroll offset directly, without animation.
    fn set_scroll_top(&mut self, offset: f64);
    fn scroll_into_view(&mut self, index: usize);
}

/// The collapsible filter panel next to the list.
pub trait FilterPanel {
    fn is_expanded(&self) -> bool;
    fn collapse(&mut self);
}

/// The views the focus controller drives, borrowed for one call.
pub struct Views<'a> {
    pub map: &'a mut dyn MapView,
    pub list: &'a mut dyn ListView,
    pub panel: &'a mut dyn FilterPanel,
}
