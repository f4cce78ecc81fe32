use foundation::time::Millis;
use runtime::deferred::Deferred;

/// Reference window during which the filter panel must not auto-collapse.
pub const DEFAULT_PANEL_SUPPRESS_MS: u64 = 100;

/// Cooperative "don't collapse now" flag for the filter panel.
///
/// Predicate edits made inside the panel (ticking a department, picking a
/// category) raise the flag for a short window; the panel's close routine
/// checks it. It is advisory only and never blocks an explicit collapse
/// request by the user.
#[derive(Debug)]
pub struct PanelGuard {
    window_ms: u64,
    until: Deferred<()>,
}

impl Default for PanelGuard {
    fn default() -> Self {
        Self::new(DEFAULT_PANEL_SUPPRESS_MS)
    }
}

impl PanelGuard {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            until: Deferred::new(),
        }
    }

    /// Starts (or restarts) the suppression window.
    pub fn suppress(&mut self, now: Millis) {
        self.until.schedule(now, self.window_ms, ());
    }

    pub fn allows_collapse(&self, now: Millis) -> bool {
        self.until.due_at().is_none_or(|due| due <= now)
    }

    pub fn tick(&mut self, now: Millis) {
        self.until.take_due(now);
    }

    pub fn cancel(&mut self) {
        self.until.cancel();
    }
}
