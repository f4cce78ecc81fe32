use serde::Serialize;

/// Which entity, if any, is focused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum Focus {
    Idle,
    Focused(usize),
}

impl Focus {
    pub fn index(self) -> Option<usize> {
        match self {
            Focus::Idle => None,
            Focus::Focused(i) => Some(i),
        }
    }
}

/// Snapshot of the focus controller's state.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct FocusState {
    pub index: Option<usize>,
    /// Zoom captured when the current focus began.
    pub previous_zoom: Option<f64>,
    pub transition_in_flight: bool,
}

impl FocusState {
    pub fn focus(&self) -> Focus {
        match self.index {
            Some(i) => Focus::Focused(i),
            None => Focus::Idle,
        }
    }
}
