//! Timestamped interaction scripts replayed against a [`HeadlessSurface`].

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use focus::MapView;
use foundation::time::Millis;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{Engine, EngineSnapshot};
use crate::error::EngineError;
use crate::headless::{Command, HeadlessSurface};

/// Slack added after the last step so every pending timer settles.
pub const SETTLE_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Search { text: String },
    SetCategories { categories: BTreeSet<String> },
    SetDepartments { departments: BTreeSet<String> },
    ToggleDepartment { department: String },
    ClearDepartments,
    ClearCategories,
    /// Click the marker of the entity at `index` in the current list.
    ClickMarker { index: usize },
    ClickRow { index: usize },
    /// Click the cluster glyph that currently contains `index`'s marker.
    ClickCluster { index: usize },
    /// The user dismisses whatever popup is open.
    ClosePopup,
    OpenPanel,
    SetMenuOpen { open: bool },
    /// Only advances the clock.
    Wait,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    pub at: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub state: EngineSnapshot,
    pub popup: Option<u64>,
    pub zoom: f64,
    pub center: [f64; 2],
    pub commands: Vec<Command>,
}

pub fn parse_script(text: &str) -> Result<Vec<Step>, EngineError> {
    serde_json::from_str(text).map_err(EngineError::MalformedScript)
}

pub fn load_script(path: &Path) -> Result<Vec<Step>, EngineError> {
    let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&text)
}

/// Runs `steps` in timestamp order (stable for equal timestamps), ticking
/// the engine before and after every step and delivering popup closes the
/// way a host event loop would.
pub fn replay(engine: &mut Engine, surface: &mut HeadlessSurface, steps: &[Step]) -> ReplayReport {
    let mut ordered: Vec<&Step> = steps.iter().collect();
    ordered.sort_by_key(|s| s.at);

    let mut last = 0;
    for step in ordered {
        let now = Millis(step.at);
        engine.tick(now, surface);
        apply(engine, surface, now, &step.action);
        surface.deliver_popup_closes(engine, now);
        engine.tick(now, surface);
        last = step.at;
    }
    let end = Millis(last).after(SETTLE_MS.max(engine.config().debounce_ms));
    engine.tick(end, surface);
    surface.deliver_popup_closes(engine, end);

    ReplayReport {
        state: engine.snapshot(),
        popup: surface.map.popup_marker().map(|k| k.0),
        zoom: surface.map.zoom(),
        center: [surface.map.center().lat, surface.map.center().lng],
        commands: surface.commands(),
    }
}

fn apply(engine: &mut Engine, surface: &mut HeadlessSurface, now: Millis, action: &Action) {
    debug!(at = now.0, ?action, "replaying step");
    match action {
        Action::Search { text } => engine.set_search_text(now, text),
        Action::SetCategories { categories } => {
            engine.set_selected_categories(now, categories.clone())
        }
        Action::SetDepartments { departments } => {
            engine.set_selected_departments(now, departments.clone())
        }
        Action::ToggleDepartment { department } => engine.toggle_department(now, department),
        Action::ClearDepartments => engine.clear_departments(now),
        Action::ClearCategories => engine.clear_categories(now),
        Action::ClickMarker { index } => match surface.marker_at(engine, *index) {
            Some(key) => engine.marker_clicked(now, key, surface),
            None => warn!(index, "no marker for index; click skipped"),
        },
        Action::ClickRow { index } => engine.row_clicked(now, *index, surface),
        Action::ClickCluster { index } => {
            let Some(key) = surface.marker_at(engine, *index) else {
                warn!(index, "no marker for index; cluster click skipped");
                return;
            };
            let Some((cluster, glyph)) = surface.map.cluster_of(key) else {
                return;
            };
            if glyph.is_single() {
                engine.marker_clicked(now, key, surface);
                return;
            }
            let action = engine.cluster_clicked(cluster, surface);
            debug!(?cluster, ?action, "cluster click handled");
        }
        Action::ClosePopup => {
            surface.map.user_close_popup();
        }
        Action::OpenPanel => surface.panel.expand(),
        Action::SetMenuOpen { open } => engine.set_menu_open(*open),
        Action::Wait => {}
    }
}
