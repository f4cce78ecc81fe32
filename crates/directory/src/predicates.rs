use std::collections::BTreeSet;

use runtime::subscribers::{SubscriptionId, Subscribers};
use serde::Serialize;

/// Current search/filter predicates.
///
/// Every field is replaced wholesale by its mutator; there is no incremental
/// patching across updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PredicateState {
    pub search_text: String,
    pub selected_categories: BTreeSet<String>,
    pub selected_departments: BTreeSet<String>,
}

impl PredicateState {
    pub fn is_unfiltered(&self) -> bool {
        self.search_text.is_empty()
            && self.selected_categories.is_empty()
            && self.selected_departments.is_empty()
    }
}

/// Owner of [`PredicateState`]; notifies subscribers synchronously after
/// every mutation.
#[derive(Debug, Default)]
pub struct PredicateStore {
    state: PredicateState,
    subscribers: Subscribers<PredicateState>,
}

impl PredicateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PredicateState {
        &self.state
    }

    pub fn subscribe(&mut self, f: impl FnMut(&PredicateState) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(f)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Stores `text` with surrounding whitespace trimmed.
    pub fn set_search_text(&mut self, text: &str) {
        self.state.search_text = text.trim().to_string();
        self.notify();
    }

    pub fn set_selected_categories(&mut self, categories: BTreeSet<String>) {
        self.state.selected_categories = categories;
        self.notify();
    }

    pub fn set_selected_departments(&mut self, departments: BTreeSet<String>) {
        self.state.selected_departments = departments;
        self.notify();
    }

    /// Adds or removes one department by replacing the whole set.
    pub fn toggle_department(&mut self, department: &str) {
        let mut next = self.state.selected_departments.clone();
        if !next.remove(department) {
            next.insert(department.to_string());
        }
        self.set_selected_departments(next);
    }

    pub fn clear_departments(&mut self) {
        self.set_selected_departments(BTreeSet::new());
    }

    pub fn clear_categories(&mut self) {
        self.set_selected_categories(BTreeSet::new());
    }

    /// Drops every subscription; used on teardown.
    pub fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }

    fn notify(&mut self) {
        self.subscribers.notify(&self.state);
    }
}
