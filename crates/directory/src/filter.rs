use std::sync::Arc;

use foundation::handles::Generation;
use foundation::time::Millis;
use runtime::deferred::Deferred;
use runtime::subscribers::{SubscriptionId, Subscribers};
use tracing::debug;

use crate::entity::Entity;
use crate::predicates::PredicateState;

/// Reference quiet period between the last predicate change and a recompute.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Returns the source positions of every entity passing all predicates.
///
/// Predicates compose with AND:
/// - name: case-insensitive substring of `search_text` (empty matches all)
/// - category: trimmed category must be selected; entities without one are
///   excluded once any category is selected
/// - department: at least one department tag must be selected (OR)
///
/// Ordering contract:
/// - Output is in ascending source position; this is a stable filter, never a sort.
pub fn recompute(entities: &[Entity], predicates: &PredicateState) -> Vec<usize> {
    let needle = predicates.search_text.to_lowercase();

    entities
        .iter()
        .enumerate()
        .filter(|(_, e)| name_matches(e, &needle))
        .filter(|(_, e)| category_matches(e, predicates))
        .filter(|(_, e)| department_matches(e, predicates))
        .map(|(pos, _)| pos)
        .collect()
}

fn name_matches(entity: &Entity, needle_lower: &str) -> bool {
    needle_lower.is_empty() || entity.name.to_lowercase().contains(needle_lower)
}

fn category_matches(entity: &Entity, predicates: &PredicateState) -> bool {
    if predicates.selected_categories.is_empty() {
        return true;
    }
    entity
        .trimmed_category()
        .is_some_and(|c| predicates.selected_categories.contains(c))
}

fn department_matches(entity: &Entity, predicates: &PredicateState) -> bool {
    if predicates.selected_departments.is_empty() {
        return true;
    }
    entity
        .departments
        .iter()
        .any(|d| predicates.selected_departments.contains(d))
}

/// Ordered result of applying the predicates to one collection.
///
/// Indices into a `FilteredSet` (0..len) are the handle every other component
/// uses for an entity. They are only meaningful together with the set's
/// generation: a new generation means every index must be re-resolved.
#[derive(Debug, Clone)]
pub struct FilteredSet {
    generation: Generation,
    collection: Arc<[Entity]>,
    positions: Vec<usize>,
}

impl FilteredSet {
    fn new(generation: Generation, collection: Arc<[Entity]>, positions: Vec<usize>) -> Self {
        Self {
            generation,
            collection,
            positions,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entity> {
        let pos = *self.positions.get(index)?;
        self.collection.get(pos)
    }

    /// Position in the source collection of the entity at `index`.
    pub fn source_position(&self, index: usize) -> Option<usize> {
        self.positions.get(index).copied()
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Iterates `(index, entity)` in set order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Entity)> + '_ {
        self.positions
            .iter()
            .enumerate()
            .filter_map(|(i, pos)| self.collection.get(*pos).map(|e| (i, e)))
    }

    /// True if both sets select the same members of the same collection.
    pub fn same_members(&self, other: &FilteredSet) -> bool {
        Arc::ptr_eq(&self.collection, &other.collection) && self.positions == other.positions
    }
}

/// Debounced producer of [`FilteredSet`]s.
///
/// Predicate changes only arm a trailing-edge timer; the recompute runs when
/// the host polls after the quiet period, always against the predicates it is
/// handed at that moment. A new set is published (new generation, subscribers
/// notified) only when membership or the collection actually changed.
#[derive(Debug)]
pub struct FilterEngine {
    debounce_ms: u64,
    collection: Arc<[Entity]>,
    current: FilteredSet,
    pending: Deferred<()>,
    subscribers: Subscribers<FilteredSet>,
}

impl FilterEngine {
    pub fn new(entities: Vec<Entity>, predicates: &PredicateState, debounce_ms: u64) -> Self {
        let collection: Arc<[Entity]> = entities.into();
        let positions = recompute(&collection, predicates);
        let current = FilteredSet::new(Generation::INITIAL, Arc::clone(&collection), positions);
        Self {
            debounce_ms,
            collection,
            current,
            pending: Deferred::new(),
            subscribers: Subscribers::new(),
        }
    }

    pub fn current(&self) -> &FilteredSet {
        &self.current
    }

    pub fn collection(&self) -> &[Entity] {
        &self.collection
    }

    pub fn subscribe(&mut self, f: impl FnMut(&FilteredSet) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(f)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Restarts the quiet period; only the last request in a burst runs.
    pub fn request(&mut self, now: Millis) {
        self.pending.schedule(now, self.debounce_ms, ());
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn due_at(&self) -> Option<Millis> {
        self.pending.due_at()
    }

    /// Runs the pending recompute if its quiet period has elapsed.
    ///
    /// Returns the new set if one was published.
    pub fn poll(&mut self, now: Millis, predicates: &PredicateState) -> Option<&FilteredSet> {
        self.pending.take_due(now)?;
        let positions = recompute(&self.collection, predicates);
        if positions == self.current.positions {
            debug!(
                generation = %self.current.generation,
                len = positions.len(),
                "filter recompute left membership unchanged"
            );
            return None;
        }
        self.publish(positions);
        Some(&self.current)
    }

    /// Swaps in a refreshed collection and recomputes immediately.
    ///
    /// Always publishes a new generation; any pending debounced recompute is
    /// superseded because this one already observes the latest predicates.
    pub fn replace_collection(
        &mut self,
        entities: Vec<Entity>,
        predicates: &PredicateState,
    ) -> &FilteredSet {
        self.pending.cancel();
        self.collection = entities.into();
        let positions = recompute(&self.collection, predicates);
        self.publish(positions);
        &self.current
    }

    /// Cancels the pending recompute and drops all subscribers.
    pub fn teardown(&mut self) {
        self.pending.cancel();
        self.subscribers.clear();
    }

    fn publish(&mut self, positions: Vec<usize>) {
        let generation = self.current.generation.next();
        // Built in full before replacing `current`; observers never see a partial set.
        let next = FilteredSet::new(generation, Arc::clone(&self.collection), positions);
        self.current = next;
        debug!(%generation, len = self.current.len(), "published filtered set");
        self.subscribers.notify(&self.current);
    }
}
