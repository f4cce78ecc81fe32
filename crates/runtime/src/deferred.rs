use foundation::time::Millis;

/// Identifies one scheduling of a [`Deferred`] slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug)]
struct Pending<T> {
    id: TaskId,
    due: Millis,
    payload: T,
}

/// Single-slot cancellable deferred task.
///
/// Key properties:
/// - At most one task is pending at any time.
/// - Scheduling while a task is pending cancels it (trailing-edge debounce).
/// - A task fires at most once, on the first `take_due` at or after its due time.
/// - Nothing runs on its own: owners poll with the host-supplied clock.
#[derive(Debug)]
pub struct Deferred<T> {
    next_id: u64,
    pending: Option<Pending<T>>,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: None,
        }
    }
}

impl<T> Deferred<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `payload` to become due `delay_ms` after `now`, replacing
    /// any pending task.
    pub fn schedule(&mut self, now: Millis, delay_ms: u64, payload: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.pending = Some(Pending {
            id,
            due: now.after(delay_ms),
            payload,
        });
        id
    }

    /// Drops the pending task, returning its payload if there was one.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.payload)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_id(&self) -> Option<TaskId> {
        self.pending.as_ref().map(|p| p.id)
    }

    pub fn due_at(&self) -> Option<Millis> {
        self.pending.as_ref().map(|p| p.due)
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.payload)
    }

    /// Removes and returns the payload if the pending task is due at `now`.
    pub fn take_due(&mut self, now: Millis) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| p.due <= now) {
            return self.cancel();
        }
        None
    }
}
