//! Timed step scheduling
//!
//! A `Timeline` is a small queue of `{due time, action}` entries driven by the
//! session clock. Effects own one timeline each; cancelling it drops every
//! pending step at once.

#[derive(Debug, Clone)]
struct Scheduled<T> {
    due_ms: f64,
    /// Insertion order, breaks ties between equal due times
    order: u64,
    action: T,
}

/// Cancellable queue of timed actions
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    steps: Vec<Scheduled<T>>,
    next_order: u64,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            next_order: 0,
        }
    }

    /// Schedule `action` at an absolute session time
    pub fn schedule_at(&mut self, due_ms: f64, action: T) {
        let order = self.next_order;
        self.next_order += 1;
        self.steps.push(Scheduled {
            due_ms,
            order,
            action,
        });
    }

    /// Schedule `action` `delay_ms` after `now_ms`
    pub fn schedule_after(&mut self, now_ms: f64, delay_ms: f64, action: T) {
        self.schedule_at(now_ms + delay_ms.max(0.0), action);
    }

    /// Remove and return the earliest step due at `now_ms`, if any
    pub fn pop_due(&mut self, now_ms: f64) -> Option<T> {
        let idx = self
            .steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| {
                a.due_ms
                    .partial_cmp(&b.due_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.order.cmp(&b.order))
            })
            .map(|(i, _)| i)?;
        Some(self.steps.remove(idx).action)
    }

    /// Drop every pending step, returning how many were dropped
    pub fn cancel(&mut self) -> usize {
        let n = self.steps.len();
        self.steps.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
