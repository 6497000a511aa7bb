use foundation::time::Time;

/// Deterministic timer queue.
///
/// Key properties:
/// - Total ordering on `(deadline, id)`; equal deadlines fire in scheduling order.
/// - Cancellation removes the entry outright, so a cancelled timer can never
///   fire later and overwrite state that belongs to someone else.
/// - Time only moves when the owner calls [`TimerQueue::pop_due`] with a new
///   `now`; nothing here reads a wall clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug)]
struct Entry<T> {
    id: TimerId,
    deadline: Time,
    payload: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn schedule(&mut self, deadline: Time, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push(Entry {
            id,
            deadline,
            payload,
        });
        id
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Returns `true` if the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Cancels every pending timer whose payload matches `pred`.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.payload));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn next_deadline(&self) -> Option<Time> {
        self.entries
            .iter()
            .map(|e| e.deadline)
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    /// Pops the earliest timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Time) -> Option<(TimerId, T)> {
        let mut best: Option<usize> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            if entry.deadline.0 > now.0 {
                continue;
            }
            match best {
                None => best = Some(idx),
                Some(b) => {
                    let cur = &self.entries[b];
                    let earlier = entry
                        .deadline
                        .0
                        .total_cmp(&cur.deadline.0)
                        .then_with(|| entry.id.cmp(&cur.id))
                        .is_lt();
                    if earlier {
                        best = Some(idx);
                    }
                }
            }
        }

        let idx = best?;
        let entry = self.entries.remove(idx);
        Some((entry.id, entry.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::TimerQueue;
    use foundation::time::Time;

    #[test]
    fn fires_in_deadline_then_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(Time(2.0), "late");
        q.schedule(Time(1.0), "first");
        q.schedule(Time(1.0), "second");

        assert!(q.pop_due(Time(0.5)).is_none());
        let fired: Vec<_> = std::iter::from_fn(|| q.pop_due(Time(5.0)))
            .map(|(_, p)| p)
            .collect();
        assert_eq!(fired, vec!["first", "second", "late"]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let a = q.schedule(Time(1.0), "a");
        q.schedule(Time(1.0), "b");
        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert!(!q.is_pending(a));

        let (_, p) = q.pop_due(Time(1.0)).expect("b is due");
        assert_eq!(p, "b");
        assert!(q.pop_due(Time(100.0)).is_none());
    }

    #[test]
    fn cancel_where_and_next_deadline() {
        let mut q = TimerQueue::new();
        q.schedule(Time(3.0), 1);
        q.schedule(Time(4.0), 2);
        q.schedule(Time(5.0), 1);
        assert_eq!(q.next_deadline(), Some(Time(3.0)));

        assert_eq!(q.cancel_where(|p| *p == 1), 2);
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(Time(4.0)));
    }
}
