//! Deterministic timer queue driven by host-supplied elapsed time.
//!
//! Timers never fire on their own: the owner advances the clock and pops due
//! entries one at a time, in due order (ties broken by scheduling order).
//! Every entry records the epoch it was scheduled in so the owner can drop
//! callbacks that outlived the session generation they belong to.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// 1 Hz level countdown.
    Countdown,
    Reshuffle,
    MismatchReset,
    /// 1 Hz countdown of the mid-level trivia question.
    InterstitialCountdown,
    /// 1 Hz per-question countdown of the boss quiz.
    QuizCountdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timer {
    pub id: u64,
    pub kind: TimerKind,
    pub due_ms: u64,
    pub epoch: u32,
}

#[derive(Clone, Debug, Default)]
pub struct TimerQueue {
    now_ms: u64,
    next_id: u64,
    pending: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule(&mut self, kind: TimerKind, delay_ms: u64, epoch: u32) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(Timer {
            id,
            kind,
            due_ms: self.now_ms.saturating_add(delay_ms),
            epoch,
        });
        id
    }

    pub fn cancel(&mut self, kind: TimerKind) -> usize {
        let before = self.pending.len();
        self.pending.retain(|t| t.kind != kind);
        before - self.pending.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.pending.iter().any(|t| t.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return the earliest timer of `epoch` due at or before
    /// `until_ms`, moving the clock to its due time. Due timers from any other
    /// epoch are discarded on the way.
    pub fn pop_due(&mut self, until_ms: u64, epoch: u32) -> Option<Timer> {
        loop {
            let idx = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due_ms <= until_ms)
                .min_by_key(|(_, t)| (t.due_ms, t.id))
                .map(|(idx, _)| idx)?;
            let timer = self.pending.swap_remove(idx);
            self.now_ms = self.now_ms.max(timer.due_ms);
            if timer.epoch == epoch {
                return Some(timer);
            }
            log::debug!(
                "dropping stale {:?} timer from epoch {} (now {epoch})",
                timer.kind,
                timer.epoch
            );
        }
    }

    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }
}
