use crate::store::CounterStore;

/// State machine over the persisted current-group pointer. Transitions wrap
/// at both ends; `warp` rejects out-of-range targets without touching the
/// pointer. Snapshot recomputation is the data manager's job, triggered on
/// every transition that changes the pointer.
pub struct CueNavigator {
    counter: CounterStore,
    max_group: usize,
}

impl CueNavigator {
    /// Restore the pointer from its store, resetting to 0 when the persisted
    /// value no longer fits the sequence.
    pub fn new(counter: CounterStore, max_group: usize) -> Self {
        let mut navigator = Self { counter, max_group };
        if navigator.counter.get() > max_group {
            navigator.counter.set(0);
        }
        navigator
    }

    pub fn current(&self) -> usize {
        self.counter.get()
    }

    pub fn max_group(&self) -> usize {
        self.max_group
    }

    /// Step back one group, wrapping from 0 to the last group.
    pub fn previous(&mut self) {
        if self.counter.get() == 0 {
            self.counter.set(self.max_group);
        } else {
            self.counter.decrement();
        }
    }

    /// Advance one group, wrapping from the last group back to 0.
    pub fn next(&mut self) {
        if self.counter.get() == self.max_group {
            self.counter.set(0);
        } else {
            self.counter.increment();
        }
    }

    /// Jump straight to a group. Out-of-range targets leave the pointer
    /// unchanged and report failure.
    pub fn warp(&mut self, group: usize) -> bool {
        if group <= self.max_group {
            self.counter.set(group);
            true
        } else {
            false
        }
    }

    /// Adopt a replaced cue sequence's bounds. The caller is expected to
    /// warp back to group 0 afterwards.
    pub fn set_max_group(&mut self, max_group: usize) {
        self.max_group = max_group;
        if self.counter.get() > max_group {
            self.counter.set(0);
        }
    }
}
