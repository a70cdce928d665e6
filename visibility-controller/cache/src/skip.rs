use visibility_controller_core::StateVersion;

/// Decides whether a synchronization pass may be skipped.
///
/// Strategies may keep state between calls. The engine consults the strategy exactly once per
/// attempted pass, while holding the synchronization lock.
pub trait SkipSynchronizer: Send + 'static {
    /// Returns true if a pass over `current` would not change anything.
    fn skip(&mut self, current: &StateVersion) -> bool;

    /// Forgets any baseline so that the next pass is not skipped.
    fn reset(&mut self) {}
}

/// Never skips a pass.
#[derive(Copy, Clone, Debug, Default)]
pub struct NeverSkip;

/// Skips a pass when the observed state is unchanged since the last pass that ran.
#[derive(Clone, Debug, Default)]
pub struct StatelessSkip {
    last: Option<StateVersion>,
}

// === impl NeverSkip ===

impl SkipSynchronizer for NeverSkip {
    fn skip(&mut self, _: &StateVersion) -> bool {
        false
    }
}

// === impl StatelessSkip ===

impl SkipSynchronizer for StatelessSkip {
    fn skip(&mut self, current: &StateVersion) -> bool {
        if self.last.as_ref() == Some(current) {
            return true;
        }
        self.last = Some(current.clone());
        false
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

impl<S: SkipSynchronizer + ?Sized> SkipSynchronizer for Box<S> {
    fn skip(&mut self, current: &StateVersion) -> bool {
        (**self).skip(current)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
