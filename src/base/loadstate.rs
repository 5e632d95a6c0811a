/// The lifecycle state of a connection.
///
/// States only move forward. `Completed` and `Cancelled` are terminal; the
/// two terminal outcomes of the transport (`FinishedLoading`, `Failed`)
/// share a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadState {
    /// Configured but not started.
    #[default]
    Idle,

    /// Registered and handed to the transport.
    Started,

    /// The transport raised an authentication or server-trust challenge.
    AwaitingChallenge,

    /// Response headers or body bytes are arriving.
    Receiving,

    /// The transport finished successfully.
    FinishedLoading,

    /// The transport failed.
    Failed,

    /// The parse step is running on the worker executor.
    Parsing,

    /// The completion callback has been (or is being) delivered.
    Completed,

    /// Cancelled before any terminal delivery was scheduled.
    Cancelled,
}

impl LoadState {
    fn rank(self) -> u8 {
        match self {
            LoadState::Idle => 0,
            LoadState::Started => 1,
            LoadState::AwaitingChallenge => 2,
            LoadState::Receiving => 3,
            LoadState::FinishedLoading | LoadState::Failed => 4,
            LoadState::Parsing => 5,
            LoadState::Completed | LoadState::Cancelled => 6,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Completed | LoadState::Cancelled)
    }

    /// Whether `next` is reachable from `self`.
    pub fn can_advance_to(self, next: LoadState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == LoadState::Cancelled {
            return true;
        }
        next.rank() > self.rank()
    }

    /// Move to `next` if reachable; returns whether the state changed.
    pub fn advance(&mut self, next: LoadState) -> bool {
        if self.can_advance_to(next) {
            *self = next;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only() {
        let mut state = LoadState::Idle;
        assert!(state.advance(LoadState::Started));
        assert!(state.advance(LoadState::Receiving));
        assert!(!state.advance(LoadState::AwaitingChallenge));
        assert_eq!(state, LoadState::Receiving);
    }

    #[test]
    fn test_terminal_states_stick() {
        let mut state = LoadState::Completed;
        assert!(!state.advance(LoadState::Cancelled));

        let mut state = LoadState::Cancelled;
        assert!(!state.advance(LoadState::Completed));
        assert!(state.is_terminal());
    }

    #[test]
    fn test_cancel_from_any_live_state() {
        for start in [
            LoadState::Idle,
            LoadState::Started,
            LoadState::AwaitingChallenge,
            LoadState::Receiving,
            LoadState::FinishedLoading,
            LoadState::Parsing,
        ] {
            assert!(start.can_advance_to(LoadState::Cancelled), "{:?}", start);
        }
    }

    #[test]
    fn test_finish_and_fail_are_exclusive() {
        let mut state = LoadState::FinishedLoading;
        assert!(!state.advance(LoadState::Failed));
        assert!(state.advance(LoadState::Parsing));
        assert!(state.advance(LoadState::Completed));
    }
}
