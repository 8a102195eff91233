use tokio::sync::watch;

/// Session lifecycle state.
///
/// Variants are declared in rank order, so the derived `Ord` gives the total
/// order `Destroyed < Stopped < Changing < Paused < Playing` used by range
/// checks such as "is at least Changing".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlaybackState {
    Destroyed,
    Stopped,
    /// A seek tore the current attempt down and a restart is pending.
    Changing,
    Paused,
    Playing,
}

impl PlaybackState {
    /// A play loop owns the session (`Changing` or above).
    pub fn is_active(self) -> bool {
        self >= Self::Changing
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Destroyed => "destroyed",
            Self::Stopped => "stopped",
            Self::Changing => "changing",
            Self::Paused => "paused",
            Self::Playing => "playing",
        };
        f.write_str(name)
    }
}

/// State monitor: the current value plus a wake-up for every transition.
///
/// Each `set` notifies all subscribers, even when the value does not change,
/// so re-asserting a state is a valid way to wake waiters. Any number of
/// tasks may wait at once.
pub(crate) struct StateCell {
    tx: watch::Sender<PlaybackState>,
}

impl StateCell {
    pub(crate) fn new(initial: PlaybackState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub(crate) fn get(&self) -> PlaybackState {
        *self.tx.borrow()
    }

    /// Receiver that has already seen the current value; `changed()` fires
    /// on the next transition.
    pub(crate) fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.tx.subscribe()
    }

    pub(crate) fn set(&self, state: PlaybackState) -> PlaybackState {
        self.tx.send_replace(state)
    }

    /// Applies `next` atomically with respect to other transitions. Returns
    /// the state that was replaced, or `None` when `next` declined.
    pub(crate) fn update(
        &self,
        next: impl FnOnce(PlaybackState) -> Option<PlaybackState>,
    ) -> Option<PlaybackState> {
        let mut replaced = None;
        self.tx.send_if_modified(|current| match next(*current) {
            Some(state) => {
                replaced = Some(*current);
                *current = state;
                true
            }
            None => false,
        });
        replaced
    }

    /// `from` → `to`, only if the current state is exactly `from`.
    pub(crate) fn transition(&self, from: PlaybackState, to: PlaybackState) -> bool {
        self.update(|current| (current == from).then_some(to)).is_some()
    }
}
