/// Keys the experiment reacts to. Hosts map their native key codes onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Response key, also advances instruction slides and ends a pause.
    Space,
    Pause,
    Abort,
    Confirm,
    Decline,
}
