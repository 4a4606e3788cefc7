use std::fmt;

/// Lifecycle of the index as seen by the retrieval gate.
///
/// ```text
/// NoIndex ──query──▶ Rebuilding ──ok──▶ IndexReady
///                        │                  │ load fails
///                        ▼                  ▼
///                      Error ◀──fails── Rebuilding (one attempt)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    NoIndex,
    IndexReady,
    Rebuilding,
    Error,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GateState::NoIndex => "NO_INDEX",
            GateState::IndexReady => "INDEX_READY",
            GateState::Rebuilding => "REBUILDING",
            GateState::Error => "ERROR",
        })
    }
}
