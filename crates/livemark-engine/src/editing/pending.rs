/// A replacement range captured before an asynchronous step, applied later
/// with `Document::apply_pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInsertion {
    pub range: std::ops::Range<usize>,
    /// Text the range covered when it was captured.
    pub expected: String,
    /// Document version at capture time.
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertionError {
    #[error("insertion range {range:?} no longer matches the document")]
    Stale { range: std::ops::Range<usize> },
}
