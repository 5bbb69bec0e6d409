use std::fmt;

use time::OffsetDateTime;

/// Progress of one deposit through the remote preservation pipeline.
///
/// Transitions are driven entirely by the remote service; this side only
/// observes them. The success path runs `Pending` → `Accepted` →
/// `Ingested` → `Replicated`; `Failed` is terminal and can follow any
/// state after acceptance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestStatus {
    /// Dropped into the staging bucket, not yet picked up.
    Pending,
    /// The service has started processing the bag.
    Accepted,
    /// Unpacked, validated, and recorded.
    Ingested,
    /// Copied into long-term storage facilities.
    Replicated,
    Failed,
}

impl IngestStatus {
    /// Terminal states: no further transition will ever be observed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Replicated | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Ingested => "ingested",
            Self::Replicated => "replicated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation from the remote service's event feed.
///
/// Owned entirely by the service; read here via polling, never mutated.
#[derive(Clone, Debug)]
pub struct ArchivalEvent {
    /// The service's own identifier for the intellectual object.
    pub object_identifier: String,
    pub status: IngestStatus,
    /// The service's processing stage, verbatim, when it reports one.
    pub stage: Option<String>,
    pub recorded_at: Option<OffsetDateTime>,
}
