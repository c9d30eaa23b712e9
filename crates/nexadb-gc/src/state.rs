use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Deletion lifecycle state for a segment.
///
/// The only legal transition is `Dropping → Dropped`; nothing in the
/// pipeline moves a segment back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentStatus {
    /// Deletion is pending; the segment is a GC candidate.
    Dropping,
    /// Deletion completed and committed to the catalog.
    Dropped,
}

/// One segment's deletion lifecycle within the current GC pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentState {
    pub segment_id: String,
    /// Storage path of the backing object, when the catalog knows it.
    pub path: Option<String>,
    pub status: SegmentStatus,
}

impl SegmentState {
    /// Creates a segment pending deletion.
    #[must_use]
    pub fn dropping(segment_id: impl Into<String>, path: Option<String>) -> Self {
        Self {
            segment_id: segment_id.into(),
            path,
            status: SegmentStatus::Dropping,
        }
    }
}

/// All segments of one collection relevant to the current GC pass.
///
/// Transient scheduling input: built fresh each cycle from the input
/// store and discarded with the job. Never persisted as an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionState {
    pub collection_id: String,
    /// Segments keyed by segment id.
    pub segments: HashMap<String, SegmentState>,
}

impl CollectionState {
    #[must_use]
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            segments: HashMap::new(),
        }
    }

    /// Adds a segment, replacing any previous entry with the same id.
    pub fn insert_segment(&mut self, segment: SegmentState) {
        self.segments.insert(segment.segment_id.clone(), segment);
    }

    /// Builder-style variant of [`insert_segment`](Self::insert_segment).
    #[must_use]
    pub fn with_segment(mut self, segment: SegmentState) -> Self {
        self.insert_segment(segment);
        self
    }

    /// Number of segments still pending deletion.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.segments
            .values()
            .filter(|segment| segment.status == SegmentStatus::Dropping)
            .count()
    }
}
