//! Error types for segment operations
//!
//! This module defines all error types surfaced by the hierarchy,
//! configuration, and query services. Transactional failures roll back the
//! open transaction and re-surface the original error unchanged; idempotent
//! no-ops (duplicate activity-type create, destroy of an absent key) are not
//! errors.

use thiserror::Error;
use uuid::Uuid;

use crate::segment::SegmentLevel;

/// Segment error types.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// A required field is missing or empty
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// A field is present that the segment level may not declare
    #[error("A {level} cannot declare {field}")]
    UnexpectedField {
        /// Level being created
        level: SegmentLevel,
        /// Name of the offending field
        field: &'static str,
    },

    /// The named parent group does not exist
    #[error("Project group with slug '{slug}' does not exist")]
    ParentGroupNotFound {
        /// Slug of the missing group
        slug: String,
    },

    /// No segment with the given id
    #[error("Segment not found: {id}")]
    SegmentNotFound {
        /// The unknown segment id
        id: Uuid,
    },

    /// No activity type with the given key in the flattened view
    #[error("Activity type not found: {key}")]
    ActivityTypeNotFound {
        /// The unknown type key
        key: String,
    },

    /// Sibling slug uniqueness violation
    #[error("A {level} with slug '{slug}' already exists under the same parent")]
    DuplicateSlug {
        /// Level of the conflicting segment
        level: SegmentLevel,
        /// The conflicting slug
        slug: String,
    },

    /// Storage backend failure
    #[error("Storage error: {message}")]
    Storage {
        /// Backend error description
        message: String,
    },
}

/// Result type for segment operations.
pub type SegmentResult<T> = Result<T, SegmentError>;

impl SegmentError {
    /// Check if this error should be logged at error level.
    ///
    /// Validation and not-found errors are expected caller mistakes; only
    /// backend failures are server errors.
    pub fn is_server_error(&self) -> bool {
        matches!(self, SegmentError::Storage { .. })
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            SegmentError::MissingField { .. } => "MISSING_FIELD",
            SegmentError::UnexpectedField { .. } => "UNEXPECTED_FIELD",
            SegmentError::ParentGroupNotFound { .. } => "PARENT_GROUP_NOT_FOUND",
            SegmentError::SegmentNotFound { .. } => "SEGMENT_NOT_FOUND",
            SegmentError::ActivityTypeNotFound { .. } => "ACTIVITY_TYPE_NOT_FOUND",
            SegmentError::DuplicateSlug { .. } => "DUPLICATE_SLUG",
            SegmentError::Storage { .. } => "STORAGE_ERROR",
        }
    }
}
