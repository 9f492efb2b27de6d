//! Segment domain models
//!
//! This module provides the core Segment entity for hierarchical workspace
//! management. Segments form a three-level tree: project groups contain
//! projects, projects contain subprojects. Parent and grandparent names and
//! slugs are denormalized onto child rows so read paths never need joins;
//! the hierarchy service keeps those copies consistent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::activity::{ActivityChannelMap, ActivityTypeMap};

/// Level of a segment within the hierarchy.
///
/// The hierarchy is fixed at three levels:
///
/// ```text
/// ProjectGroup
///   └─ Project
///        └─ Subproject
/// ```
///
/// # Examples
///
/// ```
/// use platform_segments::SegmentLevel;
///
/// assert_eq!(SegmentLevel::ProjectGroup.child(), Some(SegmentLevel::Project));
/// assert_eq!(SegmentLevel::Subproject.child(), None);
/// assert!(SegmentLevel::Subproject.is_subproject());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SegmentLevel {
    /// Top-level grouping of related projects
    ProjectGroup,

    /// A project within a group
    Project,

    /// A leaf workspace within a project
    Subproject,
}

impl SegmentLevel {
    /// The level directly below this one, if any.
    ///
    /// Subprojects are leaves and have no child level.
    pub fn child(&self) -> Option<SegmentLevel> {
        match self {
            SegmentLevel::ProjectGroup => Some(SegmentLevel::Project),
            SegmentLevel::Project => Some(SegmentLevel::Subproject),
            SegmentLevel::Subproject => None,
        }
    }

    /// Check whether this is the leaf level.
    ///
    /// Mutations on subprojects never cascade to other rows.
    pub fn is_subproject(&self) -> bool {
        matches!(self, SegmentLevel::Subproject)
    }

    /// String representation used in storage and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentLevel::ProjectGroup => "project_group",
            SegmentLevel::Project => "project",
            SegmentLevel::Subproject => "subproject",
        }
    }

    /// Parse a level from its string representation.
    ///
    /// # Examples
    ///
    /// ```
    /// use platform_segments::SegmentLevel;
    ///
    /// assert_eq!(SegmentLevel::parse("project"), Some(SegmentLevel::Project));
    /// assert_eq!(SegmentLevel::parse("unknown"), None);
    /// ```
    pub fn parse(s: &str) -> Option<SegmentLevel> {
        match s {
            "project_group" => Some(SegmentLevel::ProjectGroup),
            "project" => Some(SegmentLevel::Project),
            "subproject" => Some(SegmentLevel::Subproject),
            _ => None,
        }
    }
}

impl fmt::Display for SegmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A segment is one node of the three-level hierarchy.
///
/// Each segment carries denormalized copies of its ancestors' names and
/// slugs (`parent_*` for projects and subprojects, `grandparent_*` for
/// subprojects only) plus two per-segment configuration blobs: custom
/// activity-type definitions and activity channel lists.
///
/// Segments are created through [`crate::SegmentHierarchyService`] and the
/// repository; the `new` constructor only materializes the in-memory value.
///
/// # Examples
///
/// ```
/// use platform_segments::{Segment, SegmentDraft, SegmentLevel};
///
/// let draft = SegmentDraft::new("Acme", "acme");
/// let group = Segment::new(SegmentLevel::ProjectGroup, &draft);
/// assert_eq!(group.slug, "acme");
/// assert!(group.parent_slug.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Unique identifier, assigned at creation, immutable
    pub id: Uuid,

    /// Hierarchy level, immutable once created
    pub level: SegmentLevel,

    /// Human-readable name
    pub name: String,

    /// URL-friendly slug (unique among siblings at the same level)
    pub slug: String,

    /// Parent slug (set for projects and subprojects)
    pub parent_slug: Option<String>,

    /// Parent name (set for projects and subprojects)
    pub parent_name: Option<String>,

    /// Grandparent slug (set only for subprojects)
    pub grandparent_slug: Option<String>,

    /// Grandparent name (set only for subprojects)
    pub grandparent_name: Option<String>,

    /// Custom activity-type definitions, keyed by platform then type key
    #[serde(default)]
    pub custom_activity_types: ActivityTypeMap,

    /// Activity channel lists, keyed by platform
    #[serde(default)]
    pub activity_channels: ActivityChannelMap,

    /// When the segment was created
    pub created_at: DateTime<Utc>,

    /// When the segment was last updated
    pub updated_at: DateTime<Utc>,

    /// Custom metadata for extensibility
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Segment {
    /// Materialize a segment from a creation draft.
    ///
    /// Assigns a fresh UUID v7 id and current timestamps; the configuration
    /// blobs start empty. Hierarchy validation (which parent fields a level
    /// may carry) is the hierarchy service's responsibility, not this
    /// constructor's.
    pub fn new(level: SegmentLevel, draft: &SegmentDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            level,
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            parent_slug: draft.parent_slug.clone(),
            parent_name: draft.parent_name.clone(),
            grandparent_slug: draft.grandparent_slug.clone(),
            grandparent_name: draft.grandparent_name.clone(),
            custom_activity_types: ActivityTypeMap::new(),
            activity_channels: ActivityChannelMap::new(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    /// Check whether this segment is a leaf.
    pub fn is_subproject(&self) -> bool {
        self.level.is_subproject()
    }

    /// Apply an update patch in place, bumping `updated_at`.
    ///
    /// Only the fields present in the patch change; `id` and `level` are
    /// immutable and not part of the patch.
    pub fn apply(&mut self, patch: &SegmentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(slug) = &patch.slug {
            self.slug = slug.clone();
        }
        if let Some(types) = &patch.custom_activity_types {
            self.custom_activity_types = types.clone();
        }
        if let Some(channels) = &patch.activity_channels {
            self.activity_channels = channels.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Input for creating a segment.
///
/// The level is chosen by the hierarchy operation, not by the draft; a draft
/// only names the segment and (where applicable) its ancestors.
///
/// # Examples
///
/// ```
/// use platform_segments::SegmentDraft;
///
/// let draft = SegmentDraft::new("Website", "website").with_parent("acme", "Acme");
/// assert_eq!(draft.parent_slug.as_deref(), Some("acme"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDraft {
    /// Human-readable name
    pub name: String,

    /// URL-friendly slug
    pub slug: String,

    /// Parent slug
    #[serde(default)]
    pub parent_slug: Option<String>,

    /// Parent name
    #[serde(default)]
    pub parent_name: Option<String>,

    /// Grandparent slug
    #[serde(default)]
    pub grandparent_slug: Option<String>,

    /// Grandparent name
    #[serde(default)]
    pub grandparent_name: Option<String>,
}

impl SegmentDraft {
    /// Create a draft with no ancestor references.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            parent_slug: None,
            parent_name: None,
            grandparent_slug: None,
            grandparent_name: None,
        }
    }

    /// Set the parent reference.
    pub fn with_parent(mut self, slug: impl Into<String>, name: impl Into<String>) -> Self {
        self.parent_slug = Some(slug.into());
        self.parent_name = Some(name.into());
        self
    }

    /// Set the grandparent reference.
    pub fn with_grandparent(mut self, slug: impl Into<String>, name: impl Into<String>) -> Self {
        self.grandparent_slug = Some(slug.into());
        self.grandparent_name = Some(name.into());
        self
    }
}

/// Field update for an existing segment.
///
/// All fields are optional; absent fields are left untouched. The
/// configuration blobs are replaced wholesale when present (read-modify-write
/// at the blob level).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentPatch {
    /// New name
    #[serde(default)]
    pub name: Option<String>,

    /// New slug
    #[serde(default)]
    pub slug: Option<String>,

    /// Replacement activity-type configuration
    #[serde(default)]
    pub custom_activity_types: Option<ActivityTypeMap>,

    /// Replacement activity-channel configuration
    #[serde(default)]
    pub activity_channels: Option<ActivityChannelMap>,
}

impl SegmentPatch {
    /// Patch that renames a segment.
    pub fn rename(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            slug: Some(slug.into()),
            ..Self::default()
        }
    }
}

/// Criteria for listing segments at one level.
#[derive(Debug, Clone, Default)]
pub struct SegmentQuery {
    /// Case-insensitive substring filter on the name
    pub name_contains: Option<String>,

    /// Maximum number of rows to return
    pub limit: Option<usize>,

    /// Number of rows to skip
    pub offset: usize,
}

impl SegmentQuery {
    /// Check whether a segment satisfies the filter criteria.
    ///
    /// `limit`/`offset` are windowing, not filtering, and are applied by the
    /// repository after matching.
    pub fn matches(&self, segment: &Segment) -> bool {
        match &self.name_contains {
            Some(needle) => segment
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}
