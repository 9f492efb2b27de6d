//! # Platform Segment Management
//!
//! This crate provides hierarchical segment management for the Relay
//! platform: a three-level tree of project groups, projects, and
//! subprojects, with per-segment activity configuration.
//!
//! ## Overview
//!
//! The platform-segments crate handles:
//! - **Segments**: the three-level hierarchy with denormalized ancestor
//!   names/slugs on child rows
//! - **Cascades**: creating a group or project also materializes its
//!   placeholder descendants; renames refresh the denormalized copies on
//!   direct children — each cascade applied atomically in one transaction
//! - **Activity configuration**: per-segment custom activity-type
//!   definitions (with a flat, key-unique projection) and activity channel
//!   lists
//! - **Queries**: read-only lookups by id, slug, and level
//!
//! ## Architecture
//!
//! ```text
//! SegmentHierarchyService ──┐
//! ActivityConfigService ────┼──→ SegmentRepository (trait)
//! SegmentQueryService ──────┘         └─ MemorySegmentRepository
//!
//! ProjectGroup
//!   └─ Project            (parent_slug/parent_name → group)
//!        └─ Subproject    (+ grandparent_slug/grandparent_name → group)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use platform_segments::{ActivityTypeMap, ActivityTypeSettings, SegmentDraft};
//!
//! // Draft a project group; the hierarchy service materializes its
//! // placeholder project and subproject alongside it.
//! let draft = SegmentDraft::new("Acme", "acme");
//! assert!(draft.parent_slug.is_none());
//!
//! // Per-segment activity-type configuration with a flat projection
//! let mut types = ActivityTypeMap::new();
//! types.insert_if_absent("github", "star", ActivityTypeSettings::from_label("Star"));
//! assert_eq!(types.flatten().get("star").unwrap().platform, "github");
//! ```
//!
//! ## Cross-App Integration
//!
//! This crate is designed to work with:
//! - `platform-auth`: Authentication and session management
//! - `platform-rbac`: Fine-grained permission management

pub mod activity;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod query;
pub mod repository;
pub mod segment;

// Re-export main types for convenience
pub use activity::{
    ActivityChannelMap, ActivityTypeDisplay, ActivityTypeMap, ActivityTypeSettings,
    FlatActivityType, FlattenedActivityTypes, ShadowedActivityType, DEFAULT_PLATFORM,
};
pub use config::{ActivityConfigService, ActivityTypeInput, ChannelUpdate};
pub use error::{SegmentError, SegmentResult};
pub use hierarchy::SegmentHierarchyService;
pub use query::SegmentQueryService;
pub use repository::{ChildRename, MemorySegmentRepository, SegmentRepository, SegmentTransaction};
pub use segment::{Segment, SegmentDraft, SegmentLevel, SegmentPatch, SegmentQuery};
