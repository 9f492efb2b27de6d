//! Segment query facade
//!
//! Read-only lookups delegated straight to the repository. No business logic
//! lives here: not-found lookups yield `None`, never an error, and whatever
//! the repository signals is propagated untouched.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::SegmentResult;
use crate::repository::SegmentRepository;
use crate::segment::{Segment, SegmentLevel, SegmentQuery};

/// Read-only segment lookups.
pub struct SegmentQueryService {
    repository: Arc<dyn SegmentRepository>,
}

impl SegmentQueryService {
    /// Create a new facade over a repository.
    pub fn new(repository: Arc<dyn SegmentRepository>) -> Self {
        Self { repository }
    }

    /// Find a segment by id.
    pub async fn find_by_id(&self, id: Uuid) -> SegmentResult<Option<Segment>> {
        self.repository.find_by_id(id).await
    }

    /// Find a segment by slug at a given level.
    pub async fn find_by_slug(
        &self,
        slug: &str,
        level: SegmentLevel,
    ) -> SegmentResult<Option<Segment>> {
        self.repository.find_by_slug(slug, level).await
    }

    /// List project groups matching the criteria.
    pub async fn project_groups(&self, query: &SegmentQuery) -> SegmentResult<Vec<Segment>> {
        self.repository
            .find_by_level(SegmentLevel::ProjectGroup, query)
            .await
    }

    /// List projects matching the criteria.
    pub async fn projects(&self, query: &SegmentQuery) -> SegmentResult<Vec<Segment>> {
        self.repository
            .find_by_level(SegmentLevel::Project, query)
            .await
    }

    /// List subprojects matching the criteria.
    pub async fn subprojects(&self, query: &SegmentQuery) -> SegmentResult<Vec<Segment>> {
        self.repository
            .find_by_level(SegmentLevel::Subproject, query)
            .await
    }
}
