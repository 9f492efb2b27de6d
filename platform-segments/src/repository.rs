//! Segment repository abstraction
//!
//! This module defines the storage contract consumed by the services and an
//! in-memory implementation suitable for embedding and testing.
//!
//! Multi-step mutations go through [`SegmentTransaction`]: a one-shot handle
//! whose writes become visible all at once on `commit` and disappear on
//! `rollback` (or on drop). Single-row configuration writes go through
//! [`SegmentRepository::update`] directly.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{SegmentError, SegmentResult};
use crate::segment::{Segment, SegmentDraft, SegmentLevel, SegmentPatch, SegmentQuery};

/// Name/slug payload for the bulk child update issued after a rename.
#[derive(Debug, Clone, Default)]
pub struct ChildRename {
    /// New parent name to stamp onto children
    pub name: Option<String>,

    /// New parent slug to stamp onto children
    pub slug: Option<String>,
}

impl ChildRename {
    /// Whether the rename carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.slug.is_none()
    }
}

/// Storage contract for segments.
///
/// Implementations must enforce sibling slug uniqueness: two segments at the
/// same level with the same slug under the same parent chain may never both
/// be persisted, including when staged by racing transactions.
#[async_trait]
pub trait SegmentRepository: Send + Sync {
    /// Open a transaction for a multi-step mutation.
    async fn begin(&self) -> SegmentResult<Box<dyn SegmentTransaction>>;

    /// Create a single segment outside any transaction.
    async fn create(&self, level: SegmentLevel, draft: &SegmentDraft) -> SegmentResult<Segment>;

    /// Apply a field update to a single segment outside any transaction.
    async fn update(&self, id: Uuid, patch: &SegmentPatch) -> SegmentResult<Segment>;

    /// Find a segment by id.
    async fn find_by_id(&self, id: Uuid) -> SegmentResult<Option<Segment>>;

    /// Find a segment by slug at a given level.
    async fn find_by_slug(&self, slug: &str, level: SegmentLevel)
        -> SegmentResult<Option<Segment>>;

    /// List segments at one level matching the query criteria.
    async fn find_by_level(
        &self,
        level: SegmentLevel,
        query: &SegmentQuery,
    ) -> SegmentResult<Vec<Segment>>;
}

/// One-shot transactional write handle.
///
/// Writes issued through the handle are invisible to readers until `commit`;
/// dropping the handle without committing discards them.
#[async_trait]
pub trait SegmentTransaction: Send {
    /// Stage a segment creation.
    async fn create(&mut self, level: SegmentLevel, draft: &SegmentDraft)
        -> SegmentResult<Segment>;

    /// Stage a field update on an existing segment.
    async fn update(&mut self, id: Uuid, patch: &SegmentPatch) -> SegmentResult<Segment>;

    /// Stage the denormalized parent name/slug refresh on every direct child
    /// of the given parent. Returns the number of children touched.
    ///
    /// Children are matched through the parent's committed (pre-rename) slug,
    /// so this must be called in the same transaction as the parent rename.
    async fn update_children_bulk(
        &mut self,
        parent_id: Uuid,
        rename: &ChildRename,
    ) -> SegmentResult<u64>;

    /// Atomically apply every staged write.
    async fn commit(self: Box<Self>) -> SegmentResult<()>;

    /// Discard every staged write.
    async fn rollback(self: Box<Self>) -> SegmentResult<()>;
}

type SharedSegments = Arc<RwLock<HashMap<Uuid, Segment>>>;

/// In-memory segment repository.
///
/// Suitable for single-process embedding and testing. Transactions stage
/// their writes in a private overlay and apply them under one write lock on
/// commit, so a reader never observes a partially applied cascade.
#[derive(Clone)]
pub struct MemorySegmentRepository {
    segments: SharedSegments,
}

impl std::fmt::Debug for MemorySegmentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySegmentRepository").finish()
    }
}

impl MemorySegmentRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            segments: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of persisted segments.
    pub async fn segment_count(&self) -> usize {
        self.segments.read().await.len()
    }
}

impl Default for MemorySegmentRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Check whether `existing` occupies the slot `draft` wants: same level,
/// same slug, same parent chain.
fn is_sibling_conflict(existing: &Segment, level: SegmentLevel, draft: &SegmentDraft) -> bool {
    existing.level == level
        && existing.slug == draft.slug
        && existing.parent_slug == draft.parent_slug
        && existing.grandparent_slug == draft.grandparent_slug
}

#[async_trait]
impl SegmentRepository for MemorySegmentRepository {
    async fn begin(&self) -> SegmentResult<Box<dyn SegmentTransaction>> {
        Ok(Box::new(MemoryTransaction {
            segments: self.segments.clone(),
            staged: HashMap::new(),
            created: Vec::new(),
        }))
    }

    async fn create(&self, level: SegmentLevel, draft: &SegmentDraft) -> SegmentResult<Segment> {
        let mut segments = self.segments.write().await;
        if segments
            .values()
            .any(|existing| is_sibling_conflict(existing, level, draft))
        {
            return Err(SegmentError::DuplicateSlug {
                level,
                slug: draft.slug.clone(),
            });
        }
        let segment = Segment::new(level, draft);
        segments.insert(segment.id, segment.clone());
        Ok(segment)
    }

    async fn update(&self, id: Uuid, patch: &SegmentPatch) -> SegmentResult<Segment> {
        let mut segments = self.segments.write().await;
        let segment = segments
            .get_mut(&id)
            .ok_or(SegmentError::SegmentNotFound { id })?;
        segment.apply(patch);
        Ok(segment.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> SegmentResult<Option<Segment>> {
        Ok(self.segments.read().await.get(&id).cloned())
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        level: SegmentLevel,
    ) -> SegmentResult<Option<Segment>> {
        Ok(self
            .segments
            .read()
            .await
            .values()
            .find(|segment| segment.level == level && segment.slug == slug)
            .cloned())
    }

    async fn find_by_level(
        &self,
        level: SegmentLevel,
        query: &SegmentQuery,
    ) -> SegmentResult<Vec<Segment>> {
        let segments = self.segments.read().await;
        let mut matches: Vec<Segment> = segments
            .values()
            .filter(|segment| segment.level == level && query.matches(segment))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.slug.cmp(&b.slug).then_with(|| a.id.cmp(&b.id)));

        let offset = query.offset.min(matches.len());
        let mut windowed = matches.split_off(offset);
        if let Some(limit) = query.limit {
            windowed.truncate(limit);
        }
        Ok(windowed)
    }
}

/// Staged-overlay transaction over [`MemorySegmentRepository`].
struct MemoryTransaction {
    segments: SharedSegments,
    /// Writes staged by this transaction, keyed by segment id
    staged: HashMap<Uuid, Segment>,
    /// Ids of segments created (not merely updated) by this transaction
    created: Vec<Uuid>,
}

#[async_trait]
impl SegmentTransaction for MemoryTransaction {
    async fn create(
        &mut self,
        level: SegmentLevel,
        draft: &SegmentDraft,
    ) -> SegmentResult<Segment> {
        let conflict = {
            let base = self.segments.read().await;
            base.values()
                .filter(|existing| !self.staged.contains_key(&existing.id))
                .chain(self.staged.values())
                .any(|existing| is_sibling_conflict(existing, level, draft))
        };
        if conflict {
            return Err(SegmentError::DuplicateSlug {
                level,
                slug: draft.slug.clone(),
            });
        }

        let segment = Segment::new(level, draft);
        self.created.push(segment.id);
        self.staged.insert(segment.id, segment.clone());
        Ok(segment)
    }

    async fn update(&mut self, id: Uuid, patch: &SegmentPatch) -> SegmentResult<Segment> {
        let mut segment = match self.staged.get(&id) {
            Some(staged) => staged.clone(),
            None => self
                .segments
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or(SegmentError::SegmentNotFound { id })?,
        };
        segment.apply(patch);
        self.staged.insert(id, segment.clone());
        Ok(segment)
    }

    async fn update_children_bulk(
        &mut self,
        parent_id: Uuid,
        rename: &ChildRename,
    ) -> SegmentResult<u64> {
        let mut children = Vec::new();
        {
            let base = self.segments.read().await;

            // Children link to the parent by slug; resolve it from the
            // committed row so a rename staged earlier in this transaction
            // does not break the match.
            let parent = base
                .get(&parent_id)
                .or_else(|| self.staged.get(&parent_id))
                .ok_or(SegmentError::SegmentNotFound { id: parent_id })?;

            let child_level = match parent.level.child() {
                Some(level) => level,
                None => return Ok(0),
            };
            let parent_slug = parent.slug.clone();

            for segment in base
                .values()
                .filter(|existing| !self.staged.contains_key(&existing.id))
                .chain(self.staged.values())
            {
                if segment.level == child_level
                    && segment.parent_slug.as_deref() == Some(parent_slug.as_str())
                {
                    children.push(segment.clone());
                }
            }
        }

        let count = children.len() as u64;
        for mut child in children {
            if let Some(name) = &rename.name {
                child.parent_name = Some(name.clone());
            }
            if let Some(slug) = &rename.slug {
                child.parent_slug = Some(slug.clone());
            }
            child.updated_at = Utc::now();
            self.staged.insert(child.id, child);
        }
        Ok(count)
    }

    async fn commit(self: Box<Self>) -> SegmentResult<()> {
        let mut base = self.segments.write().await;

        // Re-validate staged creates against rows committed since `begin`:
        // of two racing creators of the same sibling slug, the later commit
        // fails instead of silently duplicating.
        for id in &self.created {
            if let Some(segment) = self.staged.get(id) {
                let draft = SegmentDraft {
                    name: segment.name.clone(),
                    slug: segment.slug.clone(),
                    parent_slug: segment.parent_slug.clone(),
                    parent_name: segment.parent_name.clone(),
                    grandparent_slug: segment.grandparent_slug.clone(),
                    grandparent_name: segment.grandparent_name.clone(),
                };
                if base
                    .values()
                    .any(|existing| is_sibling_conflict(existing, segment.level, &draft))
                {
                    return Err(SegmentError::DuplicateSlug {
                        level: segment.level,
                        slug: segment.slug.clone(),
                    });
                }
            }
        }

        for (id, segment) in self.staged {
            base.insert(id, segment);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> SegmentResult<()> {
        // Staged writes are private to the handle; dropping them is the rollback.
        Ok(())
    }
}
