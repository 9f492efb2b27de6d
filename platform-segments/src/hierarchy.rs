//! Segment hierarchy service
//!
//! Owns the creation and rename cascade rules across the three levels.
//!
//! Creating a node at one level materializes its descendant placeholder
//! counterparts: a project group yields a project and a subproject that
//! mirror its name and slug; a project yields a mirroring subproject;
//! subprojects are leaves and cascade nothing. Renaming a project group or
//! project refreshes the denormalized `parent_*` copies on every direct
//! child. Each multi-step mutation is submitted as an ordered list of writes
//! inside a single transaction, so a reader never observes a partially
//! materialized cascade.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{SegmentError, SegmentResult};
use crate::repository::{ChildRename, SegmentRepository, SegmentTransaction};
use crate::segment::{Segment, SegmentDraft, SegmentLevel, SegmentPatch};

/// Service owning segment creation and update cascades.
pub struct SegmentHierarchyService {
    repository: Arc<dyn SegmentRepository>,
}

impl SegmentHierarchyService {
    /// Create a new service over a repository.
    pub fn new(repository: Arc<dyn SegmentRepository>) -> Self {
        Self { repository }
    }

    /// Create a project group together with its placeholder descendants.
    ///
    /// A group is always a root: a draft declaring `parent_slug` or
    /// `grandparent_slug` is rejected before any write. On success exactly
    /// three rows exist — the group, a project with `parent_slug` set to the
    /// group's slug, and a subproject whose parent and grandparent both
    /// reference the group. Returns the freshly re-read group.
    pub async fn create_project_group(&self, draft: SegmentDraft) -> SegmentResult<Segment> {
        if draft.parent_slug.is_some() || draft.parent_name.is_some() {
            return Err(SegmentError::UnexpectedField {
                level: SegmentLevel::ProjectGroup,
                field: "parent_slug",
            });
        }
        if draft.grandparent_slug.is_some() || draft.grandparent_name.is_some() {
            return Err(SegmentError::UnexpectedField {
                level: SegmentLevel::ProjectGroup,
                field: "grandparent_slug",
            });
        }
        require_named(&draft)?;

        let project = SegmentDraft::new(&draft.name, &draft.slug)
            .with_parent(&draft.slug, &draft.name);
        let subproject = SegmentDraft::new(&draft.name, &draft.slug)
            .with_parent(&draft.slug, &draft.name)
            .with_grandparent(&draft.slug, &draft.name);

        let group = self
            .create_cascade(
                (SegmentLevel::ProjectGroup, draft),
                vec![
                    (SegmentLevel::Project, project),
                    (SegmentLevel::Subproject, subproject),
                ],
            )
            .await?;

        tracing::debug!(
            segment_id = %group.id,
            slug = %group.slug,
            "project group created with placeholder descendants"
        );
        Ok(group)
    }

    /// Create a project under an existing group, with its placeholder
    /// subproject.
    ///
    /// The draft must name a parent group (`parent_slug`) and must not
    /// declare a grandparent. The group is resolved by slug before any write
    /// and its name is stamped onto the project's `parent_name` and the
    /// subproject's `grandparent_name`. Returns the re-read project.
    pub async fn create_project(&self, draft: SegmentDraft) -> SegmentResult<Segment> {
        if draft.grandparent_slug.is_some() || draft.grandparent_name.is_some() {
            return Err(SegmentError::UnexpectedField {
                level: SegmentLevel::Project,
                field: "grandparent_slug",
            });
        }
        let parent_slug = draft
            .parent_slug
            .clone()
            .ok_or(SegmentError::MissingField {
                field: "parent_slug",
            })?;
        require_named(&draft)?;

        let group = self
            .repository
            .find_by_slug(&parent_slug, SegmentLevel::ProjectGroup)
            .await?
            .ok_or_else(|| SegmentError::ParentGroupNotFound {
                slug: parent_slug.clone(),
            })?;

        let project = SegmentDraft::new(&draft.name, &draft.slug)
            .with_parent(&group.slug, &group.name);
        let subproject = SegmentDraft::new(&project.name, &project.slug)
            .with_parent(&project.slug, &project.name)
            .with_grandparent(&group.slug, &group.name);

        let project = self
            .create_cascade(
                (SegmentLevel::Project, project),
                vec![(SegmentLevel::Subproject, subproject)],
            )
            .await?;

        tracing::debug!(
            segment_id = %project.id,
            slug = %project.slug,
            group = %group.slug,
            "project created with placeholder subproject"
        );
        Ok(project)
    }

    /// Create a subproject directly.
    ///
    /// Subprojects are leaves: a single row is written, with no transaction
    /// and no cascade. The draft must carry both `parent_slug` and
    /// `grandparent_slug`.
    pub async fn create_subproject(&self, draft: SegmentDraft) -> SegmentResult<Segment> {
        if draft.parent_slug.is_none() {
            return Err(SegmentError::MissingField {
                field: "parent_slug",
            });
        }
        if draft.grandparent_slug.is_none() {
            return Err(SegmentError::MissingField {
                field: "grandparent_slug",
            });
        }
        require_named(&draft)?;

        let created = self
            .repository
            .create(SegmentLevel::Subproject, &draft)
            .await?;

        tracing::debug!(segment_id = %created.id, slug = %created.slug, "subproject created");
        self.reread(created.id).await
    }

    /// Apply a field update, propagating renames to direct children.
    ///
    /// When the segment is a project group or project and the patch changes
    /// its `name` or `slug`, the denormalized `parent_name`/`parent_slug`
    /// copies on every direct child are refreshed through one bulk update in
    /// the same transaction. Subproject updates never propagate.
    pub async fn update(&self, id: Uuid, patch: SegmentPatch) -> SegmentResult<Segment> {
        let existing = self.reread(id).await?;
        let rename = ChildRename {
            name: patch.name.clone().filter(|name| *name != existing.name),
            slug: patch.slug.clone().filter(|slug| *slug != existing.slug),
        };

        let mut txn = self.repository.begin().await?;
        if let Err(err) = txn.update(id, &patch).await {
            return abort(txn, err).await;
        }
        if !existing.level.is_subproject() && !rename.is_empty() {
            match txn.update_children_bulk(id, &rename).await {
                Ok(touched) => {
                    tracing::debug!(
                        segment_id = %id,
                        children = touched,
                        "rename propagated to direct children"
                    );
                }
                Err(err) => return abort(txn, err).await,
            }
        }
        txn.commit().await?;

        self.reread(id).await
    }

    /// Submit an ordered creation cascade in one transaction and return the
    /// re-read root segment.
    ///
    /// On any step failure the transaction is rolled back and the original
    /// error is propagated unchanged.
    async fn create_cascade(
        &self,
        root: (SegmentLevel, SegmentDraft),
        descendants: Vec<(SegmentLevel, SegmentDraft)>,
    ) -> SegmentResult<Segment> {
        let mut txn = self.repository.begin().await?;

        let created = match txn.create(root.0, &root.1).await {
            Ok(segment) => segment,
            Err(err) => return abort(txn, err).await,
        };
        for (level, draft) in &descendants {
            if let Err(err) = txn.create(*level, draft).await {
                return abort(txn, err).await;
            }
        }
        txn.commit().await?;

        self.reread(created.id).await
    }

    async fn reread(&self, id: Uuid) -> SegmentResult<Segment> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(SegmentError::SegmentNotFound { id })
    }
}

/// Roll back and propagate the original error unchanged.
///
/// A failure of the rollback itself is logged and swallowed so it cannot
/// mask the error that aborted the cascade.
async fn abort<T>(txn: Box<dyn SegmentTransaction>, err: SegmentError) -> SegmentResult<T> {
    if let Err(rollback_err) = txn.rollback().await {
        tracing::error!(error = %rollback_err, "rollback failed after aborted cascade");
    }
    Err(err)
}

fn require_named(draft: &SegmentDraft) -> SegmentResult<()> {
    if draft.name.trim().is_empty() {
        return Err(SegmentError::MissingField { field: "name" });
    }
    if draft.slug.trim().is_empty() {
        return Err(SegmentError::MissingField { field: "slug" });
    }
    Ok(())
}
