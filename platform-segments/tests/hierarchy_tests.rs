//! End-to-end tests for segment cascades and activity configuration.
//!
//! These tests drive the public services against the in-memory repository
//! and verify the all-or-nothing cascade contract by injecting a failure at
//! every write index of each cascade.

use std::sync::Arc;

use async_trait::async_trait;
use platform_segments::{
    ActivityConfigService, ActivityTypeInput, ChannelUpdate, ChildRename, MemorySegmentRepository,
    Segment, SegmentDraft, SegmentError, SegmentHierarchyService, SegmentLevel, SegmentPatch,
    SegmentQuery, SegmentQueryService, SegmentRepository, SegmentResult, SegmentTransaction,
};
use uuid::Uuid;

/// Test fixture wiring all three services over one in-memory repository.
struct TestFixture {
    repository: Arc<MemorySegmentRepository>,
    hierarchy: SegmentHierarchyService,
    config: ActivityConfigService,
    queries: SegmentQueryService,
}

impl TestFixture {
    fn new() -> Self {
        let repository = Arc::new(MemorySegmentRepository::new());
        Self {
            hierarchy: SegmentHierarchyService::new(repository.clone()),
            config: ActivityConfigService::new(repository.clone()),
            queries: SegmentQueryService::new(repository.clone()),
            repository,
        }
    }
}

/// Repository decorator that fails the Nth transactional create.
///
/// Everything else delegates to the wrapped in-memory repository, so a
/// cascade aborted mid-flight exercises the real rollback path.
struct FailingRepository {
    inner: Arc<MemorySegmentRepository>,
    fail_at: usize,
}

impl FailingRepository {
    fn new(inner: Arc<MemorySegmentRepository>, fail_at: usize) -> Self {
        Self { inner, fail_at }
    }
}

#[async_trait]
impl SegmentRepository for FailingRepository {
    async fn begin(&self) -> SegmentResult<Box<dyn SegmentTransaction>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FailingTransaction {
            inner,
            fail_at: self.fail_at,
            step: 0,
        }))
    }

    async fn create(&self, level: SegmentLevel, draft: &SegmentDraft) -> SegmentResult<Segment> {
        self.inner.create(level, draft).await
    }

    async fn update(&self, id: Uuid, patch: &SegmentPatch) -> SegmentResult<Segment> {
        self.inner.update(id, patch).await
    }

    async fn find_by_id(&self, id: Uuid) -> SegmentResult<Option<Segment>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        level: SegmentLevel,
    ) -> SegmentResult<Option<Segment>> {
        self.inner.find_by_slug(slug, level).await
    }

    async fn find_by_level(
        &self,
        level: SegmentLevel,
        query: &SegmentQuery,
    ) -> SegmentResult<Vec<Segment>> {
        self.inner.find_by_level(level, query).await
    }
}

struct FailingTransaction {
    inner: Box<dyn SegmentTransaction>,
    fail_at: usize,
    step: usize,
}

#[async_trait]
impl SegmentTransaction for FailingTransaction {
    async fn create(
        &mut self,
        level: SegmentLevel,
        draft: &SegmentDraft,
    ) -> SegmentResult<Segment> {
        let step = self.step;
        self.step += 1;
        if step == self.fail_at {
            return Err(SegmentError::Storage {
                message: format!("injected failure at write {step}"),
            });
        }
        self.inner.create(level, draft).await
    }

    async fn update(&mut self, id: Uuid, patch: &SegmentPatch) -> SegmentResult<Segment> {
        self.inner.update(id, patch).await
    }

    async fn update_children_bulk(
        &mut self,
        parent_id: Uuid,
        rename: &ChildRename,
    ) -> SegmentResult<u64> {
        self.inner.update_children_bulk(parent_id, rename).await
    }

    async fn commit(self: Box<Self>) -> SegmentResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> SegmentResult<()> {
        self.inner.rollback().await
    }
}

// =============================================================================
// Cascade shape
// =============================================================================

#[tokio::test]
async fn group_cascade_yields_three_consistent_rows() {
    let fixture = TestFixture::new();

    let group = fixture
        .hierarchy
        .create_project_group(SegmentDraft::new("Acme", "acme"))
        .await
        .unwrap();

    assert_eq!(fixture.repository.segment_count().await, 3);
    assert_eq!(group.level, SegmentLevel::ProjectGroup);
    assert!(group.parent_slug.is_none() && group.grandparent_slug.is_none());

    let project = fixture
        .queries
        .find_by_slug("acme", SegmentLevel::Project)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.parent_slug.as_deref(), Some("acme"));
    assert!(project.grandparent_slug.is_none());

    let subproject = fixture
        .queries
        .find_by_slug("acme", SegmentLevel::Subproject)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subproject.parent_slug.as_deref(), Some("acme"));
    assert_eq!(subproject.grandparent_slug.as_deref(), Some("acme"));
}

#[tokio::test]
async fn project_cascade_yields_two_rows_under_existing_group() {
    let fixture = TestFixture::new();
    fixture
        .hierarchy
        .create_project_group(SegmentDraft::new("Acme", "acme"))
        .await
        .unwrap();

    fixture
        .hierarchy
        .create_project(SegmentDraft::new("Website", "website").with_parent("acme", "Acme"))
        .await
        .unwrap();

    assert_eq!(fixture.repository.segment_count().await, 5);

    let subproject = fixture
        .queries
        .find_by_slug("website", SegmentLevel::Subproject)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subproject.parent_slug.as_deref(), Some("website"));
    assert_eq!(subproject.grandparent_slug.as_deref(), Some("acme"));
    assert_eq!(subproject.grandparent_name.as_deref(), Some("Acme"));
}

#[tokio::test]
async fn project_with_unknown_group_writes_nothing() {
    let fixture = TestFixture::new();

    let err = fixture
        .hierarchy
        .create_project(SegmentDraft::new("Website", "website").with_parent("ghost", "Ghost"))
        .await
        .unwrap_err();

    assert!(matches!(err, SegmentError::ParentGroupNotFound { .. }));
    assert_eq!(fixture.repository.segment_count().await, 0);
}

#[tokio::test]
async fn subproject_creation_is_a_single_row() {
    let fixture = TestFixture::new();
    fixture
        .hierarchy
        .create_project_group(SegmentDraft::new("Acme", "acme"))
        .await
        .unwrap();

    fixture
        .hierarchy
        .create_subproject(
            SegmentDraft::new("Crawler", "crawler")
                .with_parent("acme", "Acme")
                .with_grandparent("acme", "Acme"),
        )
        .await
        .unwrap();

    assert_eq!(fixture.repository.segment_count().await, 4);
}

// =============================================================================
// All-or-nothing cascades
// =============================================================================

#[tokio::test]
async fn group_cascade_failure_at_every_step_persists_nothing() {
    for fail_at in 0..3 {
        let store = Arc::new(MemorySegmentRepository::new());
        let failing = Arc::new(FailingRepository::new(store.clone(), fail_at));
        let hierarchy = SegmentHierarchyService::new(failing);

        let err = hierarchy
            .create_project_group(SegmentDraft::new("Acme", "acme"))
            .await
            .unwrap_err();

        // The injected error surfaces unchanged
        match err {
            SegmentError::Storage { message } => {
                assert_eq!(message, format!("injected failure at write {fail_at}"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.segment_count().await, 0, "fail_at={fail_at}");
    }
}

#[tokio::test]
async fn project_cascade_failure_at_every_step_persists_nothing_new() {
    for fail_at in 0..2 {
        let store = Arc::new(MemorySegmentRepository::new());
        let seed = SegmentHierarchyService::new(store.clone());
        seed.create_project_group(SegmentDraft::new("Acme", "acme"))
            .await
            .unwrap();
        assert_eq!(store.segment_count().await, 3);

        let failing = Arc::new(FailingRepository::new(store.clone(), fail_at));
        let hierarchy = SegmentHierarchyService::new(failing);
        let err = hierarchy
            .create_project(SegmentDraft::new("Website", "website").with_parent("acme", "Acme"))
            .await
            .unwrap_err();

        assert!(matches!(err, SegmentError::Storage { .. }));
        assert_eq!(store.segment_count().await, 3, "fail_at={fail_at}");
    }
}

// =============================================================================
// Rename propagation
// =============================================================================

#[tokio::test]
async fn project_rename_refreshes_its_subprojects() {
    let fixture = TestFixture::new();
    fixture
        .hierarchy
        .create_project_group(SegmentDraft::new("Acme", "acme"))
        .await
        .unwrap();
    let project = fixture
        .hierarchy
        .create_project(SegmentDraft::new("Website", "website").with_parent("acme", "Acme"))
        .await
        .unwrap();

    fixture
        .hierarchy
        .update(project.id, SegmentPatch::rename("Webshop", "webshop"))
        .await
        .unwrap();

    let subproject = fixture
        .queries
        .find_by_slug("website", SegmentLevel::Subproject)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subproject.parent_slug.as_deref(), Some("webshop"));
    assert_eq!(subproject.parent_name.as_deref(), Some("Webshop"));
    // The subproject's own identity and grandparent copies are untouched
    assert_eq!(subproject.slug, "website");
    assert_eq!(subproject.grandparent_slug.as_deref(), Some("acme"));
}

#[tokio::test]
async fn subproject_rename_touches_only_itself() {
    let fixture = TestFixture::new();
    fixture
        .hierarchy
        .create_project_group(SegmentDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let subproject = fixture
        .queries
        .find_by_slug("acme", SegmentLevel::Subproject)
        .await
        .unwrap()
        .unwrap();
    fixture
        .hierarchy
        .update(subproject.id, SegmentPatch::rename("Leaf", "leaf"))
        .await
        .unwrap();

    assert_eq!(fixture.repository.segment_count().await, 3);
    let group = fixture
        .queries
        .find_by_slug("acme", SegmentLevel::ProjectGroup)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(group.name, "Acme");
}

// =============================================================================
// Activity configuration end to end
// =============================================================================

#[tokio::test]
async fn activity_type_lifecycle() {
    let fixture = TestFixture::new();
    let group = fixture
        .hierarchy
        .create_project_group(SegmentDraft::new("Acme", "acme"))
        .await
        .unwrap();

    // Create, then create again: the second call changes nothing
    let first = fixture
        .config
        .create_activity_type(group.id, ActivityTypeInput::new("Star"), Some("github"))
        .await
        .unwrap();
    let second = fixture
        .config
        .create_activity_type(group.id, ActivityTypeInput::new("Star"), Some("github"))
        .await
        .unwrap();
    assert_eq!(first, second);

    // Update in place under the owning platform
    let updated = fixture
        .config
        .update_activity_type(group.id, "star", ActivityTypeInput::new("Starred"))
        .await
        .unwrap();
    assert_eq!(
        updated.get("github", "star").unwrap().display.default,
        "Starred"
    );

    // Destroy, then destroy again: idempotent
    let destroyed = fixture
        .config
        .destroy_activity_type(group.id, "star")
        .await
        .unwrap();
    assert!(destroyed.is_empty());
    let again = fixture
        .config
        .destroy_activity_type(group.id, "star")
        .await
        .unwrap();
    assert_eq!(again, destroyed);
}

#[tokio::test]
async fn activity_channels_lifecycle() {
    let fixture = TestFixture::new();
    let group = fixture
        .hierarchy
        .create_project_group(SegmentDraft::new("Acme", "acme"))
        .await
        .unwrap();

    for channel in ["general", "support", "general"] {
        fixture
            .config
            .update_activity_channels(
                group.id,
                ChannelUpdate {
                    platform: "discord".to_string(),
                    channel: channel.to_string(),
                },
            )
            .await
            .unwrap();
    }

    let segment = fixture
        .queries
        .find_by_id(group.id)
        .await
        .unwrap()
        .unwrap();
    let channels = segment.activity_channels;
    assert_eq!(
        channels.channels("discord"),
        Some(&["general".to_string(), "support".to_string()][..])
    );
}

#[tokio::test]
async fn configuration_survives_a_rename() {
    let fixture = TestFixture::new();
    let group = fixture
        .hierarchy
        .create_project_group(SegmentDraft::new("Acme", "acme"))
        .await
        .unwrap();
    fixture
        .config
        .create_activity_type(group.id, ActivityTypeInput::new("Star"), Some("github"))
        .await
        .unwrap();

    fixture
        .hierarchy
        .update(group.id, SegmentPatch::rename("Acme Corp", "acme-corp"))
        .await
        .unwrap();

    let types = fixture.config.list_activity_types(group.id).await.unwrap();
    assert!(types.get("github", "star").is_some());
}
