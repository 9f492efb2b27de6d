//! Activity configuration service
//!
//! Mutations and reads of a segment's activity-type and activity-channel
//! configuration. Every operation addresses the segment by explicit id and
//! performs a whole-blob read-modify-write through the repository's
//! single-row `update` — no transaction is involved, and concurrent writers
//! to the same segment resolve last-writer-wins at the blob level.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activity::{
    ActivityChannelMap, ActivityTypeDisplay, ActivityTypeMap, ActivityTypeSettings,
    DEFAULT_PLATFORM,
};
use crate::error::{SegmentError, SegmentResult};
use crate::repository::SegmentRepository;
use crate::segment::{Segment, SegmentPatch};

/// Input for creating or updating a custom activity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTypeInput {
    /// Raw type label, e.g. "Star"
    #[serde(rename = "type")]
    pub label: String,
}

impl ActivityTypeInput {
    /// Build an input from a raw label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// Input for appending an activity channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelUpdate {
    /// Platform the channel belongs to
    pub platform: String,

    /// Channel name to append
    pub channel: String,
}

/// Service owning per-segment activity configuration.
pub struct ActivityConfigService {
    repository: Arc<dyn SegmentRepository>,
}

impl ActivityConfigService {
    /// Create a new service over a repository.
    pub fn new(repository: Arc<dyn SegmentRepository>) -> Self {
        Self { repository }
    }

    /// Register a custom activity type under a platform.
    ///
    /// Type and platform keys are lowercased; a missing platform falls back
    /// to the `"other"` sentinel. Creating a key that already exists under
    /// the same platform is an idempotent no-op returning the unchanged
    /// configuration.
    pub async fn create_activity_type(
        &self,
        segment_id: Uuid,
        input: ActivityTypeInput,
        platform: Option<&str>,
    ) -> SegmentResult<ActivityTypeMap> {
        let label = require_label(&input)?;
        let key = label.to_lowercase();
        let platform_key = platform.unwrap_or(DEFAULT_PLATFORM).to_lowercase();

        let segment = self.load(segment_id).await?;
        let mut types = segment.custom_activity_types.clone();
        if !types.insert_if_absent(&platform_key, &key, ActivityTypeSettings::from_label(label)) {
            return Ok(segment.custom_activity_types);
        }

        let updated = self.store_types(segment_id, types).await?;
        tracing::debug!(
            segment_id = %segment_id,
            platform = %platform_key,
            key = %key,
            "activity type created"
        );
        Ok(updated)
    }

    /// Update the display texts of an existing activity type.
    ///
    /// The key is resolved through the flattened view; an absent key is a
    /// not-found error. The entry stays on the platform that owns it — only
    /// its display texts change.
    pub async fn update_activity_type(
        &self,
        segment_id: Uuid,
        key: &str,
        input: ActivityTypeInput,
    ) -> SegmentResult<ActivityTypeMap> {
        let label = require_label(&input)?;

        let segment = self.load(segment_id).await?;
        let flat = segment.custom_activity_types.flatten();
        let owner = flat
            .get(key)
            .ok_or_else(|| SegmentError::ActivityTypeNotFound {
                key: key.to_string(),
            })?;

        let settings = ActivityTypeSettings {
            display: ActivityTypeDisplay::from_label(label),
            is_contribution: owner.settings.is_contribution,
        };
        let platform = owner.platform.clone();

        let mut types = segment.custom_activity_types.clone();
        types.replace(&platform, key, settings);

        let updated = self.store_types(segment_id, types).await?;
        tracing::debug!(
            segment_id = %segment_id,
            platform = %platform,
            key = %key,
            "activity type updated"
        );
        Ok(updated)
    }

    /// Remove an activity type by key.
    ///
    /// Deleting a key absent from the flattened view is an idempotent no-op
    /// returning the unchanged configuration.
    pub async fn destroy_activity_type(
        &self,
        segment_id: Uuid,
        key: &str,
    ) -> SegmentResult<ActivityTypeMap> {
        let segment = self.load(segment_id).await?;
        let flat = segment.custom_activity_types.flatten();
        let Some(owner) = flat.get(key) else {
            return Ok(segment.custom_activity_types);
        };
        let platform = owner.platform.clone();

        let mut types = segment.custom_activity_types.clone();
        types.remove(&platform, key);

        let updated = self.store_types(segment_id, types).await?;
        tracing::debug!(
            segment_id = %segment_id,
            platform = %platform,
            key = %key,
            "activity type destroyed"
        );
        Ok(updated)
    }

    /// The segment's current nested activity-type configuration.
    pub async fn list_activity_types(&self, segment_id: Uuid) -> SegmentResult<ActivityTypeMap> {
        Ok(self.load(segment_id).await?.custom_activity_types)
    }

    /// Append a channel to a platform's activity channel list.
    ///
    /// Creates a singleton list for a platform seen for the first time;
    /// a channel already present is not appended again.
    pub async fn update_activity_channels(
        &self,
        segment_id: Uuid,
        update: ChannelUpdate,
    ) -> SegmentResult<ActivityChannelMap> {
        if update.channel.trim().is_empty() {
            return Err(SegmentError::MissingField { field: "channel" });
        }

        let segment = self.load(segment_id).await?;
        let mut channels = segment.activity_channels.clone();
        channels.add(&update.platform, &update.channel);

        let patch = SegmentPatch {
            activity_channels: Some(channels),
            ..SegmentPatch::default()
        };
        let updated = self.repository.update(segment_id, &patch).await?;
        tracing::debug!(
            segment_id = %segment_id,
            platform = %update.platform,
            channel = %update.channel,
            "activity channels updated"
        );
        Ok(updated.activity_channels)
    }

    async fn load(&self, segment_id: Uuid) -> SegmentResult<Segment> {
        self.repository
            .find_by_id(segment_id)
            .await?
            .ok_or(SegmentError::SegmentNotFound { id: segment_id })
    }

    async fn store_types(
        &self,
        segment_id: Uuid,
        types: ActivityTypeMap,
    ) -> SegmentResult<ActivityTypeMap> {
        let patch = SegmentPatch {
            custom_activity_types: Some(types),
            ..SegmentPatch::default()
        };
        let updated = self.repository.update(segment_id, &patch).await?;
        Ok(updated.custom_activity_types)
    }
}

fn require_label(input: &ActivityTypeInput) -> SegmentResult<&str> {
    let label = input.label.trim();
    if label.is_empty() {
        return Err(SegmentError::MissingField { field: "type" });
    }
    Ok(label)
}
