//! Activity configuration value types
//!
//! This module provides the per-segment activity configuration: custom
//! activity-type definitions keyed by platform then by type key, and
//! activity channel lists keyed by platform. Both are dedicated value types
//! with explicit merge operations (insert-if-absent, replace, remove) so the
//! whole-blob read-modify-write cycle on a segment stays testable.
//!
//! The nested type map has a flat projection ([`ActivityTypeMap::flatten`])
//! keyed by type key alone. Existence checks before mutation go through that
//! projection; when two platforms declare the same key, the later platform
//! wins and the shadowed entry is reported instead of silently disappearing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel platform used when a caller does not name one.
pub const DEFAULT_PLATFORM: &str = "other";

/// Display texts for an activity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTypeDisplay {
    /// Default display text
    pub default: String,

    /// Short display text
    pub short: String,

    /// Channel display text
    pub channel: String,
}

impl ActivityTypeDisplay {
    /// Build the display object for a raw type label.
    ///
    /// The label doubles as default and short text; the channel text starts
    /// empty.
    pub fn from_label(label: &str) -> Self {
        Self {
            default: label.to_string(),
            short: label.to_string(),
            channel: String::new(),
        }
    }
}

/// Settings for one custom activity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTypeSettings {
    /// Display texts
    pub display: ActivityTypeDisplay,

    /// Whether activities of this type count as contributions
    #[serde(default)]
    pub is_contribution: bool,
}

impl ActivityTypeSettings {
    /// Settings freshly derived from a raw type label.
    ///
    /// New custom types never count as contributions until explicitly
    /// promoted.
    pub fn from_label(label: &str) -> Self {
        Self {
            display: ActivityTypeDisplay::from_label(label),
            is_contribution: false,
        }
    }
}

/// Nested activity-type configuration: `platform → type key → settings`.
///
/// Platforms are kept in a `BTreeMap` so iteration order (and therefore the
/// winner of a flatten collision) is deterministic.
///
/// # Examples
///
/// ```
/// use platform_segments::{ActivityTypeMap, ActivityTypeSettings};
///
/// let mut types = ActivityTypeMap::new();
/// assert!(types.insert_if_absent("github", "star", ActivityTypeSettings::from_label("Star")));
/// // Second insert of the same key is a no-op
/// assert!(!types.insert_if_absent("github", "star", ActivityTypeSettings::from_label("Star")));
///
/// let flat = types.flatten();
/// assert_eq!(flat.get("star").unwrap().platform, "github");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityTypeMap(BTreeMap<String, BTreeMap<String, ActivityTypeSettings>>);

impl ActivityTypeMap {
    /// Empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a type under a platform unless that `(platform, key)` pair
    /// already exists.
    ///
    /// Returns `true` if the entry was inserted, `false` if the key was
    /// already present (in which case the existing settings are untouched).
    pub fn insert_if_absent(
        &mut self,
        platform: &str,
        key: &str,
        settings: ActivityTypeSettings,
    ) -> bool {
        let platform_types = self.0.entry(platform.to_string()).or_default();
        if platform_types.contains_key(key) {
            return false;
        }
        platform_types.insert(key.to_string(), settings);
        true
    }

    /// Replace the settings of an existing `(platform, key)` entry.
    ///
    /// Returns `false` (without inserting) when the entry does not exist;
    /// replacement never moves a key to a different platform.
    pub fn replace(&mut self, platform: &str, key: &str, settings: ActivityTypeSettings) -> bool {
        match self.0.get_mut(platform).and_then(|types| types.get_mut(key)) {
            Some(slot) => {
                *slot = settings;
                true
            }
            None => false,
        }
    }

    /// Remove a `(platform, key)` entry, pruning the platform map when it
    /// becomes empty.
    pub fn remove(&mut self, platform: &str, key: &str) -> Option<ActivityTypeSettings> {
        let removed = self.0.get_mut(platform)?.remove(key);
        if self.0.get(platform).is_some_and(|types| types.is_empty()) {
            self.0.remove(platform);
        }
        removed
    }

    /// Look up the settings of a `(platform, key)` entry.
    pub fn get(&self, platform: &str, key: &str) -> Option<&ActivityTypeSettings> {
        self.0.get(platform)?.get(key)
    }

    /// Iterate platforms and their type maps.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&str, &BTreeMap<String, ActivityTypeSettings>)> {
        self.0.iter().map(|(platform, types)| (platform.as_str(), types))
    }

    /// Total number of type entries across all platforms.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    /// Whether no platform has any type entry.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }

    /// Project the nested configuration into a flat, key-unique view.
    ///
    /// Platforms with an empty type map are skipped. When two platforms
    /// declare the same key, the platform iterated later overwrites the
    /// earlier one in the flat view and the shadowed `(key, platform)` pair
    /// is recorded — callers that care can reject the configuration, while
    /// lookup paths keep the historical last-writer semantics.
    pub fn flatten(&self) -> FlattenedActivityTypes {
        let mut entries: BTreeMap<String, FlatActivityType> = BTreeMap::new();
        let mut shadowed = Vec::new();

        for (platform, types) in &self.0 {
            for (key, settings) in types {
                let flat = FlatActivityType {
                    platform: platform.clone(),
                    settings: settings.clone(),
                };
                if let Some(previous) = entries.insert(key.clone(), flat) {
                    shadowed.push(ShadowedActivityType {
                        key: key.clone(),
                        platform: previous.platform,
                    });
                }
            }
        }

        FlattenedActivityTypes { entries, shadowed }
    }
}

/// One entry of the flattened activity-type view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatActivityType {
    /// Platform that owns the type key in the flat view
    pub platform: String,

    /// The type settings
    pub settings: ActivityTypeSettings,
}

/// Record of a type key hidden by a flatten collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedActivityType {
    /// The colliding type key
    pub key: String,

    /// The platform whose entry lost the collision
    pub platform: String,
}

/// Flat projection of an [`ActivityTypeMap`], keyed by type key alone.
#[derive(Debug, Clone, Default)]
pub struct FlattenedActivityTypes {
    entries: BTreeMap<String, FlatActivityType>,
    shadowed: Vec<ShadowedActivityType>,
}

impl FlattenedActivityTypes {
    /// Look up the flat entry for a type key.
    pub fn get(&self, key: &str) -> Option<&FlatActivityType> {
        self.entries.get(key)
    }

    /// Whether a type key exists in the flat view.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries hidden by key collisions between platforms.
    pub fn shadowed(&self) -> &[ShadowedActivityType] {
        &self.shadowed
    }

    /// Iterate the flat entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlatActivityType)> {
        self.entries.iter().map(|(key, flat)| (key.as_str(), flat))
    }

    /// Number of distinct type keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the flat view has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Activity channel lists: `platform → ordered channel names`.
///
/// Each list has set semantics over an ordered sequence: first-insertion
/// order is preserved and duplicates are suppressed.
///
/// # Examples
///
/// ```
/// use platform_segments::ActivityChannelMap;
///
/// let mut channels = ActivityChannelMap::new();
/// assert!(channels.add("discord", "general"));
/// assert!(channels.add("discord", "support"));
/// assert!(!channels.add("discord", "general"));
/// assert_eq!(channels.channels("discord"), Some(&["general".to_string(), "support".to_string()][..]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityChannelMap(BTreeMap<String, Vec<String>>);

impl ActivityChannelMap {
    /// Empty channel map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a channel to a platform's list unless already present.
    ///
    /// Creates a singleton list for a platform seen for the first time.
    /// Returns `true` if the channel was appended.
    pub fn add(&mut self, platform: &str, channel: &str) -> bool {
        let channels = self.0.entry(platform.to_string()).or_default();
        if channels.iter().any(|existing| existing == channel) {
            return false;
        }
        channels.push(channel.to_string());
        true
    }

    /// The channel list for a platform, in insertion order.
    pub fn channels(&self, platform: &str) -> Option<&[String]> {
        self.0.get(platform).map(Vec::as_slice)
    }

    /// Iterate platforms and their channel lists.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(platform, channels)| (platform.as_str(), channels.as_slice()))
    }

    /// Whether no platform has any channel.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}
