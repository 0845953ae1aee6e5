//! # Audience Blender
//! Merges per-source audience hints into one consensus profile.
//!
//! Scalars take the most frequent non-empty value (ties go to whichever value
//! was seen first); interests and behaviors are unioned, deduplicated and
//! sorted. The resulting profile never carries empty lists.

use std::collections::BTreeSet;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sources::{AudienceHint, SourceTables};

pub const FALLBACK_INTEREST: &str = "general catalog";
pub const FALLBACK_BEHAVIOR: &str = "Exploring products";
pub const UNRESOLVED: &str = "unknown";

/// Picked when no hint carries a lifecycle stage.
pub const LIFECYCLE_STAGES: [&str; 3] = ["prospect", "returning", "loyal"];

/// Consensus audience record used by channel selection and composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendedAudienceProfile {
    pub age_range: String,
    pub location: String,
    pub interests: Vec<String>,
    pub behaviors: Vec<String>,
    pub lifecycle_stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_device: Option<String>,
}

impl BlendedAudienceProfile {
    /// Profile used when no source contributed a hint.
    pub fn fallback<R: Rng + ?Sized>(tables: &SourceTables, rng: &mut R) -> Self {
        Self {
            age_range: tables.pick_age(rng),
            location: tables.pick_location(rng),
            interests: vec!["new arrivals".to_string()],
            behaviors: vec!["Browsing catalog".to_string()],
            lifecycle_stage: UNRESOLVED.to_string(),
            preferred_device: None,
        }
    }
}

pub fn merge<R: Rng + ?Sized>(
    hints: &[AudienceHint],
    tables: &SourceTables,
    rng: &mut R,
) -> BlendedAudienceProfile {
    if hints.is_empty() {
        return BlendedAudienceProfile::fallback(tables, rng);
    }

    let age_range = most_common(hints.iter().map(|h| h.age_range.as_str()));
    let location = most_common(hints.iter().map(|h| h.location.as_str()));
    let lifecycle = most_common(hints.iter().filter_map(|h| h.lifecycle_stage.as_deref()));
    let device = most_common(hints.iter().filter_map(|h| h.preferred_device.as_deref()));

    let lifecycle_stage = match lifecycle {
        Some(stage) => stage,
        None => LIFECYCLE_STAGES
            .choose(rng)
            .copied()
            .unwrap_or(LIFECYCLE_STAGES[0])
            .to_string(),
    };

    BlendedAudienceProfile {
        age_range: age_range.unwrap_or_else(|| UNRESOLVED.to_string()),
        location: location.unwrap_or_else(|| UNRESOLVED.to_string()),
        interests: sorted_union(hints.iter().map(|h| &h.interests), FALLBACK_INTEREST),
        behaviors: sorted_union(hints.iter().map(|h| &h.behaviors), FALLBACK_BEHAVIOR),
        lifecycle_stage,
        preferred_device: device,
    }
}

/// Most frequent non-empty value; on a tie the earliest-seen value wins.
fn most_common<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for v in values.filter(|v| !v.is_empty()) {
        match counts.iter_mut().find(|(seen, _)| *seen == v) {
            Some((_, n)) => *n += 1,
            None => counts.push((v, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (v, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((v, n));
        }
    }
    best.map(|(v, _)| v.to_string())
}

fn sorted_union<'a>(lists: impl Iterator<Item = &'a Vec<String>>, fallback: &str) -> Vec<String> {
    let set: BTreeSet<&str> = lists.flatten().map(String::as_str).collect();
    if set.is_empty() {
        return vec![fallback.to_string()];
    }
    set.into_iter().map(str::to_string).collect()
}
