//! # Channels
//! Static channel blueprints plus the selector that picks one per tick.
//!
//! The channel itself is drawn uniformly from the allowed set; the blended
//! profile only shapes the copy (interest/behavior) and the attached
//! supporting signal. Weighting the draw by profile is an open extension.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::audience::BlendedAudienceProfile;
use crate::sources::{SourceBatch, SourceId, SourcePayload};

pub const FALLBACK_INTEREST: &str = "our newest collection";
pub const FALLBACK_BEHAVIOR: &str = "recent activity";

/// Known delivery channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelId {
    Email,
    Sms,
    Whatsapp,
    Ads,
}

impl ChannelId {
    pub const ALL: [ChannelId; 4] = [
        ChannelId::Email,
        ChannelId::Sms,
        ChannelId::Whatsapp,
        ChannelId::Ads,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelId::Email => "email",
            ChannelId::Sms => "sms",
            ChannelId::Whatsapp => "whatsapp",
            ChannelId::Ads => "ads",
        }
    }

    /// Case-insensitive lookup; unknown ids yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.to_lowercase();
        Self::ALL.into_iter().find(|id| id.as_str() == lowered)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template data for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBlueprint {
    pub label: String,
    pub headline: String,
    /// Body template with `{{interest}}`, `{{behavior}}` and `{{name}}` placeholders.
    pub body: String,
    pub cta: String,
    pub tone: String,
}

impl ChannelBlueprint {
    fn new(label: &str, headline: &str, body: &str, cta: &str, tone: &str) -> Self {
        Self {
            label: label.into(),
            headline: headline.into(),
            body: body.into(),
            cta: cta.into(),
            tone: tone.into(),
        }
    }
}

/// Read-only blueprint table, one entry per [`ChannelId`].
#[derive(Debug, Clone)]
pub struct ChannelCatalog {
    blueprints: [ChannelBlueprint; 4],
}

impl ChannelCatalog {
    pub fn builtin() -> Self {
        Self {
            blueprints: [
                ChannelBlueprint::new(
                    "Email",
                    "Bring them back with a curated edit",
                    "Hi {{name}}, we noticed {{behavior}}. Showcase {{interest}} with a \
                     personalized collection and highlight the benefits of returning now.",
                    "Shop the tailored picks",
                    "helpful",
                ),
                ChannelBlueprint::new(
                    "SMS",
                    "Keep momentum with a short nudge",
                    "Quick reminder: {{interest}} is trending right now. Reward the last \
                     action with a time-bound perk.",
                    "Tap to redeem offer",
                    "urgent",
                ),
                ChannelBlueprint::new(
                    "WhatsApp",
                    "Start a helpful conversation",
                    "Open with a friendly check-in referencing {{behavior}} and suggest two \
                     relevant items inspired by {{interest}}. Include an embedded carousel \
                     for rich context.",
                    "View personalized picks",
                    "conversational",
                ),
                ChannelBlueprint::new(
                    "Ads",
                    "Retarget with dynamic creative",
                    "Deploy a responsive ad set tuned to {{interest}} audiences. Mirror the \
                     onsite experience and keep the message consistent with their {{behavior}}.",
                    "Return to complete your journey",
                    "persuasive",
                ),
            ],
        }
    }

    /// Load blueprint overrides from a TOML file keyed by channel id.
    /// Channels absent from the file keep their built-in blueprint and unknown
    /// keys are skipped with a warning; a missing or unparseable file yields
    /// the built-ins.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let mut catalog = Self::builtin();
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return catalog,
        };
        match toml::from_str::<BTreeMap<String, ChannelBlueprint>>(&raw) {
            Ok(overrides) => {
                for (key, bp) in overrides {
                    match ChannelId::parse(&key) {
                        Some(id) => catalog.blueprints[id.index()] = bp,
                        None => {
                            warn!(target: "config", channel = %key, "unknown channel in overrides")
                        }
                    }
                }
            }
            Err(e) => {
                warn!(target: "config", path = %path.display(), error = %e, "ignoring channel overrides");
            }
        }
        catalog
    }

    pub fn blueprint(&self, id: ChannelId) -> &ChannelBlueprint {
        &self.blueprints[id.index()]
    }

    /// Effective channel set for a raw selection: known ids in selection order,
    /// or every channel when nothing known was requested.
    pub fn resolve(selected: &[String]) -> Vec<ChannelId> {
        let mut ids: Vec<ChannelId> = Vec::new();
        for raw in selected {
            if let Some(id) = ChannelId::parse(raw) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        if ids.is_empty() {
            ids = ChannelId::ALL.to_vec();
        }
        ids
    }
}

impl Default for ChannelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Chosen channel with the copy fragments the composer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecommendation {
    pub channel: ChannelId,
    pub blueprint: ChannelBlueprint,
    pub interest: String,
    pub behavior: String,
    pub preview: String,
    pub supporting_signals: Vec<String>,
    pub reason: String,
}

pub struct ChannelSelector<'a> {
    catalog: &'a ChannelCatalog,
}

impl<'a> ChannelSelector<'a> {
    pub fn new(catalog: &'a ChannelCatalog) -> Self {
        Self { catalog }
    }

    pub fn select<R: Rng + ?Sized>(
        &self,
        selected: &[String],
        profile: &BlendedAudienceProfile,
        sources: &SourceBatch,
        rng: &mut R,
    ) -> ChannelRecommendation {
        let allowed = ChannelCatalog::resolve(selected);
        let channel = allowed.choose(rng).copied().unwrap_or(ChannelId::Email);
        let blueprint = self.catalog.blueprint(channel).clone();

        let interest = profile
            .interests
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| FALLBACK_INTEREST.to_string());
        let behavior = profile
            .behaviors
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| FALLBACK_BEHAVIOR.to_string());

        let supporting_signals = supporting_signal(channel, sources).into_iter().collect();
        let preview = format!("Focus on {} for {} audiences", interest, profile.location);
        let reason = format!(
            "{} fits {} interest with {} context",
            blueprint.label,
            interest,
            behavior.to_lowercase()
        );

        ChannelRecommendation {
            channel,
            blueprint,
            interest,
            behavior,
            preview,
            supporting_signals,
            reason,
        }
    }
}

/// At most one signal, tied to the source that best explains the channel.
pub fn supporting_signal(channel: ChannelId, sources: &SourceBatch) -> Option<String> {
    match channel {
        ChannelId::Ads => sources.get(SourceId::GoogleAdsTag).map(|p| {
            format!("Recent campaign momentum: {}", field_text(p, "campaign"))
        }),
        ChannelId::Email => sources
            .get(SourceId::Gtm)
            .map(|p| format!("Last seen browsing {}", field_text(p, "page_view"))),
        ChannelId::Sms | ChannelId::Whatsapp => sources
            .get(SourceId::FacebookPixel)
            .map(|p| format!("Latest conversion event: {}", field_text(p, "event"))),
    }
}

fn field_text(payload: &SourcePayload, key: &str) -> String {
    match payload.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}
