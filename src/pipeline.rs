//! # Recommendation Pipeline
//! One tick: sources → blended audience → channel → message, with timing and
//! estimates drawn alongside. Pure apart from the injected RNG and clock, so
//! it is driven directly in tests.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::audience::{self, BlendedAudienceProfile};
use crate::channels::{ChannelCatalog, ChannelId, ChannelSelector};
use crate::config::StreamConfig;
use crate::estimates::{self, Metrics};
use crate::message;
use crate::preferences::SessionPreferences;
use crate::sources::{SourceCatalog, SourceTables};
use crate::timing::{self, serialize_utc_seconds, TimingRecommendation};

/// Read-only lookup tables shared by every session.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub sources: SourceCatalog,
    pub channels: ChannelCatalog,
}

impl Catalogs {
    pub fn builtin() -> Self {
        Self {
            sources: SourceCatalog::new(SourceTables::builtin()),
            channels: ChannelCatalog::builtin(),
        }
    }

    pub fn load(config: &StreamConfig) -> Self {
        Self {
            sources: SourceCatalog::new(SourceTables::builtin()),
            channels: ChannelCatalog::load_from_file(&config.channels_path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RightChannel {
    pub id: ChannelId,
    pub name: String,
    pub reason: String,
    #[serde(rename = "supportingSignals")]
    pub supporting_signals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RightMessage {
    pub headline: String,
    pub body: String,
    pub cta: String,
    pub preview: String,
    pub tone: String,
}

/// Outbound payload, one per tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationTick {
    pub campaign_id: u32,
    #[serde(serialize_with = "serialize_utc_seconds")]
    pub generated_at: DateTime<Utc>,
    pub right_time: TimingRecommendation,
    pub right_channel: RightChannel,
    pub right_message: RightMessage,
    pub right_audience: BlendedAudienceProfile,
    pub data_sources: Map<String, Value>,
    pub metrics: Metrics,
}

pub fn recommend<R: Rng + ?Sized>(
    catalogs: &Catalogs,
    prefs: &SessionPreferences,
    now: DateTime<Utc>,
    rng: &mut R,
) -> RecommendationTick {
    let batch = catalogs.sources.generate(&prefs.selected_sources, rng);
    let profile = audience::merge(batch.hints(), catalogs.sources.tables(), rng);

    let rec = ChannelSelector::new(&catalogs.channels).select(
        &prefs.selected_channels,
        &profile,
        &batch,
        rng,
    );
    let body = message::compose(&rec.blueprint, &rec.interest, &rec.behavior);

    RecommendationTick {
        campaign_id: rng.random_range(1000..=9999),
        generated_at: now,
        right_time: timing::plan(rec.channel, now, rng),
        right_channel: RightChannel {
            id: rec.channel,
            name: rec.blueprint.label,
            reason: rec.reason,
            supporting_signals: rec.supporting_signals,
        },
        right_message: RightMessage {
            headline: rec.blueprint.headline,
            body,
            cta: rec.blueprint.cta,
            preview: rec.preview,
            tone: rec.blueprint.tone,
        },
        right_audience: profile,
        data_sources: batch.to_json_map(),
        metrics: estimates::estimate(rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn select_all_covers_every_source() {
        let catalogs = Catalogs::builtin();
        let mut rng = StdRng::seed_from_u64(1);
        let tick = recommend(&catalogs, &SessionPreferences::default(), now(), &mut rng);
        let keys: Vec<&str> = tick.data_sources.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 3);
        for k in ["gtm", "facebook_pixel", "google_ads_tag"] {
            assert!(keys.contains(&k));
        }
        assert!(ChannelId::ALL.contains(&tick.right_channel.id));
        assert!((1000..=9999).contains(&tick.campaign_id));
    }

    #[test]
    fn ads_only_selection_carries_campaign_signal() {
        let catalogs = Catalogs::builtin();
        let prefs = SessionPreferences::new(&["google_ads_tag"], &["ads"]);
        let mut rng = StdRng::seed_from_u64(2);
        let tick = recommend(&catalogs, &prefs, now(), &mut rng);

        assert_eq!(tick.right_channel.id, ChannelId::Ads);
        let campaign = tick.data_sources["google_ads_tag"]["campaign"].as_str().unwrap();
        assert_eq!(
            tick.right_channel.supporting_signals,
            vec![format!("Recent campaign momentum: {campaign}")]
        );
        assert_eq!(tick.right_message.tone, "persuasive");
    }

    #[test]
    fn same_seed_same_tick() {
        let catalogs = Catalogs::builtin();
        let prefs = SessionPreferences::default();
        let a = recommend(&catalogs, &prefs, now(), &mut StdRng::seed_from_u64(77));
        let b = recommend(&catalogs, &prefs, now(), &mut StdRng::seed_from_u64(77));
        assert_eq!(a, b);
    }

    #[test]
    fn wire_shape_has_exact_top_level_fields() {
        let catalogs = Catalogs::builtin();
        let mut rng = StdRng::seed_from_u64(3);
        let tick = recommend(&catalogs, &SessionPreferences::default(), now(), &mut rng);
        let v = serde_json::to_value(&tick).unwrap();
        let obj = v.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "campaignId",
                "dataSources",
                "generatedAt",
                "metrics",
                "rightAudience",
                "rightChannel",
                "rightMessage",
                "rightTime",
            ]
        );
        assert_eq!(v["generatedAt"], "2025-09-06T09:00:00Z");
        assert!(v["rightChannel"]["supportingSignals"].is_array());
        assert!(v["rightTime"]["send_at"].as_str().unwrap().ends_with('Z'));
        assert!(v["metrics"]["expected_lift"].is_string());
        assert!(v["rightAudience"]["interests"].as_array().is_some_and(|a| !a.is_empty()));
    }
}
