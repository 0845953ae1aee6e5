//! # Source Catalog
//! Simulated tracking sources (tag manager, pixel, ads tag).
//!
//! Every generator call returns one telemetry payload plus the audience hint
//! that payload implies. Draws are independent per call, so two sources in
//! the same tick never correlate.
//!
//! Selection policy: ids are matched case-insensitively against the known
//! set; an empty or fully-unknown selection means "all sources".

use std::collections::HashMap;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form simulated telemetry for one source.
pub type SourcePayload = Map<String, Value>;

/// Known data-source ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Gtm,
    FacebookPixel,
    GoogleAdsTag,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [SourceId::Gtm, SourceId::FacebookPixel, SourceId::GoogleAdsTag];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Gtm => "gtm",
            SourceId::FacebookPixel => "facebook_pixel",
            SourceId::GoogleAdsTag => "google_ads_tag",
        }
    }

    /// Case-insensitive lookup; unknown ids yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.to_lowercase();
        Self::ALL.into_iter().find(|id| id.as_str() == lowered)
    }
}

/// One source's partial view of the audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceHint {
    pub age_range: String,
    pub location: String,
    pub interests: Vec<String>,
    pub behaviors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_device: Option<String>,
}

/// Lookup tables the generators sample from. Built once, read-only.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub age_ranges: Vec<String>,
    pub locations: Vec<String>,
    pub interest_buckets: HashMap<SourceId, Vec<String>>,
}

impl SourceTables {
    pub fn builtin() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut interest_buckets = HashMap::new();
        interest_buckets.insert(
            SourceId::Gtm,
            owned(&["flash sales", "new arrivals", "sustainability"]),
        );
        interest_buckets.insert(
            SourceId::FacebookPixel,
            owned(&["loyalty rewards", "community", "exclusive drops"]),
        );
        interest_buckets.insert(
            SourceId::GoogleAdsTag,
            owned(&["best sellers", "gift ideas", "seasonal picks"]),
        );

        Self {
            age_ranges: owned(&["18-24", "25-34", "35-44", "45-54"]),
            locations: owned(&["New York", "California", "Texas", "Florida", "Illinois"]),
            interest_buckets,
        }
    }

    pub fn interests_for(&self, id: SourceId) -> &[String] {
        self.interest_buckets
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn pick_age<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        pick_owned(&self.age_ranges, rng)
    }

    pub fn pick_location<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        pick_owned(&self.locations, rng)
    }
}

impl Default for SourceTables {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Payloads and hints for one tick, in selection order.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    payloads: Vec<(SourceId, SourcePayload)>,
    hints: Vec<AudienceHint>,
}

impl SourceBatch {
    pub fn push(&mut self, id: SourceId, payload: SourcePayload, hint: AudienceHint) {
        self.payloads.push((id, payload));
        self.hints.push(hint);
    }

    pub fn get(&self, id: SourceId) -> Option<&SourcePayload> {
        self.payloads
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, p)| p)
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.payloads.iter().map(|(id, _)| *id).collect()
    }

    pub fn hints(&self) -> &[AudienceHint] {
        &self.hints
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Wire shape: `{ "<sourceId>": { ... }, ... }`.
    pub fn to_json_map(&self) -> Map<String, Value> {
        self.payloads
            .iter()
            .map(|(id, p)| (id.as_str().to_string(), Value::Object(p.clone())))
            .collect()
    }
}

/// Generates simulated payloads + hints for the selected sources.
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    tables: SourceTables,
}

impl SourceCatalog {
    pub fn new(tables: SourceTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &SourceTables {
        &self.tables
    }

    /// Resolve the effective source set for a raw selection.
    /// Duplicates collapse onto their first occurrence.
    pub fn resolve(selected: &[String]) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = Vec::new();
        for raw in selected {
            if let Some(id) = SourceId::parse(raw) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        if ids.is_empty() {
            ids = SourceId::ALL.to_vec();
        }
        ids
    }

    pub fn generate<R: Rng + ?Sized>(&self, selected: &[String], rng: &mut R) -> SourceBatch {
        let mut batch = SourceBatch::default();
        for id in Self::resolve(selected) {
            let (payload, hint) = self.simulate(id, rng);
            batch.push(id, payload, hint);
        }

        // Never hand downstream an empty batch.
        if batch.is_empty() {
            let (payload, hint) = self.simulate(SourceId::Gtm, rng);
            batch.push(SourceId::Gtm, payload, hint);
        }
        batch
    }

    pub fn simulate<R: Rng + ?Sized>(&self, id: SourceId, rng: &mut R) -> (SourcePayload, AudienceHint) {
        match id {
            SourceId::Gtm => self.gtm(rng),
            SourceId::FacebookPixel => self.facebook_pixel(rng),
            SourceId::GoogleAdsTag => self.google_ads_tag(rng),
        }
    }

    fn gtm<R: Rng + ?Sized>(&self, rng: &mut R) -> (SourcePayload, AudienceHint) {
        let recent_event = pick(&["abandoned_cart", "category_browser", "new_visitor"], rng);
        let page = pick(
            &[
                "/products/smart-speaker",
                "/collections/summer-edit",
                "/blog/best-of-week",
            ],
            rng,
        );
        let page_label = page.rsplit('/').next().unwrap_or(page).replace('-', " ");

        let hint = AudienceHint {
            age_range: self.tables.pick_age(rng),
            location: self.tables.pick_location(rng),
            interests: vec![pick_owned(self.tables.interests_for(SourceId::Gtm), rng)],
            behaviors: vec![format!("Viewed {page_label}")],
            lifecycle_stage: Some(pick(&["prospect", "returning", "at-risk"], rng).to_string()),
            preferred_device: None,
        };

        let mut data = SourcePayload::new();
        data.insert("page_view".into(), page.into());
        data.insert("recent_event".into(), recent_event.into());
        data.insert(
            "time_on_site_seconds".into(),
            rng.random_range(30..=240u32).into(),
        );
        data.insert("active_session".into(), rng.random_bool(0.5).into());

        (data, hint)
    }

    fn facebook_pixel<R: Rng + ?Sized>(&self, rng: &mut R) -> (SourcePayload, AudienceHint) {
        let event = pick(&["AddToCart", "Purchase", "Lead", "ViewContent"], rng);
        let value = round2(rng.random_range(35.0..=220.0));
        let device = pick(&["mobile", "desktop", "tablet"], rng);

        let hint = AudienceHint {
            age_range: self.tables.pick_age(rng),
            location: self.tables.pick_location(rng),
            interests: vec![pick_owned(
                self.tables.interests_for(SourceId::FacebookPixel),
                rng,
            )],
            behaviors: vec![format!("Facebook Pixel event: {event}")],
            lifecycle_stage: None,
            preferred_device: Some(device.to_string()),
        };

        let mut data = SourcePayload::new();
        data.insert("event".into(), event.into());
        data.insert("value".into(), value.into());
        data.insert("currency".into(), "USD".into());
        data.insert("device".into(), device.into());

        (data, hint)
    }

    fn google_ads_tag<R: Rng + ?Sized>(&self, rng: &mut R) -> (SourcePayload, AudienceHint) {
        let campaign = pick(
            &["spring_promo", "retargeting_audience", "brand_awareness"],
            rng,
        );
        let conversions = rng.random_range(0..=12u32);
        let spend = round2(rng.random_range(120.0..=560.0));

        let hint = AudienceHint {
            age_range: self.tables.pick_age(rng),
            location: self.tables.pick_location(rng),
            interests: vec![pick_owned(
                self.tables.interests_for(SourceId::GoogleAdsTag),
                rng,
            )],
            behaviors: vec![format!(
                "Engaged with {} campaign",
                campaign.replace('_', " ")
            )],
            lifecycle_stage: Some(pick(&["new", "loyal", "lapsing"], rng).to_string()),
            preferred_device: None,
        };

        let mut data = SourcePayload::new();
        data.insert("campaign".into(), campaign.into());
        data.insert(
            "click_through_rate".into(),
            round2(rng.random_range(0.8..=3.4)).into(),
        );
        data.insert("conversions".into(), conversions.into());
        data.insert("spend".into(), spend.into());

        (data, hint)
    }
}

fn pick<R: Rng + ?Sized>(items: &[&'static str], rng: &mut R) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn pick_owned<R: Rng + ?Sized>(items: &[String], rng: &mut R) -> String {
    items
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sel(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_selection_yields_all_sources() {
        let catalog = SourceCatalog::default();
        let mut rng = StdRng::seed_from_u64(7);
        let batch = catalog.generate(&[], &mut rng);
        assert_eq!(batch.ids(), SourceId::ALL.to_vec());
        assert_eq!(batch.hints().len(), 3);
    }

    #[test]
    fn unknown_only_selection_falls_back_to_full_set() {
        let catalog = SourceCatalog::default();
        let mut rng = StdRng::seed_from_u64(11);
        for seed_sel in [sel(&["segment"]), sel(&["", "GA4", "hotjar"])] {
            let batch = catalog.generate(&seed_sel, &mut rng);
            assert!(!batch.is_empty());
            assert_eq!(batch.len(), 3);
        }
    }

    #[test]
    fn selection_is_case_insensitive_and_deduplicated() {
        let catalog = SourceCatalog::default();
        let mut rng = StdRng::seed_from_u64(3);
        let batch = catalog.generate(&sel(&["GTM", "gtm", "Facebook_Pixel", "nope"]), &mut rng);
        assert_eq!(batch.ids(), vec![SourceId::Gtm, SourceId::FacebookPixel]);
        assert_eq!(batch.hints().len(), 2);
    }

    #[test]
    fn gtm_payload_shape() {
        let catalog = SourceCatalog::default();
        let mut rng = StdRng::seed_from_u64(21);
        let (data, hint) = catalog.simulate(SourceId::Gtm, &mut rng);

        let page = data["page_view"].as_str().unwrap();
        assert!(page.starts_with('/'));
        let secs = data["time_on_site_seconds"].as_u64().unwrap();
        assert!((30..=240).contains(&secs));
        assert!(data["active_session"].is_boolean());

        assert!(hint.behaviors[0].starts_with("Viewed "));
        assert!(!hint.behaviors[0].contains('-'));
        assert!(hint.lifecycle_stage.is_some());
        assert!(hint.preferred_device.is_none());
        assert!(catalog
            .tables()
            .interests_for(SourceId::Gtm)
            .contains(&hint.interests[0]));
    }

    #[test]
    fn facebook_pixel_hint_carries_device() {
        let catalog = SourceCatalog::default();
        let mut rng = StdRng::seed_from_u64(5);
        let (data, hint) = catalog.simulate(SourceId::FacebookPixel, &mut rng);
        assert_eq!(data["currency"], "USD");
        let value = data["value"].as_f64().unwrap();
        assert!((35.0..=220.0).contains(&value));
        assert_eq!(
            hint.preferred_device.as_deref(),
            data["device"].as_str()
        );
        assert!(hint.lifecycle_stage.is_none());
        let event = data["event"].as_str().unwrap();
        assert_eq!(hint.behaviors[0], format!("Facebook Pixel event: {event}"));
    }

    #[test]
    fn google_ads_behavior_mentions_campaign() {
        let catalog = SourceCatalog::default();
        let mut rng = StdRng::seed_from_u64(9);
        let (data, hint) = catalog.simulate(SourceId::GoogleAdsTag, &mut rng);
        let campaign = data["campaign"].as_str().unwrap().replace('_', " ");
        assert_eq!(hint.behaviors[0], format!("Engaged with {campaign} campaign"));
        let conversions = data["conversions"].as_u64().unwrap();
        assert!(conversions <= 12);
    }

    #[test]
    fn json_map_is_keyed_by_source_id() {
        let catalog = SourceCatalog::default();
        let mut rng = StdRng::seed_from_u64(1);
        let batch = catalog.generate(&sel(&["google_ads_tag"]), &mut rng);
        let map = batch.to_json_map();
        assert_eq!(map.len(), 1);
        assert!(map["google_ads_tag"]["campaign"].is_string());
    }

    #[test]
    fn json_map_keeps_selection_order() {
        let catalog = SourceCatalog::default();
        let mut rng = StdRng::seed_from_u64(2);
        let batch = catalog.generate(&sel(&["google_ads_tag", "gtm", "facebook_pixel"]), &mut rng);
        let binding = batch.to_json_map();
        let keys: Vec<&str> = binding.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["google_ads_tag", "gtm", "facebook_pixel"]);
    }
}
