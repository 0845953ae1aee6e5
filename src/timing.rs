//! Send-time planning: a sampled time zone and delivery window per tick.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Serialize, Serializer};

use crate::channels::ChannelId;

pub const TIME_ZONES: [&str; 4] = [
    "America/New_York",
    "America/Los_Angeles",
    "Europe/London",
    "Asia/Singapore",
];

pub const WINDOW_MINUTES: [u32; 5] = [15, 30, 45, 60, 90];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingRecommendation {
    #[serde(serialize_with = "serialize_utc_seconds")]
    pub send_at: DateTime<Utc>,
    pub time_zone: String,
    pub window_minutes: u32,
    pub rationale: String,
}

pub fn plan<R: Rng + ?Sized>(channel: ChannelId, now: DateTime<Utc>, rng: &mut R) -> TimingRecommendation {
    let time_zone = TIME_ZONES.choose(rng).copied().unwrap_or(TIME_ZONES[0]);
    let window_minutes = WINDOW_MINUTES.choose(rng).copied().unwrap_or(WINDOW_MINUTES[0]);

    TimingRecommendation {
        send_at: now.trunc_subsecs(0) + Duration::minutes(i64::from(window_minutes)),
        time_zone: time_zone.to_string(),
        window_minutes,
        rationale: format!("Optimize delivery window for {channel} engagement"),
    }
}

/// `2025-01-02T03:04:05Z`
pub fn format_utc_seconds(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub fn serialize_utc_seconds<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_utc_seconds(ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn send_at_is_now_plus_window_truncated() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()
            + Duration::milliseconds(750);
        let mut rng = StdRng::seed_from_u64(17);
        let t = plan(ChannelId::Sms, now, &mut rng);

        assert!(WINDOW_MINUTES.contains(&t.window_minutes));
        assert!(TIME_ZONES.contains(&t.time_zone.as_str()));
        let expected = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()
            + Duration::minutes(i64::from(t.window_minutes));
        assert_eq!(t.send_at, expected);
        assert_eq!(t.rationale, "Optimize delivery window for sms engagement");
    }

    #[test]
    fn serializes_with_z_suffix_and_second_precision() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let t = plan(ChannelId::Email, now, &mut rng);
        let v = serde_json::to_value(&t).unwrap();
        let s = v["send_at"].as_str().unwrap();
        assert!(s.ends_with('Z'));
        assert_eq!(s.len(), "2025-01-02T03:04:05Z".len());
        assert!(v["window_minutes"].is_u64());
    }
}
