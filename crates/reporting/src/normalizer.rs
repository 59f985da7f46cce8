//! Metric normalizer: turns one loosely-typed upstream ad into a fully
//! populated metric set.
//!
//! This is the only place that touches raw JSON numbers. Absent, null or
//! unparseable values become 0, every ratio is guarded against a zero
//! denominator, and nothing here can fail.

use crate::money::Money;
use adlens_core::types::{RawActionValue, RawAdRecord, RawCreative, RawInsight};
use serde::Serialize;
use serde_json::Value;

/// Action types counted as conversions, in order of preference.
pub const CONVERSION_ACTIONS: [&str; 3] = ["purchase", "lead", "onsite_web_lead"];

/// Action type of the initial video play and of the watch-through lists.
const VIDEO_VIEW_ACTION: &str = "video_view";

/// Frequency above which an ad that still converts is considered fatigued.
pub const FATIGUE_FREQUENCY: f64 = 3.0;

// ─── Types ──────────────────────────────────────────────────────────────────

/// Raw video view counts at each watch-through threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoMetrics {
    pub views: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub p100: f64,
}

/// Canonical per-ad metrics. Every ratio is finite.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedMetrics {
    pub spend: Money,
    pub clicks: f64,
    pub impressions: f64,
    pub reach: f64,
    pub ctr: f64,
    pub cpm: f64,
    pub frequency: f64,
    pub roas: f64,
    pub cpa: f64,
    #[serde(rename = "conversoes")]
    pub conversions: f64,
    pub hook_rate: f64,
    pub hold_rate: f64,
    pub video: VideoMetrics,
    pub fatigue: bool,
}

/// Display fields of the ad creative.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreativeSummary {
    pub image_url: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub video_id: Option<String>,
}

/// Campaign or ad set identity as seen on one ad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityIdentity {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

/// An ad after normalization: identity, parent references and metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAd {
    pub id: Option<String>,
    pub name: String,
    pub status: Option<String>,
    pub effective_status: Option<String>,
    pub campaign: EntityIdentity,
    pub adset: EntityIdentity,
    pub creative: CreativeSummary,
    pub metrics: NormalizedMetrics,
}

// ─── Parsing helpers ────────────────────────────────────────────────────────

/// Parse a loose upstream number. Anything that is not a finite number
/// (absent, null, object, "abc", "NaN") is 0. Negative values pass through.
pub fn parse_number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    finite_or_zero(parsed)
}

pub(crate) fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// `numerator / denominator * scale`, or 0 when the denominator is 0.
pub(crate) fn ratio(numerator: f64, denominator: f64, scale: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        finite_or_zero(numerator / denominator * scale)
    }
}

/// Value of the first entry with the given action type.
pub fn action_value(actions: &[RawActionValue], action_type: &str) -> Option<f64> {
    actions
        .iter()
        .find(|a| a.action_type == action_type)
        .map(|a| parse_number(a.value.as_ref()))
}

/// Conversion count from the first action type of the preference list that
/// is present; 0 when none is.
pub fn resolve_conversions(actions: &[RawActionValue]) -> f64 {
    CONVERSION_ACTIONS
        .iter()
        .find_map(|kind| action_value(actions, kind))
        .unwrap_or(0.0)
}

/// Cost per acquisition; 0 unless both spend and conversions are positive.
pub fn cost_per_acquisition(spend: f64, conversions: f64) -> f64 {
    if spend > 0.0 && conversions > 0.0 {
        finite_or_zero(spend / conversions)
    } else {
        0.0
    }
}

fn watched(actions: &[RawActionValue]) -> f64 {
    action_value(actions, VIDEO_VIEW_ACTION)
        .or_else(|| actions.first().map(|a| parse_number(a.value.as_ref())))
        .unwrap_or(0.0)
}

// ─── Normalization ──────────────────────────────────────────────────────────

/// Normalize the insight block of one ad. An ad without insights yields
/// all-zero metrics.
pub fn normalize_metrics(record: &RawAdRecord) -> NormalizedMetrics {
    match record.insight() {
        Some(insight) => normalize_insight(insight),
        None => NormalizedMetrics::default(),
    }
}

fn normalize_insight(insight: &RawInsight) -> NormalizedMetrics {
    let spend = Money::from_major(parse_number(insight.spend.as_ref()));
    let clicks = parse_number(insight.clicks.as_ref().or(insight.inline_link_clicks.as_ref()));
    let impressions = parse_number(insight.impressions.as_ref());
    let reach = parse_number(insight.reach.as_ref());

    let reported_frequency = parse_number(insight.frequency.as_ref());
    let frequency = if reported_frequency > 0.0 {
        reported_frequency
    } else {
        ratio(impressions, reach, 1.0)
    };

    let roas = insight
        .purchase_roas
        .first()
        .map(|r| parse_number(r.value.as_ref()))
        .unwrap_or(0.0);

    let conversions = resolve_conversions(&insight.actions);
    let cpa = cost_per_acquisition(spend.as_f64(), conversions);

    let video = VideoMetrics {
        views: action_value(&insight.actions, VIDEO_VIEW_ACTION).unwrap_or(0.0),
        p25: watched(&insight.video_p25_watched_actions),
        p50: watched(&insight.video_p50_watched_actions),
        p75: watched(&insight.video_p75_watched_actions),
        p95: watched(&insight.video_p95_watched_actions),
        p100: watched(&insight.video_p100_watched_actions),
    };

    NormalizedMetrics {
        spend,
        clicks,
        impressions,
        reach,
        ctr: ratio(clicks, impressions, 100.0),
        cpm: ratio(spend.as_f64(), impressions, 1000.0),
        frequency,
        roas,
        cpa,
        conversions,
        hook_rate: ratio(video.views, impressions, 100.0),
        hold_rate: ratio(video.p75, impressions, 100.0),
        video,
        fatigue: is_fatigued(frequency, cpa),
    }
}

pub fn is_fatigued(frequency: f64, cpa: f64) -> bool {
    frequency > FATIGUE_FREQUENCY && cpa > 0.0
}

/// Pick display fields from the creative, falling back to the story spec and
/// finally to the ad name for the title.
pub fn summarize_creative(creative: Option<&RawCreative>, ad_name: &str) -> CreativeSummary {
    let Some(creative) = creative else {
        return CreativeSummary {
            title: Some(ad_name.to_string()),
            ..CreativeSummary::default()
        };
    };

    let spec = creative.object_story_spec.as_ref();
    let link = spec.and_then(|s| s.link_data.as_ref());
    let video = spec.and_then(|s| s.video_data.as_ref());

    let non_empty = |s: &Option<String>| s.as_ref().filter(|v| !v.trim().is_empty()).cloned();

    let image_url = non_empty(&creative.image_url)
        .or_else(|| non_empty(&creative.thumbnail_url))
        .or_else(|| link.and_then(|l| non_empty(&l.picture)))
        .or_else(|| video.and_then(|v| non_empty(&v.image_url)));

    let title = non_empty(&creative.title)
        .or_else(|| link.and_then(|l| non_empty(&l.name)))
        .or_else(|| video.and_then(|v| non_empty(&v.title)))
        .or_else(|| Some(ad_name.to_string()));

    let body = non_empty(&creative.body)
        .or_else(|| link.and_then(|l| non_empty(&l.message)))
        .or_else(|| video.and_then(|v| non_empty(&v.message)));

    CreativeSummary {
        image_url,
        title,
        body,
        video_id: video.and_then(|v| non_empty(&v.video_id)),
    }
}

/// Normalize a full ad record. `unknown_label` names ads without a name.
pub fn normalize_ad(record: &RawAdRecord, unknown_label: &str) -> NormalizedAd {
    let name = record
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(unknown_label)
        .to_string();

    let identity = |entity: &Option<adlens_core::types::RawEntityRef>| {
        entity
            .as_ref()
            .map(|e| EntityIdentity {
                id: e.id.clone().filter(|id| !id.trim().is_empty()),
                name: e.name.clone().filter(|n| !n.trim().is_empty()),
                status: e.status.clone(),
            })
            .unwrap_or_default()
    };

    NormalizedAd {
        id: record.id.clone(),
        creative: summarize_creative(record.creative.as_ref(), &name),
        name,
        status: record.status.clone(),
        effective_status: record.effective_status.clone(),
        campaign: identity(&record.campaign),
        adset: identity(&record.adset),
        metrics: normalize_metrics(record),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
