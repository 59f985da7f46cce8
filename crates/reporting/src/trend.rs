//! Daily account trend, built from the account-level insights query
//! independently of the ad hierarchy.

use crate::normalizer::{
    action_value, cost_per_acquisition, parse_number, ratio, resolve_conversions,
};
use adlens_core::types::RawDailyRecord;
use serde::Serialize;

/// Action-value entry holding purchase revenue.
const REVENUE_ACTION: &str = "purchase";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub cpm: f64,
    pub ctr: f64,
    pub revenue: f64,
    #[serde(rename = "conversoes")]
    pub conversions: f64,
    pub cpa: f64,
    pub roas: f64,
}

impl TrendPoint {
    pub fn from_daily(row: &RawDailyRecord) -> Option<Self> {
        let date = row.date_start.as_deref()?.trim();
        if date.is_empty() {
            return None;
        }

        let spend = parse_number(row.spend.as_ref());
        let impressions = parse_number(row.impressions.as_ref());
        let clicks = parse_number(row.clicks.as_ref().or(row.inline_link_clicks.as_ref()));
        let revenue = action_value(&row.action_values, REVENUE_ACTION).unwrap_or(0.0);
        let conversions = resolve_conversions(&row.actions);

        Some(Self {
            date: date.to_string(),
            spend,
            impressions,
            clicks,
            cpm: ratio(spend, impressions, 1000.0),
            ctr: ratio(clicks, impressions, 100.0),
            revenue,
            conversions,
            cpa: cost_per_acquisition(spend, conversions),
            roas: if spend > 0.0 { ratio(revenue, spend, 1.0) } else { 0.0 },
        })
    }
}

/// One point per day, oldest first. Rows without a date are dropped.
pub fn build_trend(rows: &[RawDailyRecord]) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = rows.iter().filter_map(TrendPoint::from_daily).collect();
    points.sort_by(|a, b| a.date.cmp(&b.date));
    points
}
