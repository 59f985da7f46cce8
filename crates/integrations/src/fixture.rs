//! In-memory insights source. Serves a fixed data set, used by `--seed-demo`
//! and by tests that need a source without a network.

use adlens_core::types::{
    AccountRef, RawActionValue, RawAdRecord, RawCreative, RawDailyRecord, RawEntityRef,
    RawInsight, RawInsightsEnvelope, ReportFilters,
};
use adlens_core::{InsightsSource, ReportError, ReportResult};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    ads: Vec<RawAdRecord>,
    daily: Vec<RawDailyRecord>,
    failure: Option<String>,
}

impl StaticSource {
    pub fn new(ads: Vec<RawAdRecord>, daily: Vec<RawDailyRecord>) -> Self {
        Self {
            ads,
            daily,
            failure: None,
        }
    }

    /// A source whose every fetch fails with an upstream error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Two campaigns, three ad sets and a week of account trend.
    pub fn demo() -> Self {
        let ads = vec![
            demo_ad(DemoAd {
                id: "1001",
                name: "Carousel - Summer",
                campaign: ("c-1", "Prospecting"),
                adset: ("s-1", "Lookalike 1%"),
                spend: "420.50",
                impressions: "61200",
                clicks: "1450",
                reach: "18300",
                purchases: "21",
                revenue: "1890.00",
            }),
            demo_ad(DemoAd {
                id: "1002",
                name: "Video - Testimonial",
                campaign: ("c-1", "Prospecting"),
                adset: ("s-1", "Lookalike 1%"),
                spend: "310.00",
                impressions: "44800",
                clicks: "980",
                reach: "21900",
                purchases: "9",
                revenue: "702.00",
            }),
            demo_ad(DemoAd {
                id: "1003",
                name: "Static - Free shipping",
                campaign: ("c-1", "Prospecting"),
                adset: ("s-2", "Interests"),
                spend: "198.20",
                impressions: "30500",
                clicks: "610",
                reach: "12000",
                purchases: "4",
                revenue: "260.00",
            }),
            demo_ad(DemoAd {
                id: "2001",
                name: "DPA - Viewed products",
                campaign: ("c-2", "Retargeting"),
                adset: ("s-3", "Site visitors 30d"),
                spend: "265.75",
                impressions: "15400",
                clicks: "720",
                reach: "3900",
                purchases: "26",
                revenue: "2470.00",
            }),
            demo_ad(DemoAd {
                id: "2002",
                name: "Static - Last chance",
                campaign: ("c-2", "Retargeting"),
                adset: ("s-3", "Site visitors 30d"),
                spend: "88.40",
                impressions: "9100",
                clicks: "150",
                reach: "2100",
                purchases: "0",
                revenue: "0",
            }),
        ];

        let daily = (1..=7u32)
            .map(|day| {
                let spend = 150.0 + f64::from(day) * 12.5;
                RawInsight {
                    date_start: Some(format!("2024-05-{day:02}")),
                    date_stop: Some(format!("2024-05-{day:02}")),
                    spend: Some(Value::from(format!("{spend:.2}"))),
                    impressions: Some(Value::from((18_000 + day * 900).to_string())),
                    clicks: Some(Value::from((420 + day * 15).to_string())),
                    actions: vec![RawActionValue::new("purchase", (7 + day % 3).to_string())],
                    action_values: vec![RawActionValue::new(
                        "purchase",
                        format!("{:.2}", spend * 3.1),
                    )],
                    ..RawInsight::default()
                }
            })
            .collect();

        Self::new(ads, daily)
    }

    fn check(&self) -> ReportResult<()> {
        match &self.failure {
            Some(message) => Err(ReportError::Upstream(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InsightsSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_ad_records(
        &self,
        account: &AccountRef,
        filters: &ReportFilters,
    ) -> ReportResult<Vec<RawAdRecord>> {
        self.check()?;
        let ads: Vec<RawAdRecord> = self
            .ads
            .iter()
            .filter(|ad| status_matches(ad, &filters.statuses))
            .cloned()
            .collect();
        debug!(account_id = %account.account_id, ads = ads.len(), "Serving static ad records");
        Ok(ads)
    }

    async fn fetch_account_trend(
        &self,
        _account: &AccountRef,
        _filters: &ReportFilters,
    ) -> ReportResult<Vec<RawDailyRecord>> {
        self.check()?;
        Ok(self.daily.clone())
    }
}

/// Mirrors the platform's `effective_status` filter. Records without a
/// status always pass.
fn status_matches(ad: &RawAdRecord, statuses: &[String]) -> bool {
    match ad.effective_status.as_deref() {
        Some(status) if !statuses.is_empty() => statuses.iter().any(|s| s == status),
        _ => true,
    }
}

struct DemoAd {
    id: &'static str,
    name: &'static str,
    campaign: (&'static str, &'static str),
    adset: (&'static str, &'static str),
    spend: &'static str,
    impressions: &'static str,
    clicks: &'static str,
    reach: &'static str,
    purchases: &'static str,
    revenue: &'static str,
}

fn demo_ad(ad: DemoAd) -> RawAdRecord {
    let entity = |(id, name): (&str, &str)| RawEntityRef {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        status: Some("ACTIVE".to_string()),
    };

    let spend: f64 = ad.spend.parse().unwrap_or_default();
    let revenue: f64 = ad.revenue.parse().unwrap_or_default();
    let purchase_roas = if spend > 0.0 && revenue > 0.0 {
        vec![RawActionValue::new("omni_purchase", format!("{:.4}", revenue / spend))]
    } else {
        Vec::new()
    };

    RawAdRecord {
        id: Some(ad.id.to_string()),
        name: Some(ad.name.to_string()),
        status: Some("ACTIVE".to_string()),
        effective_status: Some("ACTIVE".to_string()),
        campaign: Some(entity(ad.campaign)),
        adset: Some(entity(ad.adset)),
        creative: Some(RawCreative {
            id: Some(format!("cr-{}", ad.id)),
            title: Some(ad.name.to_string()),
            thumbnail_url: Some(format!("https://cdn.example.com/creatives/{}.jpg", ad.id)),
            ..RawCreative::default()
        }),
        insights: Some(RawInsightsEnvelope {
            data: vec![RawInsight {
                spend: Some(Value::from(ad.spend)),
                impressions: Some(Value::from(ad.impressions)),
                clicks: Some(Value::from(ad.clicks)),
                reach: Some(Value::from(ad.reach)),
                purchase_roas,
                actions: vec![RawActionValue::new("purchase", ad.purchases)],
                action_values: vec![RawActionValue::new("purchase", ad.revenue)],
                ..RawInsight::default()
            }],
        }),
    }
}
