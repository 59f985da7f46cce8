//! Report assembler: combines overview, ranked hierarchy and trend into the
//! payload consumed by the dashboard.

use crate::aggregator::{self, AdReport, CampaignReport, FinalizedMetrics};
use crate::normalizer::{self, NormalizedAd};
use crate::ranking::{self, Kpi};
use crate::trend::{self, TrendPoint};
use adlens_core::types::{RawAdRecord, RawDailyRecord, ReportFilters};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    #[serde(rename = "cliente")]
    pub client: String,
    /// Upper-case KPI label.
    #[serde(rename = "kpi_analisado")]
    pub kpi: String,
    pub overview: FinalizedMetrics,
    pub trend: Vec<TrendPoint>,
    pub campaigns: Vec<CampaignReport>,
    /// Every ad ranked account-wide, one winner for the whole account.
    #[serde(rename = "anuncios")]
    pub ads: Vec<AdReport>,
    pub filters: ReportFilters,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// True when the period had no ads at all.
    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }
}

/// Everything the assembler needs for one report.
pub struct ReportInputs<'a> {
    pub client: &'a str,
    pub kpi: &'a Kpi,
    pub filters: &'a ReportFilters,
    pub ads: &'a [RawAdRecord],
    pub daily: &'a [RawDailyRecord],
    pub unknown_label: &'a str,
}

/// Run normalize → aggregate → rank → assemble over already-fetched data.
/// Pure apart from the `generated_at` timestamp.
pub fn build_report(inputs: ReportInputs<'_>) -> Report {
    let trend = trend::build_trend(inputs.daily);

    if inputs.ads.is_empty() {
        debug!(client = %inputs.client, "No ads in period, assembling empty report");
        return assemble(
            inputs.client,
            inputs.kpi,
            inputs.filters,
            FinalizedMetrics::default(),
            trend,
            Vec::new(),
            Vec::new(),
        );
    }

    let normalized: Vec<NormalizedAd> = inputs
        .ads
        .iter()
        .map(|record| normalizer::normalize_ad(record, inputs.unknown_label))
        .collect();

    let mut account_ranking: Vec<AdReport> = normalized.iter().cloned().map(AdReport::from).collect();
    ranking::rank_ads(&mut account_ranking, inputs.kpi.strategy);

    let mut aggregation = aggregator::aggregate(normalized, inputs.unknown_label);
    ranking::rank_hierarchy(&mut aggregation.campaigns, inputs.kpi.strategy);

    debug!(
        client = %inputs.client,
        ads = account_ranking.len(),
        campaigns = aggregation.campaigns.len(),
        days = trend.len(),
        "Report assembled"
    );

    assemble(
        inputs.client,
        inputs.kpi,
        inputs.filters,
        aggregation.overview,
        trend,
        aggregation.campaigns,
        account_ranking,
    )
}

fn assemble(
    client: &str,
    kpi: &Kpi,
    filters: &ReportFilters,
    overview: FinalizedMetrics,
    trend: Vec<TrendPoint>,
    campaigns: Vec<CampaignReport>,
    ads: Vec<AdReport>,
) -> Report {
    Report {
        client: client.to_string(),
        kpi: kpi.label.clone(),
        overview,
        trend,
        campaigns,
        ads,
        filters: filters.clone(),
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use adlens_core::types::{RawActionValue, RawEntityRef, RawInsight, RawInsightsEnvelope};
    use serde_json::json;

    fn raw_ad(id: &str, campaign: &str, adset: &str, spend: &str, roas: &str) -> RawAdRecord {
        RawAdRecord {
            id: Some(id.into()),
            name: Some(format!("Ad {id}")),
            status: Some("ACTIVE".into()),
            effective_status: Some("ACTIVE".into()),
            campaign: Some(RawEntityRef {
                id: Some(campaign.into()),
                name: Some(format!("Campaign {campaign}")),
                status: Some("ACTIVE".into()),
            }),
            adset: Some(RawEntityRef {
                id: Some(adset.into()),
                name: Some(format!("Set {adset}")),
                status: Some("ACTIVE".into()),
            }),
            creative: None,
            insights: Some(RawInsightsEnvelope {
                data: vec![RawInsight {
                    spend: Some(json!(spend)),
                    impressions: Some(json!("1000")),
                    purchase_roas: vec![RawActionValue::new("omni_purchase", roas)],
                    ..RawInsight::default()
                }],
            }),
        }
    }

    fn daily(date: &str) -> RawDailyRecord {
        RawDailyRecord {
            date_start: Some(date.into()),
            spend: Some(json!("10")),
            ..RawDailyRecord::default()
        }
    }

    fn build(ads: &[RawAdRecord], kpi: &str) -> Report {
        let kpi = Kpi::resolve(kpi);
        let filters = ReportFilters::default();
        build_report(ReportInputs {
            client: "Acme",
            kpi: &kpi,
            filters: &filters,
            ads,
            daily: &[daily("2024-01-02"), daily("2024-01-01")],
            unknown_label: "Unknown",
        })
    }

    #[test]
    fn test_empty_report_keeps_trend_and_client() {
        let report = build(&[], "roas");
        assert!(report.is_empty());
        assert!(report.ads.is_empty());
        assert_eq!(report.client, "Acme");
        assert_eq!(report.kpi, "ROAS");
        assert_eq!(report.overview.spend, Money::ZERO);
        assert_eq!(report.overview.roas, 0.0);
        assert_eq!(report.overview.cpa, 0.0);
        assert_eq!(report.overview.conversions, 0);
        assert_eq!(report.trend.len(), 2);
        assert_eq!(report.trend[0].date, "2024-01-01");
    }

    #[test]
    fn test_ranked_report() {
        let ads = vec![
            raw_ad("1", "c1", "s1", "100", "1.5"),
            raw_ad("2", "c1", "s1", "50", "3.0"),
            raw_ad("3", "c1", "s1", "25", "0"),
        ];
        let report = build(&ads, "Roas");
        assert_eq!(report.kpi, "ROAS");

        let set = &report.campaigns[0].adsets[0];
        let order: Vec<_> = set.ads.iter().map(|a| a.id.as_deref().unwrap()).collect();
        assert_eq!(order, vec!["2", "1", "3"]);
        assert!(set.ads[0].is_winner);
        assert_eq!(set.ads[0].score, 3);

        let flat: Vec<_> = report.ads.iter().map(|a| a.id.as_deref().unwrap()).collect();
        assert_eq!(flat, vec!["2", "1", "3"]);
        assert_eq!(report.ads.iter().filter(|a| a.is_winner).count(), 1);

        assert_eq!(report.overview.spend.as_f64(), 175.0);
        assert_eq!(report.overview.roas, 2.25);
    }

    #[test]
    fn test_one_winner_per_adset() {
        let ads = vec![
            raw_ad("1", "c1", "s1", "100", "1"),
            raw_ad("2", "c1", "s2", "50", "2"),
            raw_ad("3", "c2", "s3", "25", "3"),
        ];
        let report = build(&ads, "default");
        let winners = report
            .campaigns
            .iter()
            .flat_map(|c| c.adsets.iter())
            .filter(|s| s.ads.iter().filter(|a| a.is_winner).count() == 1)
            .count();
        assert_eq!(winners, 3);
        assert_eq!(report.kpi, "DEFAULT");
        assert_eq!(report.ads[0].id.as_deref(), Some("1"));
    }

    #[test]
    fn test_payload_is_finite_json() {
        let mut ad = raw_ad("1", "c1", "s1", "NaN", "Infinity");
        if let Some(env) = ad.insights.as_mut() {
            env.data[0].impressions = Some(json!("0"));
            env.data[0].reach = Some(json!("0"));
        }
        let report = build(&[ad], "cpa");
        let json = serde_json::to_value(&report).unwrap();

        fn assert_finite(v: &serde_json::Value) {
            match v {
                serde_json::Value::Number(n) => assert!(n.as_f64().unwrap().is_finite()),
                serde_json::Value::Array(items) => items.iter().for_each(assert_finite),
                serde_json::Value::Object(map) => map.values().for_each(assert_finite),
                _ => {}
            }
        }
        assert_finite(&json);
        assert!(json.get("cliente").is_some());
        assert!(json.get("anuncios").is_some());
        assert_eq!(json["kpi_analisado"], "CPA");
    }
}
