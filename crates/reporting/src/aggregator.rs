//! Hierarchy aggregator: rolls normalized ads up into
//! campaign → ad set → ad, plus an account-wide overview.
//!
//! Accumulators are private working state. Callers only ever see
//! [`FinalizedMetrics`], produced by a pure conversion once every ad has
//! been added.

use crate::money::Money;
use crate::normalizer::{
    cost_per_acquisition, ratio, CreativeSummary, EntityIdentity, NormalizedAd, NormalizedMetrics,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

// ─── Output types ───────────────────────────────────────────────────────────

/// Metrics of a campaign, ad set or the overview after finalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinalizedMetrics {
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
    pub conversions: u64,
}

/// One ad in the report tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdReport {
    pub id: Option<String>,
    pub name: String,
    pub status: Option<String>,
    pub effective_status: Option<String>,
    pub creative: CreativeSummary,
    #[serde(rename = "metricas")]
    pub metrics: NormalizedMetrics,
    pub score: usize,
    pub is_winner: bool,
}

impl From<NormalizedAd> for AdReport {
    fn from(ad: NormalizedAd) -> Self {
        Self {
            id: ad.id,
            name: ad.name,
            status: ad.status,
            effective_status: ad.effective_status,
            creative: ad.creative,
            metrics: ad.metrics,
            score: 0,
            is_winner: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdSetReport {
    /// `None` for the bucket of ads without an ad set.
    pub adset_id: Option<String>,
    pub adset_name: String,
    pub status: Option<String>,
    #[serde(rename = "metricas")]
    pub metrics: FinalizedMetrics,
    pub ads: Vec<AdReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignReport {
    /// `None` for the bucket of ads without a campaign.
    pub campaign_id: Option<String>,
    pub campaign_name: String,
    pub status: Option<String>,
    #[serde(rename = "metricas")]
    pub metrics: FinalizedMetrics,
    pub adsets: Vec<AdSetReport>,
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub overview: FinalizedMetrics,
    pub campaigns: Vec<CampaignReport>,
}

// ─── Accumulator ────────────────────────────────────────────────────────────

/// Running sums for one node of the hierarchy.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    spend: Money,
    clicks: f64,
    impressions: f64,
    reach: f64,
    roas_sum: f64,
    roas_count: u32,
    /// Sum of `spend / cpa` over converting ads. Rounded only in `finalize`.
    conversions: f64,
}

impl Accumulator {
    fn add(&mut self, m: &NormalizedMetrics) {
        self.spend += m.spend;
        self.clicks += m.clicks;
        self.impressions += m.impressions;
        self.reach += m.reach;
        if m.roas != 0.0 {
            self.roas_sum += m.roas;
            self.roas_count += 1;
        }
        if m.cpa > 0.0 {
            self.conversions += m.spend.as_f64() / m.cpa;
        }
    }

    fn finalize(&self) -> FinalizedMetrics {
        let conversions = self.conversions.round();
        let spend = self.spend.as_f64();
        FinalizedMetrics {
            spend: self.spend,
            clicks: self.clicks,
            impressions: self.impressions,
            reach: self.reach,
            ctr: ratio(self.clicks, self.impressions, 100.0),
            cpm: ratio(spend, self.impressions, 1000.0),
            frequency: ratio(self.impressions, self.reach, 1.0),
            roas: ratio(self.roas_sum, f64::from(self.roas_count), 1.0),
            cpa: cost_per_acquisition(spend, conversions),
            conversions: if conversions > 0.0 { conversions as u64 } else { 0 },
        }
    }
}

/// Bucket key. Ads without an id share one synthetic bucket per level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum BucketKey {
    Id(String),
    Missing,
}

impl BucketKey {
    fn of(identity: &EntityIdentity) -> Self {
        match &identity.id {
            Some(id) => BucketKey::Id(id.clone()),
            None => BucketKey::Missing,
        }
    }

    fn id(&self) -> Option<String> {
        match self {
            BucketKey::Id(id) => Some(id.clone()),
            BucketKey::Missing => None,
        }
    }
}

struct AdSetNode {
    key: BucketKey,
    name: Option<String>,
    status: Option<String>,
    acc: Accumulator,
    ads: Vec<NormalizedAd>,
}

struct CampaignNode {
    key: BucketKey,
    name: Option<String>,
    status: Option<String>,
    acc: Accumulator,
    adsets: Vec<AdSetNode>,
    adset_index: HashMap<BucketKey, usize>,
}

// ─── Aggregation ────────────────────────────────────────────────────────────

/// Group ads by campaign and ad set, accumulate sums and finalize every
/// level. Children are ordered by spend descending; ties keep first-seen
/// order. `unknown_label` names buckets and entities without a name.
pub fn aggregate(ads: Vec<NormalizedAd>, unknown_label: &str) -> Aggregation {
    let mut overview = Accumulator::default();
    let mut campaigns: Vec<CampaignNode> = Vec::new();
    let mut campaign_index: HashMap<BucketKey, usize> = HashMap::new();

    for ad in ads {
        overview.add(&ad.metrics);

        let campaign_key = BucketKey::of(&ad.campaign);
        let ci = *campaign_index.entry(campaign_key.clone()).or_insert_with(|| {
            campaigns.push(CampaignNode {
                key: campaign_key,
                name: None,
                status: None,
                acc: Accumulator::default(),
                adsets: Vec::new(),
                adset_index: HashMap::new(),
            });
            campaigns.len() - 1
        });
        let campaign = &mut campaigns[ci];
        campaign.acc.add(&ad.metrics);
        if campaign.name.is_none() {
            campaign.name = ad.campaign.name.clone();
        }
        if campaign.status.is_none() {
            campaign.status = ad.campaign.status.clone();
        }

        let adset_key = BucketKey::of(&ad.adset);
        let adsets = &mut campaign.adsets;
        let ai = *campaign.adset_index.entry(adset_key.clone()).or_insert_with(|| {
            adsets.push(AdSetNode {
                key: adset_key,
                name: None,
                status: None,
                acc: Accumulator::default(),
                ads: Vec::new(),
            });
            adsets.len() - 1
        });
        let adset = &mut adsets[ai];
        adset.acc.add(&ad.metrics);
        if adset.name.is_none() {
            adset.name = ad.adset.name.clone();
        }
        if adset.status.is_none() {
            adset.status = ad.adset.status.clone();
        }
        adset.ads.push(ad);
    }

    let mut campaigns: Vec<CampaignReport> = campaigns
        .into_iter()
        .map(|node| finalize_campaign(node, unknown_label))
        .collect();
    campaigns.sort_by(|a, b| by_spend_desc(a.metrics.spend, b.metrics.spend));

    Aggregation {
        overview: overview.finalize(),
        campaigns,
    }
}

fn finalize_campaign(node: CampaignNode, unknown_label: &str) -> CampaignReport {
    let mut adsets: Vec<AdSetReport> = node
        .adsets
        .into_iter()
        .map(|adset| finalize_adset(adset, unknown_label))
        .collect();
    adsets.sort_by(|a, b| by_spend_desc(a.metrics.spend, b.metrics.spend));

    CampaignReport {
        campaign_id: node.key.id(),
        campaign_name: node.name.unwrap_or_else(|| unknown_label.to_string()),
        status: node.status,
        metrics: node.acc.finalize(),
        adsets,
    }
}

fn finalize_adset(node: AdSetNode, unknown_label: &str) -> AdSetReport {
    let mut ads: Vec<AdReport> = node.ads.into_iter().map(AdReport::from).collect();
    ads.sort_by(|a, b| by_spend_desc(a.metrics.spend, b.metrics.spend));

    AdSetReport {
        adset_id: node.key.id(),
        adset_name: node.name.unwrap_or_else(|| unknown_label.to_string()),
        status: node.status,
        metrics: node.acc.finalize(),
        ads,
    }
}

pub(crate) fn by_spend_desc(a: Money, b: Money) -> Ordering {
    b.cmp(&a)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ad(id: &str, campaign: Option<&str>, adset: Option<&str>, m: NormalizedMetrics) -> NormalizedAd {
        NormalizedAd {
            id: Some(id.to_string()),
            name: format!("Ad {id}"),
            status: Some("ACTIVE".into()),
            effective_status: Some("ACTIVE".into()),
            campaign: EntityIdentity {
                id: campaign.map(String::from),
                name: campaign.map(|c| format!("Campaign {c}")),
                status: Some("ACTIVE".into()),
            },
            adset: EntityIdentity {
                id: adset.map(String::from),
                name: adset.map(|a| format!("Set {a}")),
                status: Some("ACTIVE".into()),
            },
            creative: CreativeSummary::default(),
            metrics: m,
        }
    }

    fn spend(spend: f64) -> NormalizedMetrics {
        NormalizedMetrics {
            spend: Money::from_major(spend),
            ..NormalizedMetrics::default()
        }
    }

    fn sample() -> Vec<NormalizedAd> {
        vec![
            ad("1", Some("c1"), Some("s1"), NormalizedMetrics {
                spend: Money::from_major(100.0),
                clicks: 10.0,
                impressions: 1000.0,
                reach: 500.0,
                roas: 2.0,
                cpa: 25.0,
                ..NormalizedMetrics::default()
            }),
            ad("2", Some("c1"), Some("s2"), NormalizedMetrics {
                spend: Money::from_major(50.0),
                clicks: 5.0,
                impressions: 1000.0,
                reach: 500.0,
                roas: 4.0,
                cpa: 10.0,
                ..NormalizedMetrics::default()
            }),
            ad("3", Some("c2"), Some("s3"), NormalizedMetrics {
                spend: Money::from_major(300.0),
                impressions: 2000.0,
                reach: 2000.0,
                ..NormalizedMetrics::default()
            }),
            ad("4", Some("c1"), Some("s1"), spend(20.0)),
        ]
    }

    #[test]
    fn test_hierarchy_shape_and_ordering() {
        let agg = aggregate(sample(), "Unknown");
        let ids: Vec<_> = agg.campaigns.iter().map(|c| c.campaign_id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);

        let c1 = &agg.campaigns[1];
        assert_eq!(c1.campaign_name, "Campaign c1");
        let sets: Vec<_> = c1.adsets.iter().map(|s| s.adset_id.clone().unwrap()).collect();
        assert_eq!(sets, vec!["s1", "s2"]);

        let s1 = &c1.adsets[0];
        let ads: Vec<_> = s1.ads.iter().map(|a| a.id.clone().unwrap()).collect();
        assert_eq!(ads, vec!["1", "4"]);
    }

    #[test]
    fn test_sum_invariant() {
        let agg = aggregate(sample(), "Unknown");
        for campaign in &agg.campaigns {
            let from_sets: Money = campaign.adsets.iter().map(|s| s.metrics.spend).sum();
            let from_ads: Money = campaign
                .adsets
                .iter()
                .flat_map(|s| s.ads.iter())
                .map(|a| a.metrics.spend)
                .sum();
            assert_eq!(campaign.metrics.spend, from_sets);
            assert_eq!(campaign.metrics.spend, from_ads);
        }
        assert_eq!(agg.overview.spend, Money::from_major(470.0));
    }

    #[test]
    fn test_sum_invariant_with_cents() {
        let ads = vec![
            ad("1", Some("c"), Some("s1"), spend(0.10)),
            ad("2", Some("c"), Some("s2"), spend(0.10)),
            ad("3", Some("c"), Some("s1"), spend(1.10)),
            ad("4", Some("c"), Some("s3"), spend(0.20)),
            ad("5", Some("c"), Some("s2"), spend(0.70)),
        ];
        let agg = aggregate(ads, "Unknown");
        let c = &agg.campaigns[0];

        let from_sets: Money = c.adsets.iter().map(|s| s.metrics.spend).sum();
        let from_ads: Money = c.adsets.iter().flat_map(|s| &s.ads).map(|a| a.metrics.spend).sum();
        assert_eq!(c.metrics.spend, from_sets);
        assert_eq!(c.metrics.spend, from_ads);
        assert_eq!(c.metrics.spend.minor(), 220);
        assert_eq!(agg.overview.spend, c.metrics.spend);

        let json = serde_json::to_value(&c.metrics).unwrap();
        assert_eq!(json["spend"], serde_json::json!(2.2));
        assert_eq!(c.adsets[0].metrics.spend.as_f64(), 1.2);
    }

    #[test]
    fn test_finalized_ratios() {
        let agg = aggregate(sample(), "Unknown");
        let c1 = agg.campaigns.iter().find(|c| c.campaign_id.as_deref() == Some("c1")).unwrap();
        // 100/25 + 50/10 = 9 conversions over 170 spend.
        assert_eq!(c1.metrics.conversions, 9);
        assert!((c1.metrics.cpa - 170.0 / 9.0).abs() < 1e-9);
        assert_eq!(c1.metrics.roas, 3.0);
        assert!((c1.metrics.ctr - 0.75).abs() < 1e-9);
        assert!((c1.metrics.cpm - 85.0).abs() < 1e-9);
        assert_eq!(c1.metrics.frequency, 2.0);
    }

    #[test]
    fn test_overview_roas_is_mean_of_nonzero() {
        let agg = aggregate(sample(), "Unknown");
        assert_eq!(agg.overview.roas, 3.0);

        let all_zero = vec![ad("1", Some("c"), Some("s"), spend(10.0)), ad("2", None, None, spend(5.0))];
        let agg = aggregate(all_zero, "Unknown");
        assert_eq!(agg.overview.roas, 0.0);
        assert_eq!(agg.overview.cpa, 0.0);
        assert_eq!(agg.overview.conversions, 0);
    }

    #[test]
    fn test_conversions_rounded_once() {
        // Three ads at 1/3 of a conversion each: rounding per ad would give 0.
        let third = NormalizedMetrics {
            spend: Money::from_major(10.0),
            cpa: 30.0,
            ..NormalizedMetrics::default()
        };
        let ads = (0..3).map(|i| ad(&i.to_string(), Some("c"), Some("s"), third.clone())).collect();
        let agg = aggregate(ads, "Unknown");
        assert_eq!(agg.overview.conversions, 1);
        assert_eq!(agg.overview.cpa, 30.0);
    }

    #[test]
    fn test_missing_ids_share_sentinel_buckets() {
        let ads = vec![
            ad("1", None, None, spend(5.0)),
            ad("2", None, Some("s9"), spend(7.0)),
            ad("3", None, None, spend(1.0)),
            ad("4", Some("c1"), None, spend(2.0)),
        ];
        let agg = aggregate(ads, "Unknown");
        assert_eq!(agg.campaigns.len(), 2);

        let orphan = &agg.campaigns[0];
        assert!(orphan.campaign_id.is_none());
        assert_eq!(orphan.campaign_name, "Unknown");
        assert_eq!(orphan.metrics.spend, Money::from_major(13.0));
        assert_eq!(orphan.adsets.len(), 2);
        assert_eq!(orphan.adsets[0].adset_id.as_deref(), Some("s9"));
        assert!(orphan.adsets[1].adset_id.is_none());
        assert_eq!(orphan.adsets[1].adset_name, "Unknown");
        assert_eq!(orphan.adsets[1].ads.len(), 2);

        // The no-ad-set bucket is per campaign.
        assert!(agg.campaigns[1].adsets[0].adset_id.is_none());
    }

    #[test]
    fn test_spend_ties_keep_input_order() {
        let ads = vec![
            ad("a", Some("c"), Some("s"), spend(10.0)),
            ad("b", Some("c"), Some("s"), spend(10.0)),
            ad("c", Some("c"), Some("s"), spend(10.0)),
        ];
        let agg = aggregate(ads, "Unknown");
        let order: Vec<_> = agg.campaigns[0].adsets[0].ads.iter().map(|a| a.id.clone().unwrap()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_idempotent() {
        let first = aggregate(sample(), "Unknown");
        let second = aggregate(sample(), "Unknown");
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.campaigns).unwrap(),
            serde_json::to_string(&second.campaigns).unwrap()
        );
    }

    #[test]
    fn test_empty_input() {
        let agg = aggregate(Vec::new(), "Unknown");
        assert!(agg.campaigns.is_empty());
        assert_eq!(agg.overview, FinalizedMetrics::default());
    }

    #[test]
    fn test_wire_names() {
        let agg = aggregate(sample(), "Unknown");
        let json = serde_json::to_value(&agg.campaigns[0]).unwrap();
        assert!(json.get("metricas").is_some());
        assert!(json["metricas"].get("conversoes").is_some());
        assert!(json["metricas"].get("roas_sum").is_none());
        assert!(json["adsets"][0]["ads"][0].get("is_winner").is_some());
    }
}
