//! KPI ranking: orders ads by the report's chosen KPI and marks a winner.

use crate::aggregator::{AdReport, CampaignReport};
use crate::normalizer::NormalizedMetrics;
use serde::Serialize;
use std::cmp::Ordering;

/// How ads are ordered for a KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
    /// Higher ROAS first.
    RoasDesc,
    /// Lower CPA first. A CPA of 0 means no measurable conversions and always
    /// ranks after every positive CPA.
    CpaAscZeroLast,
    /// Higher CTR first.
    CtrDesc,
    /// More clicks first.
    ClicksDesc,
    /// Unrecognized KPI: whoever spent more stays on top.
    SpendDescFallback,
}

impl RankingStrategy {
    /// Map a KPI name (any case) to its strategy. Unknown names fall back to
    /// spend ordering.
    pub fn for_kpi(kpi: &str) -> Self {
        match kpi.trim().to_ascii_lowercase().as_str() {
            "roas" => RankingStrategy::RoasDesc,
            "cpa" => RankingStrategy::CpaAscZeroLast,
            "ctr" => RankingStrategy::CtrDesc,
            "cliques" | "clicks" => RankingStrategy::ClicksDesc,
            _ => RankingStrategy::SpendDescFallback,
        }
    }

    /// `Less` means `a` ranks ahead of `b`.
    pub fn compare(&self, a: &NormalizedMetrics, b: &NormalizedMetrics) -> Ordering {
        match self {
            RankingStrategy::RoasDesc => b.roas.total_cmp(&a.roas),
            RankingStrategy::CpaAscZeroLast => cpa_zero_last(a.cpa, b.cpa),
            RankingStrategy::CtrDesc => b.ctr.total_cmp(&a.ctr),
            RankingStrategy::ClicksDesc => b.clicks.total_cmp(&a.clicks),
            RankingStrategy::SpendDescFallback => b.spend.cmp(&a.spend),
        }
    }
}

fn cpa_zero_last(a: f64, b: f64) -> Ordering {
    match (a == 0.0, b == 0.0) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

/// A KPI as requested, with its display label and ranking strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kpi {
    /// Upper-case form of the requested KPI, e.g. `ROAS`.
    pub label: String,
    pub strategy: RankingStrategy,
}

impl Kpi {
    /// The label is the requested KPI upper-cased, whatever the strategy.
    pub fn resolve(requested: &str) -> Self {
        let label = requested.trim().to_uppercase();
        Self {
            strategy: RankingStrategy::for_kpi(&label),
            label,
        }
    }
}

/// Sort ads best-first (stable: ties keep input order), then score them
/// `len - rank` and flag rank 0 as the winner. An empty slice is a no-op.
pub fn rank_ads(ads: &mut [AdReport], strategy: RankingStrategy) {
    ads.sort_by(|a, b| strategy.compare(&a.metrics, &b.metrics));
    let total = ads.len();
    for (rank, ad) in ads.iter_mut().enumerate() {
        ad.score = total - rank;
        ad.is_winner = rank == 0;
    }
}

/// Rank the ads of every ad set independently, one winner per ad set.
pub fn rank_hierarchy(campaigns: &mut [CampaignReport], strategy: RankingStrategy) {
    for campaign in campaigns.iter_mut() {
        for adset in campaign.adsets.iter_mut() {
            rank_ads(&mut adset.ads, strategy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::normalizer::CreativeSummary;

    fn ad(id: &str, m: NormalizedMetrics) -> AdReport {
        AdReport {
            id: Some(id.to_string()),
            name: id.to_string(),
            status: None,
            effective_status: None,
            creative: CreativeSummary::default(),
            metrics: m,
            score: 0,
            is_winner: false,
        }
    }

    fn order(ads: &[AdReport]) -> Vec<&str> {
        ads.iter().map(|a| a.id.as_deref().unwrap()).collect()
    }

    fn with_cpa(cpa: f64) -> NormalizedMetrics {
        NormalizedMetrics { cpa, ..NormalizedMetrics::default() }
    }

    #[test]
    fn test_strategy_mapping() {
        assert_eq!(RankingStrategy::for_kpi("ROAS"), RankingStrategy::RoasDesc);
        assert_eq!(RankingStrategy::for_kpi(" Cpa "), RankingStrategy::CpaAscZeroLast);
        assert_eq!(RankingStrategy::for_kpi("ctr"), RankingStrategy::CtrDesc);
        assert_eq!(RankingStrategy::for_kpi("CLIQUES"), RankingStrategy::ClicksDesc);
        assert_eq!(RankingStrategy::for_kpi("clicks"), RankingStrategy::ClicksDesc);
        assert_eq!(RankingStrategy::for_kpi("cpm"), RankingStrategy::SpendDescFallback);
        assert_eq!(RankingStrategy::for_kpi(""), RankingStrategy::SpendDescFallback);
    }

    #[test]
    fn test_kpi_label_is_upper_case() {
        assert_eq!(Kpi::resolve("roas").label, "ROAS");
        assert_eq!(Kpi::resolve("Cliques").label, "CLIQUES");
        assert_eq!(Kpi::resolve("whatever").label, "WHATEVER");
        assert_eq!(Kpi::resolve("whatever").strategy, RankingStrategy::SpendDescFallback);
        assert_eq!(Kpi::resolve(" ctr ").label, "CTR");
        assert_eq!(Kpi::resolve("  ").label, "");
        assert_eq!(Kpi::resolve("  ").strategy, RankingStrategy::SpendDescFallback);
    }

    #[test]
    fn test_cpa_zero_ranks_last() {
        let mut ads = vec![ad("A", with_cpa(0.0)), ad("B", with_cpa(30.0)), ad("C", with_cpa(10.0))];
        rank_ads(&mut ads, RankingStrategy::CpaAscZeroLast);
        assert_eq!(order(&ads), vec!["C", "B", "A"]);
        assert!(ads[0].is_winner);
    }

    #[test]
    fn test_cpa_zero_last_regardless_of_position() {
        let mut ads = vec![
            ad("B", with_cpa(30.0)),
            ad("Z1", with_cpa(0.0)),
            ad("C", with_cpa(10.0)),
            ad("Z2", with_cpa(0.0)),
        ];
        rank_ads(&mut ads, RankingStrategy::CpaAscZeroLast);
        assert_eq!(order(&ads), vec!["C", "B", "Z1", "Z2"]);
    }

    #[test]
    fn test_roas_descending() {
        let roas = |r: f64| NormalizedMetrics { roas: r, ..NormalizedMetrics::default() };
        let mut ads = vec![ad("low", roas(1.5)), ad("high", roas(3.0)), ad("none", roas(0.0))];
        rank_ads(&mut ads, RankingStrategy::RoasDesc);
        assert_eq!(order(&ads), vec!["high", "low", "none"]);
        assert!(ads[0].is_winner);
        assert!(!ads[1].is_winner && !ads[2].is_winner);
    }

    #[test]
    fn test_fallback_orders_by_spend_and_scores() {
        let spend = |s: f64| NormalizedMetrics { spend: Money::from_major(s), ..NormalizedMetrics::default() };
        let mut ads = vec![ad("50", spend(50.0)), ad("100", spend(100.0)), ad("25", spend(25.0))];
        rank_ads(&mut ads, RankingStrategy::for_kpi("unknown"));
        assert_eq!(order(&ads), vec!["100", "50", "25"]);
        let scores: Vec<_> = ads.iter().map(|a| a.score).collect();
        assert_eq!(scores, vec![3, 2, 1]);
        assert!(ads[0].is_winner);
    }

    #[test]
    fn test_ties_preserve_input_order() {
        let ctr = |c: f64| NormalizedMetrics { ctr: c, ..NormalizedMetrics::default() };
        let mut ads = vec![ad("a", ctr(1.0)), ad("b", ctr(2.0)), ad("c", ctr(1.0)), ad("d", ctr(2.0))];
        rank_ads(&mut ads, RankingStrategy::CtrDesc);
        assert_eq!(order(&ads), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_clicks_descending() {
        let clicks = |c: f64| NormalizedMetrics { clicks: c, ..NormalizedMetrics::default() };
        let mut ads = vec![ad("few", clicks(3.0)), ad("many", clicks(90.0))];
        rank_ads(&mut ads, RankingStrategy::ClicksDesc);
        assert_eq!(order(&ads), vec!["many", "few"]);
    }

    #[test]
    fn test_empty_set_has_no_winner() {
        let mut ads: Vec<AdReport> = Vec::new();
        rank_ads(&mut ads, RankingStrategy::RoasDesc);
        assert!(ads.is_empty());
    }
}
