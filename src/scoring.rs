//! Crawl-priority scoring.
//!
//! `score` maps a [`SignalBundle`] to a [`ScoreResult`]: blocking rules first,
//! then a weighted positive/negative sum on a 0-200 scale, then bucketing.
//! No I/O, no clock, no randomness.

use crate::models::{Bucket, PageCandidate, PageType, ScoreBreakdown, ScoreResult, ScoreTerm, SignalBundle};
use crate::url_utils;

pub const W_BUSINESS_VALUE: f64 = 0.35;
pub const W_DEMAND: f64 = 0.25;
pub const W_GRAPH: f64 = 0.10;
pub const W_CLUSTER: f64 = 0.10;
pub const W_CONTENT: f64 = 0.20;

pub const W_DUPLICATION: f64 = 0.30;
pub const W_ORPHAN: f64 = 0.80;
pub const W_THIN_CONTENT: f64 = 0.20;
pub const W_CONFUSION: f64 = 1.00;

pub const CONFUSION_BLOCK_THRESHOLD: f64 = 50.0;

pub const EXCLUDE_BELOW: f64 = 60.0;
pub const NEW_AT_LEAST: f64 = 90.0;
pub const HOT_AT_LEAST: f64 = 120.0;
pub const STABLE_AT_LEAST: f64 = 90.0;

pub const MAX_TOTAL: f64 = 200.0;

/// Returns the first blocking rule the bundle trips, if any.
pub fn block_reason(signals: &SignalBundle) -> Option<String> {
    if signals.confusion_risk >= CONFUSION_BLOCK_THRESHOLD {
        return Some(format!(
            "confusion risk {:.0} >= {:.0}",
            signals.confusion_risk, CONFUSION_BLOCK_THRESHOLD
        ));
    }

    if let Some(robots) = &signals.meta_robots {
        if robots.to_ascii_lowercase().contains("noindex") {
            return Some(format!("meta robots \"{}\" contains noindex", robots));
        }
    }

    if signals.status_code != 200 {
        return Some(format!("non-200 status code: {}", signals.status_code));
    }

    // Only comparable when the serving URL is known.
    if let (Some(canonical), Some(own)) = (&signals.canonical_url, &signals.page_url) {
        if !canonical.trim().is_empty() && !url_utils::same_page(canonical, own) {
            return Some(format!("canonical points elsewhere: {}", canonical));
        }
    }

    None
}

/// Score a signal bundle. Out-of-range inputs are clamped first.
pub fn score(signals: &SignalBundle) -> ScoreResult {
    let s = signals.clamped();

    if let Some(reason) = block_reason(&s) {
        return ScoreResult {
            total: 0.0,
            normalized: 0,
            bucket: Bucket::Exclude,
            is_blocked: true,
            block_reason: Some(reason),
            breakdown: ScoreBreakdown {
                effective_confusion_risk: 100.0,
                ..Default::default()
            },
        };
    }

    let graph_norm = s.graph_strength.min(100.0);
    let cluster_norm = (s.cluster_depth as f64 * 10.0).min(100.0);

    let positive = vec![
        term("business_value", s.business_value * W_BUSINESS_VALUE),
        term("demand", s.demand * W_DEMAND),
        term("graph_strength", graph_norm * W_GRAPH),
        term("cluster_depth", cluster_norm * W_CLUSTER),
        term("content_strength", s.content_strength * W_CONTENT),
    ];
    let negative = vec![
        term("duplication_risk", s.duplication_risk * W_DUPLICATION),
        term("orphan_risk", s.orphan_risk * W_ORPHAN),
        term("thin_content_risk", s.thin_content_risk * W_THIN_CONTENT),
        term("confusion_risk", s.confusion_risk * W_CONFUSION),
    ];

    let positive_total: f64 = positive.iter().map(|t| t.value).sum();
    let negative_total: f64 = negative.iter().map(|t| t.value).sum();

    let total = ((positive_total - negative_total) * 2.0).clamp(0.0, MAX_TOTAL);
    let normalized = (total / MAX_TOTAL * 100.0).round() as u8;

    ScoreResult {
        total,
        normalized,
        bucket: bucket_for(total, false, s.is_recently_published),
        is_blocked: false,
        block_reason: None,
        breakdown: ScoreBreakdown {
            positive,
            negative,
            positive_total,
            negative_total,
            effective_confusion_risk: s.confusion_risk,
        },
    }
}

/// Score a catalog row, using its path as the serving URL when the bundle
/// does not carry one.
pub fn score_candidate(candidate: &PageCandidate) -> ScoreResult {
    if candidate.signals.page_url.is_some() {
        return score(&candidate.signals);
    }
    let mut signals = candidate.signals.clone();
    signals.page_url = Some(candidate.path.clone());
    score(&signals)
}

/// Bucket precedence: blocked/low, new, hot, stable, cold.
pub fn bucket_for(total: f64, is_blocked: bool, is_recently_published: bool) -> Bucket {
    if is_blocked || total < EXCLUDE_BELOW {
        Bucket::Exclude
    } else if is_recently_published && total >= NEW_AT_LEAST {
        Bucket::New
    } else if total >= HOT_AT_LEAST {
        Bucket::Hot
    } else if total >= STABLE_AT_LEAST {
        Bucket::Stable
    } else {
        Bucket::Cold
    }
}

fn term(name: &str, value: f64) -> ScoreTerm {
    ScoreTerm {
        name: name.to_string(),
        value,
    }
}

/// Supplies the heuristic inputs that are not yet measured per page.
///
/// `business_value`, `demand` and `content_strength` are fixed per page type
/// until real analytics feed them; implementations can replace that.
pub trait SignalEstimator: Send + Sync {
    fn business_value(&self, page_type: PageType) -> f64;
    fn demand(&self, page_type: PageType) -> f64;
    fn content_strength(&self, page_type: PageType) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderEstimator;

impl SignalEstimator for PlaceholderEstimator {
    fn business_value(&self, page_type: PageType) -> f64 {
        match page_type {
            PageType::Home => 100.0,
            PageType::Category => 80.0,
            PageType::Vehicle => 70.0,
            PageType::Piece => 60.0,
            PageType::Blog => 40.0,
            PageType::Page => 30.0,
        }
    }

    fn demand(&self, page_type: PageType) -> f64 {
        match page_type {
            PageType::Home => 100.0,
            PageType::Category => 70.0,
            PageType::Vehicle => 60.0,
            PageType::Piece => 50.0,
            PageType::Blog => 40.0,
            PageType::Page => 20.0,
        }
    }

    fn content_strength(&self, page_type: PageType) -> f64 {
        match page_type {
            PageType::Home => 80.0,
            PageType::Blog => 70.0,
            PageType::Category => 60.0,
            PageType::Vehicle | PageType::Piece | PageType::Page => 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong_bundle() -> SignalBundle {
        SignalBundle {
            business_value: 90.0,
            demand: 80.0,
            graph_strength: 60.0,
            cluster_depth: 5,
            content_strength: 70.0,
            status_code: 200,
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_bundle_is_hot() {
        let result = score(&strong_bundle());
        assert_eq!(result.bucket, Bucket::Hot);
        assert!(!result.is_blocked);
        assert!(result.block_reason.is_none());
        assert!((result.total - 153.0).abs() < 1e-9);
        assert_eq!(result.normalized, 77);
    }

    #[test]
    fn test_reference_bundle_with_404_is_excluded() {
        let mut bundle = strong_bundle();
        bundle.status_code = 404;
        let result = score(&bundle);
        assert_eq!(result.bucket, Bucket::Exclude);
        assert!(result.is_blocked);
        let reason = result.block_reason.unwrap();
        assert!(reason.contains("status"));
        assert!(reason.contains("404"));
        assert_eq!(result.breakdown.effective_confusion_risk, 100.0);
    }

    #[test]
    fn test_all_zero_is_excluded() {
        let result = score(&SignalBundle::default());
        assert_eq!(result.total, 0.0);
        assert_eq!(result.bucket, Bucket::Exclude);
        assert!(!result.is_blocked);
    }

    #[test]
    fn test_maximal_positive_is_hot() {
        let bundle = SignalBundle {
            business_value: 100.0,
            demand: 100.0,
            graph_strength: 100.0,
            cluster_depth: 10,
            content_strength: 100.0,
            ..Default::default()
        };
        let result = score(&bundle);
        assert_eq!(result.total, 200.0);
        assert_eq!(result.normalized, 100);
        assert_eq!(result.bucket, Bucket::Hot);
    }

    #[test]
    fn test_status_block_wins_over_perfect_signals() {
        for status in [0u16, 301, 302, 404, 410, 500] {
            let bundle = SignalBundle {
                business_value: 100.0,
                demand: 100.0,
                graph_strength: 100.0,
                cluster_depth: 50,
                content_strength: 100.0,
                is_recently_published: true,
                status_code: status,
                ..Default::default()
            };
            assert_eq!(score(&bundle).bucket, Bucket::Exclude, "status {}", status);
        }
    }

    #[test]
    fn test_noindex_is_case_insensitive() {
        let mut bundle = strong_bundle();
        bundle.meta_robots = Some("index, NoIndex".to_string());
        let result = score(&bundle);
        assert!(result.is_blocked);
        assert!(result.block_reason.unwrap().contains("noindex"));
    }

    #[test]
    fn test_confusion_threshold() {
        let mut bundle = strong_bundle();
        bundle.confusion_risk = 49.0;
        assert!(!score(&bundle).is_blocked);
        bundle.confusion_risk = 50.0;
        assert!(score(&bundle).is_blocked);
    }

    #[test]
    fn test_canonical_elsewhere_blocks() {
        let mut bundle = strong_bundle();
        bundle.page_url = Some("/pieces/a.html".to_string());
        bundle.canonical_url = Some("https://www.example.com/pieces/a.html".to_string());
        assert!(!score(&bundle).is_blocked);

        bundle.canonical_url = Some("https://www.example.com/pieces/b.html".to_string());
        let result = score(&bundle);
        assert!(result.is_blocked);
        assert!(result.block_reason.unwrap().contains("canonical"));
    }

    #[test]
    fn test_canonical_query_string_is_significant() {
        let mut bundle = strong_bundle();
        bundle.page_url = Some("/recherche?marque=renault".to_string());
        bundle.canonical_url = Some("https://www.example.com/recherche".to_string());
        assert!(score(&bundle).is_blocked);

        bundle.canonical_url = Some("https://www.example.com/recherche?marque=renault".to_string());
        assert!(!score(&bundle).is_blocked);
    }

    #[test]
    fn test_score_candidate_uses_path_for_canonical_check() {
        let mut signals = strong_bundle();
        signals.canonical_url = Some("/pieces/other.html".to_string());
        let candidate = PageCandidate::new("/pieces/a.html", PageType::Piece).with_signals(signals);
        assert!(score_candidate(&candidate).is_blocked);
    }

    #[test]
    fn test_recently_published_goes_new_before_hot() {
        let mut bundle = strong_bundle();
        bundle.is_recently_published = true;
        assert_eq!(score(&bundle).bucket, Bucket::New);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(bucket_for(59.9, false, false), Bucket::Exclude);
        assert_eq!(bucket_for(60.0, false, false), Bucket::Cold);
        assert_eq!(bucket_for(89.9, false, true), Bucket::Cold);
        assert_eq!(bucket_for(90.0, false, true), Bucket::New);
        assert_eq!(bucket_for(90.0, false, false), Bucket::Stable);
        assert_eq!(bucket_for(120.0, false, false), Bucket::Hot);
        assert_eq!(bucket_for(200.0, true, false), Bucket::Exclude);
    }

    #[test]
    fn test_risk_floors_total_at_zero() {
        let bundle = SignalBundle {
            business_value: 10.0,
            orphan_risk: 100.0,
            ..Default::default()
        };
        let result = score(&bundle);
        assert_eq!(result.total, 0.0);
        assert!(result.breakdown.negative_total > result.breakdown.positive_total);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let bundle = SignalBundle {
            business_value: 1000.0,
            demand: 1000.0,
            graph_strength: 1000.0,
            cluster_depth: 1000,
            content_strength: 1000.0,
            ..Default::default()
        };
        assert_eq!(score(&bundle).total, 200.0);
    }

    #[test]
    fn test_determinism() {
        let bundle = strong_bundle();
        let first = score(&bundle);
        for _ in 0..100 {
            assert_eq!(score(&bundle), first);
        }
    }

    #[test]
    fn test_breakdown_names_every_term() {
        let result = score(&strong_bundle());
        let names: Vec<&str> = result.breakdown.positive.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["business_value", "demand", "graph_strength", "cluster_depth", "content_strength"]
        );
        assert_eq!(result.breakdown.negative.len(), 4);
    }

    #[test]
    fn test_placeholder_estimator_ranks_home_first() {
        let est = PlaceholderEstimator;
        assert!(est.business_value(PageType::Home) > est.business_value(PageType::Page));
        assert!(est.demand(PageType::Category) > est.demand(PageType::Blog));
    }
}
