//! Ensemble reconciliation: run every detector over a text unit and merge
//! overlapping raw detections into one deduplicated, confidence-ranked
//! report.

use futures::future::join_all;
use tracing::{debug, warn};

use veil_core::EntitySpan;

use crate::pool::DetectorPool;

/// Runs the detector pool and reconciles overlapping detections.
pub struct EnsembleReconciler {
    pool: DetectorPool,
}

impl EnsembleReconciler {
    pub fn new(pool: DetectorPool) -> Self {
        Self { pool }
    }

    /// Produce the reconciled PII report for one text unit.
    ///
    /// Every detector is invoked independently; a failing detector is logged
    /// and dropped from this call, so one outage never aborts detection. The
    /// returned report is sorted ascending by span start.
    pub async fn reconcile(&self, text: &str) -> Vec<EntitySpan> {
        if text.is_empty() {
            return Vec::new();
        }

        let invocations = self.pool.detectors().iter().map(|detector| async move {
            (detector.name().to_string(), detector.detect(text).await)
        });

        let mut raw = Vec::new();
        for (name, outcome) in join_all(invocations).await {
            match outcome {
                Ok(spans) => {
                    debug!(detector = %name, entity_count = spans.len(), "Detector returned");
                    raw.extend(spans);
                }
                Err(e) => {
                    warn!(detector = %name, error = %e, "Detector failed, dropping its contribution");
                }
            }
        }

        let mut report = merge_overlapping(raw);
        // The sweep already yields ascending starts; re-sort as a final
        // guarantee (stable, so tie order is preserved).
        report.sort_by_key(|s| s.start);
        report
    }
}

/// Merge overlapping spans from different detectors into representatives.
///
/// Spans are stable-sorted by start, then swept left to right. A cluster is
/// anchored on its first span: the next span joins while it overlaps the
/// anchor's interval, and the first non-overlapping span closes the cluster.
/// A chain A-B-C where only B overlaps both is still one cluster anchored on
/// A; consumers depend on this grouping, so it is kept as-is.
pub fn merge_overlapping(mut spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
    if spans.is_empty() {
        return spans;
    }

    spans.sort_by_key(|s| s.start);

    let mut merged = Vec::with_capacity(spans.len());
    let mut i = 0;
    while i < spans.len() {
        let anchor_start = spans[i].start;
        let anchor_end = spans[i].end;

        let mut j = i + 1;
        while j < spans.len() && spans[j].start < anchor_end && spans[j].end > anchor_start {
            j += 1;
        }

        let cluster = &spans[i..j];
        if cluster.len() == 1 {
            merged.push(cluster[0].clone());
        } else {
            // Representative: strictly highest confidence, first-seen wins ties
            let mut best = 0;
            for (k, member) in cluster.iter().enumerate().skip(1) {
                if member.confidence > cluster[best].confidence {
                    best = k;
                }
            }

            let mut representative = cluster[best].clone();
            representative.contributing_sources =
                Some(cluster.iter().map(|m| m.source.clone()).collect());
            representative.agreement_count = Some(cluster.len());
            representative.average_confidence =
                Some(cluster.iter().map(|m| m.confidence).sum::<f64>() / cluster.len() as f64);
            merged.push(representative);
        }

        i = j;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailingDetector, StaticDetector};
    use crate::phone::PhoneHeuristicDetector;
    use veil_core::EntitySpan;

    fn span(kind: &str, text: &str, conf: f64, start: usize, end: usize, src: &str) -> EntitySpan {
        EntitySpan::new(kind, text, conf, start, end, src)
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_overlapping(vec![]).is_empty());
    }

    #[test]
    fn test_merge_idempotent_on_disjoint_spans() {
        let spans = vec![
            span("PERSON", "Alice", 0.9, 0, 5, "a"),
            span("PERSON", "Bob", 0.8, 10, 13, "a"),
            span("LOCATION", "Rome", 0.7, 20, 24, "a"),
        ];

        let merged = merge_overlapping(spans.clone());
        assert_eq!(merged, spans);
        assert!(merged.iter().all(|s| s.agreement_count.is_none()));
    }

    #[test]
    fn test_merge_overlap_votes_highest_confidence() {
        let merged = merge_overlapping(vec![
            span("PERSON", "John T", 0.6, 0, 5, "A"),
            span("PERSON", "Tan", 0.9, 2, 8, "B"),
        ]);

        assert_eq!(merged.len(), 1);
        let rep = &merged[0];
        assert_eq!(rep.text, "Tan");
        assert_eq!(rep.kind, "PERSON");
        assert_eq!(rep.source, "B");
        assert_eq!(rep.confidence, 0.9);
        assert_eq!(rep.agreement_count, Some(2));
        assert_eq!(
            rep.contributing_sources,
            Some(vec!["A".to_string(), "B".to_string()])
        );
        assert!((rep.average_confidence.unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_merge_tie_keeps_first_seen() {
        let merged = merge_overlapping(vec![
            span("PERSON", "first", 0.8, 0, 5, "A"),
            span("PERSON", "second", 0.8, 1, 6, "B"),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "first");
        assert_eq!(merged[0].source, "A");
    }

    #[test]
    fn test_merge_duplicate_sources_kept() {
        let merged = merge_overlapping(vec![
            span("PHONE_NUMBER", "91234567", 0.9, 0, 8, "phone_heuristic"),
            span("PHONE_NUMBER", "91234567", 0.9, 0, 8, "phone_heuristic"),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].contributing_sources,
            Some(vec![
                "phone_heuristic".to_string(),
                "phone_heuristic".to_string()
            ])
        );
    }

    #[test]
    fn test_merge_cluster_closes_at_first_gap() {
        let merged = merge_overlapping(vec![
            span("A", "x", 0.5, 0, 4, "a"),
            span("A", "y", 0.6, 2, 6, "b"),
            span("A", "z", 0.7, 8, 12, "c"),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].agreement_count, Some(2));
        assert!(merged[1].agreement_count.is_none());
        assert_eq!(merged[1].text, "z");
    }

    #[test]
    fn test_chain_merge_through_transitive_neighbor() {
        // B overlaps both A and C, but A does not overlap C. The sweep
        // anchors on A and closes only at the first span not overlapping A,
        // so C escapes the cluster. This grouping is intentional.
        let merged = merge_overlapping(vec![
            span("A", "a", 0.5, 0, 5, "a"),
            span("A", "b", 0.6, 3, 9, "b"),
            span("A", "c", 0.9, 6, 12, "c"),
        ]);

        // C starts at 6 >= A's end 5, so the A-anchored cluster is {a, b}
        // and c stands alone.
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "b");
        assert_eq!(merged[0].agreement_count, Some(2));
        assert_eq!(merged[1].text, "c");
        assert!(merged[1].agreement_count.is_none());
    }

    #[test]
    fn test_chain_merge_when_all_overlap_anchor_window() {
        // All three overlap the anchor's interval, so one cluster forms even
        // though b and c barely overlap each other.
        let merged = merge_overlapping(vec![
            span("A", "a", 0.5, 0, 10, "a"),
            span("A", "b", 0.6, 1, 4, "b"),
            span("A", "c", 0.9, 8, 15, "c"),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "c");
        assert_eq!(merged[0].agreement_count, Some(3));
    }

    #[test]
    fn test_merge_output_sorted_by_start() {
        let merged = merge_overlapping(vec![
            span("A", "late", 0.5, 40, 44, "a"),
            span("A", "early", 0.5, 0, 4, "b"),
            span("A", "mid", 0.5, 20, 24, "c"),
        ]);

        let starts: Vec<usize> = merged.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 20, 40]);
    }

    #[tokio::test]
    async fn test_reconcile_empty_text() {
        let reconciler = EnsembleReconciler::new(
            DetectorPool::new().with_detector(PhoneHeuristicDetector::new()),
        );
        assert!(reconciler.reconcile("").await.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_single_detector_passthrough() {
        let spans = vec![
            span("PERSON", "Alice", 0.9, 0, 5, "x"),
            span("PERSON", "Bob", 0.8, 10, 13, "x"),
        ];
        let pool = DetectorPool::new().with_detector(StaticDetector::new("ner_a", spans));
        let reconciler = EnsembleReconciler::new(pool);

        let report = reconciler.reconcile("Alice and Bob").await;
        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|s| s.source == "ner_a"));
        assert!(report.iter().all(|s| s.agreement_count.is_none()));
    }

    #[tokio::test]
    async fn test_reconcile_partial_detector_failure() {
        let spans_a = vec![span("PERSON", "Alice", 0.9, 0, 5, "x")];
        let spans_b = vec![span("LOCATION", "Rome", 0.7, 10, 14, "x")];

        let full_pool = DetectorPool::new()
            .with_detector(StaticDetector::new("ner_a", spans_a.clone()))
            .with_detector(StaticDetector::new("ner_b", spans_b.clone()))
            .with_detector(FailingDetector::new("ner_down"));
        let without_failed = DetectorPool::new()
            .with_detector(StaticDetector::new("ner_a", spans_a))
            .with_detector(StaticDetector::new("ner_b", spans_b));

        let with_failure = EnsembleReconciler::new(full_pool)
            .reconcile("Alice went to Rome")
            .await;
        let baseline = EnsembleReconciler::new(without_failed)
            .reconcile("Alice went to Rome")
            .await;

        assert_eq!(with_failure, baseline);
    }

    #[tokio::test]
    async fn test_reconcile_all_detectors_down_degrades_to_empty() {
        let pool = DetectorPool::new()
            .with_detector(FailingDetector::new("a"))
            .with_detector(FailingDetector::new("b"));
        let reconciler = EnsembleReconciler::new(pool);

        assert!(reconciler.reconcile("some text").await.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_merges_across_detectors() {
        let pool = DetectorPool::new()
            .with_detector(StaticDetector::new(
                "ner_a",
                vec![span("PERSON", "John", 0.6, 0, 5, "x")],
            ))
            .with_detector(StaticDetector::new(
                "ner_b",
                vec![span("PERSON", "John Tan", 0.9, 2, 8, "x")],
            ));
        let reconciler = EnsembleReconciler::new(pool);

        let report = reconciler.reconcile("John Tan here").await;
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].text, "John Tan");
        assert_eq!(report[0].agreement_count, Some(2));
        let sources = report[0].contributing_sources.as_ref().unwrap();
        assert!(sources.contains(&"ner_a".to_string()));
        assert!(sources.contains(&"ner_b".to_string()));
        assert!((report[0].average_confidence.unwrap() - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_reconcile_with_phone_heuristic() {
        let pool = DetectorPool::new().with_detector(PhoneHeuristicDetector::new());
        let reconciler = EnsembleReconciler::new(pool);

        let report = reconciler.reconcile("call 91234567 now").await;
        // Mobile and generic 8-digit candidates collapse to one entity
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].kind, "PHONE_NUMBER");
        assert_eq!(report[0].text, "91234567");
        assert_eq!(report[0].agreement_count, Some(2));
    }

    #[tokio::test]
    async fn test_reconcile_output_ordering_invariant() {
        let pool = DetectorPool::new()
            .with_detector(StaticDetector::new(
                "ner_a",
                vec![
                    span("A", "late", 0.9, 30, 34, "x"),
                    span("A", "early", 0.9, 0, 4, "x"),
                ],
            ))
            .with_detector(StaticDetector::new(
                "ner_b",
                vec![span("A", "mid", 0.9, 15, 19, "x")],
            ));
        let reconciler = EnsembleReconciler::new(pool);

        let report = reconciler.reconcile("irrelevant").await;
        let starts: Vec<usize> = report.iter().map(|s| s.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }
}
