//! Segment analyzer: applies the ensemble reconciler to a full transcript
//! and to each timed segment, and derives the aggregate summary.

use std::collections::HashMap;

use tracing::debug;

use veil_core::{EntitySpan, MediaAnalysis, Segment, SegmentReport, Summary};

use crate::reconcile::EnsembleReconciler;

/// Builds full-transcript and per-segment PII reports.
pub struct SegmentAnalyzer {
    reconciler: EnsembleReconciler,
}

impl SegmentAnalyzer {
    pub fn new(reconciler: EnsembleReconciler) -> Self {
        Self { reconciler }
    }

    /// Analyze a transcript and its timed segments.
    ///
    /// Segments keep their original order; a segment with no detections is
    /// omitted from `pii_segments` entirely. The summary is derived from the
    /// full-transcript report only, so segment filtering never affects it.
    pub async fn analyze(&self, transcript: &str, segments: &[Segment]) -> MediaAnalysis {
        let pii_detected = self.reconciler.reconcile(transcript).await;

        let mut pii_segments = Vec::new();
        for segment in segments {
            let text = segment.text.trim();
            let pii = self.reconciler.reconcile(text).await;
            if pii.is_empty() {
                continue;
            }
            pii_segments.push(SegmentReport {
                timestamp: format!(
                    "{} -> {}",
                    format_timestamp(segment.start_secs),
                    format_timestamp(segment.end_secs)
                ),
                text: text.to_string(),
                pii,
            });
        }

        debug!(
            entity_count = pii_detected.len(),
            segment_count = pii_segments.len(),
            "Transcript analysis complete"
        );

        let summary = build_summary(&pii_detected, pii_segments.len());

        MediaAnalysis {
            transcript: transcript.to_string(),
            pii_detected,
            pii_segments,
            summary,
        }
    }

    /// Synchronous text-only variant, skipping transcription and
    /// segmentation.
    pub async fn analyze_text(&self, text: &str) -> (Vec<EntitySpan>, Summary) {
        let report = self.reconciler.reconcile(text).await;
        let summary = build_summary(&report, 0);
        (report, summary)
    }
}

/// Format seconds as floor-minute `M:SS`.
pub fn format_timestamp(secs: f64) -> String {
    let whole = secs.max(0.0) as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Derive the aggregate summary from a full-transcript report.
fn build_summary(report: &[EntitySpan], segments_with_pii: usize) -> Summary {
    let mut pii_types: HashMap<String, usize> = HashMap::new();
    let mut unique_pii_by_type: HashMap<String, Vec<String>> = HashMap::new();

    for item in report {
        *pii_types.entry(item.kind.clone()).or_insert(0) += 1;
        let texts = unique_pii_by_type.entry(item.kind.clone()).or_default();
        if !texts.contains(&item.text) {
            texts.push(item.text.clone());
        }
    }

    Summary {
        total_pii_items: report.len(),
        segments_with_pii,
        pii_types,
        unique_pii_by_type,
        has_privacy_concerns: !report.is_empty(),
    }
}
