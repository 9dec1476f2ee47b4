//! Rule-based phone number detection for continuous digit streams.

use async_trait::async_trait;
use regex::Regex;

use veil_core::defaults::{PHONE_CONFIDENCE, PHONE_DETECTOR_NAME, PHONE_KIND};
use veil_core::{EntitySpan, Result};

use crate::detector::EntityDetector;

/// Regex-based phone number detector.
///
/// Pattern matches are only candidates: each is re-validated structurally on
/// its digit string before being accepted. Overlapping candidates from
/// different patterns are all emitted; overlap resolution belongs to the
/// ensemble reconciler.
pub struct PhoneHeuristicDetector {
    patterns: Vec<Regex>,
}

impl PhoneHeuristicDetector {
    pub fn new() -> Self {
        let patterns = [
            // Mobile numbers (8 digits starting with 8 or 9)
            r"\b[89]\d{7}\b",
            // Landline numbers (8 digits starting with 6)
            r"\b6\d{7}\b",
            // International formats
            r"\+65\s?[689]\d{7}",
            r"\(\+65\)\s?[689]\d{7}",
            // 10-digit numbers
            r"\b\d{10}\b",
            // Generic 8-digit runs in continuous streams
            r"\b\d{8}\b",
            // Country code without the plus
            r"\b65[689]\d{7}\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("phone pattern is valid"))
        .collect();

        Self { patterns }
    }

    /// Run every pattern over `text` and keep structurally valid matches.
    pub fn detect_phones(&self, text: &str) -> Vec<EntitySpan> {
        let mut matches = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.find_iter(text) {
                if Self::is_valid_number(m.as_str()) {
                    matches.push(EntitySpan::new(
                        PHONE_KIND,
                        m.as_str(),
                        PHONE_CONFIDENCE,
                        m.start(),
                        m.end(),
                        PHONE_DETECTOR_NAME,
                    ));
                }
            }
        }
        matches
    }

    /// Structural validation on the digit string (prefix symbols, parens, and
    /// spaces stripped):
    /// - 8 digits leading with 6, 8, or 9
    /// - 10 digits starting `65` with a 6/8/9 subscriber prefix
    /// - any other 10-digit run (North-American-style)
    fn is_valid_number(raw: &str) -> bool {
        let digits: Vec<u8> = raw
            .bytes()
            .filter(|b| b.is_ascii_digit())
            .map(|b| b - b'0')
            .collect();

        match digits.len() {
            8 => matches!(digits[0], 6 | 8 | 9),
            10 if digits[0] == 6 && digits[1] == 5 => matches!(digits[2], 6 | 8 | 9),
            10 => true,
            _ => false,
        }
    }
}

impl Default for PhoneHeuristicDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityDetector for PhoneHeuristicDetector {
    fn name(&self) -> &str {
        PHONE_DETECTOR_NAME
    }

    async fn detect(&self, text: &str) -> Result<Vec<EntitySpan>> {
        Ok(self.detect_phones(text))
    }
}
