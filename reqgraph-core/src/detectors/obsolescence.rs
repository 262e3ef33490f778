//! Obsolescence detection.
//!
//! A requirement goes stale when it has not been touched for longer than
//! the threshold AND nothing in the graph references it anymore. Age is
//! measured against the snapshot's injected now, so passes are
//! reproducible.

use crate::detectors::{Detector, DetectorReport};
use crate::error::DetectorError;
use crate::graph::GraphSnapshot;
use crate::taxonomy::{Domain, Violation, ViolationCode, ViolationDetails};

pub struct ObsolescenceDetector {
    threshold_days: i64,
}

impl ObsolescenceDetector {
    pub fn new(threshold_days: i64) -> Self {
        Self { threshold_days }
    }

    /// Staleness in [0, 1]: grows with age, saturating at twice the
    /// threshold, and shrinks with each incoming reference.
    fn obsolescence_score(&self, days: i64, referenced: usize) -> f64 {
        let age = (days as f64 / (2.0 * self.threshold_days as f64)).min(1.0);
        age / (1.0 + referenced as f64)
    }
}

impl Detector for ObsolescenceDetector {
    fn name(&self) -> &'static str {
        "obsolescence"
    }

    fn domain(&self) -> Domain {
        Domain::Staleness
    }

    fn detect(&self, snapshot: &GraphSnapshot) -> Result<DetectorReport, DetectorError> {
        let mut violations = Vec::new();

        for entity in snapshot.active_entities() {
            let Some(days) = snapshot.days_since_last_version(&entity.id) else {
                continue;
            };
            let referenced = snapshot.incoming_reference_count(&entity.id);
            if days > self.threshold_days && referenced == 0 {
                violations.push(Violation::new(
                    ViolationCode::OBSOLESCENCE,
                    vec![entity.id.clone()],
                    format!(
                        "{} untouched for {days} days with no incoming references",
                        entity.id
                    ),
                    ViolationDetails::Obsolescence {
                        days_since_update: days,
                        referenced_count: referenced,
                        obsolescence_score: self.obsolescence_score(days, referenced),
                    },
                ));
            }
        }

        Ok(DetectorReport::full(violations))
    }
}
