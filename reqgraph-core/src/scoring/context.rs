//! Work-context coefficients.
//!
//! Beyond the business phase, the nature of an individual requirement
//! shifts how harshly its violations count. A hotfix in flight tolerates
//! shortcuts; security-critical work tolerates almost nothing extra on
//! top of its already severe base scores.

use serde::{Deserialize, Serialize};

use crate::models::RequirementEntity;

/// Scoring context identified from a requirement's title and tags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoringContext {
    /// Emergency fix, penalties halved
    Hotfix,
    /// Security-critical work, penalties reduced to keep focus on the
    /// structural base scores
    SecurityCritical,
    /// Deliberate debt, penalties amplified
    TechnicalDebt,
    /// Everything else
    Normal,
}

impl ScoringContext {
    /// Stable context code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            ScoringContext::Hotfix => "C01",
            ScoringContext::SecurityCritical => "C02",
            ScoringContext::TechnicalDebt => "C03",
            ScoringContext::Normal => "C04",
        }
    }

    /// Multiplier applied to scaled penalties for this context.
    pub fn coefficient(&self) -> f64 {
        match self {
            ScoringContext::Hotfix => 0.5,
            ScoringContext::SecurityCritical => 0.3,
            ScoringContext::TechnicalDebt => 1.5,
            ScoringContext::Normal => 1.0,
        }
    }

    /// Identifies the context from the title prefix and tags.
    /// Hotfix takes precedence, then security, then debt.
    pub fn identify(entity: &RequirementEntity) -> Self {
        if entity.title.to_lowercase().starts_with("hotfix") {
            return ScoringContext::Hotfix;
        }
        if entity.metadata.has_tag("security_critical") {
            return ScoringContext::SecurityCritical;
        }
        if entity.metadata.has_tag("technical_debt") {
            return ScoringContext::TechnicalDebt;
        }
        ScoringContext::Normal
    }
}

impl std::fmt::Display for ScoringContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringContext::Hotfix => write!(f, "hotfix"),
            ScoringContext::SecurityCritical => write!(f, "security_critical"),
            ScoringContext::TechnicalDebt => write!(f, "technical_debt"),
            ScoringContext::Normal => write!(f, "normal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(title: &str, tags: &[&str]) -> RequirementEntity {
        let mut e = RequirementEntity::new("REQ-001", title, "A description long enough.");
        e.metadata.tags = tags.iter().map(|t| t.to_string()).collect();
        e
    }

    #[test]
    fn test_hotfix_identified_by_title_prefix() {
        let e = entity("Hotfix: login timeout", &[]);
        assert_eq!(ScoringContext::identify(&e), ScoringContext::Hotfix);
        assert_eq!(ScoringContext::identify(&e).code(), "C01");
    }

    #[test]
    fn test_hotfix_beats_security_tag() {
        let e = entity("hotfix credential leak", &["security_critical"]);
        assert_eq!(ScoringContext::identify(&e), ScoringContext::Hotfix);
    }

    #[test]
    fn test_security_identified_by_tag() {
        let e = entity("Rotate keys", &["security_critical"]);
        assert_eq!(ScoringContext::identify(&e), ScoringContext::SecurityCritical);
        assert_eq!(ScoringContext::identify(&e).coefficient(), 0.3);
    }

    #[test]
    fn test_debt_identified_by_tag() {
        let e = entity("Refactor billing", &["technical_debt"]);
        assert_eq!(ScoringContext::identify(&e), ScoringContext::TechnicalDebt);
        assert_eq!(ScoringContext::identify(&e).coefficient(), 1.5);
    }

    #[test]
    fn test_default_is_normal() {
        let e = entity("Add export", &["billing"]);
        assert_eq!(ScoringContext::identify(&e), ScoringContext::Normal);
        assert_eq!(ScoringContext::identify(&e).coefficient(), 1.0);
    }
}
