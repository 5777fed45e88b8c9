//! Executive summary over a run's gap records.

use crate::model::{ExecutiveSummary, GapRecord, Severity};

/// Aggregate gap records into an [`ExecutiveSummary`].
///
/// Pure and order-independent. An empty slice yields the all-zero summary.
/// Every non-compliant status, `partial` included, counts as a gap.
pub fn synthesize(gaps: &[GapRecord]) -> ExecutiveSummary {
    let total = gaps.len();
    if total == 0 {
        tracing::warn!("no gap records to summarise; emitting empty summary");
        return ExecutiveSummary::default();
    }

    let compliant = gaps.iter().filter(|g| g.is_compliant()).count();
    let critical = gaps
        .iter()
        .filter(|g| g.internal_coverage.severity == Severity::Critical)
        .count();
    let score = compliant as f64 / total as f64 * 100.0;

    let summary = ExecutiveSummary {
        overall_compliance_score: round2(score),
        total_requirements: total,
        gaps_identified: total - compliant,
        critical_gaps: critical,
    };
    tracing::info!(
        score = summary.overall_compliance_score,
        total,
        gaps = summary.gaps_identified,
        critical,
        "executive summary generated"
    );
    summary
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coverage, CoverageStatus, Requirement, RequirementType};

    fn gap(id: &str, status: CoverageStatus, severity: Severity) -> GapRecord {
        GapRecord {
            id: id.to_string(),
            regulatory_reference: Requirement {
                id: id.to_string(),
                text: format!("requirement {id}"),
                kind: RequirementType::Mandatory,
                section: "1".to_string(),
            },
            internal_coverage: Coverage {
                status,
                coverage_text: "None".to_string(),
                severity,
                confidence_score: 0.9,
                recommendation: "Act.".to_string(),
            },
        }
    }

    #[test]
    fn empty_input_is_all_zero() {
        let summary = synthesize(&[]);
        assert_eq!(summary, ExecutiveSummary::default());
        assert_eq!(summary.overall_compliance_score, 0.0);
        assert_eq!(summary.total_requirements, 0);
        assert_eq!(summary.gaps_identified, 0);
        assert_eq!(summary.critical_gaps, 0);
    }

    #[test]
    fn two_compliant_one_critical_missing() {
        let gaps = vec![
            gap("REQ-1", CoverageStatus::Compliant, Severity::Low),
            gap("REQ-2", CoverageStatus::Compliant, Severity::Medium),
            gap("REQ-3", CoverageStatus::Missing, Severity::Critical),
        ];
        let summary = synthesize(&gaps);
        assert_eq!(summary.overall_compliance_score, 66.67);
        assert_eq!(summary.total_requirements, 3);
        assert_eq!(summary.gaps_identified, 1);
        assert_eq!(summary.critical_gaps, 1);
    }

    #[test]
    fn partial_counts_as_gap() {
        let gaps = vec![
            gap("A", CoverageStatus::Partial, Severity::Medium),
            gap("B", CoverageStatus::Conflicting, Severity::High),
            gap("C", CoverageStatus::Compliant, Severity::Low),
            gap("D", CoverageStatus::Compliant, Severity::Low),
        ];
        let summary = synthesize(&gaps);
        assert_eq!(summary.overall_compliance_score, 50.0);
        assert_eq!(summary.gaps_identified, 2);
        assert_eq!(summary.critical_gaps, 0);
    }

    #[test]
    fn order_does_not_matter() {
        let mut gaps = vec![
            gap("A", CoverageStatus::Missing, Severity::Critical),
            gap("B", CoverageStatus::Compliant, Severity::Low),
            gap("C", CoverageStatus::Partial, Severity::Critical),
        ];
        let forward = synthesize(&gaps);
        gaps.reverse();
        assert_eq!(synthesize(&gaps), forward);
        assert_eq!(forward.overall_compliance_score, 33.33);
        assert_eq!(forward.critical_gaps, 2);
    }
}
