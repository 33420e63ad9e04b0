//! Deterministic PR-level risk aggregation from per-file scores (spec §4.3).

use std::collections::HashMap;

use prlens_core::FileRecord;

/// One file's contribution to the aggregation: score, weight (lines
/// changed), whether it is a test file, and its per-file reasons.
pub struct FileRiskInput<'a> {
    pub score: f32,
    pub weight: f32,
    pub is_test_file: bool,
    pub net_added: i64,
    pub reasons: &'a [String],
}

impl<'a> From<&'a FileRecord> for FileRiskInput<'a> {
    fn from(f: &'a FileRecord) -> Self {
        FileRiskInput {
            score: f.risk_score_file,
            weight: f.lines_changed() as f32,
            is_test_file: f.is_test_file,
            net_added: f.net_added(),
            reasons: &f.file_risk_reasons,
        }
    }
}

/// Result of aggregating a PR's file-level risk scores into one PR score
/// plus a top-capped reasons list.
pub struct AggregatedRisk {
    pub score: f32,
    pub reasons: Vec<String>,
}

/// Implements the algorithm of spec §4.3 exactly:
/// `base = weighted mean of s_i by w_i (or plain mean if all weights zero)`,
/// hard-override when any file scores >= 8, a +0.5 bump when the max score
/// is >= 8, and a -0.5 relief when net test lines were added and no file
/// is that severe.
pub fn aggregate_pr_risk(files: &[FileRiskInput]) -> AggregatedRisk {
    if files.is_empty() {
        return AggregatedRisk { score: 0.0, reasons: vec![] };
    }

    let total_weight: f32 = files.iter().map(|f| f.weight).sum();
    let base = if total_weight > 0.0 {
        files.iter().map(|f| f.score * f.weight).sum::<f32>() / total_weight
    } else {
        files.iter().map(|f| f.score).sum::<f32>() / files.len() as f32
    };

    let max_s = files.iter().map(|f| f.score).fold(f32::MIN, f32::max);
    let hard = files.iter().any(|f| f.score >= 8.0);
    let net_tests_added: i64 = files.iter().filter(|f| f.is_test_file).map(|f| f.net_added).sum();

    let mut score = if hard { base.max(8.0) } else { base };
    if max_s >= 8.0 {
        score = (score + 0.5).min(10.0);
    } else if net_tests_added > 0 {
        score = (base - 0.5).max(0.0);
    }

    let reasons = aggregate_reasons(files);
    AggregatedRisk { score, reasons }
}

/// Counts recurring file-level reasons and emits the top 3-4, tagging
/// repeats with `"reason (in N files)"`, capping at 4 with a summary
/// overflow entry if more remain (spec §4.3).
fn aggregate_reasons(files: &[FileRiskInput]) -> Vec<String> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for f in files {
        for reason in f.reasons {
            let entry = counts.entry(reason.as_str()).or_insert(0);
            if *entry == 0 {
                order.push(reason.as_str());
            }
            *entry += 1;
        }
    }

    let mut ranked: Vec<(&str, u32)> = order.into_iter().map(|r| (r, counts[r])).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    const CAP: usize = 4;
    let mut out: Vec<String> = Vec::new();
    for (reason, n) in ranked.iter().take(CAP) {
        if *n > 1 {
            out.push(format!("{reason} (in {n} files)"));
        } else {
            out.push(reason.to_string());
        }
    }
    if ranked.len() > CAP {
        out.truncate(CAP - 1);
        out.push(format!("and {} more reason(s)", ranked.len() - (CAP - 1)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_5_risk_aggregation() {
        // spec §8 Scenario 5: A(score=9, lines=100), B(score=3, lines=300).
        let files = vec![
            FileRiskInput { score: 9.0, weight: 100.0, is_test_file: false, net_added: 0, reasons: &[] },
            FileRiskInput { score: 3.0, weight: 300.0, is_test_file: false, net_added: 0, reasons: &[] },
        ];
        let result = aggregate_pr_risk(&files);
        assert!((result.score - 8.5).abs() < 1e-6);
    }

    #[test]
    fn test_net_addition_relieves_score_when_below_hard_threshold() {
        let files = vec![
            FileRiskInput { score: 5.0, weight: 100.0, is_test_file: false, net_added: 0, reasons: &[] },
            FileRiskInput { score: 2.0, weight: 50.0, is_test_file: true, net_added: 40, reasons: &[] },
        ];
        let result = aggregate_pr_risk(&files);
        let base = (5.0 * 100.0 + 2.0 * 50.0) / 150.0;
        assert!((result.score - (base - 0.5).max(0.0)).abs() < 1e-6);
    }

    #[test]
    fn empty_file_list_scores_zero() {
        let result = aggregate_pr_risk(&[]);
        assert_eq!(result.score, 0.0);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn reasons_ranked_by_frequency_and_capped() {
        let r1 = vec!["touches auth".to_string()];
        let r2 = vec!["touches auth".to_string(), "large diff".to_string()];
        let r3 = vec!["touches auth".to_string()];
        let files = vec![
            FileRiskInput { score: 1.0, weight: 10.0, is_test_file: false, net_added: 0, reasons: &r1 },
            FileRiskInput { score: 1.0, weight: 10.0, is_test_file: false, net_added: 0, reasons: &r2 },
            FileRiskInput { score: 1.0, weight: 10.0, is_test_file: false, net_added: 0, reasons: &r3 },
        ];
        let result = aggregate_pr_risk(&files);
        assert_eq!(result.reasons[0], "touches auth (in 3 files)");
        assert!(result.reasons.contains(&"large diff".to_string()));
    }
}
