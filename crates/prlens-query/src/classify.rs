//! Deterministic query router (spec §4.8): classifies a free-text query
//! into a retrieval plan before any handler runs. First-match-wins across
//! five rule groups, in the order the spec lists them.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Direct,
    Hybrid,
    Vector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryObject {
    Prs,
    Features,
    Files,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    List,
    Top,
    Count,
    Riskiest,
    Largest,
    Explain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub route: Route,
    pub object: QueryObject,
    pub metric: Metric,
    pub semantic_terms: Vec<String>,
    pub limit: Option<usize>,
    pub pr_number: Option<u64>,
    pub author: Option<String>,
    pub specific_file: Option<String>,
}

impl QueryPlan {
    fn base(route: Route, object: QueryObject, metric: Metric) -> Self {
        QueryPlan {
            route,
            object,
            metric,
            semantic_terms: Vec::new(),
            limit: None,
            pr_number: None,
            author: None,
            specific_file: None,
        }
    }
}

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).unwrap())
        }
    };
}

cached_regex!(re_riskiest, r"(?i)\b(riskiest|most\s+risky|high\s+risk)\b");
cached_regex!(re_largest, r"(?i)\b(largest|biggest|most\s+changes)\b");
cached_regex!(re_top_n, r"(?i)\btop\s+(\d+)\b");
cached_regex!(re_count, r"(?i)\b(how\s+many|number\s+of|total\b)");
cached_regex!(re_features_shipped, r"(?i)\b(features?\s+shipped|shipped\s+features?)\b");
cached_regex!(re_what_shipped, r"(?i)\bwhat\s+(was\s+)?shipped\b");
cached_regex!(re_file_changed_most, r"(?i)\bfile\s+that\s+changed\s+most\b");
cached_regex!(re_pr_number, r"(?i)\bpr\s*#?\s*(\d+)\b");
cached_regex!(re_changes_by, r"(?i)\bchanges?\s+(made|done)\s+by\s+(\w+)\b");
cached_regex!(re_merged_or_list, r"(?i)\b(count|merged|list)\b");

cached_regex!(
    re_topic_cue,
    r"(?i)\b(auth(?:entication|orization)?|payment|billing|invoice|pipeline|ci|cd|deploy|security|vulnerability|risk|database|sql|query|api|endpoint|route|ui|ux|frontend|backend|test(?:ing|ed)?|performance|optimization|speed|error|bug|fix|issue)\b"
);

cached_regex!(
    re_specific_file,
    r"(?i)\b(?:show\s+changes?\s+in\s+|changes?\s+to\s+|file\s+)([A-Za-z0-9_./\-]+\.[A-Za-z0-9]+)\b|([A-Za-z0-9_./\-]+\.[A-Za-z0-9]{1,6})\b"
);

cached_regex!(
    re_vector_cue,
    r"(?i)\b(why|explain|how\s+does|what\s+is|risky\s+because|show\s+me|tell\s+me|describe|understand|streaming\s+features|complex\s+changes|impact\s+of)\b"
);

/// Classifies `query` into a retrieval plan. Deterministic: the same input
/// always produces the same plan (spec §8 invariant 5).
pub fn classify(query: &str) -> QueryPlan {
    if let Some(plan) = classify_direct(query) {
        return plan;
    }

    if let Some(terms) = topic_cues(query) {
        let mut plan = QueryPlan::base(Route::Hybrid, QueryObject::Prs, Metric::List);
        plan.semantic_terms = terms;
        return plan;
    }

    if let Some(file) = specific_file(query) {
        let mut plan = QueryPlan::base(Route::Hybrid, QueryObject::Files, Metric::List);
        plan.specific_file = Some(file);
        return plan;
    }

    if re_vector_cue().is_match(query) {
        let mut plan = QueryPlan::base(Route::Vector, QueryObject::Prs, Metric::Explain);
        plan.semantic_terms = vec![query.to_string()];
        return plan;
    }

    let mut plan = QueryPlan::base(Route::Hybrid, QueryObject::Prs, Metric::List);
    plan.semantic_terms = vec![query.to_string()];
    plan
}

fn classify_direct(query: &str) -> Option<QueryPlan> {
    let is_direct = re_riskiest().is_match(query)
        || re_largest().is_match(query)
        || re_top_n().is_match(query)
        || re_count().is_match(query)
        || re_features_shipped().is_match(query)
        || re_what_shipped().is_match(query)
        || re_file_changed_most().is_match(query)
        || re_pr_number().is_match(query)
        || re_changes_by().is_match(query)
        || re_merged_or_list().is_match(query);

    if !is_direct {
        return None;
    }

    let object = if re_file_changed_most().is_match(query) {
        QueryObject::Files
    } else if re_features_shipped().is_match(query) {
        QueryObject::Features
    } else {
        QueryObject::Prs
    };

    let metric = if re_riskiest().is_match(query) {
        Metric::Riskiest
    } else if re_largest().is_match(query) {
        Metric::Largest
    } else if re_file_changed_most().is_match(query) {
        Metric::Top
    } else if re_count().is_match(query) {
        Metric::Count
    } else {
        Metric::List
    };

    let mut plan = QueryPlan::base(Route::Direct, object, metric);

    if let Some(caps) = re_top_n().captures(query) {
        plan.limit = caps[1].parse().ok();
    }
    if let Some(caps) = re_pr_number().captures(query) {
        plan.pr_number = caps[1].parse().ok();
    }
    if let Some(caps) = re_changes_by().captures(query) {
        plan.author = Some(caps[2].to_string());
    }

    Some(plan)
}

fn topic_cues(query: &str) -> Option<Vec<String>> {
    let cues: Vec<String> =
        re_topic_cue().find_iter(query).map(|m| m.as_str().to_ascii_lowercase()).collect();
    if cues.is_empty() {
        None
    } else {
        let mut dedup = Vec::new();
        for cue in cues {
            if !dedup.contains(&cue) {
                dedup.push(cue);
            }
        }
        Some(dedup)
    }
}

fn specific_file(query: &str) -> Option<String> {
    let caps = re_specific_file().captures(query)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_what_shipped_last_two_weeks() {
        let plan = classify("What was shipped in owner/repo last two weeks?");
        assert_eq!(plan.route, Route::Direct);
        assert_eq!(plan.object, QueryObject::Prs);
        assert_eq!(plan.metric, Metric::List);
    }

    #[test]
    fn scenario_2_top_5_riskiest() {
        let plan = classify("Top 5 riskiest PRs");
        assert_eq!(plan.route, Route::Direct);
        assert_eq!(plan.metric, Metric::Riskiest);
        assert_eq!(plan.limit, Some(5));
    }

    #[test]
    fn scenario_3_specific_file() {
        let plan = classify("show changes in monthly_user_site_hits_job.py");
        assert_eq!(plan.route, Route::Hybrid);
        assert_eq!(plan.object, QueryObject::Files);
        assert_eq!(plan.specific_file.as_deref(), Some("monthly_user_site_hits_job.py"));
    }

    #[test]
    fn scenario_4_explanation() {
        let plan = classify("why was last week risky?");
        assert_eq!(plan.route, Route::Vector);
        assert_eq!(plan.metric, Metric::Explain);
        assert_eq!(plan.semantic_terms, vec!["why was last week risky?".to_string()]);
    }

    #[test]
    fn pr_number_extracted() {
        let plan = classify("pr #42 details");
        assert_eq!(plan.pr_number, Some(42));
    }

    #[test]
    fn author_extracted_from_changes_by() {
        let plan = classify("changes made by alice");
        assert_eq!(plan.author.as_deref(), Some("alice"));
    }

    #[test]
    fn classification_is_deterministic() {
        let a = classify("riskiest files in the payment pipeline");
        let b = classify("riskiest files in the payment pipeline");
        assert_eq!(a, b);
    }

    #[test]
    fn default_route_is_hybrid_with_raw_query() {
        let plan = classify("some unmatched free text banana");
        assert_eq!(plan.route, Route::Hybrid);
        assert_eq!(plan.semantic_terms, vec!["some unmatched free text banana".to_string()]);
    }
}
