//! Named topic shortcuts (spec §4.9): predefined term bundles fed into
//! `Features` or `RiskyFiles`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    AuthFeatures,
    PaymentFeatures,
    SecurityChanges,
    DatabaseChanges,
    ApiChanges,
    TestChanges,
    PerformanceChanges,
    BugFixes,
    ComplexChanges,
    StreamingFeatures,
}

impl Topic {
    /// The search terms this shortcut expands to when fed into a hybrid
    /// handler's ANN query.
    pub fn terms(&self) -> &'static str {
        match self {
            Topic::AuthFeatures => "authentication authorization login session token",
            Topic::PaymentFeatures => "payment billing invoice checkout subscription",
            Topic::SecurityChanges => "security vulnerability exploit sanitization injection",
            Topic::DatabaseChanges => "database sql migration schema query index",
            Topic::ApiChanges => "api endpoint route handler request response",
            Topic::TestChanges => "test testing coverage assertion fixture",
            Topic::PerformanceChanges => "performance optimization latency throughput speed",
            Topic::BugFixes => "bug fix error issue regression",
            Topic::ComplexChanges => "complex refactor architecture rewrite large change",
            Topic::StreamingFeatures => "streaming websocket real-time event subscription feed",
        }
    }

    /// Whether this shortcut feeds `Features` (feature-PR search) or
    /// `RiskyFiles` (file-level ANN). Security and complexity shortcuts
    /// look for risky files; the rest look for shipped features.
    pub fn uses_risky_files(&self) -> bool {
        matches!(self, Topic::SecurityChanges | Topic::DatabaseChanges | Topic::ComplexChanges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_topic_has_nonempty_terms() {
        let all = [
            Topic::AuthFeatures,
            Topic::PaymentFeatures,
            Topic::SecurityChanges,
            Topic::DatabaseChanges,
            Topic::ApiChanges,
            Topic::TestChanges,
            Topic::PerformanceChanges,
            Topic::BugFixes,
            Topic::ComplexChanges,
            Topic::StreamingFeatures,
        ];
        for topic in all {
            assert!(!topic.terms().is_empty());
        }
    }
}
