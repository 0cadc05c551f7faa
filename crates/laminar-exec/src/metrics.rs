//! Metric scraping from tool output.
//!
//! Tools in this ecosystem print human-oriented reports; the runner only
//! understands a small, fixed set of line shapes. Each recognized pattern is
//! a `(name, regex)` pair evaluated independently — one malformed line can
//! never block extraction of the other metrics. Anything unrecognized is
//! silently ignored; this is intentionally not a general log parser.

use std::collections::HashMap;

use regex::Regex;

/// Result of applying one pattern to a block of output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatternMatch {
    Matched(f64),
    Unmatched,
}

struct MetricPattern {
    name: &'static str,
    regex: Regex,
}

impl MetricPattern {
    /// First numeric match wins; a capture that fails to parse as a number
    /// is treated as no match rather than an error.
    fn apply(&self, output: &str) -> PatternMatch {
        for caps in self.regex.captures_iter(output) {
            if let Some(value) = caps.get(1) {
                if let Ok(n) = value.as_str().parse::<f64>() {
                    return PatternMatch::Matched(n);
                }
            }
        }
        PatternMatch::Unmatched
    }
}

/// Extracts named numeric metrics from free-form tool stdout.
pub struct MetricParser {
    patterns: Vec<MetricPattern>,
}

impl MetricParser {
    /// Build the parser with the recognized pattern table.
    pub fn new() -> Self {
        // Literal patterns; compilation cannot fail.
        let table: &[(&'static str, &'static str)] = &[
            ("pass_rate", r"(?i)pass rate:\s*(-?\d+(?:\.\d+)?)\s*%"),
            ("security_issues", r"(?i)security issues\s*\|\s*(-?\d+)"),
            ("orphaned_entries", r"(?i)orphaned entries:\s*(-?\d+)"),
            ("coverage", r"(?i)coverage:\s*(-?\d+(?:\.\d+)?)\s*%"),
            ("violations", r"(?i)violations:\s*(-?\d+)"),
        ];
        let patterns = table
            .iter()
            .map(|(name, pattern)| MetricPattern {
                name,
                regex: Regex::new(pattern).unwrap(),
            })
            .collect();
        Self { patterns }
    }

    /// Scan `output` and return every metric that matched.
    pub fn parse(&self, output: &str) -> HashMap<String, f64> {
        let mut metrics = HashMap::new();
        for pattern in &self.patterns {
            if let PatternMatch::Matched(value) = pattern.apply(output) {
                metrics.insert(pattern.name.to_string(), value);
            }
        }
        if !metrics.is_empty() {
            tracing::debug!(count = metrics.len(), "Scraped metrics from tool output");
        }
        metrics
    }
}

impl Default for MetricParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_rate_percentage() {
        let parser = MetricParser::new();
        let metrics = parser.parse("Checked 40 files\nPass Rate: 97.5%\n");
        assert_eq!(metrics.get("pass_rate"), Some(&97.5));
    }

    #[test]
    fn pipe_delimited_security_issues() {
        let parser = MetricParser::new();
        let metrics = parser.parse("| Security Issues | 3 |\n");
        assert_eq!(metrics.get("security_issues"), Some(&3.0));
    }

    #[test]
    fn orphaned_entries_count() {
        let parser = MetricParser::new();
        let metrics = parser.parse("Scan complete. Orphaned entries: 12\n");
        assert_eq!(metrics.get("orphaned_entries"), Some(&12.0));
    }

    #[test]
    fn multiple_metrics_in_one_report() {
        let parser = MetricParser::new();
        let report = "Coverage: 81.2%\nViolations: 0\nPass Rate: 100%\n";
        let metrics = parser.parse(report);
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics.get("coverage"), Some(&81.2));
        assert_eq!(metrics.get("violations"), Some(&0.0));
        assert_eq!(metrics.get("pass_rate"), Some(&100.0));
    }

    #[test]
    fn first_match_per_pattern_wins() {
        let parser = MetricParser::new();
        let metrics = parser.parse("Pass Rate: 90%\nPass Rate: 10%\n");
        assert_eq!(metrics.get("pass_rate"), Some(&90.0));
    }

    #[test]
    fn unrecognized_output_yields_empty_map() {
        let parser = MetricParser::new();
        assert!(parser.parse("nothing to see here\n").is_empty());
        assert!(parser.parse("").is_empty());
    }

    #[test]
    fn case_insensitive_matching() {
        let parser = MetricParser::new();
        let metrics = parser.parse("PASS RATE: 88%\ncoverage: 70%\n");
        assert_eq!(metrics.get("pass_rate"), Some(&88.0));
        assert_eq!(metrics.get("coverage"), Some(&70.0));
    }

    #[test]
    fn one_bad_line_does_not_block_others() {
        let parser = MetricParser::new();
        // The "Pass Rate" line is garbled; the others still extract.
        let report = "Pass Rate: abc%\nOrphaned entries: 4\nViolations: 2\n";
        let metrics = parser.parse(report);
        assert!(metrics.get("pass_rate").is_none());
        assert_eq!(metrics.get("orphaned_entries"), Some(&4.0));
        assert_eq!(metrics.get("violations"), Some(&2.0));
    }

    #[test]
    fn pattern_match_variants() {
        let pattern = MetricPattern {
            name: "x",
            regex: Regex::new(r"x=(\d+)").unwrap(),
        };
        assert_eq!(pattern.apply("x=7"), PatternMatch::Matched(7.0));
        assert_eq!(pattern.apply("y=7"), PatternMatch::Unmatched);
    }

    #[test]
    fn negative_values_extract() {
        let parser = MetricParser::new();
        let metrics = parser.parse("Orphaned entries: -1\n");
        assert_eq!(metrics.get("orphaned_entries"), Some(&-1.0));
    }
}
