/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Hierarchical topic patterns and the filters built from them.
//!
//! Topics are `/`-delimited segment lists such as `floor1/gate3/enter`. A pattern
//! segment is either a literal, a single-level wildcard (`+`, or `*` as an alias)
//! or a trailing multi-level wildcard (`#`). The lone pattern `*` matches every
//! non-empty topic.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub const TOPIC_DELIMITER: char = '/';
pub const SINGLE_LEVEL_WILDCARD: &str = "+";
pub const SINGLE_LEVEL_WILDCARD_ALIAS: &str = "*";
pub const MULTI_LEVEL_WILDCARD: &str = "#";
pub const CATCH_ALL_PATTERN: &str = "*";

/// Narrow matching seam so wildcard semantics can be swapped without touching callers.
pub trait TopicMatcher: Send + Sync {
    fn matches(&self, topic: &str) -> bool;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PatternErrorKind {
    Empty,
    EmptySegment,
    MultiLevelNotLast,
    WildcardInLiteral,
}

/// Raised when a topic pattern cannot be compiled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatternError {
    pub pattern: String,
    pub kind: PatternErrorKind,
}

impl PatternError {
    fn new(pattern: &str, kind: PatternErrorKind) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind,
        }
    }
}

impl Display for PatternError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            PatternErrorKind::Empty => write!(f, "topic pattern must not be empty"),
            PatternErrorKind::EmptySegment => {
                write!(f, "topic pattern '{}' contains an empty segment", self.pattern)
            }
            PatternErrorKind::MultiLevelNotLast => write!(
                f,
                "multi-level wildcard must be the last segment of '{}'",
                self.pattern
            ),
            PatternErrorKind::WildcardInLiteral => write!(
                f,
                "wildcard characters must occupy a whole segment in '{}'",
                self.pattern
            ),
        }
    }
}

impl Error for PatternError {}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Segment {
    Literal(String),
    SingleLevel,
    MultiLevel,
}

/// A compiled topic pattern. Immutable after [`TopicExpr::compile`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TopicExpr {
    pattern: String,
    catch_all: bool,
    segments: Vec<Segment>,
}

impl TopicExpr {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::new(pattern, PatternErrorKind::Empty));
        }

        if pattern == CATCH_ALL_PATTERN {
            return Ok(Self {
                pattern: pattern.to_string(),
                catch_all: true,
                segments: Vec::new(),
            });
        }

        let raw: Vec<&str> = pattern.split(TOPIC_DELIMITER).collect();
        let last = raw.len() - 1;
        let mut segments = Vec::with_capacity(raw.len());

        for (idx, segment) in raw.into_iter().enumerate() {
            let compiled = match segment {
                "" => return Err(PatternError::new(pattern, PatternErrorKind::EmptySegment)),
                SINGLE_LEVEL_WILDCARD | SINGLE_LEVEL_WILDCARD_ALIAS => Segment::SingleLevel,
                MULTI_LEVEL_WILDCARD if idx == last => Segment::MultiLevel,
                MULTI_LEVEL_WILDCARD => {
                    return Err(PatternError::new(
                        pattern,
                        PatternErrorKind::MultiLevelNotLast,
                    ))
                }
                literal if literal.contains(['+', '#', '*']) => {
                    return Err(PatternError::new(
                        pattern,
                        PatternErrorKind::WildcardInLiteral,
                    ))
                }
                literal => Segment::Literal(literal.to_string()),
            };
            segments.push(compiled);
        }

        Ok(Self {
            pattern: pattern.to_string(),
            catch_all: false,
            segments,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }
}

impl TopicMatcher for TopicExpr {
    fn matches(&self, topic: &str) -> bool {
        if topic.is_empty() {
            return false;
        }
        if self.catch_all {
            return true;
        }

        let mut levels = topic.split(TOPIC_DELIMITER);
        for segment in &self.segments {
            match segment {
                // `#` is always last and needs at least one remaining non-empty level.
                Segment::MultiLevel => {
                    let mut rest = levels.by_ref().peekable();
                    return rest.peek().is_some() && rest.all(|level| !level.is_empty());
                }
                Segment::SingleLevel => match levels.next() {
                    Some(level) if !level.is_empty() => {}
                    _ => return false,
                },
                Segment::Literal(literal) => match levels.next() {
                    Some(level) if level == literal => {}
                    _ => return false,
                },
            }
        }

        levels.next().is_none()
    }
}

impl Display for TopicExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// A set of compiled topic expressions. An empty filter participates in every topic.
#[derive(Clone, Debug, Default)]
pub struct TopicFilter {
    exprs: Vec<TopicExpr>,
}

impl TopicFilter {
    pub fn compile<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exprs = patterns
            .into_iter()
            .map(|pattern| TopicExpr::compile(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { exprs })
    }

    /// A filter with no expressions; matches every topic.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn exprs(&self) -> &[TopicExpr] {
        &self.exprs
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.exprs.iter().map(TopicExpr::pattern).collect()
    }
}

impl TopicMatcher for TopicFilter {
    fn matches(&self, topic: &str) -> bool {
        self.exprs.is_empty() || self.exprs.iter().any(|expr| expr.matches(topic))
    }
}

/// Returns `true` when `topic` is concrete enough to be published.
pub fn is_publishable_topic(topic: &str) -> bool {
    !topic.is_empty()
        && !topic.contains(['+', '#', '*'])
        && topic.split(TOPIC_DELIMITER).all(|level| !level.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{
        is_publishable_topic, PatternErrorKind, TopicExpr, TopicFilter, TopicMatcher,
    };

    fn expr(pattern: &str) -> TopicExpr {
        TopicExpr::compile(pattern).expect("pattern should compile")
    }

    #[test]
    fn single_level_wildcard_matches_exactly_one_segment() {
        let pattern = expr("a/+/c");

        assert!(pattern.matches("a/b/c"));
        assert!(!pattern.matches("a/b/d/c"));
        assert!(!pattern.matches("a/c"));
        assert!(!pattern.matches("a//c"));
    }

    #[test]
    fn star_is_a_single_level_alias_inside_patterns() {
        let pattern = expr("floor1/*/enter");

        assert!(pattern.matches("floor1/gate3/enter"));
        assert!(!pattern.matches("floor1/gate3/exit"));
    }

    #[test]
    fn multi_level_wildcard_needs_at_least_one_trailing_segment() {
        let pattern = expr("a/#");

        assert!(pattern.matches("a/b"));
        assert!(pattern.matches("a/b/c"));
        assert!(!pattern.matches("a"));
        assert!(!pattern.matches("b/c"));
    }

    #[test]
    fn literal_match_is_exact_and_case_sensitive() {
        let pattern = expr("floor1/gate3/enter");

        assert!(pattern.matches("floor1/gate3/enter"));
        assert!(!pattern.matches("Floor1/gate3/enter"));
        assert!(!pattern.matches("floor1/gate3"));
        assert!(!pattern.matches("floor1/gate3/enter/extra"));
    }

    #[test]
    fn catch_all_matches_any_non_empty_topic() {
        let pattern = expr("*");

        assert!(pattern.is_catch_all());
        assert!(pattern.matches("a"));
        assert!(pattern.matches("a/b/c"));
        assert!(!pattern.matches(""));
    }

    #[test]
    fn compile_rejects_malformed_patterns() {
        let cases = [
            ("", PatternErrorKind::Empty),
            ("a/#/b", PatternErrorKind::MultiLevelNotLast),
            ("#/a", PatternErrorKind::MultiLevelNotLast),
            ("a//b", PatternErrorKind::EmptySegment),
            ("a/b/", PatternErrorKind::EmptySegment),
            ("a/b+/c", PatternErrorKind::WildcardInLiteral),
        ];

        for (pattern, kind) in cases {
            let err = TopicExpr::compile(pattern).expect_err(pattern);
            assert_eq!(err.kind, kind, "pattern {pattern:?}");
        }
    }

    #[test]
    fn repeated_matching_is_stable() {
        let pattern = expr("a/+/#");
        let first = pattern.matches("a/b/c/d");

        for _ in 0..16 {
            assert_eq!(pattern.matches("a/b/c/d"), first);
        }
        assert!(first);
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = TopicFilter::all();

        assert!(filter.is_empty());
        assert!(filter.matches("anything/at/all"));
    }

    #[test]
    fn filter_matches_when_any_expression_matches() {
        let filter = TopicFilter::compile(["gate/+/enter", "alarm/#"]).expect("filter");

        assert!(filter.matches("gate/3/enter"));
        assert!(filter.matches("alarm/fire/floor2"));
        assert!(!filter.matches("gate/3/exit"));
        assert_eq!(filter.patterns(), vec!["gate/+/enter", "alarm/#"]);
    }

    #[test]
    fn filter_compile_fails_on_first_bad_pattern() {
        assert!(TopicFilter::compile(["ok/topic", "bad/#/pattern"]).is_err());
    }

    #[test]
    fn publishable_topics_are_concrete() {
        assert!(is_publishable_topic("floor1/gate3/enter"));
        assert!(!is_publishable_topic(""));
        assert!(!is_publishable_topic("floor1/+/enter"));
        assert!(!is_publishable_topic("floor1//enter"));
    }
}
