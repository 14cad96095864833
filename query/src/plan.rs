//! Basic queries and the plan they form.
//!
//! A [`Basic`] query is one independently evaluable conjunction: unordered
//! field parameters plus at most one pattern subtree. A [`Plan`] is the
//! ordered DNF expansion of the whole query; the full result set is the
//! union over the plan.

use std::time::Duration;

use serde::Serialize;

use crate::fields::Field;
use crate::node::Node;
use crate::node::OperatorKind;
use crate::node::Parameter;
use crate::node::Pattern;
use crate::node::new_operator;
use crate::node::to_sexpr;

pub type Plan = Vec<Basic>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Basic {
    pub parameters: Vec<Parameter>,
    pub pattern: Option<Node>,
}

/// `fork:`/`archived:`/`index:` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNoOnly {
    Yes,
    No,
    Only,
}

impl YesNoOnly {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "yes" | "true" => Some(Self::Yes),
            "no" | "false" => Some(Self::No),
            "only" => Some(Self::Only),
            _ => None,
        }
    }
}

/// A `count:` value; `all` lifts the result limit entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountValue {
    All,
    Limit(usize),
}

impl CountValue {
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        value.parse().ok().map(Self::Limit)
    }
}

/// A repository filter with optional revision specifiers, written
/// `repo:name@rev1:rev2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRevFilter {
    pub name: String,
    pub revs: Vec<String>,
}

impl RepoRevFilter {
    pub fn parse(value: &str) -> Self {
        match value.split_once('@') {
            Some((name, revs)) => Self {
                name: name.to_string(),
                revs: revs
                    .split(':')
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            None => Self {
                name: value.to_string(),
                revs: Vec::new(),
            },
        }
    }

    pub fn render(&self) -> String {
        if self.revs.is_empty() {
            self.name.clone()
        } else {
            format!("{}@{}", self.name, self.revs.join(":"))
        }
    }
}

/// Parses durations of the form `500ms`, `10s`, `2m`, `1h`.
pub(crate) fn parse_duration(value: &str) -> Option<Duration> {
    let split = value.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = value.split_at(split);
    let n: u64 = digits.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(n)),
        "s" => Some(Duration::from_secs(n)),
        "m" => Some(Duration::from_secs(n * 60)),
        "h" => Some(Duration::from_secs(n * 3600)),
        _ => None,
    }
}

impl Basic {
    /// Partitions one DNF disjunct into parameters and a pattern subtree.
    /// Multiple pattern nodes in a disjunct fold into one AND.
    pub fn from_disjunct(disjunct: Vec<Node>) -> Self {
        let mut parameters = Vec::new();
        let mut patterns = Vec::new();
        for node in disjunct {
            match node {
                Node::Parameter(p) => parameters.push(p),
                other => patterns.push(other),
            }
        }
        let pattern = new_operator(patterns, OperatorKind::And).into_iter().next();
        Self {
            parameters,
            pattern,
        }
    }

    /// Folds `rev:` parameters into the repo filters and merges duplicate
    /// repo filters that DNF expansion can produce, so repo resolution sees
    /// one filter per repository.
    pub fn concat_rev_filters(mut self) -> Self {
        let mut revs: Vec<String> = Vec::new();
        self.parameters.retain(|p| {
            if p.field == Field::Rev && !p.negated {
                revs.extend(
                    p.value
                        .split(':')
                        .filter(|r| !r.is_empty())
                        .map(str::to_string),
                );
                return false;
            }
            true
        });

        let mut merged: Vec<Parameter> = Vec::new();
        let mut filters: Vec<RepoRevFilter> = Vec::new();
        for p in self.parameters.drain(..) {
            if p.field != Field::Repo || p.negated {
                merged.push(p);
                continue;
            }
            let filter = RepoRevFilter::parse(&p.value);
            match filters.iter_mut().find(|f| f.name == filter.name) {
                Some(existing) => {
                    for rev in filter.revs {
                        if !existing.revs.contains(&rev) {
                            existing.revs.push(rev);
                        }
                    }
                }
                None => filters.push(filter),
            }
        }
        for filter in &mut filters {
            for rev in &revs {
                if !filter.revs.contains(rev) {
                    filter.revs.push(rev.clone());
                }
            }
        }
        // A bare `rev:` constrains every repository, so it attaches to a
        // catch-all filter when no `repo:` filter is present.
        if filters.is_empty() && !revs.is_empty() {
            filters.push(RepoRevFilter {
                name: ".*".to_string(),
                revs,
            });
        }
        merged.extend(filters.into_iter().map(|f| Parameter {
            field: Field::Repo,
            value: f.render(),
            negated: false,
        }));
        self.parameters = merged;
        self
    }

    pub fn find_parameter(&self, field: Field) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.field == field && !p.negated)
    }

    pub fn find_value(&self, field: Field) -> Option<&str> {
        self.find_parameter(field).map(|p| p.value.as_str())
    }

    pub fn exists(&self, field: Field) -> bool {
        self.parameters.iter().any(|p| p.field == field)
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.find_value(Field::Case)
            .is_some_and(|v| v.eq_ignore_ascii_case("yes"))
    }

    pub fn count(&self) -> Option<CountValue> {
        self.find_value(Field::Count).and_then(CountValue::parse)
    }

    /// The effective result ceiling for this basic query.
    pub fn max_results(&self, default: usize) -> usize {
        match self.count() {
            Some(CountValue::All) => usize::MAX,
            Some(CountValue::Limit(n)) => n,
            None => default,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.find_value(Field::Timeout).and_then(parse_duration)
    }

    pub fn index(&self) -> YesNoOnly {
        self.find_value(Field::Index)
            .and_then(YesNoOnly::parse)
            .unwrap_or(YesNoOnly::Yes)
    }

    pub fn fork(&self) -> Option<YesNoOnly> {
        self.find_value(Field::Fork).and_then(YesNoOnly::parse)
    }

    pub fn archived(&self) -> Option<YesNoOnly> {
        self.find_value(Field::Archived).and_then(YesNoOnly::parse)
    }

    /// Non-negated and negated values of `field`, in parameter order.
    pub fn include_exclude_values(&self, field: Field) -> (Vec<String>, Vec<String>) {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for p in &self.parameters {
            if p.field != field {
                continue;
            }
            if p.negated {
                exclude.push(p.value.clone());
            } else {
                include.push(p.value.clone());
            }
        }
        (include, exclude)
    }

    /// Included repo filters (with revs parsed out) and excluded repo
    /// name regexes.
    pub fn repositories(&self) -> (Vec<RepoRevFilter>, Vec<String>) {
        let (include, exclude) = self.include_exclude_values(Field::Repo);
        let filters = include.iter().map(|v| RepoRevFilter::parse(v)).collect();
        (filters, exclude)
    }

    pub fn repo_has_file_content(&self) -> (Vec<String>, Vec<String>) {
        self.include_exclude_values(Field::RepoHasFile)
    }

    /// The pattern subtree rendered canonically; empty when patternless.
    pub fn pattern_string(&self) -> String {
        match &self.pattern {
            Some(node) => to_sexpr(std::slice::from_ref(node)),
            None => String::new(),
        }
    }

    /// Rebuilds the basic query with `f` applied to every pattern leaf.
    pub fn map_pattern(self, f: &impl Fn(Pattern) -> Pattern) -> Self {
        Self {
            parameters: self.parameters,
            pattern: self.pattern.map(|p| p.map_patterns(f)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::node::PatternKind;

    fn param(field: Field, value: &str, negated: bool) -> Parameter {
        Parameter {
            field,
            value: value.to_string(),
            negated,
        }
    }

    #[test]
    fn from_disjunct_partitions_and_folds_patterns() {
        let basic = Basic::from_disjunct(vec![
            Node::parameter(Field::Repo, "foo", false),
            Node::pattern("a", PatternKind::Literal),
            Node::pattern("b", PatternKind::Literal),
        ]);
        assert_eq!(basic.parameters, vec![param(Field::Repo, "foo", false)]);
        assert_eq!(basic.pattern_string(), r#"(and "a" "b")"#);
    }

    #[test]
    fn rev_parameters_fold_into_repo_filters() {
        let basic = Basic {
            parameters: vec![
                param(Field::Repo, "foo", false),
                param(Field::Rev, "release", false),
            ],
            pattern: None,
        }
        .concat_rev_filters();
        assert_eq!(basic.parameters, vec![param(Field::Repo, "foo@release", false)]);
    }

    #[test]
    fn a_bare_rev_attaches_to_a_catch_all_repo_filter() {
        let basic = Basic {
            parameters: vec![param(Field::Rev, "release", false)],
            pattern: None,
        }
        .concat_rev_filters();
        assert_eq!(basic.parameters, vec![param(Field::Repo, ".*@release", false)]);
    }

    #[test]
    fn duplicate_repo_filters_merge_revs() {
        let basic = Basic {
            parameters: vec![
                param(Field::Repo, "foo@dev", false),
                param(Field::Repo, "foo@main", false),
                param(Field::Repo, "foo@dev", false),
            ],
            pattern: None,
        }
        .concat_rev_filters();
        assert_eq!(
            basic.parameters,
            vec![param(Field::Repo, "foo@dev:main", false)]
        );
    }

    #[test]
    fn negated_repo_filters_are_untouched() {
        let basic = Basic {
            parameters: vec![
                param(Field::Repo, "keep", false),
                param(Field::Repo, "drop", true),
            ],
            pattern: None,
        }
        .concat_rev_filters();
        assert_eq!(
            basic.parameters,
            vec![param(Field::Repo, "drop", true), param(Field::Repo, "keep", false)]
        );
    }

    #[test]
    fn count_and_timeout_accessors() {
        let basic = Basic {
            parameters: vec![
                param(Field::Count, "50", false),
                param(Field::Timeout, "2s", false),
            ],
            pattern: None,
        };
        assert_eq!(basic.max_results(30), 50);
        assert_eq!(basic.timeout(), Some(Duration::from_secs(2)));

        let all = Basic {
            parameters: vec![param(Field::Count, "all", false)],
            pattern: None,
        };
        assert_eq!(all.max_results(30), usize::MAX);

        let unset = Basic {
            parameters: Vec::new(),
            pattern: None,
        };
        assert_eq!(unset.max_results(30), 30);
        assert_eq!(unset.timeout(), None);
    }

    #[test]
    fn include_exclude_split() {
        let basic = Basic {
            parameters: vec![
                param(Field::File, "a", false),
                param(Field::File, "b", true),
                param(Field::File, "c", false),
            ],
            pattern: None,
        };
        assert_eq!(
            basic.include_exclude_values(Field::File),
            (
                vec!["a".to_string(), "c".to_string()],
                vec!["b".to_string()]
            )
        );
    }

    #[test]
    fn repo_rev_filter_parse_and_render() {
        let filter = RepoRevFilter::parse("github\\.com/x@main:v1");
        assert_eq!(filter.name, "github\\.com/x");
        assert_eq!(filter.revs, vec!["main".to_string(), "v1".to_string()]);
        assert_eq!(filter.render(), "github\\.com/x@main:v1");
    }

    #[test]
    fn duration_parsing() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("10s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("s"), None);
    }
}
