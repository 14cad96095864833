//! Plan-to-job-tree construction.
//!
//! A plan's disjuncts become a union; each basic query becomes a timeout
//! and limit shell around its pattern expression; AND/OR pattern operators
//! become intersection/union combinators over the same basic query with one
//! operand substituted; and each atomic pattern becomes the parallel set of
//! leaf jobs its result types and `index:` routing call for.

use std::time::Duration;

use quarry_backend::Features;
use quarry_backend::RequestType;
use quarry_backend::ResultTypes;
use quarry_backend::lang;
use quarry_backend::to_backend_query;
use quarry_query::Basic;
use quarry_query::Field;
use quarry_query::Node;
use quarry_query::OperatorKind;
use quarry_query::PatternKind;
use quarry_query::RepoRevFilter;
use quarry_query::YesNoOnly;

use crate::clients::CommitRequest;
use crate::clients::IndexedRequest;
use crate::clients::RepoQuery;
use crate::clients::TextPatternInfo;
use crate::combinators::AndJob;
use crate::combinators::LimitJob;
use crate::combinators::OrJob;
use crate::combinators::ParallelJob;
use crate::combinators::TimeoutJob;
use crate::error::Result;
use crate::job::Job;
use crate::leaf::CommitSearchJob;
use crate::leaf::IndexedSearchJob;
use crate::leaf::RepoSearchJob;
use crate::leaf::UnindexedSearchJob;
use crate::limits::DEFAULT_AND_OPERAND_LIMIT;
use crate::limits::DEFAULT_MAX_RESULTS;
use crate::limits::DEFAULT_TIMEOUT;

/// Caller-level defaults and backend capabilities the builder closes over.
#[derive(Debug, Clone)]
pub struct SearchInputs {
    pub default_limit: usize,
    pub default_timeout: Duration,
    pub features: Features,
}

impl Default for SearchInputs {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_MAX_RESULTS,
            default_timeout: DEFAULT_TIMEOUT,
            features: Features::default(),
        }
    }
}

/// Builds the job tree for a whole plan: the union over its basic queries.
pub fn new_plan_job(inputs: &SearchInputs, plan: &[Basic]) -> Result<Box<dyn Job>> {
    let children = plan
        .iter()
        .map(|basic| new_basic_job(inputs, basic))
        .collect::<Result<Vec<_>>>()?;
    Ok(OrJob::new(children))
}

/// Builds the job tree for one basic query: its pattern expression wrapped
/// in the query's result limit and deadline.
pub fn new_basic_job(inputs: &SearchInputs, basic: &Basic) -> Result<Box<dyn Job>> {
    let basic = with_content_pattern(basic);
    let job = pattern_expression_job(inputs, &basic)?;
    let max_results = basic.max_results(inputs.default_limit);
    let timeout = basic.timeout().unwrap_or(inputs.default_timeout);
    Ok(TimeoutJob::new(timeout, LimitJob::new(max_results, job)))
}

/// A patternless query with `content:` searches for that content.
fn with_content_pattern(basic: &Basic) -> Basic {
    let mut basic = basic.clone();
    if basic.pattern.is_none() {
        if let Some(content) = basic.find_value(Field::Content) {
            basic.pattern = Some(Node::pattern(content, PatternKind::Literal));
        }
    }
    basic
}

/// Splits AND/OR pattern operators into combinator jobs, each operand run
/// as the same basic query with only that operand as its pattern. Operands
/// of an intersection get a high interior limit since most of their matches
/// are discarded.
fn pattern_expression_job(inputs: &SearchInputs, basic: &Basic) -> Result<Box<dyn Job>> {
    let Some(Node::Operator(op)) = &basic.pattern else {
        return flat_job(inputs, basic);
    };
    let mut children = Vec::with_capacity(op.operands.len());
    for operand in &op.operands {
        let mut sub = basic.clone();
        sub.pattern = Some(operand.clone());
        let child = pattern_expression_job(inputs, &sub)?;
        children.push(match op.kind {
            OperatorKind::And => LimitJob::new(DEFAULT_AND_OPERAND_LIMIT, child),
            OperatorKind::Or => child,
        });
    }
    Ok(match op.kind {
        OperatorKind::And => AndJob::new(children),
        OperatorKind::Or => OrJob::new(children),
    })
}

/// Builds the leaf jobs for an operator-free basic query and runs them in
/// parallel: indexed and/or unindexed text search per `index:`, a symbol
/// search when asked for, a repository listing when repo results are
/// wanted, and a commit-log search for `type:commit` and `type:diff`.
fn flat_job(inputs: &SearchInputs, basic: &Basic) -> Result<Box<dyn Job>> {
    let (type_values, _) = basic.include_exclude_values(Field::Type);
    let mut types = ResultTypes::from_type_values(&type_values);
    if basic.exists(Field::Content) {
        types = types.with(ResultTypes::FILE);
    }
    let max_results = basic.max_results(inputs.default_limit);
    let index = basic.index();

    let mut children: Vec<Box<dyn Job>> = Vec::new();
    if types.has(ResultTypes::FILE) || types.has(ResultTypes::PATH) {
        if index != YesNoOnly::No {
            let query = to_backend_query(basic, types, inputs.features, RequestType::Text)?;
            children.push(Box::new(IndexedSearchJob {
                request: IndexedRequest { query, max_results },
            }));
        }
        if index != YesNoOnly::Only {
            children.push(Box::new(UnindexedSearchJob {
                request: text_pattern_info(basic, types, max_results),
            }));
        }
    }
    if types.has(ResultTypes::SYMBOL) && basic.pattern.is_some() {
        let query = to_backend_query(basic, types, inputs.features, RequestType::Symbol)?;
        children.push(Box::new(IndexedSearchJob {
            request: IndexedRequest { query, max_results },
        }));
    }
    if types.has(ResultTypes::REPO) {
        if let Some(query) = repo_query(basic, max_results) {
            children.push(Box::new(RepoSearchJob { query }));
        }
    }
    if types.has(ResultTypes::COMMIT) {
        children.push(Box::new(CommitSearchJob {
            request: commit_request(basic, &type_values, max_results),
        }));
    }
    Ok(ParallelJob::new(children))
}

fn text_pattern_info(basic: &Basic, types: ResultTypes, limit: usize) -> TextPatternInfo {
    let (mut include_paths, mut exclude_paths) = basic.include_exclude_values(Field::File);
    let (include_langs, exclude_langs) = basic.include_exclude_values(Field::Lang);
    include_paths.extend(include_langs.iter().map(|l| lang::to_file_regexp(l)));
    exclude_paths.extend(exclude_langs.iter().map(|l| lang::to_file_regexp(l)));
    TextPatternInfo {
        pattern: basic.pattern.clone(),
        case_sensitive: basic.is_case_sensitive(),
        include_paths,
        exclude_paths,
        limit,
        pattern_matches_content: types.has(ResultTypes::FILE),
        pattern_matches_path: types.has(ResultTypes::PATH),
    }
}

/// Commit and diff requests share one shape; `type:diff` flips matching
/// from commit messages to changed content.
fn commit_request(basic: &Basic, type_values: &[String], limit: usize) -> CommitRequest {
    let (include, exclude) = basic.repositories();
    CommitRequest {
        pattern: basic.pattern.clone(),
        case_sensitive: basic.is_case_sensitive(),
        include,
        exclude,
        diff: type_values.iter().any(|t| t == "diff"),
        limit,
    }
}

/// A repository listing for this basic query, if its pattern shape permits
/// one: no pattern lists by the `repo:` filters alone, a plain non-negated
/// pattern doubles as an extra name filter, anything else is not
/// expressible as a listing.
fn repo_query(basic: &Basic, limit: usize) -> Option<RepoQuery> {
    let (mut include, exclude) = basic.repositories();
    match &basic.pattern {
        None => {}
        Some(Node::Pattern(p)) if !p.negated => include.push(RepoRevFilter {
            name: p.value.clone(),
            revs: Vec::new(),
        }),
        Some(_) => return None,
    }
    if include.is_empty() && exclude.is_empty() {
        return None;
    }
    Some(RepoQuery {
        include,
        exclude,
        fork: basic.fork(),
        archived: basic.archived(),
        limit,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use quarry_query::SearchType;
    use quarry_query::pipeline;

    use super::*;

    fn build(query: &str) -> Box<dyn Job> {
        let plan = pipeline(query, SearchType::Literal).expect("query should produce a plan");
        new_plan_job(&SearchInputs::default(), &plan).expect("plan should build")
    }

    fn tree(job: &dyn Job) -> String {
        let children = job.children();
        if children.is_empty() {
            return job.name().to_string();
        }
        let rendered: Vec<String> = children.iter().map(|child| tree(*child)).collect();
        format!("{}({})", job.name(), rendered.join(", "))
    }

    #[test]
    fn a_plain_query_gets_the_standard_shell() {
        assert_eq!(
            tree(build("foo").as_ref()),
            "Timeout(Limit(Parallel(IndexedSearch, UnindexedSearch, RepoSearch)))"
        );
    }

    #[test]
    fn and_operands_are_intersected_under_interior_limits() {
        assert_eq!(
            tree(build("a and b").as_ref()),
            "Timeout(Limit(And(\
             Limit(Parallel(IndexedSearch, UnindexedSearch, RepoSearch)), \
             Limit(Parallel(IndexedSearch, UnindexedSearch, RepoSearch)))))"
        );
    }

    #[test]
    fn or_operands_are_unioned() {
        assert_eq!(
            tree(build("a or b").as_ref()),
            "Timeout(Limit(Or(\
             Parallel(IndexedSearch, UnindexedSearch, RepoSearch), \
             Parallel(IndexedSearch, UnindexedSearch, RepoSearch))))"
        );
    }

    #[test]
    fn multiple_disjuncts_union_their_basic_jobs() {
        assert_eq!(
            tree(build("a (repo:x or repo:y)").as_ref()),
            "Or(\
             Timeout(Limit(Parallel(IndexedSearch, UnindexedSearch, RepoSearch))), \
             Timeout(Limit(Parallel(IndexedSearch, UnindexedSearch, RepoSearch))))"
        );
    }

    #[test]
    fn index_only_drops_the_unindexed_leaf() {
        assert_eq!(
            tree(build("foo index:only").as_ref()),
            "Timeout(Limit(Parallel(IndexedSearch, RepoSearch)))"
        );
    }

    #[test]
    fn index_no_drops_the_indexed_leaf() {
        assert_eq!(
            tree(build("foo index:no").as_ref()),
            "Timeout(Limit(Parallel(UnindexedSearch, RepoSearch)))"
        );
    }

    #[test]
    fn type_symbol_searches_symbols_only() {
        assert_eq!(
            tree(build("foo type:symbol").as_ref()),
            "Timeout(Limit(IndexedSearch))"
        );
    }

    #[test]
    fn type_repo_lists_repositories_only() {
        assert_eq!(
            tree(build("foo type:repo").as_ref()),
            "Timeout(Limit(RepoSearch))"
        );
    }

    #[test]
    fn type_commit_searches_the_commit_log() {
        assert_eq!(
            tree(build("foo type:commit").as_ref()),
            "Timeout(Limit(CommitSearch))"
        );
    }

    #[test]
    fn type_diff_flips_the_diff_flag() {
        let plan = pipeline("foo type:diff repo:bar", SearchType::Literal)
            .expect("query should produce a plan");
        let (type_values, _) = plan[0].include_exclude_values(Field::Type);
        let request = commit_request(&plan[0], &type_values, 30);
        assert!(request.diff);
        assert_eq!(request.include.len(), 1);
        assert_eq!(request.include[0].name, "bar");
    }

    #[test]
    fn a_patternless_filter_query_still_lists_repositories() {
        assert_eq!(
            tree(build("repo:foo").as_ref()),
            "Timeout(Limit(Parallel(IndexedSearch, UnindexedSearch, RepoSearch)))"
        );
    }

    #[test]
    fn content_field_supplies_the_pattern() {
        let plan = pipeline("content:foo type:repo", SearchType::Literal)
            .expect("query should produce a plan");
        let basic = with_content_pattern(&plan[0]);
        assert_eq!(basic.pattern, Some(Node::pattern("foo", PatternKind::Literal)));
    }

    #[test]
    fn negated_patterns_do_not_become_repo_filters() {
        assert_eq!(
            tree(build("not foo type:repo").as_ref()),
            "Timeout(Limit(Noop))"
        );
    }

    #[test]
    fn lang_filters_reach_the_unindexed_request() {
        let plan = pipeline("foo lang:go", SearchType::Literal)
            .expect("query should produce a plan");
        let info = text_pattern_info(&plan[0], ResultTypes::default_types(), 30);
        assert_eq!(info.include_paths, vec![lang::to_file_regexp("go")]);
        assert!(info.pattern_matches_content);
    }
}
