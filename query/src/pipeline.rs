//! The query normalization pipeline: parse, DNF-expand, validate, and
//! partition into a plan of basic queries. Every stage is pure and the
//! first error short-circuits.

use thiserror::Error;

use crate::dnf;
use crate::fields::Field;
use crate::node::Node;
use crate::parser;
use crate::parser::ParseError;
use crate::parser::SearchType;
use crate::plan::Basic;
use crate::plan::Plan;
use crate::validate;
use crate::validate::ValidateError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validate(#[from] ValidateError),
}

pub type Result<T> = std::result::Result<T, QueryError>;

/// Normalizes a raw query string into a [`Plan`].
///
/// A `patterntype:` parameter in the query overrides the caller's default
/// search type; since the search type changes how bare patterns are
/// scanned, the query is reparsed under the override.
pub fn pipeline(input: &str, search_type: SearchType) -> Result<Plan> {
    let mut nodes = parser::parse(input, search_type)?;
    if let Some(overridden) = override_search_type(&nodes) {
        if overridden != search_type {
            nodes = parser::parse(input, overridden)?;
        }
    }
    if nodes.is_empty() {
        return Ok(Vec::new());
    }
    let disjuncts = dnf::expand(&nodes);
    for disjunct in &disjuncts {
        validate::validate(disjunct)?;
    }
    Ok(disjuncts
        .into_iter()
        .map(Basic::from_disjunct)
        .map(Basic::concat_rev_filters)
        .collect())
}

fn override_search_type(nodes: &[Node]) -> Option<SearchType> {
    for node in nodes {
        match node {
            Node::Parameter(p) if p.field == Field::PatternType => {
                return match p.value.to_ascii_lowercase().as_str() {
                    "literal" => Some(SearchType::Literal),
                    "regexp" => Some(SearchType::Regexp),
                    _ => None,
                };
            }
            Node::Operator(op) => {
                if let Some(found) = override_search_type(&op.operands) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}
