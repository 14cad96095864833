//! Basic-query to backend-query compilation.
//!
//! Pure AST-to-AST translation: the pattern tree folds into backend
//! conjunctions/disjunctions, field filters become extra conjuncts, and the
//! result is simplified once at the end. No I/O, no clocks, no limits; for
//! a given input the output is byte-for-byte deterministic.

use regex_syntax::hir::HirKind;
use thiserror::Error;

use quarry_query::Basic;
use quarry_query::Field;
use quarry_query::Node;
use quarry_query::OperatorKind;
use quarry_query::Pattern;
use quarry_query::PatternKind;

use crate::ast::BackendQuery;
use crate::lang;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] Box<regex_syntax::Error>),
    #[error("unexpected {0}: parameter inside a pattern expression")]
    UnexpectedParameter(String),
    #[error("symbol searches need at least one non-negated pattern")]
    NegatedSymbolPattern,
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Which result kinds the caller asked for; determines whether pattern
/// leaves match file content, file names, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultTypes(u8);

impl ResultTypes {
    pub const EMPTY: Self = Self(0);
    pub const FILE: Self = Self(1 << 0);
    pub const PATH: Self = Self(1 << 1);
    pub const REPO: Self = Self(1 << 2);
    pub const SYMBOL: Self = Self(1 << 3);
    pub const COMMIT: Self = Self(1 << 4);

    /// The default when a query carries no `type:` filter.
    pub const fn default_types() -> Self {
        Self(Self::FILE.0 | Self::PATH.0 | Self::REPO.0)
    }

    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn has(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Resolves `type:` values; unknown values are ignored and an empty
    /// outcome falls back to the default set.
    pub fn from_type_values(values: &[String]) -> Self {
        let mut types = Self::EMPTY;
        for value in values {
            types = match value.to_ascii_lowercase().as_str() {
                "file" => types.with(Self::FILE),
                "path" => types.with(Self::PATH),
                "repo" => types.with(Self::REPO),
                "symbol" => types.with(Self::SYMBOL),
                "commit" | "diff" => types.with(Self::COMMIT),
                _ => types,
            };
        }
        if types.is_empty() {
            return Self::default_types();
        }
        types
    }
}

/// Capabilities advertised by the connected backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Features {
    /// The backend understands first-class language predicates, so `lang:`
    /// filters are passed as predicates in addition to the file regex.
    pub content_based_lang_filters: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Text,
    Symbol,
}

#[derive(Clone, Copy)]
struct LeafTarget {
    case_sensitive: bool,
    content: bool,
    file_name: bool,
}

/// Compiles one basic query into the backend's AST.
pub fn to_backend_query(
    basic: &Basic,
    result_types: ResultTypes,
    features: Features,
    request: RequestType,
) -> Result<BackendQuery> {
    let case_sensitive = basic.is_case_sensitive();
    let mut content = result_types.has(ResultTypes::FILE);
    let file_name = result_types.has(ResultTypes::PATH);
    if !content && !file_name {
        content = true;
    }
    let target = LeafTarget {
        case_sensitive,
        content,
        file_name,
    };

    let mut conjuncts = Vec::new();
    if let Some(pattern) = &basic.pattern {
        if request == RequestType::Symbol && only_negated(pattern) {
            return Err(CompileError::NegatedSymbolPattern);
        }
        conjuncts.push(compile_pattern(pattern, target, request)?);
    }

    let (include_files, exclude_files) = basic.include_exclude_values(Field::File);
    for file in &include_files {
        conjuncts.push(file_leaf(file, case_sensitive)?);
    }
    for file in &exclude_files {
        conjuncts.push(BackendQuery::not(file_leaf(file, case_sensitive)?));
    }

    let (include_langs, exclude_langs) = basic.include_exclude_values(Field::Lang);
    for language in &include_langs {
        conjuncts.push(file_leaf(&lang::to_file_regexp(language), false)?);
        if features.content_based_lang_filters {
            conjuncts.push(BackendQuery::Language(lang::normalize(language)));
        }
    }
    for language in &exclude_langs {
        conjuncts.push(BackendQuery::not(file_leaf(
            &lang::to_file_regexp(language),
            false,
        )?));
        if features.content_based_lang_filters {
            conjuncts.push(BackendQuery::not(BackendQuery::Language(lang::normalize(
                language,
            ))));
        }
    }

    let (has_file, has_not_file) = basic.repo_has_file_content();
    for file in &has_file {
        conjuncts.push(BackendQuery::RepoScope(Box::new(file_leaf(file, false)?)));
    }
    for file in &has_not_file {
        conjuncts.push(BackendQuery::not(BackendQuery::RepoScope(Box::new(
            file_leaf(file, false)?,
        ))));
    }

    Ok(BackendQuery::and(conjuncts).simplify())
}

fn compile_pattern(node: &Node, target: LeafTarget, request: RequestType) -> Result<BackendQuery> {
    match node {
        Node::Operator(op) => {
            let children = op
                .operands
                .iter()
                .map(|operand| compile_pattern(operand, target, request))
                .collect::<Result<Vec<_>>>()?;
            Ok(match op.kind {
                OperatorKind::And => BackendQuery::and(children),
                OperatorKind::Or => BackendQuery::or(children),
            })
        }
        Node::Pattern(pattern) => {
            let mut leaf = pattern_leaf(pattern, target)?;
            if request == RequestType::Symbol {
                leaf = BackendQuery::Symbol(Box::new(leaf));
            }
            if pattern.negated {
                leaf = BackendQuery::not(leaf);
            }
            Ok(leaf)
        }
        Node::Parameter(parameter) => Err(CompileError::UnexpectedParameter(
            parameter.field.to_string(),
        )),
    }
}

fn pattern_leaf(pattern: &Pattern, target: LeafTarget) -> Result<BackendQuery> {
    match pattern.kind {
        PatternKind::Literal => Ok(substring(pattern.value.clone(), target)),
        PatternKind::Regexp => match as_literal(&pattern.value)? {
            // Substring matching is cheaper for the backend; correctness is
            // unchanged since the regexp reduces to this exact string.
            Some(literal) => Ok(substring(literal, target)),
            None => Ok(BackendQuery::Regexp {
                pattern: pattern.value.clone(),
                case_sensitive: target.case_sensitive,
                content: target.content,
                file_name: target.file_name,
            }),
        },
    }
}

fn substring(pattern: String, target: LeafTarget) -> BackendQuery {
    BackendQuery::Substring {
        pattern,
        case_sensitive: target.case_sensitive,
        content: target.content,
        file_name: target.file_name,
    }
}

/// A file-name filter leaf, with the same literal reduction as patterns.
fn file_leaf(pattern: &str, case_sensitive: bool) -> Result<BackendQuery> {
    let target = LeafTarget {
        case_sensitive,
        content: false,
        file_name: true,
    };
    match as_literal(pattern)? {
        Some(literal) => Ok(substring(literal, target)),
        None => Ok(BackendQuery::Regexp {
            pattern: pattern.to_string(),
            case_sensitive,
            content: false,
            file_name: true,
        }),
    }
}

/// The exact string this regexp matches, if it matches only one.
fn as_literal(pattern: &str) -> Result<Option<String>> {
    let hir = regex_syntax::Parser::new()
        .parse(pattern)
        .map_err(Box::new)?;
    match hir.kind() {
        HirKind::Literal(literal) => Ok(Some(
            String::from_utf8_lossy(&literal.0).into_owned(),
        )),
        _ => Ok(None),
    }
}

fn only_negated(node: &Node) -> bool {
    match node {
        Node::Pattern(pattern) => pattern.negated,
        Node::Parameter(_) => false,
        Node::Operator(op) => op.operands.iter().all(only_negated),
    }
}
