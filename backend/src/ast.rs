//! The indexed-search backend's query AST.
//!
//! This grammar belongs to the backend and is treated as an external
//! protocol: conjunction/disjunction/negation nodes, substring vs regexp
//! leaves, a symbol-scope wrapper, a repo-scope wrapper for file-presence
//! filters, first-class language predicates, and boolean constants.
//! `Display` renders the backend's canonical s-expression; `Serialize`
//! provides the byte-stable form used to check compiler determinism.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BackendQuery {
    And(Vec<BackendQuery>),
    Or(Vec<BackendQuery>),
    Not(Box<BackendQuery>),
    Substring {
        pattern: String,
        case_sensitive: bool,
        content: bool,
        file_name: bool,
    },
    Regexp {
        pattern: String,
        case_sensitive: bool,
        content: bool,
        file_name: bool,
    },
    /// Restricts the wrapped query to symbol definitions.
    Symbol(Box<BackendQuery>),
    /// Evaluates the wrapped query against repositories as a whole
    /// (file-presence filters).
    RepoScope(Box<BackendQuery>),
    Language(String),
    Const(bool),
}

impl BackendQuery {
    pub fn and(children: Vec<BackendQuery>) -> Self {
        Self::And(children)
    }

    pub fn or(children: Vec<BackendQuery>) -> Self {
        Self::Or(children)
    }

    pub fn not(child: BackendQuery) -> Self {
        Self::Not(Box::new(child))
    }

    /// Backend-sanctioned rewrites only: flatten nested And/Or, drop
    /// identity constants, fold absorbing constants, collapse singleton
    /// operators. Anything beyond this would change what the backend sees.
    pub fn simplify(self) -> Self {
        match self {
            Self::And(children) => simplify_operator(children, true),
            Self::Or(children) => simplify_operator(children, false),
            Self::Not(child) => match child.simplify() {
                Self::Const(value) => Self::Const(!value),
                simplified => Self::Not(Box::new(simplified)),
            },
            Self::Symbol(child) => Self::Symbol(Box::new(child.simplify())),
            Self::RepoScope(child) => Self::RepoScope(Box::new(child.simplify())),
            leaf => leaf,
        }
    }
}

fn simplify_operator(children: Vec<BackendQuery>, is_and: bool) -> BackendQuery {
    // And's identity is TRUE, Or's is FALSE; the other constant absorbs.
    let identity = is_and;
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match child.simplify() {
            BackendQuery::Const(value) if value == identity => {}
            BackendQuery::Const(value) => return BackendQuery::Const(value),
            BackendQuery::And(grandchildren) if is_and => flat.extend(grandchildren),
            BackendQuery::Or(grandchildren) if !is_and => flat.extend(grandchildren),
            simplified => flat.push(simplified),
        }
    }
    match flat.len() {
        0 => BackendQuery::Const(identity),
        1 => flat.remove(0),
        _ if is_and => BackendQuery::And(flat),
        _ => BackendQuery::Or(flat),
    }
}

impl fmt::Display for BackendQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(children) => write_operator(f, "and", children),
            Self::Or(children) => write_operator(f, "or", children),
            Self::Not(child) => write!(f, "(not {child})"),
            Self::Substring {
                pattern,
                case_sensitive,
                content,
                file_name,
            } => write_leaf(f, "substr", pattern, *case_sensitive, *content, *file_name),
            Self::Regexp {
                pattern,
                case_sensitive,
                content,
                file_name,
            } => write_leaf(f, "regex", pattern, *case_sensitive, *content, *file_name),
            Self::Symbol(child) => write!(f, "(sym {child})"),
            Self::RepoScope(child) => write!(f, "(type:repo {child})"),
            Self::Language(lang) => write!(f, "lang:{lang}"),
            Self::Const(true) => f.write_str("TRUE"),
            Self::Const(false) => f.write_str("FALSE"),
        }
    }
}

fn write_operator(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    children: &[BackendQuery],
) -> fmt::Result {
    write!(f, "({name}")?;
    for child in children {
        write!(f, " {child}")?;
    }
    write!(f, ")")
}

fn write_leaf(
    f: &mut fmt::Formatter<'_>,
    base: &str,
    pattern: &str,
    case_sensitive: bool,
    content: bool,
    file_name: bool,
) -> fmt::Result {
    if case_sensitive {
        f.write_str("case_")?;
    }
    // Leaves restricted to one target carry a prefix; unrestricted leaves
    // match both content and file names.
    if content && !file_name {
        f.write_str("content_")?;
    } else if file_name && !content {
        f.write_str("file_")?;
    }
    write!(f, "{base}:\"{pattern}\"")
}
