//! Query AST.
//!
//! A parsed query is a list of [`Node`]s with an implicit top-level AND.
//! Operator construction always goes through [`new_operator`], which keeps
//! the tree flat: no AND-of-AND or OR-of-OR children survive, and empty
//! leaves are dropped. DNF expansion relies on that shape.

use std::fmt;

use serde::Serialize;

use crate::fields::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    And,
    Or,
}

impl OperatorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// How a pattern leaf should be interpreted by the backend compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Literal,
    Regexp,
}

/// A search term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Pattern {
    pub value: String,
    pub negated: bool,
    pub kind: PatternKind,
}

/// A `field:value` filter. `negated` corresponds to a `-field:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Parameter {
    pub field: Field,
    pub value: String,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Operator {
    pub kind: OperatorKind,
    pub operands: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Node {
    Pattern(Pattern),
    Parameter(Parameter),
    Operator(Operator),
}

impl Node {
    pub fn pattern(value: impl Into<String>, kind: PatternKind) -> Self {
        Self::Pattern(Pattern {
            value: value.into(),
            negated: false,
            kind,
        })
    }

    pub fn parameter(field: Field, value: impl Into<String>, negated: bool) -> Self {
        Self::Parameter(Parameter {
            field,
            value: value.into(),
            negated,
        })
    }

    fn is_empty_leaf(&self) -> bool {
        match self {
            Self::Pattern(p) => p.value.is_empty(),
            Self::Parameter(_) => false,
            Self::Operator(op) => op.operands.is_empty(),
        }
    }

    /// True if no [`Parameter`] appears anywhere in this subtree. Such
    /// subtrees are pure pattern expressions and stay intact through DNF.
    pub fn is_parameter_free(&self) -> bool {
        match self {
            Self::Pattern(_) => true,
            Self::Parameter(_) => false,
            Self::Operator(op) => op.operands.iter().all(Node::is_parameter_free),
        }
    }

    /// True if a [`Pattern`] appears anywhere in this subtree.
    pub fn contains_pattern(&self) -> bool {
        match self {
            Self::Pattern(_) => true,
            Self::Parameter(_) => false,
            Self::Operator(op) => op.operands.iter().any(Node::contains_pattern),
        }
    }

    /// Applies `f` to every pattern leaf, rebuilding the tree.
    pub fn map_patterns(self, f: &impl Fn(Pattern) -> Pattern) -> Self {
        match self {
            Self::Pattern(p) => Self::Pattern(f(p)),
            Self::Parameter(p) => Self::Parameter(p),
            Self::Operator(op) => Self::Operator(Operator {
                kind: op.kind,
                operands: op
                    .operands
                    .into_iter()
                    .map(|n| n.map_patterns(f))
                    .collect(),
            }),
        }
    }
}

/// Builds an operator node over `operands`, flattening any operand that is
/// itself an operator of the same kind and dropping empty leaves. Returns a
/// list so that a single surviving operand is passed through unwrapped.
pub fn new_operator(operands: Vec<Node>, kind: OperatorKind) -> Vec<Node> {
    let mut flat = Vec::with_capacity(operands.len());
    for node in operands {
        if node.is_empty_leaf() {
            continue;
        }
        match node {
            Node::Operator(op) if op.kind == kind => flat.extend(op.operands),
            other => flat.push(other),
        }
    }
    if flat.len() <= 1 {
        return flat;
    }
    vec![Node::Operator(Operator {
        kind,
        operands: flat,
    })]
}

impl fmt::Display for Node {
    /// Canonical s-expression form, e.g. `(or (and "a" "b") "repo:foo")`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(p) => {
                if p.negated {
                    write!(f, "(not {:?})", p.value)
                } else {
                    write!(f, "{:?}", p.value)
                }
            }
            Self::Parameter(p) => {
                let neg = if p.negated { "-" } else { "" };
                write!(f, "\"{neg}{}:{}\"", p.field, p.value)
            }
            Self::Operator(op) => {
                write!(f, "({}", op.kind.as_str())?;
                for operand in &op.operands {
                    write!(f, " {operand}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Renders a top-level node list (implicit AND) as one s-expression string.
pub fn to_sexpr(nodes: &[Node]) -> String {
    let rendered: Vec<String> = nodes.iter().map(ToString::to_string).collect();
    rendered.join(" ")
}

/// Renders a node list back into query syntax, suitable for re-parsing.
/// Inverse of parsing up to whitespace and flattening.
pub fn to_query_string(nodes: &[Node]) -> String {
    let rendered: Vec<String> = nodes.iter().map(node_to_query).collect();
    rendered.join(" and ")
}

fn node_to_query(node: &Node) -> String {
    match node {
        Node::Pattern(p) => {
            let body = if p.value.contains(char::is_whitespace) || p.value.contains(':') {
                format!("\"{}\"", p.value)
            } else {
                p.value.clone()
            };
            if p.negated {
                format!("(not {body})")
            } else {
                body
            }
        }
        Node::Parameter(p) => {
            let neg = if p.negated { "-" } else { "" };
            if p.value.contains(char::is_whitespace) {
                format!("{neg}{}:\"{}\"", p.field, p.value)
            } else {
                format!("{neg}{}:{}", p.field, p.value)
            }
        }
        Node::Operator(op) => {
            let parts: Vec<String> = op.operands.iter().map(node_to_query).collect();
            format!("({})", parts.join(&format!(" {} ", op.kind.as_str())))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pat(value: &str) -> Node {
        Node::pattern(value, PatternKind::Literal)
    }

    #[test]
    fn new_operator_flattens_same_kind() {
        let inner = new_operator(vec![pat("b"), pat("c")], OperatorKind::And);
        let mut operands = vec![pat("a")];
        operands.extend(inner);
        let outer = new_operator(operands, OperatorKind::And);
        assert_eq!(to_sexpr(&outer), r#"(and "a" "b" "c")"#);
    }

    #[test]
    fn new_operator_keeps_different_kind_nested() {
        let inner = new_operator(vec![pat("b"), pat("c")], OperatorKind::Or);
        let mut operands = vec![pat("a")];
        operands.extend(inner);
        let outer = new_operator(operands, OperatorKind::And);
        assert_eq!(to_sexpr(&outer), r#"(and "a" (or "b" "c"))"#);
    }

    #[test]
    fn new_operator_unwraps_single_operand() {
        let nodes = new_operator(vec![pat("solo")], OperatorKind::Or);
        assert_eq!(nodes, vec![pat("solo")]);
    }

    #[test]
    fn new_operator_drops_empty_leaves() {
        let nodes = new_operator(vec![pat(""), pat("a")], OperatorKind::And);
        assert_eq!(nodes, vec![pat("a")]);
    }

    #[test]
    fn display_negation_and_parameters() {
        let nodes = new_operator(
            vec![
                Node::Pattern(Pattern {
                    value: "x".to_string(),
                    negated: true,
                    kind: PatternKind::Literal,
                }),
                Node::parameter(crate::Field::Repo, "foo", true),
            ],
            OperatorKind::And,
        );
        assert_eq!(to_sexpr(&nodes), r#"(and (not "x") "-repo:foo")"#);
    }
}
