//! Disjunctive normal form expansion.
//!
//! Distributes OR over AND so the query becomes a list of disjuncts, each a
//! flat conjunction of nodes. Subtrees without parameters are pure pattern
//! expressions; they are treated as atoms and kept intact, since the job
//! layer evaluates pattern-level and/or itself.

use crate::node::Node;
use crate::node::OperatorKind;

/// Expands a top-level node list (implicit AND) into disjuncts.
pub fn expand(nodes: &[Node]) -> Vec<Vec<Node>> {
    let mut disjuncts = vec![Vec::new()];
    for node in nodes {
        disjuncts = product(disjuncts, expand_node(node));
    }
    disjuncts
}

fn expand_node(node: &Node) -> Vec<Vec<Node>> {
    if node.is_parameter_free() {
        return vec![vec![node.clone()]];
    }
    match node {
        Node::Pattern(_) | Node::Parameter(_) => vec![vec![node.clone()]],
        Node::Operator(op) => match op.kind {
            OperatorKind::And => {
                let mut acc = vec![Vec::new()];
                for operand in &op.operands {
                    acc = product(acc, expand_node(operand));
                }
                acc
            }
            OperatorKind::Or => op.operands.iter().flat_map(expand_node).collect(),
        },
    }
}

fn product(left: Vec<Vec<Node>>, right: Vec<Vec<Node>>) -> Vec<Vec<Node>> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for l in &left {
        for r in &right {
            let mut conjunct = l.clone();
            conjunct.extend(r.iter().cloned());
            out.push(conjunct);
        }
    }
    out
}
