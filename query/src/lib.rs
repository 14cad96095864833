//! Boolean search-query parsing and plan normalization.
//!
//! A raw query string is parsed into a [`Node`] tree, expanded into
//! disjunctive normal form, validated, and partitioned into a [`Plan`] of
//! independently evaluable [`Basic`] queries (field parameters plus one
//! pattern subtree).

pub mod dnf;
pub mod fields;
pub mod node;
pub mod parser;
pub mod pipeline;
pub mod plan;
pub mod validate;

pub use fields::Field;
pub use node::Node;
pub use node::Operator;
pub use node::OperatorKind;
pub use node::Parameter;
pub use node::Pattern;
pub use node::PatternKind;
pub use parser::ParseError;
pub use parser::SearchType;
pub use pipeline::pipeline;
pub use plan::Basic;
pub use plan::CountValue;
pub use plan::Plan;
pub use plan::RepoRevFilter;
pub use plan::YesNoOnly;
