//! Compilation of basic queries into the indexed-search backend's query AST.
//!
//! The AST in [`ast`] is an external wire contract owned by the backend; it
//! is reproduced here exactly and never extended opportunistically. The
//! compiler in [`compile`] is a pure, deterministic AST-to-AST translation.

pub mod ast;
pub mod compile;
pub mod lang;

pub use ast::BackendQuery;
pub use compile::CompileError;
pub use compile::Features;
pub use compile::RequestType;
pub use compile::ResultTypes;
pub use compile::to_backend_query;
