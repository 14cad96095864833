//! Structural validation of DNF disjuncts, before any execution.

use regex::Regex;
use thiserror::Error;

use crate::fields::Field;
use crate::node::Node;
use crate::plan::CountValue;
use crate::plan::YesNoOnly;
use crate::plan::parse_duration;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidateError {
    #[error("field {field} may not be specified more than once")]
    DuplicateField { field: Field },
    #[error("invalid value {value:?} for field {field}")]
    InvalidValue { field: Field, value: String },
    #[error("invalid regular expression in {field}:{value}: {message}")]
    InvalidRegex {
        field: Field,
        value: String,
        message: String,
    },
    #[error("field {field} does not support negation")]
    InvalidNegation { field: Field },
}

pub type Result<T> = std::result::Result<T, ValidateError>;

const SELECT_ROOTS: [&str; 5] = ["repo", "file", "content", "symbol", "commit"];

/// Validates one disjunct. Parameters only appear at the top of a disjunct
/// after DNF; operator nodes here are pattern-only subtrees and need no
/// field checks.
pub fn validate(disjunct: &[Node]) -> Result<()> {
    let mut seen: Vec<Field> = Vec::new();
    for node in disjunct {
        let Node::Parameter(p) = node else {
            continue;
        };
        if p.field.is_singleton() {
            if seen.contains(&p.field) {
                return Err(ValidateError::DuplicateField { field: p.field });
            }
            seen.push(p.field);
        }
        if p.negated && !p.field.is_negatable() {
            return Err(ValidateError::InvalidNegation { field: p.field });
        }
        validate_value(p.field, &p.value)?;
    }
    Ok(())
}

fn validate_value(field: Field, value: &str) -> Result<()> {
    let invalid = || ValidateError::InvalidValue {
        field,
        value: value.to_string(),
    };
    match field {
        Field::Case => match value.to_ascii_lowercase().as_str() {
            "yes" | "no" => Ok(()),
            _ => Err(invalid()),
        },
        Field::Fork | Field::Archived | Field::Index => {
            YesNoOnly::parse(value).map(|_| ()).ok_or_else(invalid)
        }
        Field::Visibility => match value.to_ascii_lowercase().as_str() {
            "public" | "private" | "any" => Ok(()),
            _ => Err(invalid()),
        },
        Field::Count => CountValue::parse(value).map(|_| ()).ok_or_else(invalid),
        Field::Timeout => parse_duration(value).map(|_| ()).ok_or_else(invalid),
        Field::PatternType => match value.to_ascii_lowercase().as_str() {
            "literal" | "regexp" => Ok(()),
            _ => Err(invalid()),
        },
        Field::Select => {
            // Only the root of a selector path is checked here.
            let root = value.split('.').next().unwrap_or_default();
            if SELECT_ROOTS.contains(&root.to_ascii_lowercase().as_str()) {
                Ok(())
            } else {
                Err(invalid())
            }
        }
        Field::Repo => {
            // Rev suffixes are not part of the name regex.
            let name = value.split('@').next().unwrap_or_default();
            check_regex(field, value, name)
        }
        Field::File | Field::RepoHasFile => check_regex(field, value, value),
        Field::Lang | Field::Content | Field::Type | Field::Rev => Ok(()),
    }
}

fn check_regex(field: Field, value: &str, pattern: &str) -> Result<()> {
    match Regex::new(pattern) {
        Ok(_) => Ok(()),
        Err(err) => Err(ValidateError::InvalidRegex {
            field,
            value: value.to_string(),
            message: err.to_string(),
        }),
    }
}
