//! Field vocabulary for `field:value` parameters.

use std::fmt;

use serde::Serialize;

/// Recognized parameter fields. Anything else written as `word:value`
/// is treated as plain pattern text by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Repo,
    File,
    Lang,
    Content,
    Case,
    Type,
    Count,
    Timeout,
    Fork,
    Archived,
    Visibility,
    Index,
    Rev,
    RepoHasFile,
    PatternType,
    Select,
}

impl Field {
    /// Resolves a (case-insensitive) field name or alias.
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        let field = match lowered.as_str() {
            "repo" | "r" => Self::Repo,
            "file" | "f" | "path" => Self::File,
            "lang" | "l" | "language" => Self::Lang,
            "content" => Self::Content,
            "case" => Self::Case,
            "type" => Self::Type,
            "count" => Self::Count,
            "timeout" => Self::Timeout,
            "fork" => Self::Fork,
            "archived" => Self::Archived,
            "visibility" => Self::Visibility,
            "index" => Self::Index,
            "rev" | "revision" => Self::Rev,
            "repohasfile" => Self::RepoHasFile,
            "patterntype" => Self::PatternType,
            "select" => Self::Select,
            _ => return None,
        };
        Some(field)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Repo => "repo",
            Self::File => "file",
            Self::Lang => "lang",
            Self::Content => "content",
            Self::Case => "case",
            Self::Type => "type",
            Self::Count => "count",
            Self::Timeout => "timeout",
            Self::Fork => "fork",
            Self::Archived => "archived",
            Self::Visibility => "visibility",
            Self::Index => "index",
            Self::Rev => "rev",
            Self::RepoHasFile => "repohasfile",
            Self::PatternType => "patterntype",
            Self::Select => "select",
        }
    }

    /// Fields that may appear at most once per basic query.
    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            Self::Case
                | Self::Count
                | Self::Timeout
                | Self::Fork
                | Self::Archived
                | Self::Visibility
                | Self::Index
                | Self::PatternType
                | Self::Select
                | Self::Type
        )
    }

    /// Fields whose values must compile as regular expressions.
    pub fn is_regexp_valued(self) -> bool {
        matches!(self, Self::Repo | Self::File | Self::RepoHasFile)
    }

    /// Fields where a leading `-` means exclusion.
    pub fn is_negatable(self) -> bool {
        matches!(
            self,
            Self::Repo | Self::File | Self::Lang | Self::RepoHasFile
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
