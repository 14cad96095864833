//! Language filters expressed as file-name regexes.
//!
//! The indexed backend predates first-class language predicates, so `lang:`
//! filters are always expanded to an equivalent anchored extension regex;
//! the predicate form is added on top only when the backend advertises
//! content-based language filtering.

/// Canonicalizes common language aliases.
pub fn normalize(lang: &str) -> String {
    let lowered = lang.to_ascii_lowercase();
    match lowered.as_str() {
        "golang" => "go".to_string(),
        "c++" | "cxx" => "cpp".to_string(),
        "c#" | "cs" => "csharp".to_string(),
        "js" => "javascript".to_string(),
        "ts" => "typescript".to_string(),
        "py" => "python".to_string(),
        "rb" => "ruby".to_string(),
        "rs" => "rust".to_string(),
        "kt" => "kotlin".to_string(),
        "sh" | "bash" => "shell".to_string(),
        "md" => "markdown".to_string(),
        "yml" => "yaml".to_string(),
        _ => lowered,
    }
}

fn extensions(lang: &str) -> Option<&'static [&'static str]> {
    let exts: &'static [&'static str] = match lang {
        "go" => &["go"],
        "rust" => &["rs"],
        "python" => &["py", "pyi"],
        "java" => &["java"],
        "javascript" => &["js", "jsx", "mjs", "cjs"],
        "typescript" => &["ts", "tsx"],
        "c" => &["c", "h"],
        "cpp" => &["cpp", "cc", "cxx", "hpp", "hh"],
        "csharp" => &["cs"],
        "ruby" => &["rb"],
        "php" => &["php"],
        "scala" => &["scala"],
        "kotlin" => &["kt", "kts"],
        "swift" => &["swift"],
        "shell" => &["sh", "bash"],
        "haskell" => &["hs"],
        "ocaml" => &["ml", "mli"],
        "lua" => &["lua"],
        "perl" => &["pl", "pm"],
        "r" => &["r"],
        "dart" => &["dart"],
        "zig" => &["zig"],
        "elixir" => &["ex", "exs"],
        "erlang" => &["erl", "hrl"],
        "clojure" => &["clj", "cljs"],
        "html" => &["html", "htm"],
        "css" => &["css"],
        "json" => &["json"],
        "yaml" => &["yaml", "yml"],
        "toml" => &["toml"],
        "markdown" => &["md", "markdown"],
        "sql" => &["sql"],
        "protobuf" => &["proto"],
        "graphql" => &["graphql"],
        "thrift" => &["thrift"],
        _ => return None,
    };
    Some(exts)
}

/// An anchored, case-insensitive file-name regex matching files of `lang`.
/// Unknown languages fall back to treating the alias itself as an
/// extension.
pub fn to_file_regexp(lang: &str) -> String {
    let normalized = normalize(lang);
    match extensions(&normalized) {
        Some(exts) => format!(r"(?i)\.({})$", exts.join("|")),
        None => format!(r"(?i)\.({normalized})$"),
    }
}
