use once_cell::sync::Lazy;
use regex::Regex;

use crate::metrics::MatcherMetrics;

/// comby's fallback matcher, used when no language-specific one applies
pub const GENERIC_MATCHER: &str = ".generic";

static VALID_MATCHER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\.(s|sh|bib|c|cs|css|dart|clj|elm|erl|ex|f|fsx|go|html|hs|java|js|json|jl|kt|tex|lisp|nim|md|ml|org|pas|php|py|re|rb|rs|rst|scala|sql|swift|txt|ts)$",
    )
    .expect("matcher extension regex is valid")
});

/// Returns the matcher that parameterizes a structural search.
///
/// An explicit language wins; only the first one is used since comby applies a
/// single matcher per run. Without languages the extension hint is used when
/// comby recognises it, and otherwise the generic matcher.
pub fn to_matcher(languages: &[String], extension_hint: &str, metrics: &MatcherMetrics) -> String {
    if let Some(language) = languages.first() {
        let matcher = lookup_matcher(language);
        metrics.record_request(matcher);
        return matcher.to_string();
    }

    if !extension_hint.is_empty() {
        let matcher = extension_to_matcher(extension_hint);
        metrics.record_request(&format!("inferred:{}", matcher));
        return matcher.to_string();
    }

    metrics.record_request(&format!("inferred:{}", GENERIC_MATCHER));
    GENERIC_MATCHER.to_string()
}

/// Uses a file extension such as `.go` as the matcher if comby knows it
pub fn extension_to_matcher(extension: &str) -> &str {
    if VALID_MATCHER.is_match(extension) {
        extension
    } else {
        GENERIC_MATCHER
    }
}

/// Looks up the `-matcher` value for a language name, case-insensitively.
///
/// comby selects a language by a representative file extension, so one
/// extension per language is enough, and unknown languages fall back to the
/// generic matcher.
pub fn lookup_matcher(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "assembly" | "asm" => ".s",
        "bash" => ".sh",
        "c" => ".c",
        "c#" | "csharp" => ".cs",
        "css" => ".css",
        "dart" => ".dart",
        "clojure" => ".clj",
        "elm" => ".elm",
        "erlang" => ".erl",
        "elixir" => ".ex",
        "fortran" => ".f",
        "f#" | "fsharp" => ".fsx",
        "go" => ".go",
        "html" => ".html",
        "haskell" => ".hs",
        "java" => ".java",
        "javascript" => ".js",
        "json" => ".json",
        "julia" => ".jl",
        "kotlin" => ".kt",
        "latex" => ".tex",
        "lisp" => ".lisp",
        "nim" => ".nim",
        "ocaml" => ".ml",
        "pascal" => ".pas",
        "php" => ".php",
        "python" => ".py",
        "reason" => ".re",
        "ruby" => ".rb",
        "rust" => ".rs",
        "scala" => ".scala",
        "sql" => ".sql",
        "swift" => ".swift",
        "text" => ".txt",
        "typescript" | "ts" => ".ts",
        "xml" => ".xml",
        _ => GENERIC_MATCHER,
    }
}
