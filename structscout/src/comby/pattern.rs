//! Approximating comby patterns with regular expressions.

use once_cell::sync::Lazy;
use regex::Regex;

/// Holes of a comby match template: `:[x]`, `...`, `:[[x]]`, `:[x.]`, `:[x\n]`,
/// `:[ x]` and regex holes `:[x~re]` whose regex has no `]`.
static HOLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r":\[\w+\]|\.\.\.|:\[\[\w+\]\]|:\[\w+\.\]|:\[\w+\\n\]|:\[[ ]+(?:\w+)?\]|:\[\w*~[^\]]*\]",
    )
    .expect("hole regex is valid")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Converts a structural pattern to a regular expression that matches every
/// file the structural pattern can match (and usually more).
///
/// The literal text between holes must appear in order in any match, with
/// whitespace runs matching any whitespace run. Anything at all may sit where a
/// hole was, including newlines. With `shortcircuit` the gaps may not cross a
/// newline, which finds true matches faster but can miss multi-line ones.
///
/// A pattern made only of holes produces an empty regex, which matches every file.
pub fn structural_pat_to_regexp_query(pattern: &str, shortcircuit: bool) -> String {
    let pieces: Vec<String> = HOLE
        .split(pattern)
        .filter(|piece| !piece.is_empty())
        .map(literal_to_regex)
        .collect();

    if pieces.is_empty() {
        return String::new();
    }

    let gap = if shortcircuit { ").*?(" } else { ")(?s:.)*?(" };
    format!("({})", pieces.join(gap))
}

fn literal_to_regex(piece: &str) -> String {
    WHITESPACE
        .split(piece)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"[\s]+")
}
