//! Index key-expression translation.
//!
//! Source index keys are written in the source engine's expression syntax,
//! e.g. `REPORT+upper(NAME)` or `str(CUSTNO,8,0)`. PostgreSQL wants a
//! comma-separated list of expressions instead. The translation is a fixed
//! pipeline of four textual rewrites:
//!
//! 1. `+` becomes `,`
//! 2. `upper(a,b)` becomes `upper(a),upper(b)`
//! 3. `str(x)` becomes `x`
//! 4. `str(a,b,c)` becomes `substr(a,b,c)`
//!
//! An argument may contain one level of nested calls, as in
//! `str(upper(NAME))` or `upper(trim(a),b)`. Deeper nesting and keys outside
//! that grammar pass through unchanged; if the result is not valid
//! PostgreSQL the `CREATE INDEX` fails and that index is skipped.

use regex::Regex;
use std::sync::LazyLock;

/// One call argument: plain text or a single-level parenthesized group.
const ARG: &str = r"((?:[^(),]|\([^()]*\))*)";

static UPPER_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bupper\({ARG},{ARG}\)")).expect("valid upper pattern")
});

static STR_SINGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bstr\({ARG}\)")).expect("valid str pattern")
});

static STR_TRIPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bstr\({ARG},{ARG},{ARG}\)")).expect("valid substr pattern")
});

/// Translate a source index key expression into a PostgreSQL index column list.
pub fn translate_key(expr: &str) -> String {
    let joined = expr.replace('+', ",");
    let upper = UPPER_PAIR.replace_all(&joined, "upper(${1}),upper(${2})");
    let bare = STR_SINGLE.replace_all(&upper, "${1}");
    STR_TRIPLE
        .replace_all(&bare, "substr(${1},${2},${3})")
        .into_owned()
}
