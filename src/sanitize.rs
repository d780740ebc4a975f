use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A```[\w+-]*[ \t]*\r?\n").expect("leading fence regex"));
static TRAILING_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n```[ \t]*\z").expect("trailing fence regex"));
static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t]*\r?\n){2,}").expect("blank run regex"));
static INNER_FENCE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^```(?:mdx|md)[ \t]*\r?\n").expect("inner fence regex"));

/// Cleans a model response into a document body.
///
/// Order matters: leading fence line, trailing fence line, blank-line runs, then trim plus a
/// single trailing newline. Everything else passes through untouched.
pub fn sanitize(raw: &str) -> String {
    let mut text = raw.to_string();
    // Repeat so a response wrapped twice still reaches a fixed point in one call.
    loop {
        let trimmed = text.trim();
        let stripped = LEADING_FENCE_RE.replace(trimmed, "");
        let stripped = TRAILING_FENCE_RE.replace(&stripped, "").into_owned();
        if stripped == trimmed {
            break;
        }
        text = stripped;
    }
    let collapsed = BLANK_RUN_RE.replace_all(&text, "\n\n");
    let mut out = collapsed.trim().to_string();
    out.push('\n');
    out
}

/// Like [`sanitize`], but also drops stray ```` ```mdx ```` / ```` ```md ```` lines anywhere in
/// the text. Used when repairing files written by earlier runs.
pub fn sanitize_document(raw: &str) -> String {
    let stripped = INNER_FENCE_LINE_RE.replace_all(raw, "");
    sanitize(&stripped)
}
