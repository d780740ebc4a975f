use std::borrow::Cow;

pub const DELIMITER: &str = "---";

/// A document split around its metadata block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Split<'a> {
    /// Text before the opening delimiter, usually empty or blank.
    pub prefix: &'a str,
    pub frontmatter: Option<&'a str>,
    pub body: &'a str,
}

impl<'a> Split<'a> {
    /// Everything outside the metadata block.
    pub fn without_frontmatter(&self) -> Cow<'a, str> {
        if self.prefix.is_empty() {
            Cow::Borrowed(self.body)
        } else {
            Cow::Owned(format!("{}{}", self.prefix, self.body))
        }
    }
}

/// Splits off the metadata block: the text between the first two lines that are exactly `---`
/// (surrounding whitespace ignored). Without two such lines the whole text is body.
pub fn split(text: &str) -> Split<'_> {
    let mut delims = line_spans(text).filter(|&(s, e)| is_delimiter(&text[s..e]));
    match (delims.next(), delims.next()) {
        (Some((s0, e0)), Some((s1, e1))) => Split {
            prefix: &text[..s0],
            frontmatter: Some(&text[e0..s1]),
            body: &text[e1..],
        },
        _ => Split {
            prefix: "",
            frontmatter: None,
            body: text,
        },
    }
}

/// True when the text opens with a frontmatter delimiter line.
pub fn starts_with_frontmatter(text: &str) -> bool {
    text.trim_start_matches('\u{feff}')
        .lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(is_delimiter)
}

fn is_delimiter(line: &str) -> bool {
    line.trim_start_matches('\u{feff}').trim() == DELIMITER
}

// (start, end) byte spans of each line, end including the newline.
fn line_spans(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos >= text.len() {
            return None;
        }
        let start = pos;
        let end = match text[start..].find('\n') {
            Some(i) => start + i + 1,
            None => text.len(),
        };
        pos = end;
        Some((start, end))
    })
}
