use crate::lang::{Direction, Language};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Term {
    pub src: String,
    pub tgt: String,
}

/// Fixed term translations rendered into the prompt when they occur in a document.
#[derive(Clone, Debug, Default)]
pub struct Glossary {
    terms: Vec<Term>,
}

impl Glossary {
    #[must_use]
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Built-in terms for a language pair.
    pub fn builtin(direction: Direction) -> Self {
        let pairs: &[(&str, &str)] = match (direction.source, direction.target) {
            (Language::En, Language::Zh) => &[
                ("posts", "帖子"),
                ("channels", "渠道"),
                ("analytics", "分析"),
                ("publishing", "发布"),
                ("engagement", "互动"),
                ("dashboard", "仪表板"),
            ],
            _ => &[],
        };
        let mut g = Self::new();
        g.extend(pairs.iter().map(|(s, t)| (s.to_string(), t.to_string())));
        g
    }

    /// Adds or replaces terms; blank entries are dropped.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = (String, String)>) {
        for (src, tgt) in entries {
            let src = src.trim();
            let tgt = tgt.trim();
            if src.is_empty() || tgt.is_empty() {
                continue;
            }
            match self.terms.iter_mut().find(|t| t.src.eq_ignore_ascii_case(src)) {
                Some(existing) => existing.tgt = tgt.to_string(),
                None => self.terms.push(Term {
                    src: src.to_string(),
                    tgt: tgt.to_string(),
                }),
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms whose source form occurs in `text` (case-insensitive), longest first.
    #[must_use]
    pub fn relevant_for_text(&self, text: &str, max_items: usize) -> Vec<&Term> {
        if self.terms.is_empty() || text.is_empty() || max_items == 0 {
            return Vec::new();
        }
        let lower = text.to_lowercase();
        let mut items: Vec<&Term> = self
            .terms
            .iter()
            .filter(|t| lower.contains(&t.src.to_lowercase()))
            .collect();
        items.sort_by(|a, b| b.src.len().cmp(&a.src.len()).then_with(|| a.src.cmp(&b.src)));
        items.truncate(max_items);
        items
    }

    #[must_use]
    pub fn render_for_prompt(terms: &[&Term]) -> String {
        if terms.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        out.push_str("GLOSSARY (use these translations consistently):\n");
        for t in terms {
            out.push_str("- ");
            out.push_str(&t.src);
            out.push_str(" => ");
            out.push_str(&t.tgt);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Glossary;
    use crate::lang::Direction;

    #[test]
    fn picks_relevant_terms_longest_first() {
        let mut g = Glossary::builtin(Direction::EN_ZH);
        g.extend([("post".to_string(), "发布".to_string())]);
        let hits = g.relevant_for_text("Scheduling Posts from the Dashboard", 8);
        let srcs: Vec<&str> = hits.iter().map(|t| t.src.as_str()).collect();
        assert_eq!(srcs, vec!["dashboard", "posts", "post"]);

        let block = Glossary::render_for_prompt(&hits);
        assert!(block.starts_with("GLOSSARY"));
        assert!(block.contains("- posts => 帖子\n"));
    }

    #[test]
    fn extend_replaces_and_skips_blank() {
        let mut g = Glossary::builtin(Direction::EN_ZH);
        let before = g.len();
        g.extend([
            ("Posts".to_string(), "贴文".to_string()),
            ("  ".to_string(), "x".to_string()),
        ]);
        assert_eq!(g.len(), before);
        assert_eq!(g.relevant_for_text("posts", 1)[0].tgt, "贴文");
        assert!(Glossary::builtin(Direction::ZH_EN).is_empty());
    }
}
