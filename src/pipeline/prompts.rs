use crate::lang::{Direction, Language};
use crate::terminology::Glossary;

/// Separates the instructions from the document in the user prompt.
pub const BODY_DELIMITER: &str = "===== DOCUMENT (MDX) =====";

pub const DEFAULT_PRESERVED_NAMES: &[&str] = &[
    "Aitoearn",
    "Instagram",
    "Facebook",
    "LinkedIn",
    "X/Twitter",
    "Twitter",
    "TikTok",
    "Pinterest",
    "YouTube",
    "Mastodon",
    "Threads",
    "Bluesky",
];

const MAX_GLOSSARY_ITEMS: usize = 24;

pub const DEFAULT_INSTRUCTIONS_TEXT: &str = r#"You are translating technical documentation from {{source_lang}} to {{target_lang}}.

Rules:
1. Keep the frontmatter block (between the --- lines) intact; translate only the human-readable values of title and description.
2. Keep every HTML tag, MDX component, import/export line, code block and link target exactly as written.
3. Translate only prose: paragraphs, headings, list items, table cells, and component text content.
4. Keep these names exactly as written: {{preserved_names}}.
5. Do NOT add explanations, notes or comments.
6. Do NOT wrap the output in code fences such as ```mdx or ```md.
7. Return the complete translated document and nothing else.{{extra_rules}}
{{glossary}}
{{delimiter}}
"#;

pub fn default_system_prompt(direction: Direction) -> String {
    match direction.target {
        Language::Zh => "You are a professional technical documentation translator. You translate English MDX documentation into natural, fluent Simplified Chinese while keeping the MDX structure exactly intact. Never add code fences; return the translated document directly.".to_string(),
        Language::En => "You are a professional technical documentation translator. You translate Chinese MDX documentation into natural, concise English while keeping the MDX structure exactly intact. Never add code fences; return the translated document directly.".to_string(),
    }
}

/// Builds the chat prompts for one language pair.
#[derive(Clone, Debug)]
pub struct PromptBuilder {
    direction: Direction,
    system: String,
    preserved_names: Vec<String>,
    extra_rules: Vec<String>,
    glossary: Glossary,
}

impl PromptBuilder {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            system: default_system_prompt(direction),
            preserved_names: DEFAULT_PRESERVED_NAMES.iter().map(|s| s.to_string()).collect(),
            extra_rules: Vec::new(),
            glossary: Glossary::builtin(direction),
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    #[must_use]
    pub fn with_preserved_names(mut self, names: Vec<String>) -> Self {
        self.preserved_names = names;
        self
    }

    #[must_use]
    pub fn with_extra_rules(mut self, rules: Vec<String>) -> Self {
        self.extra_rules = rules;
        self
    }

    #[must_use]
    pub fn with_glossary(mut self, glossary: Glossary) -> Self {
        self.glossary = glossary;
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Same preserved names and extra rules for another pair. The system prompt and the
    /// glossary are written for one pair, so `direction` gets its built-in ones.
    pub fn for_direction(&self, direction: Direction) -> Self {
        if direction == self.direction {
            return self.clone();
        }
        Self {
            direction,
            system: default_system_prompt(direction),
            preserved_names: self.preserved_names.clone(),
            extra_rules: self.extra_rules.clone(),
            glossary: Glossary::builtin(direction),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    /// Instruction block, delimiter, then the body verbatim.
    pub fn build(&self, body: &str) -> String {
        let extra = self
            .extra_rules
            .iter()
            .filter(|r| !r.trim().is_empty())
            .enumerate()
            .map(|(i, r)| format!("\n{}. {}", i + 8, r.trim()))
            .collect::<String>();
        let terms = self.glossary.relevant_for_text(body, MAX_GLOSSARY_ITEMS);
        let glossary = Glossary::render_for_prompt(&terms);
        let names = if self.preserved_names.is_empty() {
            "(none)".to_string()
        } else {
            self.preserved_names.join(", ")
        };

        let mut out = render_template(
            DEFAULT_INSTRUCTIONS_TEXT,
            &[
                ("source_lang", self.direction.source.display_name()),
                ("target_lang", self.direction.target.display_name()),
                ("preserved_names", &names),
                ("extra_rules", &extra),
                ("glossary", &glossary),
                ("delimiter", BODY_DELIMITER),
            ],
        );
        out.push_str(body);
        out
    }
}

/// Prompt with the built-in rules for `direction`.
pub fn build_prompt(body: &str, direction: Direction) -> String {
    PromptBuilder::new(direction).build(body)
}

pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (k, v) in vars {
        let pat = format!("{{{{{k}}}}}");
        out = out.replace(&pat, v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{build_prompt, render_template, PromptBuilder, BODY_DELIMITER};
    use crate::lang::Direction;
    use crate::terminology::Glossary;

    #[test]
    fn body_follows_delimiter_verbatim() {
        let body = "---\ntitle: \"Using {tags}\"\n---\n\n<Card href=\"/x\">Posts</Card>\n";
        let p = build_prompt(body, Direction::EN_ZH);
        let (head, tail) = p.split_once(&format!("{BODY_DELIMITER}\n")).expect("delimiter");
        assert_eq!(tail, body);
        assert!(head.contains("from English to Simplified Chinese"));
        assert!(head.contains("Aitoearn"));
        assert!(head.contains("- posts => 帖子"));
        assert!(!head.contains("{{"));
    }

    #[test]
    fn reverse_direction_and_overrides() {
        let b = PromptBuilder::new(Direction::ZH_EN)
            .with_preserved_names(vec!["Acme".into()])
            .with_extra_rules(vec!["Use US spelling.".into(), " ".into()])
            .with_glossary(Glossary::new());
        let p = b.build("正文");
        assert!(p.contains("from Simplified Chinese to English"));
        assert!(p.contains("exactly as written: Acme."));
        assert!(p.contains("\n8. Use US spelling."));
        assert!(!p.contains("9."));
        assert!(!p.contains("GLOSSARY"));
        assert!(b.system_prompt().contains("into natural, concise English"));
    }

    #[test]
    fn switching_direction_keeps_names_and_rules() {
        let mut glossary = Glossary::new();
        glossary.extend([("帖子".to_string(), "posts".to_string())]);
        let b = PromptBuilder::new(Direction::EN_ZH)
            .with_system("Translate for Acme.")
            .with_preserved_names(vec!["Acme".into()])
            .with_extra_rules(vec!["Keep product names in English.".into()])
            .with_glossary(glossary);
        assert_eq!(b.for_direction(Direction::EN_ZH).system_prompt(), "Translate for Acme.");

        let r = b.for_direction(Direction::ZH_EN);
        assert_eq!(r.direction(), Direction::ZH_EN);
        assert!(r.system_prompt().contains("into natural, concise English"));
        let p = r.build("帖子");
        assert!(p.contains("from Simplified Chinese to English"));
        assert!(p.contains("exactly as written: Acme."));
        assert!(p.contains("\n8. Keep product names in English."));
        assert!(!p.contains("GLOSSARY"));
    }

    #[test]
    fn template_vars() {
        assert_eq!(render_template("{{a}}-{{b}}-{{a}}", &[("a", "1"), ("b", "2")]), "1-2-1");
    }
}
