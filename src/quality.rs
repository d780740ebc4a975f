use crate::frontmatter::starts_with_frontmatter;
use crate::lang::Language;
use crate::textutil::text_metrics;

pub const DEFAULT_SHORT_OUTPUT_RATIO: f32 = 0.3;

/// Soft checks on a finished translation. Flags are warnings only.
#[derive(Clone, Debug, Default)]
pub struct QualityReport {
    pub flags: Vec<String>,
    pub src_chars: usize,
    pub tgt_chars: usize,
    pub len_ratio: f32,
    pub han_ratio: f32,
    pub latin_alpha_ratio: f32,
}

impl QualityReport {
    pub fn is_clean(&self) -> bool {
        self.flags.is_empty()
    }

    #[must_use]
    pub fn render_line(&self) -> String {
        format!(
            "src_chars={} tgt_chars={} ratio={:.2} han_ratio={:.2} latin_alpha_ratio={:.2} flags=[{}]",
            self.src_chars,
            self.tgt_chars,
            self.len_ratio,
            self.han_ratio,
            self.latin_alpha_ratio,
            self.flags.join(", ")
        )
    }
}

#[must_use]
pub fn quality_report(
    source: &str,
    translated: &str,
    target: Language,
    short_output_ratio: f32,
) -> QualityReport {
    // Character counts, not bytes: Han text is three bytes per char in UTF-8.
    let src_chars = source.chars().count();
    let tgt_chars = translated.chars().count();
    let len_ratio = if src_chars == 0 {
        0.0
    } else {
        tgt_chars as f32 / src_chars as f32
    };

    let tgt_metrics = text_metrics(translated);
    let han_ratio = tgt_metrics.han_ratio();
    let latin_alpha_ratio = tgt_metrics.latin_alpha_ratio();

    let mut flags: Vec<String> = Vec::new();
    if src_chars > 0 && len_ratio < short_output_ratio {
        flags.push("output_too_short".to_string());
    }
    if starts_with_frontmatter(source) && !starts_with_frontmatter(translated) {
        flags.push("frontmatter_missing".to_string());
    }
    if tgt_metrics.non_ws >= 20 {
        match target {
            Language::Zh => {
                if han_ratio < 0.06 && latin_alpha_ratio > 0.25 {
                    flags.push("target_script_missing_han".to_string());
                }
            }
            Language::En => {
                if latin_alpha_ratio < 0.18 && han_ratio > 0.20 {
                    flags.push("target_script_missing_latin".to_string());
                }
            }
        }
    }

    QualityReport {
        flags,
        src_chars,
        tgt_chars,
        len_ratio,
        han_ratio,
        latin_alpha_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::{quality_report, DEFAULT_SHORT_OUTPUT_RATIO};
    use crate::lang::Language;

    #[test]
    fn good_translation_is_clean() {
        let src = "---\ntitle: Tags\n---\n\nYou can create tags.\n";
        let tgt = "---\ntitle: 标签\n---\n\n您可以创建标签，并用它们整理帖子。\n";
        let r = quality_report(src, tgt, Language::Zh, DEFAULT_SHORT_OUTPUT_RATIO);
        assert!(r.is_clean(), "{}", r.render_line());
    }

    #[test]
    fn flags_short_output_and_lost_frontmatter() {
        let src = "---\ntitle: Tags\n---\n\nYou can create tags and organize your posts with them.\n";
        let r = quality_report(src, "标签\n", Language::Zh, DEFAULT_SHORT_OUTPUT_RATIO);
        assert!(r.flags.contains(&"output_too_short".to_string()));
        assert!(r.flags.contains(&"frontmatter_missing".to_string()));
    }

    #[test]
    fn flags_untranslated_output() {
        let src = "You can create tags and organize your posts with them.";
        let r = quality_report(src, src, Language::Zh, DEFAULT_SHORT_OUTPUT_RATIO);
        assert_eq!(r.flags, vec!["target_script_missing_han".to_string()]);
    }
}
