use crate::lang::Language;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextMetrics {
    pub non_ws: usize,
    pub han: usize,
    pub latin_alpha: usize,
}

impl TextMetrics {
    pub fn han_ratio(&self) -> f32 {
        ratio(self.han, self.non_ws)
    }

    pub fn latin_alpha_ratio(&self) -> f32 {
        ratio(self.latin_alpha, self.non_ws)
    }
}

pub fn text_metrics(text: &str) -> TextMetrics {
    let mut m = TextMetrics::default();
    for ch in text.chars() {
        if ch.is_whitespace() {
            continue;
        }
        m.non_ws = m.non_ws.saturating_add(1);
        if ch.is_ascii_alphabetic() {
            m.latin_alpha = m.latin_alpha.saturating_add(1);
        } else if is_han(ch) {
            m.han = m.han.saturating_add(1);
        }
    }
    m
}

/// True when `text` reads as mostly `lang` by script share.
///
/// Chinese: Han share of all characters, whitespace included, at or above `threshold`.
/// English: ASCII letters among non-whitespace characters at or above `threshold`, with
/// Han under 5%.
pub fn is_mostly_language(text: &str, lang: Language, threshold: f32) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    match lang {
        Language::Zh => {
            let total = text.chars().count();
            let han = text.chars().filter(|c| is_han(*c)).count();
            ratio(han, total) >= threshold
        }
        Language::En => {
            let m = text_metrics(text);
            m.latin_alpha_ratio() >= threshold && m.han_ratio() < 0.05
        }
    }
}

pub fn is_han(ch: char) -> bool {
    let u = ch as u32;
    (0x3400..=0x4DBF).contains(&u)
        || (0x4E00..=0x9FFF).contains(&u)
        || (0xF900..=0xFAFF).contains(&u)
        || (0x20000..=0x2A6DF).contains(&u)
        || (0x2A700..=0x2EBEF).contains(&u)
}

fn ratio(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::{is_mostly_language, text_metrics};
    use crate::lang::Language;

    #[test]
    fn metrics_count_scripts() {
        let m = text_metrics("ab 中文!");
        assert_eq!(m.non_ws, 5);
        assert_eq!(m.latin_alpha, 2);
        assert_eq!(m.han, 2);
    }

    #[test]
    fn mostly_chinese_threshold() {
        assert!(is_mostly_language("这是一篇中文文章。", Language::Zh, 0.3));
        assert!(!is_mostly_language("This is English with 一个 word.", Language::Zh, 0.3));
        assert!(!is_mostly_language("   ", Language::Zh, 0.3));
    }

    #[test]
    fn mostly_english_threshold() {
        assert!(is_mostly_language("You can schedule posts.", Language::En, 0.3));
        assert!(!is_mostly_language("您可以安排帖子 posts", Language::En, 0.3));
    }
}
