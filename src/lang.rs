use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    En,
    Zh,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }

    /// Name used inside prompts.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Zh => "Simplified Chinese",
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "zh" | "zh-cn" | "zh-hans" | "chinese" => Ok(Self::Zh),
            other => Err(anyhow!("unsupported language: {other}")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Translation direction: text in `source` becomes text in `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Direction {
    pub source: Language,
    pub target: Language,
}

impl Direction {
    pub const EN_ZH: Direction = Direction {
        source: Language::En,
        target: Language::Zh,
    };
    pub const ZH_EN: Direction = Direction {
        source: Language::Zh,
        target: Language::En,
    };
}

impl Default for Direction {
    fn default() -> Self {
        Self::EN_ZH
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let norm = s.trim().to_ascii_lowercase().replace(['_', '>'], "-");
        let (src, tgt) = norm
            .split_once('-')
            .ok_or_else(|| anyhow!("direction must look like `en-zh`: {s}"))?;
        let source: Language = src.trim_end_matches('-').parse()?;
        let target: Language = tgt.trim_start_matches('-').parse()?;
        if source == target {
            return Err(anyhow!("direction source and target are the same: {s}"));
        }
        Ok(Self { source, target })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, Language};

    #[test]
    fn parses_direction_spellings() {
        assert_eq!("en-zh".parse::<Direction>().unwrap(), Direction::EN_ZH);
        assert_eq!("ZH_EN".parse::<Direction>().unwrap(), Direction::ZH_EN);
        assert_eq!("en->zh".parse::<Direction>().unwrap(), Direction::EN_ZH);
        assert!("en-en".parse::<Direction>().is_err());
        assert!("fr-en".parse::<Direction>().is_err());
        assert_eq!(Direction::ZH_EN.to_string(), "zh-en");
        assert_eq!(Language::Zh.display_name(), "Simplified Chinese");
    }
}
