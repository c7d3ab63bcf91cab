use serde::{Deserialize, Deserializer, Serialize};

pub(crate) const RESET: &str = "\x1b[0m";
pub(crate) const BOLD: &str = "\x1b[1m";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ThemePreset {
    Fjord,
    Graphite,
    Solarized,
    Aurora,
    Ember,
}

impl<'de> Deserialize<'de> for ThemePreset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ThemePreset::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown theme `{raw}`")))
    }
}

impl ThemePreset {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ThemePreset::Fjord => "fjord",
            ThemePreset::Graphite => "graphite",
            ThemePreset::Solarized => "solarized",
            ThemePreset::Aurora => "aurora",
            ThemePreset::Ember => "ember",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "fjord" | "classic" | "default" => Some(ThemePreset::Fjord),
            "graphite" | "slate" | "gray" | "mono" => Some(ThemePreset::Graphite),
            "solarized" | "sand" | "amber" => Some(ThemePreset::Solarized),
            "aurora" | "mint" | "violet" => Some(ThemePreset::Aurora),
            "ember" | "warm" | "copper" => Some(ThemePreset::Ember),
            _ => None,
        }
    }

    /// Resolve the preset into the escape table handed to the renderer.
    pub(crate) fn theme(self) -> Theme {
        match self {
            ThemePreset::Fjord => Theme {
                bold: BOLD,
                italic: "\x1b[3m",
                heading: "\x1b[1;35m",
                bullet: "\x1b[93m",
                ordered: "\x1b[93m",
                inline_code: "\x1b[1;36m",
                dim: "\x1b[90m",
                syntax_theme: "base16-eighties.dark".to_string(),
            },
            ThemePreset::Graphite => Theme {
                bold: BOLD,
                italic: "\x1b[3m",
                heading: "\x1b[1;97m",
                bullet: "\x1b[90m",
                ordered: "\x1b[37m",
                inline_code: "\x1b[1;37m",
                dim: "\x1b[90m",
                syntax_theme: "base16-ocean.dark".to_string(),
            },
            ThemePreset::Solarized => Theme {
                bold: BOLD,
                italic: "\x1b[3m",
                heading: "\x1b[1;33m",
                bullet: "\x1b[32m",
                ordered: "\x1b[32m",
                inline_code: "\x1b[1;36m",
                dim: "\x1b[37m",
                syntax_theme: "Solarized (dark)".to_string(),
            },
            ThemePreset::Aurora => Theme {
                bold: BOLD,
                italic: "\x1b[3m",
                heading: "\x1b[1;38;5;141m",
                bullet: "\x1b[38;5;79m",
                ordered: "\x1b[38;5;79m",
                inline_code: "\x1b[1;38;5;183m",
                dim: "\x1b[38;5;245m",
                syntax_theme: "base16-mocha.dark".to_string(),
            },
            ThemePreset::Ember => Theme {
                bold: BOLD,
                italic: "\x1b[3m",
                heading: "\x1b[1;38;5;208m",
                bullet: "\x1b[38;5;214m",
                ordered: "\x1b[38;5;214m",
                inline_code: "\x1b[1;38;5;223m",
                dim: "\x1b[38;5;244m",
                syntax_theme: "base16-eighties.dark".to_string(),
            },
        }
    }
}

pub(crate) fn default_theme() -> ThemePreset {
    ThemePreset::Fjord
}

/// Escape sequences the renderer applies. Built once from a preset and then
/// treated as read-only configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Theme {
    pub(crate) bold: &'static str,
    pub(crate) italic: &'static str,
    pub(crate) heading: &'static str,
    pub(crate) bullet: &'static str,
    pub(crate) ordered: &'static str,
    pub(crate) inline_code: &'static str,
    pub(crate) dim: &'static str,
    pub(crate) syntax_theme: String,
}

impl Theme {
    pub(crate) fn with_syntax_theme(mut self, name: Option<&str>) -> Self {
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            self.syntax_theme = name.to_string();
        }
        self
    }

    pub(crate) fn dim(&self, text: &str) -> String {
        format!("{}{text}{RESET}", self.dim)
    }
}

/// Named accent colours used for the model label and the horizontal rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Accent {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Grey,
    Orange3,
}

impl Accent {
    pub(crate) fn code(self) -> &'static str {
        match self {
            Accent::Red => "\x1b[91m",
            Accent::Green => "\x1b[92m",
            Accent::Yellow => "\x1b[93m",
            Accent::Blue => "\x1b[94m",
            Accent::Magenta => "\x1b[95m",
            Accent::Cyan => "\x1b[96m",
            Accent::White => "\x1b[97m",
            Accent::Grey => "\x1b[37m",
            Accent::Orange3 => "\x1b[38;5;208m",
        }
    }

    /// Unknown names fall back to green.
    pub(crate) fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "red" => Accent::Red,
            "yellow" => Accent::Yellow,
            "blue" => Accent::Blue,
            "magenta" => Accent::Magenta,
            "cyan" => Accent::Cyan,
            "white" => Accent::White,
            "grey" | "gray" => Accent::Grey,
            "orange3" | "orange" => Accent::Orange3,
            _ => Accent::Green,
        }
    }

    pub(crate) fn paint(self, text: &str) -> String {
        format!("{}{text}{RESET}", self.code())
    }
}

/// Full-width horizontal rule in the accent colour.
pub(crate) fn rule(accent: Accent, width: usize) -> String {
    accent.paint(&"─".repeat(width.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn preset_parse_accepts_aliases() {
        assert_eq!(ThemePreset::parse(" Classic "), Some(ThemePreset::Fjord));
        assert_eq!(ThemePreset::parse("copper"), Some(ThemePreset::Ember));
        assert_eq!(ThemePreset::parse("neon"), None);
    }

    #[test]
    fn unknown_accent_falls_back_to_green() {
        assert_eq!(Accent::from_name("chartreuse"), Accent::Green);
        assert_eq!(Accent::from_name("Orange3"), Accent::Orange3);
    }

    #[test]
    fn rule_spans_requested_width() {
        let line = rule(Accent::Cyan, 12);
        assert_eq!(line, format!("\x1b[96m{}\x1b[0m", "─".repeat(12)));
    }

    #[test]
    fn syntax_theme_override_ignores_blank_names() {
        let theme = ThemePreset::Fjord.theme().with_syntax_theme(Some("  "));
        assert_eq!(theme.syntax_theme, "base16-eighties.dark");
        let theme = theme.with_syntax_theme(Some("InspiredGitHub"));
        assert_eq!(theme.syntax_theme, "InspiredGitHub");
    }
}
