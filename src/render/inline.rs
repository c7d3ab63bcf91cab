use regex::{Captures, Regex};

use super::theme::{Theme, RESET};

/// Stands in for an inline code span while the other rules run. Lives in the
/// private use area so it cannot collide with model output.
const CODE_SENTINEL: char = '\u{E000}';

type Transform = fn(&Captures<'_>, &Theme) -> String;

struct Rule {
    name: &'static str,
    pattern: Regex,
    transform: Transform,
}

/// Ordered line-level markdown rules. Each rule is applied once per line, in
/// declaration order, after inline code spans have been set aside.
pub(crate) struct InlineRules {
    inline_code: Regex,
    rules: Vec<Rule>,
}

impl InlineRules {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        let rules = vec![
            Rule {
                name: "bold",
                pattern: Regex::new(r"\*\*(.*?)\*\*|__(.*?)__")?,
                transform: bold,
            },
            Rule {
                name: "italic",
                pattern: Regex::new(r"\*(.*?)\*|_(.*?)_")?,
                transform: italic,
            },
            Rule {
                name: "heading",
                pattern: Regex::new(r"^(#{1,6})\s*(.*)")?,
                transform: heading,
            },
            Rule {
                name: "bullet",
                pattern: Regex::new(r"^\s*([*\-+])\s+(.*)")?,
                transform: bullet,
            },
            Rule {
                name: "ordered",
                pattern: Regex::new(r"^(\d+\.)\s+(.*)")?,
                transform: ordered,
            },
        ];
        Ok(Self {
            inline_code: Regex::new(r"`(.*?)`")?,
            rules,
        })
    }

    pub(crate) fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }

    pub(crate) fn apply(&self, line: &str, theme: &Theme) -> String {
        let spans: Vec<String> = self
            .inline_code
            .captures_iter(line)
            .map(|caps| caps[1].to_string())
            .collect();
        let mut styled = if spans.is_empty() {
            line.to_string()
        } else {
            let sentinel = CODE_SENTINEL.to_string();
            self.inline_code
                .replace_all(line, sentinel.as_str())
                .into_owned()
        };

        for rule in &self.rules {
            styled = rule
                .pattern
                .replace_all(&styled, |caps: &Captures<'_>| (rule.transform)(caps, theme))
                .into_owned();
        }

        for span in spans {
            let code = format!("{}{span}{RESET}", theme.inline_code);
            styled = styled.replacen(CODE_SENTINEL, &code, 1);
        }
        styled
    }
}

fn either<'a>(caps: &'a Captures<'_>) -> &'a str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

fn bold(caps: &Captures<'_>, theme: &Theme) -> String {
    format!("{}{}{RESET}", theme.bold, either(caps))
}

fn italic(caps: &Captures<'_>, theme: &Theme) -> String {
    format!("{}{}{RESET}", theme.italic, either(caps))
}

fn heading(caps: &Captures<'_>, theme: &Theme) -> String {
    let depth = caps[1].len();
    format!("{}{} {}{RESET}", theme.heading, " ".repeat(depth), &caps[2])
}

fn bullet(caps: &Captures<'_>, theme: &Theme) -> String {
    format!("  {}•{RESET} {}", theme.bullet, &caps[2])
}

fn ordered(caps: &Captures<'_>, theme: &Theme) -> String {
    format!(" {}{}{RESET} {}", theme.ordered, &caps[1], &caps[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::theme::ThemePreset;
    use pretty_assertions::assert_eq;

    fn apply(line: &str) -> String {
        let rules = InlineRules::new().expect("rules compile");
        rules.apply(line, &ThemePreset::Fjord.theme())
    }

    #[test]
    fn bold_and_inline_code() {
        assert_eq!(
            apply("Hello **world** and `code`"),
            "Hello \x1b[1mworld\x1b[0m and \x1b[1;36mcode\x1b[0m"
        );
    }

    #[test]
    fn emphasis_markers_inside_code_are_left_alone() {
        assert_eq!(
            apply("run `a *b* c` now"),
            "run \x1b[1;36ma *b* c\x1b[0m now"
        );
    }

    #[test]
    fn multiple_code_spans_keep_their_order() {
        assert_eq!(
            apply("`one` then `two`"),
            "\x1b[1;36mone\x1b[0m then \x1b[1;36mtwo\x1b[0m"
        );
    }

    #[test]
    fn underscore_forms_match_asterisk_forms() {
        assert_eq!(apply("__strong__"), "\x1b[1mstrong\x1b[0m");
        assert_eq!(apply("_soft_"), "\x1b[3msoft\x1b[0m");
    }

    #[test]
    fn heading_indents_by_depth() {
        assert_eq!(apply("## Setup"), "\x1b[1;35m   Setup\x1b[0m");
    }

    #[test]
    fn list_markers_become_bullets_and_numbers() {
        assert_eq!(apply("- item"), "  \x1b[93m•\x1b[0m item");
        assert_eq!(apply("   + nested"), "  \x1b[93m•\x1b[0m nested");
        assert_eq!(apply("3. third"), " \x1b[93m3.\x1b[0m third");
    }

    #[test]
    fn unmatched_backtick_is_literal() {
        assert_eq!(apply("a ` b"), "a ` b");
    }

    #[test]
    fn rules_run_in_declared_order() {
        let rules = InlineRules::new().expect("rules compile");
        assert_eq!(
            rules.rule_names(),
            vec!["bold", "italic", "heading", "bullet", "ordered"]
        );
    }
}
