use std::sync::{Mutex, OnceLock};
use std::thread::{self, JoinHandle};

use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::{SyntaxReference, SyntaxSet};

use super::theme::RESET;

struct SyntaxAssets {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl SyntaxAssets {
    fn load() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }

    fn syntax_for(&self, language: &str) -> &SyntaxReference {
        let language = language.trim();
        if language.is_empty() {
            return self.syntaxes.find_syntax_plain_text();
        }
        self.syntaxes
            .find_syntax_by_token(language)
            .or_else(|| self.syntaxes.find_syntax_by_extension(language))
            .or_else(|| self.syntaxes.find_syntax_by_name(language))
            .unwrap_or_else(|| {
                tracing::debug!(language, "no syntax for fence tag; using plain text");
                self.syntaxes.find_syntax_plain_text()
            })
    }
}

/// Syntax highlighter whose grammar and theme sets load at most once.
///
/// `preload` starts loading on a background thread so the first code block
/// does not stall the prompt; `lazy` defers loading to the first call. Either
/// way the caller sees the same results.
pub(crate) struct Highlighter {
    pending: Mutex<Option<JoinHandle<SyntaxAssets>>>,
    assets: OnceLock<SyntaxAssets>,
}

impl Highlighter {
    pub(crate) fn preload() -> Self {
        let pending = match thread::Builder::new()
            .name("syntax-preload".to_string())
            .spawn(SyntaxAssets::load)
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(%err, "could not spawn syntax preload; loading on demand");
                None
            }
        };
        Self {
            pending: Mutex::new(pending),
            assets: OnceLock::new(),
        }
    }

    pub(crate) fn lazy() -> Self {
        Self {
            pending: Mutex::new(None),
            assets: OnceLock::new(),
        }
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.assets.get().is_some()
    }

    fn assets(&self) -> &SyntaxAssets {
        self.assets.get_or_init(|| {
            let handle = match self.pending.lock() {
                Ok(mut slot) => slot.take(),
                Err(poisoned) => poisoned.into_inner().take(),
            };
            match handle.map(JoinHandle::join) {
                Some(Ok(assets)) => assets,
                Some(Err(_)) => {
                    tracing::warn!("syntax preload panicked; loading inline");
                    SyntaxAssets::load()
                }
                None => SyntaxAssets::load(),
            }
        })
    }

    /// Highlight `code` as `language` using the named syntect theme. Returns
    /// `None` when the theme is unknown or a line fails to highlight, leaving
    /// the caller to print the block plainly. Each output line ends with a
    /// reset so colour never leaks past the block.
    pub(crate) fn highlight(&self, code: &str, language: &str, theme_name: &str) -> Option<String> {
        let assets = self.assets();
        let Some(theme) = assets.themes.themes.get(theme_name) else {
            tracing::warn!(theme_name, "unknown syntax theme");
            return None;
        };
        let mut highlighter = HighlightLines::new(assets.syntax_for(language), theme);
        let mut lines = Vec::new();
        for line in code.split('\n') {
            let source = format!("{line}\n");
            let ranges = match highlighter.highlight_line(&source, &assets.syntaxes) {
                Ok(ranges) => ranges,
                Err(err) => {
                    tracing::warn!(%err, language, "syntax highlighting failed");
                    return None;
                }
            };
            let mut styled = String::new();
            for (style, text) in ranges {
                let text = text.trim_end_matches('\n');
                if text.is_empty() {
                    continue;
                }
                let fg = style.foreground;
                styled.push_str(&format!("\x1b[38;2;{};{};{}m{text}", fg.r, fg.g, fg.b));
            }
            styled.push_str(RESET);
            lines.push(styled);
        }
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textwrap::core::display_width;

    #[test]
    fn highlighted_lines_keep_their_text() {
        let highlighter = Highlighter::lazy();
        assert!(!highlighter.is_loaded());
        let out = highlighter
            .highlight("fn main() {}\nlet x = 1;", "rust", "base16-ocean.dark")
            .expect("highlighted");
        assert!(highlighter.is_loaded());
        let rows: Vec<&str> = out.split('\n').collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("\x1b[38;2;"));
        assert!(rows.iter().all(|row| row.ends_with(RESET)));
        assert_eq!(display_width(rows[0]), "fn main() {}".len());
    }

    #[test]
    fn unknown_language_still_highlights_as_plain_text() {
        let highlighter = Highlighter::lazy();
        let out = highlighter
            .highlight("just words", "no-such-language", "base16-ocean.dark")
            .expect("plain text fallback");
        assert_eq!(display_width(&out), "just words".len());
    }

    #[test]
    fn unknown_theme_yields_none() {
        let highlighter = Highlighter::lazy();
        assert!(highlighter.highlight("x", "rust", "missing-theme").is_none());
    }

    #[test]
    fn preloaded_assets_match_lazy_ones() {
        let eager = Highlighter::preload();
        let lazy = Highlighter::lazy();
        let code = "def f():\n    return 1";
        assert_eq!(
            eager.highlight(code, "python", "InspiredGitHub"),
            lazy.highlight(code, "python", "InspiredGitHub")
        );
    }
}
