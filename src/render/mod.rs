//! Markdown to ANSI rendering for chat replies.

mod highlight;
mod inline;
pub(crate) mod theme;
mod wrap;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::blocks::{fence_language, is_fence};
use crate::canvas::measure;

pub(crate) use highlight::Highlighter;
use inline::InlineRules;
pub(crate) use theme::{rule, Accent, Theme, ThemePreset};

/// How replies are printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RenderMode {
    Raw,
    #[default]
    #[serde(alias = "rich")]
    Lite,
}

impl RenderMode {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "raw" => Some(RenderMode::Raw),
            "lite" | "rich" => Some(RenderMode::Lite),
            _ => None,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Raw => "raw",
            RenderMode::Lite => "lite",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RenderedOutput {
    pub(crate) text: String,
    pub(crate) rows: usize,
    pub(crate) code_blocks: usize,
}

struct OpenFence<'a> {
    opening: &'a str,
    language: &'a str,
    body: Vec<&'a str>,
}

pub(crate) struct Renderer {
    theme: Theme,
    rules: InlineRules,
    highlighter: Arc<Highlighter>,
}

impl Renderer {
    pub(crate) fn new(theme: Theme, highlighter: Arc<Highlighter>) -> Result<Self> {
        let rules = InlineRules::new().context("failed to compile markdown rules")?;
        tracing::debug!(rules = ?rules.rule_names(), syntax_theme = %theme.syntax_theme, "renderer ready");
        Ok(Self {
            theme,
            rules,
            highlighter,
        })
    }

    pub(crate) fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Render `markdown` for a terminal `width` columns wide, or without
    /// wrapping when the width is unknown.
    pub(crate) fn render(&self, markdown: &str, width: Option<usize>) -> RenderedOutput {
        let width = width.unwrap_or(0);
        let mut out: Vec<String> = Vec::new();
        let mut fence: Option<OpenFence<'_>> = None;
        let mut code_blocks = 0;

        for line in markdown.split('\n') {
            if is_fence(line) {
                match fence.take() {
                    None => {
                        fence = Some(OpenFence {
                            opening: line,
                            language: fence_language(line),
                            body: Vec::new(),
                        })
                    }
                    Some(open) => {
                        if let Some(block) = self.code_block(open.language, &open.body) {
                            out.push(block);
                        }
                        code_blocks += 1;
                    }
                }
                continue;
            }
            match fence.as_mut() {
                Some(open) => open.body.push(line),
                None => out.push(self.prose_line(line, width)),
            }
        }

        if let Some(open) = fence {
            tracing::debug!(lines = open.body.len(), "unterminated fence rendered as text");
            out.push(wrap::wrap_line(&untab(open.opening), width));
            for line in open.body {
                out.push(wrap::wrap_line(&untab(line), width));
            }
        }

        let text = out.join("\n");
        RenderedOutput {
            rows: measure(&text, width),
            text,
            code_blocks,
        }
    }

    /// Render in the requested mode. Raw output is the reply as-is.
    pub(crate) fn render_mode(
        &self,
        markdown: &str,
        mode: RenderMode,
        width: Option<usize>,
    ) -> RenderedOutput {
        match mode {
            RenderMode::Lite => self.render(markdown, width),
            RenderMode::Raw => RenderedOutput {
                text: markdown.to_string(),
                rows: measure(markdown, width.unwrap_or(0)),
                code_blocks: 0,
            },
        }
    }

    fn prose_line(&self, line: &str, width: usize) -> String {
        let styled = self.rules.apply(&untab(line), &self.theme);
        wrap::wrap_line(&styled, width)
    }

    fn code_block(&self, language: &str, body: &[&str]) -> Option<String> {
        if body.is_empty() {
            return None;
        }
        let code = body
            .iter()
            .map(|line| line.replace('\t', "    "))
            .collect::<Vec<_>>()
            .join("\n");
        if !self.highlighter.is_loaded() {
            tracing::debug!("waiting for syntax definitions");
        }
        let highlighted = self
            .highlighter
            .highlight(&code, language, &self.theme.syntax_theme);
        Some(highlighted.unwrap_or(code))
    }
}

fn untab(line: &str) -> String {
    line.replace('\t', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::CodeBlocks;
    use pretty_assertions::assert_eq;
    use textwrap::core::display_width;

    fn renderer() -> Renderer {
        Renderer::new(ThemePreset::Fjord.theme(), Arc::new(Highlighter::lazy()))
            .expect("renderer")
    }

    #[test]
    fn styles_bold_and_inline_code() {
        let out = renderer().render("Hello **world** and `code`", Some(80));
        assert_eq!(
            out.text,
            "Hello \x1b[1mworld\x1b[0m and \x1b[1;36mcode\x1b[0m"
        );
        assert_eq!(out.rows, 1);
        assert_eq!(out.code_blocks, 0);
    }

    #[test]
    fn block_count_matches_extractor() {
        let reply = "# Plan\n```rust\nfn main() {}\n```\n- step\n```\n\tindented\n```\ntrailing\n```sh\nno close";
        let out = renderer().render(reply, Some(40));
        assert_eq!(out.code_blocks, 2);
        assert_eq!(out.code_blocks, CodeBlocks::extract(reply).len());
    }

    #[test]
    fn code_lines_are_not_styled_as_markdown() {
        let out = renderer().render("```\n# not a heading\n```", Some(80));
        assert!(!out.text.contains("\x1b[1;35m"));
        assert!(out.text.contains("# not a heading"));
    }

    #[test]
    fn unterminated_fence_is_printed_plain() {
        let out = renderer().render("text\n```python\nprint('x')", Some(80));
        assert_eq!(out.text, "text\n```python\nprint('x')");
        assert_eq!(out.code_blocks, 0);
        assert_eq!(out.rows, 3);
    }

    #[test]
    fn wrapped_rows_fit_the_width() {
        let reply = "A **fairly** long line of prose with `inline code` and _emphasis_ that must wrap neatly.\n\n1. first numbered item that also runs past the edge";
        for width in [12, 17, 30] {
            let out = renderer().render(reply, Some(width));
            for row in out.text.split('\n') {
                assert!(display_width(row) <= width, "{width}: {row:?}");
            }
            assert_eq!(out.rows, out.text.split('\n').count());
        }
    }

    #[test]
    fn escape_sequences_stay_on_one_row() {
        let reply = "**bold words spanning the wrap point** then `code that also spans`";
        let out = renderer().render(reply, Some(10));
        for row in out.text.split('\n') {
            let mut rest = row;
            while let Some(start) = rest.find("\x1b[") {
                let tail = &rest[start + 2..];
                let end = tail
                    .find(|c: char| c.is_ascii_alphabetic())
                    .expect("escape terminated on the same row");
                rest = &tail[end + 1..];
            }
        }
    }

    #[test]
    fn unknown_width_leaves_lines_unwrapped() {
        let line = "word ".repeat(40);
        let out = renderer().render(&line, None);
        assert_eq!(out.text, line);
        assert_eq!(out.rows, 1);
    }

    #[test]
    fn raw_mode_passes_text_through() {
        let out = renderer().render_mode("**x**\n```\ny\n```", RenderMode::Raw, Some(80));
        assert_eq!(out.text, "**x**\n```\ny\n```");
    }

    #[test]
    fn render_mode_names() {
        assert_eq!(RenderMode::parse("RICH"), Some(RenderMode::Lite));
        assert_eq!(RenderMode::parse("raw"), Some(RenderMode::Raw));
        assert_eq!(RenderMode::parse("fancy"), None);
        assert_eq!(RenderMode::Lite.as_str(), "lite");
    }
}
