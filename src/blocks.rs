use crate::error::ReplError;

const FENCE: &str = "```";

/// A line opens or closes a fenced block when, once trimmed, it starts with
/// three backticks. The renderer and the extractor both go through this so
/// they always agree on block boundaries.
pub(crate) fn is_fence(line: &str) -> bool {
    line.trim().starts_with(FENCE)
}

/// Language tag of an opening fence line.
pub(crate) fn fence_language(line: &str) -> &str {
    line.trim_matches(|c: char| c == '`' || c.is_whitespace())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CodeBlock {
    pub(crate) ordinal: usize,
    pub(crate) language: String,
    pub(crate) content: String,
}

/// Fenced code blocks of the most recent reply, numbered from 1.
#[derive(Debug, Default)]
pub(crate) struct CodeBlocks {
    blocks: Vec<CodeBlock>,
}

impl CodeBlocks {
    pub(crate) fn extract(text: &str) -> Self {
        let mut blocks = Vec::new();
        let mut open: Option<(String, Vec<&str>)> = None;
        for line in text.split('\n') {
            if is_fence(line) {
                match open.take() {
                    None => open = Some((fence_language(line).to_string(), Vec::new())),
                    Some((language, body)) => blocks.push(CodeBlock {
                        ordinal: blocks.len() + 1,
                        language,
                        content: body.join("\n"),
                    }),
                }
                continue;
            }
            if let Some((_, body)) = open.as_mut() {
                body.push(line);
            }
        }
        if open.is_some() {
            tracing::debug!(complete = blocks.len(), "reply ends inside an open fence");
        }
        Self { blocks }
    }

    /// Replace the stored blocks with those found in `text`.
    pub(crate) fn parse(&mut self, text: &str) {
        *self = Self::extract(text);
    }

    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }

    pub(crate) fn get(&self, index: usize) -> Result<&CodeBlock, ReplError> {
        index
            .checked_sub(1)
            .and_then(|i| self.blocks.get(i))
            .ok_or(ReplError::InvalidIndex {
                index,
                count: self.blocks.len(),
            })
    }

    /// Copy block `index` (1-based) to the clipboard.
    pub(crate) fn copy_block(
        &self,
        index: usize,
        clipboard: &mut dyn ClipboardSink,
    ) -> Result<&CodeBlock, ReplError> {
        let block = self.get(index)?;
        clipboard.set_text(&block.content)?;
        tracing::debug!(
            ordinal = block.ordinal,
            language = %block.language,
            bytes = block.content.len(),
            "copied code block"
        );
        Ok(block)
    }
}

pub(crate) trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<(), ReplError>;
}

/// System clipboard. Kept alive for the whole session because some
/// platforms drop the selection when the owning handle goes away.
pub(crate) struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub(crate) fn open() -> Result<Self, ReplError> {
        arboard::Clipboard::new()
            .map(|inner| Self { inner })
            .map_err(|err| {
                tracing::debug!(%err, "clipboard unavailable");
                ReplError::Clipboard(err.to_string())
            })
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ReplError> {
        self.inner
            .set_text(text.to_string())
            .map_err(|err| ReplError::Clipboard(err.to_string()))
    }
}
