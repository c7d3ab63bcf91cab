use std::io::Write;

use anyhow::Result;

use crate::render::Accent;
use crate::terminal::{Key, KeySource};

use super::App;

const QUESTION: &str = "Are you sure you want to submit? ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Confirmation {
    Commit,
    /// Back to the editor with the text intact.
    Edit,
}

impl Confirmation {
    pub(crate) fn from_key(key: &Key) -> Self {
        match key {
            Key::Char('y' | 'Y') => Confirmation::Commit,
            _ => Confirmation::Edit,
        }
    }
}

impl<W: Write> App<W> {
    /// Ask once, below the just-submitted input, whether to send it. On yes
    /// every row of the question is wiped and the input stays on screen; on
    /// anything else both are erased so the editor can redraw in their place.
    pub(super) fn confirm(&mut self, keys: &mut dyn KeySource) -> Result<Confirmation> {
        let _raw = keys.raw_mode()?;
        let question = format!("{QUESTION}{}", Accent::Cyan.paint("[y/n]"));
        let input_end = self.canvas.mark();
        self.canvas.append(&question)?;
        let answer = Confirmation::from_key(&keys.next_key()?);
        match answer {
            Confirmation::Commit => {
                self.canvas.rewind(input_end)?;
                self.canvas.commit();
            }
            Confirmation::Edit => self.canvas.erase()?,
        }
        tracing::debug!(?answer, "submission confirmation");
        Ok(answer)
    }
}
