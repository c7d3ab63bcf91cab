use std::io::{self, Write};

use crate::canvas::Canvas;
use crate::terminal::KeySource;

use super::input::{read_line, LineInput};

pub(crate) const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SelectableItem {
    pub(crate) id: i64,
    pub(crate) label: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SelectorState {
    Idle,
    ShowingPage(usize),
    AwaitingChoice(usize),
    /// `None` means start a new chat.
    Done(Option<SelectableItem>),
    Cancelled,
}

/// Paged picker over a list of items. Pure state; drawing goes through
/// [`run_selector`].
pub(crate) struct Selector {
    title: String,
    fresh_label: String,
    items: Vec<SelectableItem>,
    page_size: usize,
    state: SelectorState,
}

impl Selector {
    pub(crate) fn new(items: Vec<SelectableItem>, page_size: usize) -> Self {
        Self {
            title: "Select chat".to_string(),
            fresh_label: "New Chat".to_string(),
            items,
            page_size: page_size.max(1),
            state: SelectorState::Idle,
        }
    }

    pub(crate) fn state(&self) -> &SelectorState {
        &self.state
    }

    pub(crate) fn page_count(&self) -> usize {
        self.items.len().div_ceil(self.page_size).max(1)
    }

    fn current_page(&self) -> usize {
        match self.state {
            SelectorState::ShowingPage(page) | SelectorState::AwaitingChoice(page) => page,
            _ => 0,
        }
    }

    pub(crate) fn page_items(&self) -> &[SelectableItem] {
        let start = (self.current_page() * self.page_size).min(self.items.len());
        let end = (start + self.page_size).min(self.items.len());
        &self.items[start..end]
    }

    /// Text for the current page, ending with the choice prompt. Moves the
    /// selector to `AwaitingChoice`.
    pub(crate) fn show(&mut self) -> String {
        let page = self.current_page();
        self.state = SelectorState::AwaitingChoice(page);
        let items = self.page_items();

        let mut text = format!(
            "\n{}: (0-{}, default: 0)\n\n0. {}\n",
            self.title,
            items.len(),
            self.fresh_label
        );
        for (i, item) in items.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", i + 1, item.label));
        }

        let mut hints = Vec::new();
        if page + 1 < self.page_count() {
            hints.push("n for next page");
        }
        if page > 0 {
            hints.push("p for previous page");
        }
        hints.push("q to quit");
        if items.is_empty() {
            text.push_str(&format!("(No saved chats, {}): ", hints.join(", ")));
        } else {
            let first = page * self.page_size + 1;
            text.push_str(&format!(
                "(Showing {}-{} of {}, {}): ",
                first,
                first + items.len() - 1,
                self.items.len(),
                hints.join(", ")
            ));
        }
        text
    }

    /// Feed one submitted answer. Anything unrecognised redisplays the page.
    pub(crate) fn choose(&mut self, input: &str) -> &SelectorState {
        let SelectorState::AwaitingChoice(page) = self.state else {
            return &self.state;
        };
        let answer = input.trim().to_lowercase();
        let last_page = self.page_count() - 1;
        self.state = match answer.as_str() {
            "" | "0" => SelectorState::Done(None),
            "n" => SelectorState::ShowingPage((page + 1).min(last_page)),
            "p" => SelectorState::ShowingPage(page.saturating_sub(1)),
            "q" => SelectorState::Cancelled,
            other => match other.parse::<usize>() {
                Ok(choice) if (1..=self.page_items().len()).contains(&choice) => {
                    SelectorState::Done(Some(self.page_items()[choice - 1].clone()))
                }
                _ => SelectorState::ShowingPage(page),
            },
        };
        tracing::debug!(state = ?self.state, "selector transition");
        &self.state
    }

    pub(crate) fn cancel(&mut self) {
        self.state = SelectorState::Cancelled;
    }
}

/// Drive the selector on the canvas until it finishes. Each page is drawn
/// from the same snapshot, so paging never piles output up on screen.
pub(crate) fn run_selector<W: Write>(
    selector: &mut Selector,
    canvas: &mut Canvas<W>,
    keys: &mut dyn KeySource,
    width: &dyn Fn() -> usize,
    dim: &dyn Fn(&str) -> String,
) -> io::Result<SelectorState> {
    canvas.snapshot();
    loop {
        canvas.restore_and_clear()?;
        let page = selector.show();
        match read_line(canvas, keys, width, &page, "")? {
            LineInput::Submitted(answer) => {
                if let SelectorState::ShowingPage(_) = selector.choose(&answer) {
                    continue;
                }
            }
            LineInput::Interrupted => {
                selector.cancel();
                let (head, prompt) = page.rsplit_once('\n').unwrap_or(("", page.as_str()));
                canvas.draw(&format!("{head}\n{}\n", dim(prompt)), width())?;
            }
        }
        canvas.commit();
        canvas.release_snapshot();
        return Ok(selector.state().clone());
    }
}
