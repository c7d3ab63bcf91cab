use std::io::{self, Write};

use textwrap::core::display_width;

use crate::canvas::{cell_width, measure, Canvas};
use crate::terminal::{Key, KeySource};

const TAB: &str = "    ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LineInput {
    Submitted(String),
    Interrupted,
}

/// Editable text with a byte cursor that always sits on a char boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct InputBuffer {
    text: String,
    cursor: usize,
}

impl InputBuffer {
    pub(crate) fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.len(),
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn into_text(self) -> String {
        self.text
    }

    fn insert_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.insert_str(c.encode_utf8(&mut buf));
    }

    /// Insert at the cursor. Tabs become spaces and other control characters
    /// are dropped, so every char in the buffer has the width `measure` gives it.
    fn insert_str(&mut self, raw: &str) {
        let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
        let mut clean = String::with_capacity(normalized.len());
        for ch in normalized.chars() {
            match ch {
                '\t' => clean.push_str(TAB),
                '\n' => clean.push('\n'),
                ch if ch.is_control() => {}
                ch => clean.push(ch),
            }
        }
        self.text.insert_str(self.cursor, &clean);
        self.cursor += clean.len();
    }

    fn backspace(&mut self) {
        if let Some((prev, _)) = self.text[..self.cursor].char_indices().last() {
            self.text.drain(prev..self.cursor);
            self.cursor = prev;
        }
    }

    fn backspace_word(&mut self) {
        while self.cursor > 0 && self.text[..self.cursor].ends_with(char::is_whitespace) {
            self.backspace();
        }
        while self.cursor > 0 && !self.text[..self.cursor].ends_with(char::is_whitespace) {
            self.backspace();
        }
    }

    fn delete(&mut self) {
        if let Some(ch) = self.text[self.cursor..].chars().next() {
            self.text.drain(self.cursor..self.cursor + ch.len_utf8());
        }
    }

    fn move_left(&mut self) {
        if let Some((prev, _)) = self.text[..self.cursor].char_indices().last() {
            self.cursor = prev;
        }
    }

    fn move_right(&mut self) {
        if let Some(ch) = self.text[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Apply an editing key. Enter, interrupt and end-of-input are handled by
    /// the caller.
    pub(crate) fn apply(&mut self, key: &Key) {
        match key {
            Key::Char(c) => self.insert_char(*c),
            Key::Paste(text) => self.insert_str(text),
            Key::Ctrl('n') => self.insert_char('\n'),
            Key::Ctrl('r') => self.clear(),
            Key::Ctrl('a') | Key::Home => self.cursor = 0,
            Key::Ctrl('e') | Key::End => self.cursor = self.text.len(),
            Key::Ctrl('w') => self.backspace_word(),
            Key::Backspace => self.backspace(),
            Key::Delete => self.delete(),
            Key::Left => self.move_left(),
            Key::Right => self.move_right(),
            _ => {}
        }
    }
}

/// Column and row the cursor lands on after printing `before`, when the
/// first row starts at `start_column` and continuation lines are indented to
/// the same column.
fn cursor_cell(before: &str, width: usize, start_column: usize) -> (usize, usize) {
    let width = width.max(1);
    let (mut column, mut row) = (start_column, 0);
    for ch in before.chars() {
        if ch == '\n' {
            column = start_column;
            row += 1;
            continue;
        }
        let cells = cell_width(ch);
        if cells == 0 {
            continue;
        }
        // A wide char that does not fit moves whole to the next row.
        if column + cells > width {
            column = 0;
            row += 1;
        }
        column += cells;
        if column >= width {
            column = 0;
            row += 1;
        }
    }
    (column, row)
}

/// Screen text for `prefix` followed by the buffer, plus the row and column
/// the cursor belongs at, relative to the first row of that text.
pub(crate) fn layout(prefix: &str, buffer: &InputBuffer, width: usize) -> (String, usize, usize) {
    let width = width.max(1);
    let (head_rows, prompt) = match prefix.rsplit_once('\n') {
        Some((head, prompt)) => (measure(&format!("{head}\n"), width), prompt),
        None => (0, prefix),
    };
    let prompt_width = display_width(prompt);
    let lead_rows = prompt_width.saturating_sub(1) / width;
    let start_column = prompt_width - lead_rows * width;

    let indent = " ".repeat(start_column);
    let body = buffer.text().replace('\n', &format!("\n{indent}"));
    let before = &buffer.text()[..buffer.cursor()];
    let (column, row) = cursor_cell(before, width, start_column);
    (format!("{prefix}{body}"), head_rows + lead_rows + row, column)
}

/// Edit a line below `prefix`, starting from `default`. Every keystroke
/// redraws through the canvas, so the region never leaves stale rows.
/// On return the region holds the final text plus a newline and has not been
/// committed; the caller decides whether it stays.
pub(crate) fn read_line<W: Write>(
    canvas: &mut Canvas<W>,
    keys: &mut dyn KeySource,
    width: &dyn Fn() -> usize,
    prefix: &str,
    default: &str,
) -> io::Result<LineInput> {
    let _raw = keys.raw_mode()?;
    let mut buffer = InputBuffer::with_text(default);
    loop {
        let columns = width();
        let (text, row, column) = layout(prefix, &buffer, columns);
        canvas.draw(&text, columns)?;
        canvas.place_cursor(row, column)?;

        match keys.next_key()? {
            Key::Enter => {
                finish(canvas, prefix, &buffer, width())?;
                return Ok(LineInput::Submitted(buffer.into_text()));
            }
            Key::Interrupt | Key::Eof => {
                finish(canvas, prefix, &buffer, width())?;
                return Ok(LineInput::Interrupted);
            }
            key => buffer.apply(&key),
        }
    }
}

fn finish<W: Write>(
    canvas: &mut Canvas<W>,
    prefix: &str,
    buffer: &InputBuffer,
    width: usize,
) -> io::Result<()> {
    let (text, _, _) = layout(prefix, buffer, width);
    canvas.draw(&format!("{text}\n"), width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::tests::ScriptedKeys;
    use pretty_assertions::assert_eq;

    fn buffer_after(keys: &[Key]) -> InputBuffer {
        let mut buffer = InputBuffer::default();
        for key in keys {
            buffer.apply(key);
        }
        buffer
    }

    #[test]
    fn editing_keys_move_and_delete() {
        let buffer = buffer_after(&[
            Key::Char('a'),
            Key::Char('c'),
            Key::Left,
            Key::Char('b'),
            Key::End,
            Key::Backspace,
            Key::Home,
            Key::Delete,
        ]);
        assert_eq!(buffer.text(), "b");
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn ctrl_w_removes_the_previous_word() {
        let mut buffer = InputBuffer::with_text("copy block  ");
        buffer.apply(&Key::Ctrl('w'));
        assert_eq!(buffer.text(), "copy ");
    }

    #[test]
    fn ctrl_n_inserts_newline_and_ctrl_r_clears() {
        let mut buffer = InputBuffer::with_text("one");
        buffer.apply(&Key::Ctrl('n'));
        buffer.apply(&Key::Char('2'));
        assert_eq!(buffer.text(), "one\n2");
        buffer.apply(&Key::Ctrl('r'));
        assert_eq!(buffer, InputBuffer::default());
    }

    #[test]
    fn paste_normalizes_line_endings() {
        let buffer = buffer_after(&[Key::Paste("a\r\nb\rc".to_string())]);
        assert_eq!(buffer.text(), "a\nb\nc");
        assert_eq!(buffer.cursor(), buffer.text().len());
    }

    #[test]
    fn multibyte_cursor_stays_on_char_boundaries() {
        let mut buffer = InputBuffer::with_text("héllo");
        buffer.apply(&Key::Left);
        buffer.apply(&Key::Left);
        buffer.apply(&Key::Left);
        buffer.apply(&Key::Backspace);
        assert_eq!(buffer.text(), "hllo");
    }

    #[test]
    fn cursor_position_wraps_and_follows_newlines() {
        assert_eq!(cursor_cell("abcdef", 4, 2), (0, 2));
        assert_eq!(cursor_cell("ab\ncd", 10, 2), (4, 1));
        assert_eq!(cursor_cell("漢字", 3, 0), (2, 1));
    }

    #[test]
    fn tabs_and_control_chars_never_reach_the_screen() {
        let buffer = buffer_after(&[
            Key::Paste("\tabcdefghijklmn".to_string()),
            Key::Char('\t'),
            Key::Char('\u{7}'),
        ]);
        assert_eq!(buffer.text(), "    abcdefghijklmn    ");

        let mut pasted = InputBuffer::default();
        pasted.apply(&Key::Paste("\tabcdefghijklmn\tz".to_string()));
        let (text, _, _) = layout(": ", &pasted, 20);
        let (expanded, _, _) =
            layout(": ", &InputBuffer::with_text("    abcdefghijklmn    z"), 20);
        assert_eq!(text, expanded);
        assert_eq!(display_width(&text), 25);
        assert_eq!(measure(&text, 20), 2);
    }

    #[test]
    fn cursor_row_agrees_with_measured_rows() {
        for (text, width) in [("abcdefgh", 5), ("漢字漢字漢", 7), ("e\u{301}xyz", 3), ("a\nbcdef", 4)] {
            let buffer = InputBuffer::with_text(text);
            let (screen, row, _) = layout(": ", &buffer, width);
            assert!(row <= measure(&screen, width), "{text:?} at {width}");
            assert!(row + 1 >= measure(&screen, width), "{text:?} at {width}");
        }
    }

    #[test]
    fn layout_accounts_for_multi_line_prefix() {
        let buffer = InputBuffer::with_text("x\ny");
        let (text, row, column) = layout("header\n: ", &buffer, 20);
        assert_eq!(text, "header\n: x\n  y");
        assert_eq!((row, column), (2, 3));
    }

    #[test]
    fn read_line_submits_edited_default() {
        let mut canvas = Canvas::new(Vec::new());
        let mut keys = ScriptedKeys::typed("!");
        let line = read_line(&mut canvas, &mut keys, &|| 40, ": ", "draft").expect("read");
        assert_eq!(line, LineInput::Submitted("draft!".to_string()));
        assert_eq!(canvas.rows(), measure(": draft!\n", 40));
    }

    #[test]
    fn interrupt_ends_the_line() {
        let mut canvas = Canvas::new(Vec::new());
        let mut keys = ScriptedKeys(vec![Key::Char('a'), Key::Interrupt].into());
        let line = read_line(&mut canvas, &mut keys, &|| 40, ": ", "").expect("read");
        assert_eq!(line, LineInput::Interrupted);
    }
}
