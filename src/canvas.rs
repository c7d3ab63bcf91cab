use std::io::{self, Write};

use crossterm::cursor::{MoveDown, MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use textwrap::core::display_width;

/// Number of terminal rows `text` occupies when printed at `width` columns.
///
/// Every newline-delimited line takes at least one row and soft-wraps every
/// `width` visible columns. A trailing newline moves the cursor but does not
/// add a row of its own. A width of zero disables wrapping.
pub(crate) fn measure(text: &str, width: usize) -> usize {
    if text.is_empty() {
        return 0;
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n').map(|line| line_rows(line, width)).sum()
}

/// Columns a single character takes, by the same rule `measure` applies.
pub(crate) fn cell_width(ch: char) -> usize {
    let mut buf = [0u8; 4];
    display_width(ch.encode_utf8(&mut buf))
}

fn line_rows(line: &str, width: usize) -> usize {
    if width == 0 {
        return 1;
    }
    display_width(line).div_ceil(width).max(1)
}

/// How far below the first row of `text` the cursor sits after printing it.
fn cursor_rows(text: &str, width: usize) -> usize {
    let rows = measure(text, width);
    if text.ends_with('\n') {
        rows
    } else {
        rows.saturating_sub(1)
    }
}

/// Move up `rows` rows to column 0 and erase from there to the end of the
/// screen. Clearing zero rows writes nothing.
pub(crate) fn clear<W: Write>(out: &mut W, rows: usize) -> io::Result<()> {
    if rows == 0 {
        return Ok(());
    }
    queue!(
        out,
        MoveToColumn(0),
        MoveUp(clamp_rows(rows)),
        Clear(ClearType::FromCursorDown)
    )?;
    out.flush()
}

fn clamp_rows(rows: usize) -> u16 {
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// Opaque marker for the row output started on, counted relative to the
/// live region so it survives the screen scrolling underneath it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct CursorSnapshot {
    rows_above_region: usize,
}

/// Owns a writer and remembers exactly how many rows its live region takes,
/// so redraws erase the previous frame without leaving stale rows behind.
pub(crate) struct Canvas<W: Write> {
    out: W,
    region: String,
    width: usize,
    cursor_row: usize,
    snapshot: Option<CursorSnapshot>,
}

impl<W: Write> Canvas<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            out,
            region: String::new(),
            width: 0,
            cursor_row: 0,
            snapshot: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn get_ref(&self) -> &W {
        &self.out
    }

    pub(crate) fn rows(&self) -> usize {
        measure(&self.region, self.width)
    }

    /// Erase the live region and draw `text` as its replacement.
    pub(crate) fn draw(&mut self, text: &str, width: usize) -> io::Result<()> {
        self.erase()?;
        self.width = width;
        self.append(text)
    }

    /// Extend the live region without erasing it.
    pub(crate) fn append(&mut self, text: &str) -> io::Result<()> {
        self.write_raw(text)?;
        self.out.flush()?;
        self.region.push_str(text);
        self.cursor_row = cursor_rows(&self.region, self.width);
        Ok(())
    }

    /// Keep whatever the live region shows and start a fresh, empty region at
    /// the cursor.
    pub(crate) fn commit(&mut self) {
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.rows_above_region += self.cursor_row;
        }
        self.region.clear();
        self.cursor_row = 0;
    }

    /// Print permanent output that later redraws never touch.
    pub(crate) fn print(&mut self, text: &str, width: usize) -> io::Result<()> {
        self.commit();
        self.width = width;
        self.append(text)?;
        self.commit();
        Ok(())
    }

    /// Remove the live region from the screen.
    pub(crate) fn erase(&mut self) -> io::Result<()> {
        if !self.region.is_empty() {
            if self.cursor_row == 0 {
                queue!(self.out, MoveToColumn(0), Clear(ClearType::FromCursorDown))?;
                self.out.flush()?;
            } else {
                clear(&mut self.out, self.cursor_row)?;
            }
        }
        self.region.clear();
        self.cursor_row = 0;
        Ok(())
    }

    /// Move the cursor to `row`/`column` inside the live region. Positions past
    /// the last drawn cell are pulled back onto it so row bookkeeping stays
    /// exact.
    pub(crate) fn place_cursor(&mut self, row: usize, column: usize) -> io::Result<()> {
        let last_row = self.rows().saturating_sub(1);
        let (row, column) = if row > last_row {
            (last_row, self.width.saturating_sub(1))
        } else {
            (row, column)
        };
        if row < self.cursor_row {
            queue!(self.out, MoveUp(clamp_rows(self.cursor_row - row)))?;
        } else if row > self.cursor_row {
            queue!(self.out, MoveDown(clamp_rows(row - self.cursor_row)))?;
        }
        queue!(self.out, MoveToColumn(clamp_rows(column)))?;
        self.out.flush()?;
        self.cursor_row = row;
        Ok(())
    }

    /// Position in the live region that [`Canvas::rewind`] can return to.
    pub(crate) fn mark(&self) -> usize {
        self.region.len()
    }

    /// Erase everything appended to the live region after `mark` and leave
    /// the cursor where that earlier text ended.
    pub(crate) fn rewind(&mut self, mark: usize) -> io::Result<()> {
        let Some(kept) = self.region.get(..mark) else {
            return Ok(());
        };
        if kept.len() == self.region.len() {
            return Ok(());
        }
        let row = cursor_rows(kept, self.width);
        let tail = display_width(kept.rsplit('\n').next().unwrap_or(""));
        let column = if self.width == 0 { tail } else { tail % self.width };

        queue!(self.out, MoveToColumn(clamp_rows(column)))?;
        if self.cursor_row > row {
            queue!(self.out, MoveUp(clamp_rows(self.cursor_row - row)))?;
        }
        queue!(self.out, Clear(ClearType::FromCursorDown))?;
        self.out.flush()?;
        self.region.truncate(mark);
        self.cursor_row = row;
        Ok(())
    }

    /// Remember the current row so later output can be wiped back to it.
    pub(crate) fn snapshot(&mut self) {
        self.commit();
        self.snapshot = Some(CursorSnapshot::default());
    }

    /// Return to the snapshot row and clear everything printed since. Without
    /// a snapshot this only erases the live region.
    pub(crate) fn restore_and_clear(&mut self) -> io::Result<()> {
        let Some(snapshot) = self.snapshot.as_mut() else {
            return self.erase();
        };
        let rows = snapshot.rows_above_region + self.cursor_row;
        snapshot.rows_above_region = 0;
        self.region.clear();
        self.cursor_row = 0;
        if rows == 0 {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::FromCursorDown))?;
            self.out.flush()
        } else {
            clear(&mut self.out, rows)
        }
    }

    pub(crate) fn release_snapshot(&mut self) {
        self.snapshot = None;
    }

    fn write_raw(&mut self, text: &str) -> io::Result<()> {
        // Raw mode disables output post-processing, so newlines carry their
        // own carriage return.
        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            self.out.write_all(first.as_bytes())?;
        }
        for line in lines {
            self.out.write_all(b"\r\n")?;
            self.out.write_all(line.as_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn written(canvas: &Canvas<Vec<u8>>) -> String {
        String::from_utf8_lossy(canvas.get_ref()).into_owned()
    }

    fn clear_sequence(rows: usize) -> String {
        let mut expected = Vec::new();
        clear(&mut expected, rows).expect("write to vec");
        String::from_utf8(expected).expect("utf8")
    }

    #[test]
    fn measure_counts_wrapped_rows() {
        assert_eq!(measure("", 10), 0);
        assert_eq!(measure("short", 10), 1);
        assert_eq!(measure("0123456789", 10), 1);
        assert_eq!(measure("0123456789a", 10), 2);
        assert_eq!(measure("a\n\nb", 10), 3);
        assert_eq!(measure("\x1b[1mbold\x1b[0m", 4), 1);
        assert_eq!(measure("漢字漢字", 6), 2);
    }

    #[test]
    fn trailing_newline_does_not_add_a_row() {
        assert_eq!(measure("one\ntwo\n", 10), 2);
        assert_eq!(measure("\n", 10), 1);
    }

    #[test]
    fn clear_of_zero_rows_is_a_no_op() {
        let mut out = Vec::new();
        clear(&mut out, 0).expect("write to vec");
        assert!(out.is_empty());
    }

    #[test]
    fn redraw_clears_exactly_the_rows_it_printed() {
        let mut canvas = Canvas::new(Vec::new());
        let first = "line one\nline two that wraps\n";
        canvas.draw(first, 10).expect("draw");
        assert_eq!(canvas.rows(), measure(first, 10));
        canvas.draw("next", 10).expect("redraw");

        let expected = format!(
            "line one\r\nline two that wraps\r\n{}next",
            clear_sequence(measure(first, 10))
        );
        assert_eq!(written(&canvas), expected);
    }

    #[test]
    fn committed_output_is_never_erased() {
        let mut canvas = Canvas::new(Vec::new());
        canvas.print("kept\n", 20).expect("print");
        canvas.draw("live", 20).expect("draw");
        canvas.erase().expect("erase");
        canvas.erase().expect("second erase is a no-op");
        let mut tail = Vec::new();
        queue!(tail, MoveToColumn(0), Clear(ClearType::FromCursorDown)).expect("write");
        let expected = format!("kept\r\nlive{}", String::from_utf8_lossy(&tail));
        assert_eq!(written(&canvas), expected);
    }

    #[test]
    fn snapshot_clears_everything_printed_since() {
        let mut canvas = Canvas::new(Vec::new());
        canvas.print("before\n", 20).expect("print");
        canvas.snapshot();
        canvas.print("page line 1\npage line 2\n", 20).expect("print page");
        canvas.draw(": n\n", 20).expect("draw prompt");
        canvas.restore_and_clear().expect("restore");
        canvas.print("again\n", 20).expect("print");
        canvas.restore_and_clear().expect("restore again");

        let expected = format!(
            "before\r\npage line 1\r\npage line 2\r\n: n\r\n{}again\r\n{}",
            clear_sequence(3),
            clear_sequence(1)
        );
        assert_eq!(written(&canvas), expected);
    }

    #[test]
    fn rewind_clears_every_row_appended_after_the_mark() {
        let mut canvas = Canvas::new(Vec::new());
        canvas.draw(": hi\n", 20).expect("draw");
        let mark = canvas.mark();
        let question = "Are you sure you want to submit? [y/n]";
        canvas.append(question).expect("append");
        canvas.rewind(mark).expect("rewind");
        assert_eq!(canvas.rows(), 1);

        let expected = format!(": hi\r\n{question}{}", clear_sequence(1));
        assert_eq!(written(&canvas), expected);

        canvas.rewind(mark).expect("nothing left to rewind");
        assert_eq!(written(&canvas), expected);
    }

    #[test]
    fn cursor_placement_is_clamped_to_drawn_rows() {
        let mut canvas = Canvas::new(Vec::new());
        canvas.draw("abcdefgh", 4).expect("draw");
        canvas.place_cursor(5, 0).expect("place");
        canvas.erase().expect("erase");
        let mut tail = Vec::new();
        queue!(tail, MoveToColumn(3)).expect("write");
        let expected = format!(
            "abcdefgh{}{}",
            String::from_utf8_lossy(&tail),
            clear_sequence(1)
        );
        assert_eq!(written(&canvas), expected);
    }
}
