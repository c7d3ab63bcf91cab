use std::panic::{catch_unwind, AssertUnwindSafe};

use textwrap::core::display_width;
use textwrap::{Options, WordSeparator, WordSplitter, WrapAlgorithm};

/// Wrap one styled line to `width` columns. Escape sequences are zero width
/// and never split; words only break on ASCII spaces and are never hyphenated.
/// A width of zero leaves the line untouched.
pub(crate) fn wrap_line(line: &str, width: usize) -> String {
    if width == 0 || display_width(line) <= width {
        return line.to_string();
    }
    let options = Options::new(width)
        .word_separator(WordSeparator::AsciiSpace)
        .word_splitter(WordSplitter::NoHyphenation)
        .wrap_algorithm(WrapAlgorithm::FirstFit)
        .break_words(true);
    let wrapped = catch_unwind(AssertUnwindSafe(|| {
        textwrap::wrap(line, &options)
            .into_iter()
            .map(|row| row.into_owned())
            .collect::<Vec<_>>()
    }));
    match wrapped {
        Ok(rows) => rows.join("\n"),
        Err(_) => {
            tracing::warn!(width, "line wrap failed; emitting it unwrapped");
            line.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_lines_pass_through() {
        assert_eq!(wrap_line("  keep  trailing  ", 40), "  keep  trailing  ");
        assert_eq!(wrap_line("anything at all", 0), "anything at all");
    }

    #[test]
    fn wraps_on_spaces_without_hyphenating() {
        assert_eq!(
            wrap_line("alpha beta-gamma delta", 11),
            "alpha\nbeta-gamma\ndelta"
        );
    }

    #[test]
    fn escapes_do_not_count_toward_width() {
        let line = "\x1b[1mbold\x1b[0m text here";
        let wrapped = wrap_line(line, 9);
        assert_eq!(wrapped, "\x1b[1mbold\x1b[0m text\nhere");
        for row in wrapped.split('\n') {
            assert!(display_width(row) <= 9, "{row:?}");
        }
    }

    #[test]
    fn long_words_are_broken_to_fit() {
        let wrapped = wrap_line("abcdefghij", 4);
        assert_eq!(wrapped, "abcd\nefgh\nij");
    }
}
