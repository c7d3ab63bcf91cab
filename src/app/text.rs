#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Text,
    Escape,
    Csi,
    Osc,
    OscEscape,
}

/// Strip terminal control from a model reply before it is rendered or saved.
/// CSI and OSC sequences are dropped whole, CR and CRLF become LF, and other
/// control characters except tab are removed.
pub(crate) fn sanitize_reply(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut scan = Scan::Text;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        scan = match scan {
            Scan::Escape => match ch {
                '[' => Scan::Csi,
                ']' => Scan::Osc,
                _ => Scan::Text,
            },
            Scan::Csi if ('@'..='~').contains(&ch) => Scan::Text,
            Scan::Csi => Scan::Csi,
            Scan::Osc => match ch {
                '\u{7}' => Scan::Text,
                '\u{1b}' => Scan::OscEscape,
                _ => Scan::Osc,
            },
            Scan::OscEscape if ch == '\\' => Scan::Text,
            Scan::OscEscape => Scan::Osc,
            Scan::Text => {
                match ch {
                    '\u{1b}' => {
                        scan = Scan::Escape;
                        continue;
                    }
                    '\r' => {
                        if chars.peek() != Some(&'\n') {
                            out.push('\n');
                        }
                    }
                    '\n' | '\t' => out.push(ch),
                    c if c.is_control() => {}
                    c => out.push(c),
                }
                Scan::Text
            }
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_csi_and_osc_sequences() {
        assert_eq!(
            sanitize_reply("a\x1b[31mred\x1b[0m b \x1b]0;title\x07c \x1b]8;;x\x1b\\d"),
            "ared b c d"
        );
    }

    #[test]
    fn carriage_returns_become_newlines_once() {
        assert_eq!(sanitize_reply("one\r\ntwo\rthree"), "one\ntwo\nthree");
    }

    #[test]
    fn keeps_tabs_and_drops_other_controls() {
        assert_eq!(sanitize_reply("x\ty\u{7}\u{8}z"), "x\tyz");
    }

    #[test]
    fn markdown_passes_through() {
        let reply = "# Title\n```rust\nfn main() {}\n```";
        assert_eq!(sanitize_reply(reply), reply);
    }
}
