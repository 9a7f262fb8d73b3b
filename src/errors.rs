// File: src/errors.rs
//
// Diagnostic formatting. Kept as its own module the way `ruff`'s
// `errors.rs` is, but narrowed to the exact wire format spec.md §6
// mandates -- no ANSI color, no source-line caret boxes, since the
// end-to-end test scenarios in spec.md §8 match these strings
// literally. `ruff`'s Levenshtein "did you mean" suggestion helper is
// not ported: clox has no equivalent and nothing in this language
// calls for it.

use crate::scanner::{Token, TokenKind};

/// Format one parser diagnostic as `original_source/lox/src/compiler.c`'s
/// `error_at` does: `[line N] Error (at '<lexeme>' | at end): <message>`,
/// with the location clause omitted entirely for a scanner Error token
/// (whose own lexeme already *is* the message).
pub fn format_parse_error(token: &Token, message: &str) -> String {
    let mut out = format!("[line {}] Error", token.line);
    match token.kind {
        TokenKind::Eof => out.push_str(" at end"),
        TokenKind::Error => {}
        _ => out.push_str(&format!(" at '{}'", token.lexeme)),
    }
    out.push_str(": ");
    out.push_str(message);
    out
}

pub struct FrameTrace {
    pub name: String,
    pub line: u32,
}

/// Format a runtime error: the message, then one `[line N] in <name>`
/// line per frame, top (most recently called) first.
pub fn format_runtime_error(message: &str, trace: &[FrameTrace]) -> String {
    let mut out = format!("{}\n", message);
    for (i, frame) in trace.iter().enumerate() {
        out.push_str(&format!("[line {}] in {}", frame.line, frame.name));
        if i + 1 < trace.len() {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_at_end() {
        let t = Token { kind: TokenKind::Eof, lexeme: "", line: 3 };
        assert_eq!(format_parse_error(&t, "Expect expression."), "[line 3] Error at end: Expect expression.");
    }

    #[test]
    fn formats_at_lexeme() {
        let t = Token { kind: TokenKind::Identifier, lexeme: "foo", line: 1 };
        assert_eq!(
            format_parse_error(&t, "Expect ';' after value."),
            "[line 1] Error at 'foo': Expect ';' after value."
        );
    }

    #[test]
    fn runtime_error_trace_format() {
        let trace = vec![
            FrameTrace { name: "inner".into(), line: 4 },
            FrameTrace { name: "script".into(), line: 1 },
        ];
        assert_eq!(
            format_runtime_error("Undefined variable 'foo'.", &trace),
            "Undefined variable 'foo'.\n[line 4] in inner\n[line 1] in script"
        );
    }
}
