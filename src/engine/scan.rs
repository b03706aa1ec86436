//! Parameter placeholder scanning.
//!
//! Counts parameter markers in query text: positional `?` and named
//! `:name`, `@name`, `$name` markers. Markers inside quoted literals,
//! quoted identifiers, and comments are ignored.

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

/// Count the parameter markers in `sql`.
pub fn count_placeholders(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut state = ScanState::Code;
    let mut count = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            ScanState::Code => match b {
                b'\'' => state = ScanState::SingleQuoted,
                b'"' => state = ScanState::DoubleQuoted,
                b'-' if next == Some(b'-') => {
                    state = ScanState::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = ScanState::BlockComment;
                    i += 1;
                }
                b'?' => count += 1,
                b':' | b'@' | b'$' => {
                    let attached = i > 0 && (is_ident_byte(bytes[i - 1]) || bytes[i - 1] == b':');
                    if !attached && next.is_some_and(is_ident_start) {
                        count += 1;
                        while i + 1 < bytes.len() && is_ident_byte(bytes[i + 1]) {
                            i += 1;
                        }
                    }
                }
                _ => {}
            },
            // Doubled quotes are escapes; leaving and re-entering the literal
            // on the second quote is equivalent.
            ScanState::SingleQuoted if b == b'\'' => state = ScanState::Code,
            ScanState::DoubleQuoted if b == b'"' => state = ScanState::Code,
            ScanState::LineComment if b == b'\n' => state = ScanState::Code,
            ScanState::BlockComment if b == b'*' && next == Some(b'/') => {
                state = ScanState::Code;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    count
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
