//! Terminal text sanitization.
//!
//! HTTP error strings and TXT records come from the network. Terminal
//! emulators interpret escape sequences, so this text is stripped of them
//! before it is printed.

use std::borrow::Cow;

const ESC: char = '\x1b';

/// Strip ANSI escape sequences and control characters except `\n` and `\t`.
///
/// Returns `Cow::Borrowed` when nothing needs to change.
#[must_use]
pub fn sanitize_display_text(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_disallowed) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ESC {
            // CSI: ESC [ params final-byte; other escapes drop one following char.
            match chars.next() {
                Some('[') => {
                    for next in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&next) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    // OSC runs until BEL or ST (ESC \).
                    while let Some(next) = chars.next() {
                        if next == '\x07' {
                            break;
                        }
                        if next == ESC && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_disallowed(c) {
            result.push(c);
        }
    }
    Cow::Owned(result)
}

fn is_disallowed(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}
