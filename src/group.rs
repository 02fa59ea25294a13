// SPDX: CC0-1.0

//! Balanced delimiter spans.
//!
//! Every reader here works on bytes and only ever stops on the ASCII
//! delimiters it was given, so the returned slices always fall on `char`
//! boundaries. Unmatched groups are tolerated: the reader hands back the rest
//! of the text instead of failing.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Group<'src> {
    /// Text between the delimiters, exclusive.
    pub content: &'src str,
    /// Forward: index just past the closing delimiter.
    /// Backward: index of the opening delimiter.
    pub end: usize,
    /// False when the text ran out before the group was balanced.
    pub closed: bool,
}

/// Read the group starting at the delimiter at `start`.
///
/// Going forward, `text[start]` must be `open`; going backward it must be
/// `close`. Returns `None` if it is not.
pub fn find_matching(
    text: &str,
    start: usize,
    open: u8,
    close: u8,
    dir: Direction,
) -> Option<Group<'_>> {
    let bytes = text.as_bytes();
    match dir {
        Direction::Forward => {
            if bytes.get(start) != Some(&open) {
                return None;
            }
            let mut depth = 0usize;
            for (idx, &byte) in bytes.iter().enumerate().skip(start) {
                if byte == open {
                    depth += 1;
                } else if byte == close {
                    depth -= 1;
                    if depth == 0 {
                        return Some(Group {
                            content: &text[start + 1..idx],
                            end: idx + 1,
                            closed: true,
                        });
                    }
                }
            }
            Some(Group {
                content: &text[start + 1..],
                end: text.len(),
                closed: false,
            })
        }

        Direction::Backward => {
            if bytes.get(start) != Some(&close) {
                return None;
            }
            let mut depth = 0usize;
            for idx in (0..=start).rev() {
                let byte = bytes[idx];
                if byte == close {
                    depth += 1;
                } else if byte == open {
                    depth -= 1;
                    if depth == 0 {
                        return Some(Group {
                            content: &text[idx + 1..start],
                            end: idx,
                            closed: true,
                        });
                    }
                }
            }
            Some(Group {
                content: &text[..start],
                end: 0,
                closed: false,
            })
        }
    }
}

/// Shorthand for a forward parenthesis group.
pub fn paren_group(text: &str, start: usize) -> Option<Group<'_>> {
    find_matching(text, start, b'(', b')', Direction::Forward)
}

/// Shorthand for a forward brace group.
pub fn brace_group(text: &str, start: usize) -> Option<Group<'_>> {
    find_matching(text, start, b'{', b'}', Direction::Forward)
}

/// True if `text` is exactly one balanced parenthesis group.
pub fn is_wrapped(text: &str) -> bool {
    match paren_group(text, 0) {
        Some(group) => group.closed && group.end == text.len(),
        None => false,
    }
}

/// Remove parentheses that wrap the whole text, as many layers as there are.
pub fn strip_outer_parens(mut text: &str) -> &str {
    text = text.trim();
    while is_wrapped(text) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

/// Byte indices of `sep` that sit outside every parenthesis group.
pub fn top_level_positions(text: &str, mut sep: impl FnMut(&[u8], usize) -> bool) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0isize;
    let mut ret = Vec::new();
    for idx in 0..bytes.len() {
        match bytes[idx] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {
                if depth <= 0 && sep(bytes, idx) {
                    ret.push(idx);
                }
            }
        }
    }
    ret
}

/// Split on a separator byte that sits outside every parenthesis group.
pub fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let mut ret = Vec::new();
    let mut last = 0;
    for idx in top_level_positions(text, |bytes, idx| bytes[idx] == sep) {
        ret.push(&text[last..idx]);
        last = idx + 1;
    }
    ret.push(&text[last..]);
    ret
}
