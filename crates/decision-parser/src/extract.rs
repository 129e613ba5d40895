//! Locating the structured part of a free-form model reply.

use crate::repair::is_apostrophe;

const THINK_TAGS: [(&str, &str); 2] = [("<thinking>", "</thinking>"), ("<think>", "</think>")];
const FENCE: &str = "```";

/// Remove reasoning blocks and return `(remaining text, reasoning)`.
///
/// An unterminated block keeps its remainder in the returned text as well,
/// so an object written after a forgotten closing tag is still found. A
/// closing tag with no opening one treats everything before it as reasoning.
pub fn strip_think_blocks(text: &str) -> (String, Option<String>) {
    let mut rest = text.to_string();
    let mut reasoning: Vec<String> = Vec::new();

    for (open, close) in THINK_TAGS {
        loop {
            let lower = rest.to_ascii_lowercase();
            let Some(start) = lower.find(open) else {
                if let Some(end) = lower.find(close) {
                    push_trimmed(&mut reasoning, &rest[..end]);
                    rest = rest[end + close.len()..].to_string();
                    continue;
                }
                break;
            };

            let body_start = start + open.len();
            match lower[body_start..].find(close) {
                Some(len) => {
                    push_trimmed(&mut reasoning, &rest[body_start..body_start + len]);
                    rest = format!("{}{}", &rest[..start], &rest[body_start + len + close.len()..]);
                }
                None => {
                    push_trimmed(&mut reasoning, &rest[body_start..]);
                    rest = format!("{}{}", &rest[..start], &rest[body_start..]);
                    break;
                }
            }
        }
    }

    let reasoning = (!reasoning.is_empty()).then(|| reasoning.join("\n"));
    (rest, reasoning)
}

/// A reply split around its code fences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedText {
    /// Trimmed fenced bodies, in order
    pub blocks: Vec<String>,
    /// The whole text with only the fence marker lines removed
    pub unfenced: String,
    /// Prose before the first fence
    pub prose: Option<String>,
}

/// Split `text` into its fenced bodies and the text around them. Without
/// fences `unfenced` is the input unchanged and `blocks` is empty.
pub fn split_code_fences(text: &str) -> FencedText {
    let prose = text.find(FENCE).and_then(|first| {
        let p = text[..first].trim();
        (!p.is_empty()).then(|| p.to_string())
    });

    let mut blocks = Vec::new();
    let mut unfenced = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find(FENCE) {
        let marker = cursor + offset;
        unfenced.push_str(&text[cursor..marker]);
        let open = marker + FENCE.len();
        // Skip the language tag on the opening line
        let body_start = match text[open..].find('\n') {
            Some(nl) if !text[open..open + nl].contains('{') => open + nl + 1,
            _ => open,
        };
        let body_end = text[body_start..].find(FENCE).map_or(text.len(), |len| body_start + len);
        let body = &text[body_start..body_end];
        blocks.push(body.trim().to_string());
        unfenced.push_str(body);
        cursor = (body_end + FENCE.len()).min(text.len());
    }
    unfenced.push_str(&text[cursor..]);

    FencedText { blocks, unfenced, prose }
}

/// A brace-balanced object found in text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectSpan<'a> {
    pub text: &'a str,
    pub start: usize,
    /// False when the text ended before the braces balanced
    pub complete: bool,
}

/// Every top-level `{...}` in `text`, in order, using a string-aware
/// bracket-depth scan. Double- and single-quoted strings are both skipped;
/// an apostrophe inside a word does not open one. A trailing unbalanced
/// object is returned with `complete == false`.
pub fn find_objects(text: &str) -> Vec<ObjectSpan<'_>> {
    let indexed: Vec<(usize, char)> = text.char_indices().collect();
    let chars: Vec<char> = indexed.iter().map(|(_, c)| *c).collect();

    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (n, &(i, c)) in indexed.iter().enumerate() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote && !(quote == '\'' && is_apostrophe(&chars, n)) {
                in_string = None;
            }
            continue;
        }

        match c {
            '"' if depth > 0 => in_string = Some('"'),
            '\'' if depth > 0 && !is_apostrophe(&chars, n) => in_string = Some('\''),
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(ObjectSpan {
                            text: &text[s..=i],
                            start: s,
                            complete: true,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(s) = start {
        spans.push(ObjectSpan {
            text: &text[s..],
            start: s,
            complete: false,
        });
    }
    spans
}

fn push_trimmed(out: &mut Vec<String>, text: &str) {
    let t = text.trim();
    if !t.is_empty() {
        out.push(t.to_string());
    }
}
