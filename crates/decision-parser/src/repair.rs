//! Best-effort repair of almost-JSON written by language models.
//!
//! Each pass is string-aware: nothing inside a double-quoted string is
//! touched once quotes have been normalised. Valid JSON passes through every
//! stage unchanged.

/// Run every repair pass in order.
pub fn repair_json(input: &str) -> String {
    let text = normalize_smart_quotes(input);
    let text = convert_single_quotes(&text);
    let text = strip_comments(&text);
    let text = strip_ellipsis(&text);
    let text = quote_bare_words(&text);
    let text = remove_trailing_commas(&text);
    close_unbalanced(&text)
}

/// Curly quotes to their ASCII forms.
pub fn normalize_smart_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{00AB}' | '\u{00BB}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' => '\'',
            other => other,
        })
        .collect()
}

/// Single-quoted strings become double-quoted. An apostrophe between two
/// word characters (`don't`) is left alone.
pub fn convert_single_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_double = false;
    let mut in_single = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        if c == '\\' && (in_double || in_single) {
            escaped = true;
            out.push(c);
            continue;
        }

        if in_double {
            if c == '"' {
                in_double = false;
            }
            out.push(c);
        } else if in_single {
            match c {
                '\'' if is_apostrophe(&chars, i) => out.push(c),
                '\'' => {
                    in_single = false;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                _ => out.push(c),
            }
        } else {
            match c {
                '"' => {
                    in_double = true;
                    out.push(c);
                }
                '\'' if is_apostrophe(&chars, i) => out.push(c),
                '\'' => {
                    in_single = true;
                    out.push('"');
                }
                _ => out.push(c),
            }
        }
    }
    out
}

pub(crate) fn is_apostrophe(chars: &[char], i: usize) -> bool {
    let before = i.checked_sub(1).and_then(|j| chars.get(j));
    let after = chars.get(i + 1);
    matches!((before, after), (Some(b), Some(a)) if b.is_alphanumeric() && a.is_alphanumeric())
}

/// Drop `// line`, `# line` and `/* block */` comments outside strings.
pub fn strip_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match (c, chars.get(i + 1)) {
            ('"', _) => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ('/', Some('/')) | ('#', _) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Remove `...` and `…` placeholders outside strings.
pub fn strip_ellipsis(text: &str) -> String {
    map_outside_strings(text, |segment| segment.replace("...", "").replace('\u{2026}', ""))
}

/// Quote unquoted keys and bare-word values; map Python and JS literals.
pub fn quote_bare_words(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
            i += 1;
        } else if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            // Numbers pass through whole so exponents are not taken for words
            let start = i;
            while i < chars.len() && is_number_char(chars[i]) {
                i += 1;
            }
            if chars.get(i).is_some_and(|n| n.is_alphabetic() || *n == '%') {
                // `5x`, `20%`: keep as a string for later coercion
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '%') {
                    i += 1;
                }
                out.push('"');
                out.extend(&chars[start..i]);
                out.push('"');
            } else {
                out.extend(&chars[start..i]);
            }
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let next = chars[i..].iter().find(|ch| !ch.is_whitespace());
            if next == Some(&':') {
                out.push('"');
                out.push_str(&word);
                out.push('"');
            } else {
                out.push_str(&bare_value(&word));
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')
}

fn bare_value(word: &str) -> String {
    match word {
        "true" | "True" | "TRUE" => "true".to_string(),
        "false" | "False" | "FALSE" => "false".to_string(),
        "null" | "None" | "NULL" | "nil" | "undefined" | "NaN" | "Infinity" => "null".to_string(),
        other => format!("\"{}\"", other),
    }
}

/// Drop commas that directly precede `}` or `]`.
pub fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']') | None) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Close a string and any brackets left open by a truncated reply.
pub fn close_unbalanced(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    if stack.is_empty() && !in_string {
        return text.to_string();
    }

    let mut out = text.to_string();
    if in_string {
        out.push('"');
    }
    let trimmed_len = out.trim_end().trim_end_matches(',').trim_end().len();
    out.truncate(trimmed_len);
    if out.ends_with(':') {
        out.push_str(" null");
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// Apply `f` to every run of text outside double-quoted strings.
fn map_outside_strings(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut segment = String::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            out.push_str(&f(&segment));
            segment.clear();
            out.push(c);
            in_string = true;
        } else {
            segment.push(c);
        }
    }
    out.push_str(&f(&segment));
    out
}
