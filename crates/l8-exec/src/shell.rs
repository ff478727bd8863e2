// shell.rs — Quote-aware lexing helpers for the classifier.
//
// None of this is a full shell parser. It only answers the questions the
// classifier needs: where does one sub-command end and the next begin, which
// commands are substituted into it, what are its words, and which files
// does a lone `>` write to. All of them respect single quotes, double quotes
// and backslash escapes so that `echo "a > b; c"` is one command with no
// redirect. Anything this lexer misreads tends to produce an unknown program
// name, which the classifier treats as destructive.

/// A single-angle-bracket output redirect found in a sub-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Redirect {
    /// `> path` — the path with quotes and escapes removed.
    Target(String),
    /// `>` with nothing usable after it (end of input, `>(...)`, etc.).
    Missing,
}

/// Split a command line into sub-commands at `;`, `&&`, `||`, `|`, `&`,
/// newlines and subshell parentheses.
///
/// Connectors inside quotes or after a backslash are ignored, as are the
/// `&` and `|` characters that belong to redirects (`2>&1`, `&>`, `>|`).
/// Command and process substitutions (`$(...)`, backticks, `<(...)`) stay
/// inside the segment that contains them; see [`substitutions`].
/// Returned slices are trimmed and never empty.
pub(crate) fn split_segments(command: &str) -> Vec<&str> {
    let indexed: Vec<(usize, char)> = command.char_indices().collect();
    let chars: Vec<char> = indexed.iter().map(|&(_, c)| c).collect();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let pos = indexed[i].0;
        let c = chars[i];
        let prev = i.checked_sub(1).map(|p| chars[p]);
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                }
            }
            Some(_) => match c {
                '\\' => i += 1,
                '"' => quote = None,
                '`' => i = closing_backtick(&chars, i + 1),
                '(' if prev == Some('$') => i = closing_paren(&chars, i + 1),
                _ => {}
            },
            None => match c {
                '\\' => i += 1,
                '\'' | '"' => quote = Some(c),
                '`' => i = closing_backtick(&chars, i + 1),
                '(' if matches!(prev, Some('$') | Some('<') | Some('>')) => {
                    i = closing_paren(&chars, i + 1);
                }
                ';' | '\n' | '(' | ')' => {
                    push_segment(&mut segments, &command[start..pos]);
                    start = pos + c.len_utf8();
                }
                '&' | '|' => {
                    let next = chars.get(i + 1).copied();
                    let part_of_redirect = match c {
                        '&' => matches!(prev, Some('>') | Some('<')) || next == Some('>'),
                        _ => prev == Some('>'),
                    };
                    if !part_of_redirect {
                        push_segment(&mut segments, &command[start..pos]);
                        if next == Some(c) {
                            i += 1;
                        }
                        start = indexed[i].0 + 1;
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    if start < command.len() {
        push_segment(&mut segments, &command[start..]);
    }
    segments
}

/// Bodies of every command and process substitution in a segment:
/// `$(...)` and backticks (unquoted or inside double quotes) and
/// `<(...)` / `>(...)` (unquoted). Single-quoted text is literal.
///
/// An unterminated substitution runs to the end of the segment.
pub(crate) fn substitutions(segment: &str) -> Vec<String> {
    let chars: Vec<char> = segment.chars().collect();
    let mut bodies = Vec::new();
    let mut in_double = false;
    let mut i = 0;

    while i < chars.len() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        match chars[i] {
            '\\' => i += 1,
            '\'' if !in_double => {
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    i += 1;
                }
            }
            '"' => in_double = !in_double,
            '`' => {
                let end = closing_backtick(&chars, i + 1);
                bodies.push(chars[i + 1..end].iter().collect());
                i = end;
            }
            '(' if prev == Some('$')
                || (!in_double && matches!(prev, Some('<') | Some('>'))) =>
            {
                let end = closing_paren(&chars, i + 1);
                bodies.push(chars[i + 1..end].iter().collect());
                i = end;
            }
            _ => {}
        }
        i += 1;
    }
    bodies
}

/// Index of the `)` closing a parenthesis opened just before `start`, or
/// `chars.len()` if there is none.
fn closing_paren(chars: &[char], start: usize) -> usize {
    let mut depth = 1;
    let mut quote: Option<char> = None;
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                }
            }
            Some(_) => {
                if c == '\\' {
                    i += 1;
                } else if c == '"' {
                    quote = None;
                }
            }
            None => match c {
                '\\' => i += 1,
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return i;
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    chars.len()
}

/// Index of the next unescaped backtick at or after `start`, or `chars.len()`.
fn closing_backtick(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '`' => return i,
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

fn push_segment<'a>(segments: &mut Vec<&'a str>, piece: &'a str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        segments.push(piece);
    }
}

/// Split a sub-command into words with POSIX shell quoting rules.
///
/// Malformed quoting (an unterminated quote) falls back to plain whitespace
/// splitting instead of failing.
pub(crate) fn tokenize(segment: &str) -> Vec<String> {
    match shlex::split(segment) {
        Some(words) => words,
        None => segment.split_whitespace().map(String::from).collect(),
    }
}

/// Find every lone `>` redirect in a sub-command.
///
/// Appends (`>>`) and file-descriptor duplications (`>&2`, `2>&1`) are not
/// reported.
pub(crate) fn redirect_targets(segment: &str) -> Vec<Redirect> {
    let chars: Vec<char> = segment.chars().collect();
    let mut redirects = Vec::new();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                }
                i += 1;
            }
            Some(_) => {
                if c == '\\' {
                    i += 1;
                } else if c == '"' {
                    quote = None;
                }
                i += 1;
            }
            None => match c {
                '\\' => i += 2,
                '\'' | '"' => {
                    quote = Some(c);
                    i += 1;
                }
                '>' if chars.get(i + 1) == Some(&'>') => {
                    // Append: skip every `>` in the run.
                    while chars.get(i) == Some(&'>') {
                        i += 1;
                    }
                }
                '>' => {
                    i += 1;
                    if chars.get(i) == Some(&'|') {
                        i += 1;
                    }
                    let dup = chars.get(i) == Some(&'&');
                    if dup {
                        i += 1;
                    }
                    while chars.get(i).is_some_and(|c| c.is_whitespace()) {
                        i += 1;
                    }
                    let (word, next) = read_word(&chars, i);
                    i = next;
                    if dup && is_fd_word(&word) {
                        continue;
                    }
                    if word.is_empty() {
                        redirects.push(Redirect::Missing);
                    } else {
                        redirects.push(Redirect::Target(word));
                    }
                }
                _ => i += 1,
            },
        }
    }
    redirects
}

// `-` (close) or a descriptor number after `>&`.
fn is_fd_word(word: &str) -> bool {
    word == "-" || (!word.is_empty() && word.chars().all(|c| c.is_ascii_digit()))
}

/// Read one shell word starting at `start`, removing quotes and escapes.
///
/// Stops at unquoted whitespace or an operator character. Returns the word
/// and the index just past it.
fn read_word(chars: &[char], start: usize) -> (String, usize) {
    let mut word = String::new();
    let mut quote: Option<char> = None;
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                } else {
                    word.push(c);
                }
            }
            Some(_) => {
                if c == '"' {
                    quote = None;
                } else if c == '\\' && i + 1 < chars.len() {
                    i += 1;
                    word.push(chars[i]);
                } else {
                    word.push(c);
                }
            }
            None => {
                if c.is_whitespace() || matches!(c, ';' | '&' | '|' | '<' | '>' | '(' | ')') {
                    break;
                }
                match c {
                    '\'' | '"' => quote = Some(c),
                    '\\' if i + 1 < chars.len() => {
                        i += 1;
                        word.push(chars[i]);
                    }
                    _ => word.push(c),
                }
            }
        }
        i += 1;
    }
    (word, i)
}
