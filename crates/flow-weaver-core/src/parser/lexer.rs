//! Splits source text into documentation-comment blocks and, within each
//! block, into trimmed content lines with their original line/column.
//!
//! The grammar itself is comment-host-agnostic: a block is either a
//! `/** … */` run, or a maximal run of consecutive lines that each start
//! (after leading whitespace) with the same `///` or `#` marker.

/// One content line of a `/** … */` block, stripped of the leading `*`
/// and surrounding whitespace, with its position in the original file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub line: usize,
    pub column: usize,
    pub text: String,
}

/// A contiguous `/** … */` comment, broken into content lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentBlock {
    pub lines: Vec<SourceLine>,
}

/// Scan `source` for `/** … */` blocks, in order of appearance.
pub fn lex(source: &str) -> Vec<CommentBlock> {
    let mut blocks = Vec::new();
    let mut line_no = 1usize;
    let mut col_no = 1usize;
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i] == '/' && chars.get(i + 1) == Some(&'*') && chars.get(i + 2) == Some(&'*') {
            let start_line = line_no;
            let start_col = col_no;
            i += 3;
            col_no += 3;
            let mut body = String::new();
            let mut body_line = start_line;
            let mut body_col = start_col + 3;
            let mut line_starts: Vec<(usize, usize)> = vec![(body_line, body_col)];

            while i < chars.len() {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    i += 2;
                    col_no += 2;
                    break;
                }
                let c = chars[i];
                body.push(c);
                if c == '\n' {
                    line_no += 1;
                    col_no = 1;
                    body_line = line_no;
                    body_col = 1;
                    line_starts.push((body_line, body_col));
                } else {
                    col_no += 1;
                }
                i += 1;
            }

            let mut lines = Vec::new();
            for (idx, raw_line) in body.split('\n').enumerate() {
                let (line, _col) = line_starts.get(idx).copied().unwrap_or((start_line, 1));
                let trimmed_start = raw_line.trim_start();
                let leading_ws = raw_line.len() - trimmed_start.len();
                let stripped = trimmed_start.strip_prefix('*').unwrap_or(trimmed_start);
                let stripped = stripped.strip_prefix(' ').unwrap_or(stripped);
                let text = stripped.trim_end().to_string();
                if text.is_empty() {
                    continue;
                }
                let column = leading_ws + 1;
                lines.push(SourceLine { line, column, text });
            }

            blocks.push(CommentBlock { lines });
            continue;
        }

        if col_no == 1 {
            if let Some(kind) = line_prefix_kind(&chars, i) {
                let (block, next_i, next_line) = scan_line_comment_run(&chars, i, line_no, kind);
                blocks.push(block);
                i = next_i;
                line_no = next_line;
                col_no = 1;
                continue;
            }
        }

        if chars[i] == '\n' {
            line_no += 1;
            col_no = 1;
        } else {
            col_no += 1;
        }
        i += 1;
    }

    blocks
}

/// Whether the line starting at `start` (itself the first character of a
/// line) opens with a `///` or `#` marker once its leading whitespace is
/// skipped. Two-slash (`//`) and three-star (`/**`) openers are handled
/// elsewhere and never match here.
fn line_prefix_kind(chars: &[char], start: usize) -> Option<&'static str> {
    let mut j = start;
    while j < chars.len() && chars[j] != '\n' && chars[j].is_whitespace() {
        j += 1;
    }
    if j + 2 < chars.len() && chars[j] == '/' && chars[j + 1] == '/' && chars[j + 2] == '/' {
        Some("///")
    } else if j < chars.len() && chars[j] == '#' {
        Some("#")
    } else {
        None
    }
}

/// Consume a maximal run of consecutive lines sharing `kind`'s marker,
/// starting at `i` (the first character of a line already confirmed to
/// match). Returns the block, the index just past the run, and the line
/// number of the line after it.
fn scan_line_comment_run(chars: &[char], mut i: usize, mut line_no: usize, kind: &str) -> (CommentBlock, usize, usize) {
    let mut lines = Vec::new();
    loop {
        let line = line_no;
        let mut j = i;
        while j < chars.len() && chars[j] != '\n' {
            j += 1;
        }
        let raw_line: String = chars[i..j].iter().collect();
        let trimmed_start = raw_line.trim_start();
        let leading_ws = raw_line.len() - trimmed_start.len();
        let after_marker = trimmed_start.strip_prefix(kind).unwrap_or(trimmed_start);
        let after_marker = after_marker.strip_prefix(' ').unwrap_or(after_marker);
        let text = after_marker.trim_end().to_string();
        if !text.is_empty() {
            lines.push(SourceLine { line, column: leading_ws + 1, text });
        }

        i = j;
        if i < chars.len() {
            i += 1;
            line_no += 1;
        } else {
            break;
        }

        match line_prefix_kind(chars, i) {
            Some(k) if k == kind => continue,
            _ => break,
        }
    }
    (CommentBlock { lines }, i, line_no)
}
