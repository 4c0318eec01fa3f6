//! Cleanup of model and tool text before it is shown to a person.
//!
//! Two entry points are exposed:
//! - [`strip_reasoning`] drops reasoning traces (`<reasoning>`/`<think>` blocks and
//!   `**Reasoning` sections) line by line.
//! - [`clean_formatting`] runs the formatting pipeline: wrapped result objects, markup
//!   tags, tables, markdown decoration, mojibake and whitespace.
//!
//! [`sanitize`] does both. Every function here is total, and no pass ever grows the text.
//! Marker runs (`- - x`, `# ## x`) are stripped whole in one pass; the pipeline is then
//! re-applied until the text stops changing, so output is a fixed point unless markup
//! uncovers new markup more than `MAX_PASSES` levels deep.
use lazy_static::lazy_static;
use regex::Regex;

/// Upper bound on pipeline passes; real input settles in two
const MAX_PASSES: usize = 32;

const REASONING_TAGS: [&str; 2] = ["reasoning", "think"];

/// UTF-8 punctuation that was decoded as cp1252 or latin-1, and what it should have been
const MOJIBAKE: &[(&str, &str)] = &[
    ("\u{e2}\u{20ac}\u{af}", " "),
    ("\u{e2}\u{20ac}\u{2018}", "-"),
    ("\u{e2}\u{20ac}\u{2122}", "'"),
    ("\u{e2}\u{20ac}\u{2dc}", "'"),
    ("\u{e2}\u{20ac}\u{153}", "\""),
    ("\u{e2}\u{20ac}\u{9d}", "\""),
    ("\u{e2}\u{20ac}\u{a6}", "..."),
    ("\u{e2}\u{20ac}\u{201c}", "-"),
    ("\u{e2}\u{20ac}\u{201d}", "--"),
    ("\u{e2}\u{80}\u{af}", " "),
    ("\u{e2}\u{80}\u{91}", "-"),
    ("\u{e2}\u{80}\u{99}", "'"),
    ("\u{e2}\u{80}\u{98}", "'"),
    ("\u{e2}\u{80}\u{9c}", "\""),
    ("\u{e2}\u{80}\u{9d}", "\""),
    ("\u{e2}\u{80}\u{a6}", "..."),
    ("\u{e2}\u{80}\u{93}", "-"),
    ("\u{e2}\u{80}\u{94}", "--"),
];

lazy_static! {
    static ref WRAPPED_RESULT_SINGLE: Regex = Regex::new(r"\{'result':\s*'[^']*'\}").unwrap();
    static ref WRAPPED_RESULT_DOUBLE: Regex = Regex::new(r#"\{"result":\s*"[^"]*"\}"#).unwrap();
    static ref WRAPPED_RESULT_LEADING: Regex =
        Regex::new(r#"(?ms)^\{'result':\s*".*?"\}\s*"#).unwrap();
    static ref LINE_BREAK_TAG: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref MARKUP_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref TABLE_SEPARATOR_CELL: Regex = Regex::new(r"^:?-+:?$").unwrap();
    static ref HORIZONTAL_RULE: Regex =
        Regex::new(r"(?m)^[ \t]*(?:-{3,}|\*{3,}|_{3,})[ \t]*$").unwrap();
    // any mix of stacked bullet and heading markers at line start
    static ref LINE_MARKERS: Regex =
        Regex::new(r"(?m)^[ \t]*(?:[*+-][ \t]+|#{1,6}(?:[ \t]+|$))+").unwrap();
    static ref REASONING_HEADING: Regex =
        Regex::new(r"^[ \t]*(?:[*+-][ \t]+|#{1,6}[ \t]+)*\*\*Reasoning").unwrap();
    static ref INLINE_CODE: Regex = Regex::new(r"`([^`\n]*)`").unwrap();
    static ref BLANK_RUN: Regex = Regex::new(r"\n\s*\n\s*\n").unwrap();
    static ref HORIZONTAL_SPACE: Regex = Regex::new(r"[ \t]+").unwrap();
}

/// Remove reasoning traces and then clean the formatting
pub fn sanitize(text: &str) -> String {
    settle(text, |t| clean_pass(&strip_reasoning(t)))
}

/// Run the formatting pipeline without touching reasoning traces
pub fn clean_formatting(text: &str) -> String {
    settle(text, clean_pass)
}

/// Drop reasoning blocks.
///
/// A block opens at a line containing `<reasoning>`/`<think>` (any case) or starting with
/// `**Reasoning` (after any bullet or heading markers), and runs until a closing tag or a blank line. Text before an opening tag
/// and after a closing tag on the same line is kept.
pub fn strip_reasoning(text: &str) -> String {
    let mut kept: Vec<String> = Vec::new();
    let mut skipping = false;

    for line in text.lines() {
        let lower = line.to_ascii_lowercase();

        if skipping {
            if let Some((_, end)) = find_tag(&lower, true) {
                skipping = false;
                push_trimmed(&mut kept, &line[end..]);
            } else if line.trim().is_empty() {
                skipping = false;
            }
            continue;
        }

        if let Some((start, open_end)) = find_tag(&lower, false) {
            push_trimmed(&mut kept, &line[..start]);
            match find_tag(&lower[open_end..], true) {
                Some((_, close_end)) => push_trimmed(&mut kept, &line[open_end + close_end..]),
                None => skipping = true,
            }
            continue;
        }

        if REASONING_HEADING.is_match(line) {
            skipping = true;
            continue;
        }

        // a stray closing tag with no opener
        if let Some((start, end)) = find_tag(&lower, true) {
            let joined = format!("{}{}", &line[..start], &line[end..]);
            push_trimmed(&mut kept, &joined);
            continue;
        }

        kept.push(line.to_string());
    }

    kept.join("\n").trim().to_string()
}

fn push_trimmed(kept: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        kept.push(fragment.to_string());
    }
}

/// Earliest reasoning tag in an ASCII-lowercased line, as (start, end) byte offsets
fn find_tag(lower: &str, closing: bool) -> Option<(usize, usize)> {
    REASONING_TAGS
        .iter()
        .filter_map(|tag| {
            let marker = if closing {
                format!("</{}>", tag)
            } else {
                format!("<{}>", tag)
            };
            lower.find(&marker).map(|start| (start, start + marker.len()))
        })
        .min_by_key(|(start, _)| *start)
}

fn settle<F>(text: &str, pass: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut current = pass(text);
    for _ in 0..MAX_PASSES {
        let next = pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn clean_pass(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = strip_wrapped_results(&text);
    let text = convert_markup(&text);
    let text = convert_tables(&text);
    let text = strip_markdown(&text);
    let text = repair_encoding(&text);
    collapse_whitespace(&text)
}

fn strip_wrapped_results(text: &str) -> String {
    let text = WRAPPED_RESULT_SINGLE.replace_all(text, "");
    let text = WRAPPED_RESULT_DOUBLE.replace_all(&text, "");
    WRAPPED_RESULT_LEADING.replace_all(&text, "").into_owned()
}

fn convert_markup(text: &str) -> String {
    let text = LINE_BREAK_TAG.replace_all(text, "\n");
    MARKUP_TAG.replace_all(&text, "").into_owned()
}

fn is_table_line(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

fn table_cells(line: &str) -> Vec<&str> {
    line.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect()
}

fn is_separator_row(line: &str) -> bool {
    let cells = table_cells(line);
    !cells.is_empty() && cells.iter().all(|cell| TABLE_SEPARATOR_CELL.is_match(cell))
}

fn table_row_to_field(line: &str) -> Option<String> {
    let cells = table_cells(line);
    if cells.len() < 2 {
        return None;
    }
    let field = cells[0].replace("**", "");
    let field = field.trim();
    let value = cells[1];
    if field.is_empty() || field == "Field" || value == "Information" {
        return None;
    }
    Some(format!("{}: {}", field, value))
}

/// Rewrite each run of `|`-prefixed lines as `Field: Value` lines, dropping header and
/// separator rows
fn convert_tables(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut output: Vec<String> = Vec::with_capacity(lines.len());

    let mut i = 0;
    while i < lines.len() {
        if !is_table_line(lines[i]) {
            output.push(lines[i].to_string());
            i += 1;
            continue;
        }

        let start = i;
        while i < lines.len() && is_table_line(lines[i]) {
            i += 1;
        }
        let block = &lines[start..i];

        for (index, row) in block.iter().enumerate() {
            if is_separator_row(row) {
                continue;
            }
            let is_header = block
                .get(index + 1)
                .is_some_and(|next| is_separator_row(next));
            if is_header {
                continue;
            }
            if let Some(field) = table_row_to_field(row) {
                output.push(field);
            }
        }
    }

    output.join("\n")
}

fn strip_markdown(text: &str) -> String {
    let text = HORIZONTAL_RULE.replace_all(text, "");
    let text = LINE_MARKERS.replace_all(&text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    strip_single_emphasis(&text)
}

/// Remove `*italic*` markers, leaving `**bold**` untouched
fn strip_single_emphasis(text: &str) -> String {
    text.split('\n')
        .map(strip_line_emphasis)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_line_emphasis(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut dropped = vec![false; chars.len()];
    let mut open: Option<usize> = None;

    for i in 0..chars.len() {
        if chars[i] != '*' {
            continue;
        }
        let lone = (i == 0 || chars[i - 1] != '*') && chars.get(i + 1) != Some(&'*');
        if !lone {
            // a strong marker sits between, so the pair would not be plain emphasis
            open = None;
            continue;
        }
        match open.take() {
            Some(start) => {
                dropped[start] = true;
                dropped[i] = true;
            }
            None => open = Some(i),
        }
    }

    chars
        .iter()
        .zip(dropped)
        .filter(|(_, drop)| !drop)
        .map(|(c, _)| c)
        .collect()
}

fn repair_encoding(text: &str) -> String {
    let mut repaired = text.to_string();
    for (broken, intended) in MOJIBAKE {
        if repaired.contains(broken) {
            repaired = repaired.replace(broken, intended);
        }
    }
    repaired
}

fn collapse_whitespace(text: &str) -> String {
    let text = BLANK_RUN.replace_all(text, "\n\n");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    text.trim().to_string()
}
