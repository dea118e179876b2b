use crate::NoteId;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HeadingNode {
    /// 1..=6
    pub level: u8,
    pub text: String,
    /// Stable across re-parses of unchanged text.
    pub id: String,
    /// 1-based line number in the body.
    pub line: u32,
    pub children: Vec<HeadingNode>,
}

/// Builds the heading tree of a note body.
///
/// A heading is 1 to 6 `#` followed by a space. Deeper headings nest under the
/// closest shallower one; skipped levels are not filled in.
pub fn parse_outline(note: &NoteId, body: &str) -> Vec<HeadingNode> {
    let mut roots = Vec::new();
    let mut open: Vec<HeadingNode> = Vec::new();

    for heading in scan_headings(note, body) {
        while open.last().is_some_and(|top| top.level >= heading.level) {
            close_top(&mut open, &mut roots);
        }
        open.push(heading);
    }
    while !open.is_empty() {
        close_top(&mut open, &mut roots);
    }

    roots
}

fn close_top(open: &mut Vec<HeadingNode>, roots: &mut Vec<HeadingNode>) {
    let Some(done) = open.pop() else {
        return;
    };
    match open.last_mut() {
        Some(parent) => parent.children.push(done),
        None => roots.push(done),
    }
}

fn scan_headings(note: &NoteId, body: &str) -> Vec<HeadingNode> {
    let mut out = Vec::new();
    let mut in_fenced = false;

    for (ix, line) in body.lines().enumerate() {
        if is_fence(line) {
            in_fenced = !in_fenced;
            continue;
        }
        if in_fenced {
            continue;
        }
        let Some((level, text)) = parse_heading_line(line) else {
            continue;
        };

        let ordinal = out.len();
        out.push(HeadingNode {
            level,
            id: heading_id(note, ordinal, text),
            text: text.to_string(),
            line: ix as u32 + 1,
            children: Vec::new(),
        });
    }

    out
}

fn parse_heading_line(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = line[hashes..].strip_prefix(' ')?;
    let text = rest.trim();
    if text.is_empty() {
        return None;
    }
    Some((hashes as u8, text))
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn heading_id(note: &NoteId, ordinal: usize, text: &str) -> String {
    let slug = slugify(text);
    if slug.is_empty() {
        format!("{note}-h{ordinal}")
    } else {
        format!("{note}-h{ordinal}-{slug}")
    }
}

pub(crate) fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Pre-order walk yielding `(depth, node)`, depth starting at 0 for roots.
pub fn flatten_outline(outline: &[HeadingNode]) -> Vec<(usize, &HeadingNode)> {
    fn walk<'a>(nodes: &'a [HeadingNode], depth: usize, out: &mut Vec<(usize, &'a HeadingNode)>) {
        for n in nodes {
            out.push((depth, n));
            walk(&n.children, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    walk(outline, 0, &mut out);
    out
}

pub fn find_heading<'a>(outline: &'a [HeadingNode], id: &str) -> Option<&'a HeadingNode> {
    flatten_outline(outline)
        .into_iter()
        .map(|(_, n)| n)
        .find(|n| n.id == id)
}
