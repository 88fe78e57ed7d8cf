//! Heading-based Markdown splitter.
//!
//! Splits a Markdown document into sections at headings of level 1-3
//! (`#`, `##`, `###`). Each section becomes one [`Chunk`] holding the body
//! lines under its heading; the heading line itself is dropped.
//!
//! Rules:
//!
//! - a heading is `#{1,3}` followed by a space (or end of line) at the start
//!   of a line, ignoring leading whitespace;
//! - deeper headings (`####` and below) stay inside the current section;
//! - lines inside fenced code blocks (```` ``` ```` or `~~~`) are never
//!   headings, so `# comment` in a shell snippet is kept as content;
//! - sections with no non-blank content are dropped;
//! - section text is trimmed of surrounding blank lines.
//!
//! Each chunk receives a fresh UUID, its index within the file, and a
//! SHA-256 hash of its text.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

const MAX_SPLIT_LEVEL: usize = 3;

/// Split `text` (the contents of `source_path`) into heading sections.
pub fn split_by_headers(source_path: &str, text: &str) -> Vec<Chunk> {
    let mut sections: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut fence: Option<&str> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            current.push(line);
            continue;
        }

        if let Some(marker) = fence_marker(trimmed) {
            fence = Some(marker);
            current.push(line);
            continue;
        }

        if heading_level(trimmed).is_some() {
            flush(&mut sections, &mut current);
            continue;
        }

        current.push(line);
    }
    flush(&mut sections, &mut current);

    sections
        .into_iter()
        .enumerate()
        .map(|(i, text)| make_chunk(source_path, i as i64, &text))
        .collect()
}

/// Level of a split-worthy heading, or `None`.
fn heading_level(line: &str) -> Option<usize> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > MAX_SPLIT_LEVEL {
        return None;
    }
    match line[level..].chars().next() {
        None | Some(' ') | Some('\t') => Some(level),
        _ => None,
    }
}

fn fence_marker(line: &str) -> Option<&'static str> {
    if line.starts_with("```") {
        Some("```")
    } else if line.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

fn flush(sections: &mut Vec<String>, current: &mut Vec<&str>) {
    let first = current.iter().position(|l| !l.trim().is_empty());
    let last = current.iter().rposition(|l| !l.trim().is_empty());
    if let (Some(first), Some(last)) = (first, last) {
        sections.push(current[first..=last].join("\n").trim_end().to_string());
    }
    current.clear();
}

fn make_chunk(source_path: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        source_path: source_path.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}
