// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recursive character text splitter for personality documents.
//!
//! Splits on paragraph, then line, then sentence, then word boundaries,
//! falling back to raw character windows for unbroken runs. Adjacent chunks
//! share an `overlap`-character tail so context is not lost at boundaries.

const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split `text` into chunks of at most `chunk_size` characters (boundary
/// segments may push a chunk up to `chunk_size + overlap`).
///
/// Blank input yields no chunks.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if char_len(trimmed) <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let segments = segment(trimmed, &SEPARATORS, chunk_size);
    merge(segments, chunk_size, overlap)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Recursively break `text` into segments no longer than `chunk_size`,
/// preferring the earliest separator in the priority list.
fn segment(text: &str, separators: &[&str], chunk_size: usize) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let Some((sep, rest)) = separators.split_first() else {
        // No separator left: hard character windows.
        return text
            .chars()
            .collect::<Vec<_>>()
            .chunks(chunk_size)
            .map(|window| window.iter().collect())
            .collect();
    };

    if !text.contains(sep) {
        return segment(text, rest, chunk_size);
    }

    let pieces: Vec<&str> = text.split(sep).collect();
    let last = pieces.len() - 1;
    let mut segments = Vec::new();
    for (i, piece) in pieces.iter().enumerate() {
        let mut owned = (*piece).to_string();
        if i < last {
            // Keep the separator attached so merged chunks read naturally.
            owned.push_str(sep);
        }
        if owned.trim().is_empty() {
            continue;
        }
        segments.extend(segment(&owned, rest, chunk_size));
    }
    segments
}

/// Greedily pack segments into chunks, seeding each new chunk with the
/// trailing `overlap` characters of the previous one.
fn merge(segments: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for seg in segments {
        if !current.is_empty() && char_len(&current) + char_len(&seg) > chunk_size {
            let tail = overlap_tail(&current, overlap);
            let finished = std::mem::take(&mut current);
            chunks.push(finished.trim().to_string());
            current = tail;
        }
        current.push_str(&seg);
    }

    let final_chunk = current.trim();
    if !final_chunk.is_empty() {
        chunks.push(final_chunk.to_string());
    }
    chunks
}

fn overlap_tail(s: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let chars: Vec<char> = s.chars().collect();
    let start = chars.len().saturating_sub(overlap);
    chars[start..].iter().collect()
}
