// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding BLOB codec and similarity math.
//!
//! Embeddings are stored as little-endian f32 byte sequences. Similarity is
//! computed in-process after candidate rows are loaded.

/// Serialize an embedding vector to a little-endian f32 BLOB.
pub fn vec_to_blob(v: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(v.len() * 4);
    for value in v {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Deserialize a little-endian f32 BLOB back to an embedding vector.
///
/// Trailing bytes that do not form a full f32 are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched dimensions or zero-magnitude inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
