use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A stored gallery embedding. The blob is the producer's raw dump of the
/// 128-dim f64 vector, little-endian.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FaceEncoding {
    pub id: u64,
    pub employee_id: u64,
    pub encoding: Vec<u8>,
    pub created_at: NaiveDateTime,
}

pub fn encode_embedding(values: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Returns `None` when the blob length is not a whole number of f64s.
pub fn decode_embedding(blob: &[u8]) -> Option<Vec<f64>> {
    if blob.len() % 8 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(blob.len() / 8);
    for chunk in blob.chunks_exact(8) {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        out.push(f64::from_le_bytes(buf));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_survives_blob_encoding() {
        let values = vec![0.0, -1.5, 0.123456789, f64::MAX];
        let blob = encode_embedding(&values);
        assert_eq!(blob.len(), 32);
        assert_eq!(decode_embedding(&blob), Some(values));
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let blob = encode_embedding(&[1.0, 2.0]);
        assert_eq!(decode_embedding(&blob[..blob.len() - 1]), None);
    }
}
