//! Deterministic feature-hashed text embeddings.
//!
//! Tokens are hashed twice with seeded FNV-1a: the first hash picks the
//! bucket, the second the sign. The accumulated vector is L2-normalized so
//! cosine similarity reduces to a dot product of unit vectors.

pub const DEFAULT_EMBEDDING_DIM: usize = 256;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x1000_0000_01b3;
const BUCKET_SEED: u64 = 0x517c_c1b7_2722_0a95;
const SIGN_SEED: u64 = 0x27d4_eb2f_1656_67c5;

#[derive(Clone, Debug)]
pub struct HashedEmbedder {
    dim: usize,
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl HashedEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for token in tokenize(text) {
            let bucket = (fnv1a_64_with_seed(token.as_bytes(), BUCKET_SEED) % self.dim as u64)
                as usize;
            let sign = if fnv1a_64_with_seed(token.as_bytes(), SIGN_SEED) & 1 == 1 {
                1.0
            } else {
                -1.0
            };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

/// Cosine similarity of two vectors; zero when either has no magnitude.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right.iter()).map(|(a, b)| a * b).sum();
    let left_norm: f32 = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm: f32 = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm * right_norm)
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
}

fn fnv1a_64_with_seed(bytes: &[u8], seed: u64) -> u64 {
    let mut hash = FNV_OFFSET_BASIS ^ seed;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::{cosine_similarity, HashedEmbedder};

    #[test]
    fn embeddings_are_unit_length_and_deterministic() {
        let embedder = HashedEmbedder::default();
        let first = embedder.embed("wildfire risk assessment for hillside properties");
        let second = embedder.embed("wildfire risk assessment for hillside properties");

        assert_eq!(first, second);
        let norm: f32 = first.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "expected unit vector, norm was {norm}");
    }

    #[test]
    fn identical_text_has_maximal_similarity() {
        let embedder = HashedEmbedder::default();
        let vector = embedder.embed("flood zone elevation requirement");
        let similarity = cosine_similarity(&vector, &vector);
        assert!((similarity - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_text_scores_above_unrelated_text() {
        let embedder = HashedEmbedder::default();
        let query = embedder.embed("wildfire risk defensible space vegetation");
        let related = embedder.embed("wildfire exposure requires defensible space around vegetation");
        let unrelated = embedder.embed("quarterly accounting ledger reconciliation procedures");

        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated),
            "related text should outrank unrelated text"
        );
    }

    #[test]
    fn empty_text_embeds_to_the_zero_vector() {
        let embedder = HashedEmbedder::default();
        let vector = embedder.embed("   ");
        assert!(vector.iter().all(|value| *value == 0.0));
        assert_eq!(cosine_similarity(&vector, &vector), 0.0);
    }
}
