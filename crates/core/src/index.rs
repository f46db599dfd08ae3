use crate::traits::VectorIndex;
use crate::{IndexError, RetrievedChunk, SimilarityMetric, TextChunk};
use std::cmp::Ordering;

/// Exact nearest-neighbour index over a session's chunks, held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    entries: Vec<(TextChunk, Vec<f32>)>,
    dimensions: usize,
    metric: SimilarityMetric,
}

impl InMemoryIndex {
    pub fn build(
        chunks: Vec<TextChunk>,
        vectors: Vec<Vec<f32>>,
        metric: SimilarityMetric,
    ) -> Result<Self, IndexError> {
        if chunks.len() != vectors.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let dimensions = match vectors.first() {
            Some(vector) => vector.len(),
            None => return Err(IndexError::Empty),
        };

        if let Some(odd) = vectors.iter().find(|vector| vector.len() != dimensions) {
            return Err(IndexError::DimensionMismatch {
                expected: dimensions,
                found: odd.len(),
            });
        }

        Ok(Self {
            entries: chunks.into_iter().zip(vectors).collect(),
            dimensions,
            metric,
        })
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    fn score(&self, query: &[f32], vector: &[f32]) -> f32 {
        match self.metric {
            SimilarityMetric::L2 => -squared_l2(query, vector).sqrt(),
            SimilarityMetric::Cosine => cosine_similarity(query, vector),
        }
    }
}

impl VectorIndex for InMemoryIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>, IndexError> {
        if query_vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                found: query_vector.len(),
            });
        }

        let mut scored = self
            .entries
            .iter()
            .map(|(chunk, vector)| (self.score(query_vector, vector), chunk))
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| {
            right
                .0
                .partial_cmp(&left.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.1.position.cmp(&right.1.position))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, chunk)| RetrievedChunk {
                chunk: chunk.clone(),
                score,
            })
            .collect())
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|a| a * a).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|b| b * b).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm * right_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(position: usize, text: &str) -> TextChunk {
        TextChunk {
            chunk_id: format!("chunk-{position}"),
            position,
            start: position * 10,
            text: text.to_string(),
        }
    }

    fn sample(metric: SimilarityMetric) -> InMemoryIndex {
        InMemoryIndex::build(
            vec![chunk(0, "north"), chunk(1, "east"), chunk(2, "north-east")],
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]],
            metric,
        )
        .expect("sample index should build")
    }

    #[test]
    fn l2_ranks_nearest_first() -> Result<(), IndexError> {
        let index = sample(SimilarityMetric::L2);
        let hits = index.search(&[0.1, 0.9], 2)?;

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "north");
        assert_eq!(hits[1].chunk.text, "north-east");
        assert!(hits[0].score >= hits[1].score);
        Ok(())
    }

    #[test]
    fn cosine_ignores_magnitude() -> Result<(), IndexError> {
        let index = sample(SimilarityMetric::Cosine);
        let hits = index.search(&[10.0, 0.0], 1)?;
        assert_eq!(hits[0].chunk.text, "east");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn k_is_clamped_and_ties_keep_chunk_order() -> Result<(), IndexError> {
        let index = InMemoryIndex::build(
            vec![chunk(0, "a"), chunk(1, "b"), chunk(2, "c")],
            vec![vec![1.0], vec![1.0], vec![1.0]],
            SimilarityMetric::L2,
        )?;

        let hits = index.search(&[1.0], 10)?;
        let positions = hits.iter().map(|hit| hit.chunk.position).collect::<Vec<_>>();
        assert_eq!(positions, vec![0, 1, 2]);
        Ok(())
    }

    #[test]
    fn build_rejects_mismatched_input() {
        assert_eq!(
            InMemoryIndex::build(vec![chunk(0, "a")], Vec::new(), SimilarityMetric::L2).err(),
            Some(IndexError::CountMismatch { chunks: 1, vectors: 0 })
        );
        assert_eq!(
            InMemoryIndex::build(Vec::new(), Vec::new(), SimilarityMetric::L2).err(),
            Some(IndexError::Empty)
        );
        assert_eq!(
            InMemoryIndex::build(
                vec![chunk(0, "a"), chunk(1, "b")],
                vec![vec![1.0, 2.0], vec![1.0]],
                SimilarityMetric::L2
            )
            .err(),
            Some(IndexError::DimensionMismatch { expected: 2, found: 1 })
        );
    }

    #[test]
    fn query_dimension_must_match() {
        let index = sample(SimilarityMetric::L2);
        assert_eq!(
            index.search(&[1.0, 2.0, 3.0], 1).err(),
            Some(IndexError::DimensionMismatch { expected: 2, found: 3 })
        );
    }
}
