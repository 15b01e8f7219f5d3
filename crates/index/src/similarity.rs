//! Cosine similarity over L2-normalised vectors, where it reduces to a dot product.

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scale `v` to unit length in place; zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

pub fn similarity_matrix(vectors: &[Vec<f32>]) -> Vec<Vec<f32>> {
    vectors
        .iter()
        .map(|a| vectors.iter().map(|b| dot(a, b)).collect())
        .collect()
}

/// Corpus entries scoring at least `threshold` against `query`, best first, at most `top_k`.
pub fn find_similar(
    query: &[f32],
    corpus: &[Vec<f32>],
    top_k: usize,
    threshold: f32,
) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = corpus
        .iter()
        .enumerate()
        .map(|(idx, v)| (idx, dot(query, v)))
        .filter(|(_, score)| *score >= threshold)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);
    scored
}

/// Every pair `i < j` scoring at least `threshold`, in row-major order.
pub fn find_duplicates(vectors: &[Vec<f32>], threshold: f32) -> Vec<(usize, usize, f32)> {
    let mut pairs = Vec::new();
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            let score = dot(&vectors[i], &vectors[j]);
            if score >= threshold {
                pairs.push((i, j, score));
            }
        }
    }
    pairs
}

/// Per item, its `max_per_item` best neighbours above `threshold`.
///
/// A pair is kept only when it appears in the lower-indexed item's list, so
/// each edge is reported once as `(i, j)` with `i < j`. Sorted by score,
/// highest first.
pub fn find_related_pairs(
    vectors: &[Vec<f32>],
    threshold: f32,
    max_per_item: usize,
) -> Vec<(usize, usize, f32)> {
    let mut pairs = Vec::new();
    for (i, item) in vectors.iter().enumerate() {
        let mut neighbours: Vec<(usize, f32)> = vectors
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, other)| (j, dot(item, other)))
            .filter(|(_, score)| *score >= threshold)
            .collect();
        neighbours.sort_by(|a, b| b.1.total_cmp(&a.1));
        neighbours.truncate(max_per_item);

        pairs.extend(
            neighbours
                .into_iter()
                .filter(|(j, _)| i < *j)
                .map(|(j, score)| (i, j, score)),
        );
    }
    pairs.sort_by(|a, b| b.2.total_cmp(&a.2));
    pairs
}
