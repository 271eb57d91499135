//! Single-pass k-means for risk triage.
//!
//! Centroids are seeded by sampling `k` stored vectors at evenly spaced
//! positions, then every vector is assigned to its nearest centroid by cosine
//! similarity exactly once. Centroids are not recomputed and there is no
//! convergence loop, so the result is an approximation and is reported as
//! such through [`SinglePassClusters::converged`].
//!
//! # Algorithm Details
//! - Distance metric: cosine similarity
//! - Seeding: deterministic, indices `i * n / k`
//! - Iterations: 1

/// Epsilon for floating-point comparisons.
const EPSILON: f32 = 1e-10;

/// Output of [`single_pass_clusters`].
#[derive(Debug, Clone, PartialEq)]
pub struct SinglePassClusters {
    /// Seed vectors, L2-normalised.
    pub centroids: Vec<Vec<f32>>,

    /// Index into `centroids` for each input vector.
    pub assignments: Vec<usize>,

    /// Always `false`: no refinement step is run.
    pub converged: bool,
}

/// Cluster `vectors` into `k` groups with one assignment pass.
///
/// Returns `None` when `k` is zero or larger than the number of vectors.
#[must_use = "clustering results should be used or the computation is wasted"]
pub fn single_pass_clusters(vectors: &[&[f32]], k: usize) -> Option<SinglePassClusters> {
    if k == 0 || k > vectors.len() {
        return None;
    }

    let centroids: Vec<Vec<f32>> = seed_indices(vectors.len(), k)
        .map(|i| normalize_vector_copy(vectors[i]))
        .collect();
    let centroid_refs: Vec<&[f32]> = centroids.iter().map(Vec::as_slice).collect();
    let assignments = vectors
        .iter()
        .map(|vector| assign_to_nearest_centroid(vector, &centroid_refs))
        .collect();

    Some(SinglePassClusters {
        centroids,
        assignments,
        converged: false,
    })
}

/// Evenly spaced sample positions `0, n/k, 2n/k, ...`. Distinct because `k <= n`.
fn seed_indices(n: usize, k: usize) -> impl Iterator<Item = usize> {
    (0..k).map(move |i| i * n / k)
}

/// Index of the centroid most similar to `vector`. Ties go to the lowest index.
pub fn assign_to_nearest_centroid(vector: &[f32], centroids: &[&[f32]]) -> usize {
    let mut best_similarity = f32::NEG_INFINITY;
    let mut best_cluster = 0;

    for (i, centroid) in centroids.iter().enumerate() {
        let similarity = cosine_similarity(vector, centroid);
        if similarity > best_similarity {
            best_similarity = similarity;
            best_cluster = i;
        }
    }

    best_cluster
}

/// Computes cosine similarity between two vectors.
///
/// Returns a value in `[-1, 1]`, or 0.0 when either vector has zero length
/// or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a < EPSILON || norm_b < EPSILON {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

fn normalize_vector_copy(vector: &[f32]) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > EPSILON {
        vector.iter().map(|v| v / norm).collect()
    } else {
        vector.to_vec()
    }
}
