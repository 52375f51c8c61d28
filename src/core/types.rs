//! Core type definitions for SVM

/// Result of a buffer-based prediction
///
/// `probability` is exactly `0.0` whenever probability estimation did not run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    /// Predicted label truncated to an integer class index
    pub index: i32,
    /// Estimated probability of `index`, or 0.0
    pub probability: f64,
}

impl PredictionResult {
    pub fn new(index: i32, probability: f64) -> Self {
        Self { index, probability }
    }
}

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector {
    /// Sorted indices of stored elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Build a dense-as-sparse vector: element `i` becomes the pair `(i, buffer[i])`
    ///
    /// Every element is stored, zeros included.
    pub fn from_dense(buffer: &[f32]) -> Self {
        Self {
            indices: (0..buffer.len()).collect(),
            values: buffer.iter().map(|&v| f64::from(v)).collect(),
        }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Largest stored index, if any
    pub fn max_index(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    /// Number of stored elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Training sample with features and target
#[derive(Clone, Debug)]
pub struct Sample {
    /// Feature vector (sparse representation)
    pub features: SparseVector,
    /// Class label, or regression target
    pub label: f64,
}

impl Sample {
    pub fn new(features: SparseVector, label: f64) -> Self {
        Self { features, label }
    }
}

/// Result of optimization process
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Lagrange multipliers (alpha values)
    pub alpha: Vec<f64>,
    /// Bias term (b), decision function is `sum(alpha_i * y_i * K) + b`
    pub b: f64,
    /// Indices of support vectors (where alpha > 0)
    pub support_vectors: Vec<usize>,
    /// Number of iterations performed
    pub iterations: usize,
    /// Final objective value
    pub objective_value: f64,
}

/// Configuration for the solvers
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Upper bound for alpha of positive samples
    pub c_positive: f64,
    /// Upper bound for alpha of negative samples
    pub c_negative: f64,
    /// Tolerance for KKT conditions
    pub epsilon: f64,
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Kernel cache size in bytes
    pub cache_size: usize,
    /// Enable shrinking heuristic
    pub shrinking: bool,
    /// Number of iterations between shrinking (h in the paper)
    pub shrinking_iterations: usize,
}

impl OptimizerConfig {
    /// Box constraint for a sample with the given +1/-1 label
    pub fn bound(&self, label: f64) -> f64 {
        if label > 0.0 {
            self.c_positive
        } else {
            self.c_negative
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            c_positive: 1.0,
            c_negative: 1.0,
            epsilon: 0.001,
            max_iterations: 10000,
            cache_size: 100 * 1024 * 1024,
            shrinking: true,
            shrinking_iterations: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_vector_creation() {
        let sv = SparseVector::new(vec![2, 0, 4], vec![2.0, 1.0, 3.0]);

        assert_eq!(sv.indices, vec![0, 2, 4]);
        assert_eq!(sv.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(sv.max_index(), Some(4));
    }

    #[test]
    fn test_sparse_vector_get() {
        let sv = SparseVector::new(vec![1, 3, 5], vec![1.0, 2.0, 3.0]);

        assert_eq!(sv.get(0), 0.0);
        assert_eq!(sv.get(1), 1.0);
        assert_eq!(sv.get(3), 2.0);
        assert_eq!(sv.get(6), 0.0);
    }

    #[test]
    fn test_from_dense_keeps_every_element() {
        let sv = SparseVector::from_dense(&[0.5, 0.0, -1.25]);

        assert_eq!(sv.indices, vec![0, 1, 2]);
        assert_eq!(sv.values, vec![0.5, 0.0, -1.25]);
        assert_eq!(sv.nnz(), 3);
    }

    #[test]
    fn test_from_dense_empty() {
        let sv = SparseVector::from_dense(&[]);
        assert!(sv.is_empty());
        assert_eq!(sv.max_index(), None);
    }

    #[test]
    fn test_sparse_vector_norm() {
        let sv = SparseVector::new(vec![0, 1], vec![3.0, 4.0]);
        assert_eq!(sv.norm_squared(), 25.0);
    }

    #[test]
    fn test_optimizer_config_default() {
        let config = OptimizerConfig::default();
        assert_eq!(config.c_positive, 1.0);
        assert_eq!(config.c_negative, 1.0);
        assert_eq!(config.epsilon, 0.001);
        assert!(config.shrinking);
        assert_eq!(config.bound(1.0), 1.0);
    }

    #[test]
    fn test_optimizer_config_weighted_bounds() {
        let config = OptimizerConfig {
            c_positive: 2.0,
            c_negative: 0.5,
            ..OptimizerConfig::default()
        };
        assert_eq!(config.bound(1.0), 2.0);
        assert_eq!(config.bound(-1.0), 0.5);
    }

    #[test]
    #[should_panic(expected = "Indices and values must have same length")]
    fn test_sparse_vector_length_mismatch() {
        SparseVector::new(vec![0, 1], vec![1.0, 2.0, 3.0]);
    }
}
