//! Trained SVM models
//!
//! A model holds the support vectors of every one-vs-one class pair in one
//! shared pool, grouped by class, in the layout of the classic libsvm model:
//!
//! - `labels[k]` / `n_sv[k]`: label of class k and how many SVs it owns
//! - `sv_coef`: `nr_class - 1` rows, one column per SV. For the pair (i, j),
//!   the coefficients of class i SVs live in row `j - 1` and those of class j
//!   SVs in row `i`.
//! - `rho[p]`, `prob_a[p]`, `prob_b[p]`: one entry per pair, pairs ordered
//!   (0,1), (0,2), ..., (1,2), ...
//!
//! Regression models have a single row of coefficients and a single rho;
//! `prob_a[0]` is then the Laplace scale.

pub mod params;
pub mod persistence;
pub mod probability;
pub mod train;

pub use self::params::*;
pub use self::persistence::*;
pub use self::probability::*;
pub use self::train::*;

use crate::core::{Result, SVMError, SparseVector};
use crate::kernel::{Kernel, KernelType};
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SvmModel {
    pub params: TrainParams,
    pub nr_class: usize,
    pub labels: Vec<i32>,
    pub n_sv: Vec<usize>,
    pub support_vectors: Vec<SparseVector>,
    pub sv_coef: Vec<Vec<f64>>,
    pub rho: Vec<f64>,
    pub prob_a: Option<Vec<f64>>,
    pub prob_b: Option<Vec<f64>>,
}

impl SvmModel {
    pub fn svm_type(&self) -> SvmType {
        self.params.svm_type
    }

    pub fn kernel(&self) -> &KernelType {
        &self.params.kernel
    }

    pub fn total_sv(&self) -> usize {
        self.support_vectors.len()
    }

    /// Whether the model carries probability information
    pub fn check_probability_model(&self) -> bool {
        match self.svm_type() {
            SvmType::CSvc => self.prob_a.is_some() && self.prob_b.is_some(),
            SvmType::EpsilonSvr => self.prob_a.is_some(),
        }
    }

    /// Laplace scale of the SVR noise model, if trained with probability
    pub fn svr_probability(&self) -> Option<f64> {
        match self.svm_type() {
            SvmType::EpsilonSvr => self.prob_a.as_ref().and_then(|a| a.first().copied()),
            SvmType::CSvc => None,
        }
    }

    /// Raw decision values and the predicted label
    ///
    /// Classification yields one value per class pair; the label wins the
    /// most pairwise votes, ties going to the class listed first. Regression
    /// yields the single regression value, which is also the prediction.
    pub fn predict_values(&self, x: &SparseVector) -> (f64, Vec<f64>) {
        let kernel = self.kernel();

        if self.svm_type() == SvmType::EpsilonSvr {
            let coef = self.sv_coef.first().map(Vec::as_slice).unwrap_or(&[]);
            let value = coef
                .iter()
                .zip(&self.support_vectors)
                .map(|(c, sv)| c * kernel.compute(sv, x))
                .sum::<f64>()
                - self.rho.first().copied().unwrap_or(0.0);
            return (value, vec![value]);
        }

        let k_values: Vec<f64> = self
            .support_vectors
            .iter()
            .map(|sv| kernel.compute(sv, x))
            .collect();

        let mut start = Vec::with_capacity(self.nr_class);
        let mut offset = 0;
        for &count in &self.n_sv {
            start.push(offset);
            offset += count;
        }

        let mut votes = vec![0usize; self.nr_class];
        let mut dec_values = Vec::with_capacity(self.rho.len());
        let mut p = 0;
        for i in 0..self.nr_class {
            for j in (i + 1)..self.nr_class {
                let (si, sj) = (start[i], start[j]);
                let (ci, cj) = (self.n_sv[i], self.n_sv[j]);
                let coef_i = &self.sv_coef[j - 1];
                let coef_j = &self.sv_coef[i];

                let sum = (si..si + ci).map(|k| coef_i[k] * k_values[k]).sum::<f64>()
                    + (sj..sj + cj).map(|k| coef_j[k] * k_values[k]).sum::<f64>()
                    - self.rho[p];
                dec_values.push(sum);

                if sum > 0.0 {
                    votes[i] += 1;
                } else {
                    votes[j] += 1;
                }
                p += 1;
            }
        }

        let winner = argmax(votes.iter().map(|&v| v as f64));
        (f64::from(self.labels[winner]), dec_values)
    }

    /// Predicted label (classification) or value (regression)
    pub fn predict(&self, x: &SparseVector) -> f64 {
        self.predict_values(x).0
    }

    /// Predicted label and the class probabilities, in `labels` order
    ///
    /// Falls back to [`predict`](Self::predict) with no estimates when the
    /// model is a regressor or lacks probability information.
    pub fn predict_probability(&self, x: &SparseVector) -> (f64, Option<Vec<f64>>) {
        let (Some(prob_a), Some(prob_b)) = (&self.prob_a, &self.prob_b) else {
            return (self.predict(x), None);
        };
        if !self.svm_type().is_classification() {
            return (self.predict(x), None);
        }

        let k = self.nr_class;
        if k < 2 {
            return (self.predict(x), Some(vec![1.0; k]));
        }

        let (_, dec_values) = self.predict_values(x);
        let mut pairwise = vec![vec![0.0; k]; k];
        let mut p = 0;
        for i in 0..k {
            for j in (i + 1)..k {
                let r = clamped_sigmoid(dec_values[p], prob_a[p], prob_b[p]);
                pairwise[i][j] = r;
                pairwise[j][i] = 1.0 - r;
                p += 1;
            }
        }

        let estimates = if k == 2 {
            vec![pairwise[0][1], pairwise[1][0]]
        } else {
            multiclass_probability(&pairwise)
        };

        let winner = argmax(estimates.iter().copied());
        debug!("probability estimates {estimates:?}, winner {winner}");
        (f64::from(self.labels[winner]), Some(estimates))
    }

    /// Probability estimate of `label`, given estimates in `labels` order
    pub fn probability_of(&self, label: i32, estimates: &[f64]) -> Result<f64> {
        self.labels
            .iter()
            .position(|&l| l == label)
            .and_then(|pos| estimates.get(pos).copied())
            .ok_or_else(|| SVMError::InvalidParameter(format!("label {label} is not in the model")))
    }
}

/// Position of the first maximum
fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-built 3-class linear model on one feature; every pairwise
    /// decision value is -x
    fn three_class_model() -> SvmModel {
        SvmModel {
            params: TrainParams {
                kernel: KernelType::Linear,
                ..TrainParams::default()
            },
            nr_class: 3,
            labels: vec![5, 7, 9],
            n_sv: vec![1, 1, 1],
            support_vectors: vec![
                SparseVector::new(vec![0], vec![1.0]),
                SparseVector::new(vec![0], vec![1.0]),
                SparseVector::new(vec![0], vec![1.0]),
            ],
            // Class 0 SV: rows 0 (pair 0-1) and 1 (pair 0-2)
            // Class 1 SV: row 0 (pair 0-1) and row 1 (pair 1-2)
            // Class 2 SV: row 0 (pair 0-2) and row 1 (pair 1-2)
            sv_coef: vec![vec![-1.0, 0.0, 0.0], vec![-1.0, -1.0, 0.0]],
            rho: vec![0.0, 0.0, 0.0],
            prob_a: None,
            prob_b: None,
        }
    }

    #[test]
    fn test_predict_values_votes() {
        let model = three_class_model();

        // All pair values are -x, so class j wins every pair
        let (label, dec) = model.predict_values(&SparseVector::new(vec![0], vec![2.0]));
        assert_eq!(dec, vec![-2.0, -2.0, -2.0]);
        assert_eq!(label, 9.0);

        // All pair values are positive: class 0 wins every pair
        let (label, _) = model.predict_values(&SparseVector::new(vec![0], vec![-2.0]));
        assert_eq!(label, 5.0);
    }

    #[test]
    fn test_vote_tie_goes_to_first_class() {
        let model = SvmModel {
            rho: vec![0.0, 0.0, 0.0],
            sv_coef: vec![vec![1.0, 0.0, -1.0], vec![0.0, 1.0, 0.0]],
            ..three_class_model()
        };
        // pair 0-1: +x, pair 0-2: -x, pair 1-2: +x  => one vote each
        let (label, dec) = model.predict_values(&SparseVector::new(vec![0], vec![1.0]));
        assert_eq!(dec, vec![1.0, -1.0, 1.0]);
        assert_eq!(label, 5.0);
    }

    #[test]
    fn test_predict_probability_without_information() {
        let model = three_class_model();
        assert!(!model.check_probability_model());

        let (label, estimates) = model.predict_probability(&SparseVector::new(vec![0], vec![2.0]));
        assert_eq!(label, 9.0);
        assert!(estimates.is_none());
    }

    #[test]
    fn test_predict_probability_binary() {
        let model = SvmModel {
            params: TrainParams {
                kernel: KernelType::Linear,
                probability: true,
                ..TrainParams::default()
            },
            nr_class: 2,
            labels: vec![1, 0],
            n_sv: vec![1, 1],
            support_vectors: vec![
                SparseVector::new(vec![0], vec![1.0]),
                SparseVector::new(vec![0], vec![-1.0]),
            ],
            sv_coef: vec![vec![0.5, -0.5]],
            rho: vec![0.0],
            prob_a: Some(vec![-2.0]),
            prob_b: Some(vec![0.0]),
        };
        assert!(model.check_probability_model());

        let (label, estimates) = model.predict_probability(&SparseVector::new(vec![0], vec![1.0]));
        let estimates = estimates.unwrap();

        assert_eq!(label, 1.0);
        assert!((estimates[0] + estimates[1] - 1.0).abs() < 1e-12);
        assert!(estimates[0] > 0.5);
        assert_eq!(model.probability_of(1, &estimates).unwrap(), estimates[0]);
        assert_eq!(model.probability_of(0, &estimates).unwrap(), estimates[1]);
        assert!(model.probability_of(3, &estimates).is_err());
    }

    #[test]
    fn test_regression_predict_values() {
        let model = SvmModel {
            params: TrainParams {
                svm_type: SvmType::EpsilonSvr,
                kernel: KernelType::Linear,
                probability: true,
                ..TrainParams::default()
            },
            nr_class: 2,
            labels: Vec::new(),
            n_sv: Vec::new(),
            support_vectors: vec![SparseVector::new(vec![0], vec![1.0])],
            sv_coef: vec![vec![2.0]],
            rho: vec![-1.0],
            prob_a: Some(vec![0.25]),
            prob_b: None,
        };

        let x = SparseVector::new(vec![0], vec![3.0]);
        assert_eq!(model.predict_values(&x), (7.0, vec![7.0]));
        assert!(model.check_probability_model());
        assert_eq!(model.svr_probability(), Some(0.25));

        // Regression never takes the probability path
        assert_eq!(model.predict_probability(&x), (7.0, None));
    }
}
