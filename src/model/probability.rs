//! Probability calibration
//!
//! Platt scaling of pairwise decision values (with the Newton refinement of
//! Lin, Lin and Weng), pairwise coupling into multi-class probabilities
//! (Wu, Lin and Weng, method 2) and the Laplace noise scale used by SVR.

use log::info;

const MIN_PAIRWISE_PROBABILITY: f64 = 1e-7;

/// Fit the sigmoid `1 / (1 + exp(A f + B))` to decision values and +1/-1 labels
///
/// Returns `(A, B)`.
pub fn sigmoid_train(dec_values: &[f64], labels: &[f64]) -> (f64, f64) {
    let prior1 = labels.iter().filter(|&&y| y > 0.0).count() as f64;
    let prior0 = labels.len() as f64 - prior1;

    let max_iter = 100;
    let min_step = 1e-10;
    let sigma = 1e-12;
    let eps = 1e-5;

    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = labels
        .iter()
        .map(|&y| if y > 0.0 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        dec_values
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let f_apb = f * a + b;
                if f_apb >= 0.0 {
                    t * f_apb + (-f_apb).exp().ln_1p()
                } else {
                    (t - 1.0) * f_apb + f_apb.exp().ln_1p()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    let mut iter = 0;
    while iter < max_iter {
        // Gradient and Hessian, with sigma keeping H positive definite
        let (mut h11, mut h22, mut h21) = (sigma, sigma, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);
        for (&f, &t) in dec_values.iter().zip(&targets) {
            let f_apb = f * a + b;
            let (p, q) = if f_apb >= 0.0 {
                let e = (-f_apb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_apb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < eps && g2.abs() < eps {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let d_a = -(h22 * g1 - h21 * g2) / det;
        let d_b = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * d_a + g2 * d_b;

        let mut step = 1.0;
        while step >= min_step {
            let new_a = a + step * d_a;
            let new_b = b + step * d_b;
            let new_f = objective(new_a, new_b);
            if new_f < fval + 0.0001 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }

        if step < min_step {
            info!("line search fails in two-class probability estimates");
            break;
        }
        iter += 1;
    }

    if iter >= max_iter {
        info!("reaching maximal iterations in two-class probability estimates");
    }
    (a, b)
}

/// Probability of the positive class for decision value `f`
pub fn sigmoid_predict(f: f64, a: f64, b: f64) -> f64 {
    let f_apb = f * a + b;
    // Evaluated on the side that cannot overflow
    if f_apb >= 0.0 {
        let e = (-f_apb).exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}

/// Pairwise probability clamped away from 0 and 1
pub(crate) fn clamped_sigmoid(f: f64, a: f64, b: f64) -> f64 {
    sigmoid_predict(f, a, b).clamp(MIN_PAIRWISE_PROBABILITY, 1.0 - MIN_PAIRWISE_PROBABILITY)
}

/// Couple pairwise probabilities `r[i][j] = P(i | i or j)` into class probabilities
pub fn multiclass_probability(r: &[Vec<f64>]) -> Vec<f64> {
    let k = r.len();
    let max_iter = 100.max(k);
    let eps = 0.005 / k as f64;

    let mut q = vec![vec![0.0; k]; k];
    for t in 0..k {
        for j in 0..t {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = q[j][t];
        }
        for j in (t + 1)..k {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = -r[j][t] * r[t][j];
        }
    }

    let mut p = vec![1.0 / k as f64; k];
    let mut qp = vec![0.0; k];

    let mut iter = 0;
    while iter < max_iter {
        let mut pqp = 0.0;
        for t in 0..k {
            qp[t] = (0..k).map(|j| q[t][j] * p[j]).sum();
            pqp += p[t] * qp[t];
        }

        let max_error = qp
            .iter()
            .map(|&v| (v - pqp).abs())
            .fold(0.0, f64::max);
        if max_error < eps {
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + pqp) / q[t][t];
            p[t] += diff;
            pqp = (pqp + diff * (diff * q[t][t] + 2.0 * qp[t])) / (1.0 + diff) / (1.0 + diff);
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
        iter += 1;
    }

    if iter >= max_iter {
        info!("exceeds max_iter in multiclass probability coupling");
    }
    p
}

/// Laplace scale from cross-validation residuals `target - prediction`
///
/// Residuals beyond five standard deviations are treated as outliers.
pub fn laplace_scale(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }

    let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / residuals.len() as f64;
    let std = (2.0 * mae * mae).sqrt();

    let inliers: Vec<f64> = residuals
        .iter()
        .map(|r| r.abs())
        .filter(|&r| r <= 5.0 * std)
        .collect();
    if inliers.is_empty() {
        return mae;
    }
    let sigma = inliers.iter().sum::<f64>() / inliers.len() as f64;

    info!(
        "prob. model for test data: target value = predicted value + z, \
         z: Laplace distribution e^(-|z|/sigma)/(2sigma), sigma = {sigma}"
    );
    sigma
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_predict_is_monotone_and_bounded() {
        // A < 0 maps larger decision values to higher probability
        let low = sigmoid_predict(-2.0, -1.5, 0.0);
        let mid = sigmoid_predict(0.0, -1.5, 0.0);
        let high = sigmoid_predict(2.0, -1.5, 0.0);

        assert!(low < mid && mid < high);
        assert_relative_eq!(mid, 0.5);
        assert!(sigmoid_predict(1e6, -1.0, 0.0) <= 1.0);
        assert!(sigmoid_predict(-1e6, -1.0, 0.0) >= 0.0);
    }

    #[test]
    fn test_clamped_sigmoid_stays_inside_open_interval() {
        assert_eq!(clamped_sigmoid(1e6, -1.0, 0.0), 1.0 - 1e-7);
        assert_eq!(clamped_sigmoid(-1e6, -1.0, 0.0), 1e-7);
    }

    #[test]
    fn test_sigmoid_train_separable_gives_negative_slope() {
        let dec_values = [-2.0, -1.5, -1.0, -0.5, 0.5, 1.0, 1.5, 2.0];
        let labels = [-1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0];

        let (a, b) = sigmoid_train(&dec_values, &labels);
        assert!(a < 0.0);
        assert!(b.abs() < 1e-6, "symmetric data should give B = 0, got {b}");
        assert!(sigmoid_predict(2.0, a, b) > 0.8);
        assert!(sigmoid_predict(-2.0, a, b) < 0.2);
    }

    #[test]
    fn test_sigmoid_train_prior_only() {
        // Constant decision values leave only the prior in B
        let dec_values = [0.0; 4];
        let labels = [1.0, -1.0, -1.0, -1.0];

        let (_, b) = sigmoid_train(&dec_values, &labels);
        let p = sigmoid_predict(0.0, 0.0, b);
        // Mean of the regularized targets: (2/3 + 3 * 1/5) / 4
        assert_relative_eq!(p, 19.0 / 60.0, epsilon = 1e-4);
    }

    #[test]
    fn test_multiclass_probability_uniform() {
        let r = vec![vec![0.0, 0.5, 0.5], vec![0.5, 0.0, 0.5], vec![0.5, 0.5, 0.0]];
        let p = multiclass_probability(&r);

        for value in &p {
            assert_relative_eq!(*value, 1.0 / 3.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_multiclass_probability_prefers_dominant_class() {
        let r = vec![vec![0.0, 0.9, 0.9], vec![0.1, 0.0, 0.5], vec![0.1, 0.5, 0.0]];
        let p = multiclass_probability(&r);

        assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(p[0] > p[1] && p[0] > p[2]);
        assert_relative_eq!(p[1], p[2], epsilon = 1e-2);
    }

    #[test]
    fn test_laplace_scale_drops_outliers() {
        let mut residuals = vec![0.1, -0.1, 0.1, -0.1, 0.1, -0.1, 0.1, -0.1, 0.1, -0.1];
        residuals.push(100.0);

        let sigma = laplace_scale(&residuals);
        assert_relative_eq!(sigma, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_laplace_scale_without_outliers_is_mae() {
        assert_relative_eq!(laplace_scale(&[0.5, -1.0, 1.5]), 1.0);
        assert_eq!(laplace_scale(&[]), 0.0);
    }
}
