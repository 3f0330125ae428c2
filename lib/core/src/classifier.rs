//! Duplicate-probability classifiers
//!
//! Two interchangeable strategies behind the [`Classifier`] trait: a
//! rule-based scorer that needs no training data and a logistic model fit
//! offline on labeled feature rows. Artifact selection happens in
//! [`crate::store::ModelStore`]; call sites only see the trait.

use crate::features::{FeatureRow, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// Converts feature rows into duplicate probabilities in [0, 1].
pub trait Classifier: Send + Sync {
    fn predict(&self, rows: &[FeatureRow]) -> Vec<f32>;
}

/// Heuristic weights for [`RuleBasedClassifier`].
///
/// The defaults are empirical tuning choices, not invariants; only the
/// feature order and the gov-id short-circuit are load-bearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleWeights {
    /// Score assigned outright when the government id matches
    pub gov_id_score: f32,
    pub phone: f32,
    pub email: f32,
    pub vector_sim: f32,
    pub name: f32,
    pub addr: f32,
    pub city: f32,
    pub state: f32,
    pub postal: f32,
    /// Bonus when the DOB delta is under 30 days
    pub dob_close_bonus: f32,
    /// Bonus when the DOB delta is under 365 days
    pub dob_near_bonus: f32,
    /// Upper bound on the accumulated score
    pub cap: f32,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            gov_id_score: 0.99,
            phone: 0.4,
            email: 0.4,
            vector_sim: 0.1,
            name: 0.1,
            addr: 0.05,
            city: 0.05,
            state: 0.03,
            postal: 0.05,
            dob_close_bonus: 0.10,
            dob_near_bonus: 0.05,
            cap: 0.99,
        }
    }
}

/// Availability fallback used when no trained artifact exists.
///
/// Hard identifiers dominate: a government-id match alone decides the score.
/// Softer signals accumulate small weighted contributions, and DOB proximity
/// only counts when at least one of phone, email, or name already agrees.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedClassifier {
    weights: RuleWeights,
}

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: RuleWeights) -> Self {
        Self { weights }
    }

    fn score(&self, row: &FeatureRow) -> f32 {
        let w = &self.weights;
        let [vsim, name_sim, phone, email, gov_id, addr, city, state, postal, dob_delta] = *row;

        if gov_id >= 1.0 {
            return w.gov_id_score;
        }

        let mut score = 0.0;
        score += w.phone * phone;
        score += w.email * email;
        score += w.vector_sim * vsim;
        score += w.name * name_sim;
        score += w.addr * addr;
        score += w.city * city;
        score += w.state * state;
        score += w.postal * postal;

        let dob_gate = phone > 0.0 || email > 0.0 || name_sim > 0.0;
        if dob_gate && dob_delta < 365.0 {
            score += if dob_delta < 30.0 {
                w.dob_close_bonus
            } else {
                w.dob_near_bonus
            };
        }
        score.min(w.cap)
    }
}

impl Classifier for RuleBasedClassifier {
    fn predict(&self, rows: &[FeatureRow]) -> Vec<f32> {
        rows.iter().map(|row| self.score(row)).collect()
    }
}

/// Logistic regression over standardized feature rows.
///
/// The standardization constants are part of the artifact so prediction does
/// not depend on the training set being available.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainedClassifier {
    weights: [f32; FEATURE_COUNT],
    bias: f32,
    means: [f32; FEATURE_COUNT],
    stds: [f32; FEATURE_COUNT],
}

impl TrainedClassifier {
    /// Fit with class-balanced sample weights by batch gradient descent.
    ///
    /// Labels are 0 or 1. Balancing follows the `n / (2 * n_class)` scheme so
    /// the minority class is not drowned out by skewed pair mining.
    pub fn fit(rows: &[FeatureRow], labels: &[u8]) -> Self {
        assert_eq!(rows.len(), labels.len(), "rows and labels must align");
        let n = rows.len().max(1) as f32;

        let mut means = [0.0f32; FEATURE_COUNT];
        let mut stds = [0.0f32; FEATURE_COUNT];
        for row in rows {
            for (m, x) in means.iter_mut().zip(row.iter()) {
                *m += x / n;
            }
        }
        for row in rows {
            for ((s, m), x) in stds.iter_mut().zip(means.iter()).zip(row.iter()) {
                *s += (x - m) * (x - m) / n;
            }
        }
        for s in &mut stds {
            *s = s.sqrt();
            if *s < 1e-6 {
                *s = 1.0;
            }
        }

        let n_pos = labels.iter().filter(|&&l| l == 1).count() as f32;
        let n_neg = labels.len() as f32 - n_pos;
        let (w_pos, w_neg) = if n_pos > 0.0 && n_neg > 0.0 {
            (n / (2.0 * n_pos), n / (2.0 * n_neg))
        } else {
            (1.0, 1.0)
        };

        let standardized: Vec<[f32; FEATURE_COUNT]> = rows
            .iter()
            .map(|row| {
                let mut z = [0.0f32; FEATURE_COUNT];
                for i in 0..FEATURE_COUNT {
                    z[i] = (row[i] - means[i]) / stds[i];
                }
                z
            })
            .collect();

        let mut weights = [0.0f32; FEATURE_COUNT];
        let mut bias = 0.0f32;
        const EPOCHS: usize = 500;
        const LEARNING_RATE: f32 = 0.5;
        const L2: f32 = 1e-4;

        for _ in 0..EPOCHS {
            let mut grad_w = [0.0f32; FEATURE_COUNT];
            let mut grad_b = 0.0f32;
            let mut weight_sum = 0.0f32;

            for (z, &label) in standardized.iter().zip(labels.iter()) {
                let sample_weight = if label == 1 { w_pos } else { w_neg };
                let logit: f32 =
                    bias + weights.iter().zip(z.iter()).map(|(w, x)| w * x).sum::<f32>();
                let err = sample_weight * (sigmoid(logit) - label as f32);
                for (g, x) in grad_w.iter_mut().zip(z.iter()) {
                    *g += err * x;
                }
                grad_b += err;
                weight_sum += sample_weight;
            }

            if weight_sum == 0.0 {
                break;
            }
            for (w, g) in weights.iter_mut().zip(grad_w.iter()) {
                *w -= LEARNING_RATE * (g / weight_sum + L2 * *w);
            }
            bias -= LEARNING_RATE * grad_b / weight_sum;
        }

        Self {
            weights,
            bias,
            means,
            stds,
        }
    }

    fn probability(&self, row: &FeatureRow) -> f32 {
        let mut logit = self.bias;
        for i in 0..FEATURE_COUNT {
            let z = (row[i] - self.means[i]) / self.stds[i];
            logit += self.weights[i] * z;
        }
        sigmoid(logit)
    }

    /// Fraction of rows classified correctly at the 0.5 cutoff.
    pub fn accuracy(&self, rows: &[FeatureRow], labels: &[u8]) -> f32 {
        if rows.is_empty() {
            return 0.0;
        }
        let correct = rows
            .iter()
            .zip(labels.iter())
            .filter(|(row, &label)| (self.probability(row) >= 0.5) as u8 == label)
            .count();
        correct as f32 / rows.len() as f32
    }
}

impl Classifier for TrainedClassifier {
    fn predict(&self, rows: &[FeatureRow]) -> Vec<f32> {
        rows.iter().map(|row| self.probability(row)).collect()
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// A classifier resolved from an artifact path: the trained model when the
/// artifact exists, the rule-based fallback otherwise.
#[derive(Debug, Clone)]
pub enum LoadedClassifier {
    RuleBased(RuleBasedClassifier),
    Trained(TrainedClassifier),
}

impl LoadedClassifier {
    pub fn is_trained(&self) -> bool {
        matches!(self, LoadedClassifier::Trained(_))
    }
}

impl Classifier for LoadedClassifier {
    fn predict(&self, rows: &[FeatureRow]) -> Vec<f32> {
        match self {
            LoadedClassifier::RuleBased(c) => c.predict(rows),
            LoadedClassifier::Trained(c) => c.predict(rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::DOB_DELTA_SENTINEL;

    fn zero_row() -> FeatureRow {
        [0.0; FEATURE_COUNT]
    }

    #[test]
    fn test_gov_id_match_dominates() {
        let c = RuleBasedClassifier::new();
        let mut row = zero_row();
        row[4] = 1.0;
        row[9] = DOB_DELTA_SENTINEL;
        let probs = c.predict(&[row]);
        assert!(probs[0] >= 0.99);
    }

    #[test]
    fn test_all_zero_with_sentinel_dob_scores_zero() {
        let c = RuleBasedClassifier::new();
        let mut row = zero_row();
        row[9] = DOB_DELTA_SENTINEL;
        assert_eq!(c.predict(&[row])[0], 0.0);
    }

    #[test]
    fn test_dob_bonus_requires_supporting_signal() {
        let c = RuleBasedClassifier::new();
        // Close DOB alone is not enough
        let mut lonely = zero_row();
        lonely[9] = 5.0;
        assert_eq!(c.predict(&[lonely])[0], 0.0);

        // Phone match plus close DOB gets both contributions
        let mut supported = lonely;
        supported[2] = 1.0;
        let p = c.predict(&[supported])[0];
        assert!((p - 0.5).abs() < 1e-6); // 0.4 phone + 0.1 close-DOB bonus
    }

    #[test]
    fn test_dob_near_vs_close_bonus() {
        let c = RuleBasedClassifier::new();
        let mut close = zero_row();
        close[2] = 1.0;
        close[9] = 10.0;
        let mut near = close;
        near[9] = 100.0;
        let probs = c.predict(&[close, near]);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_score_is_capped() {
        let c = RuleBasedClassifier::new();
        let mut row = [1.0; FEATURE_COUNT];
        row[4] = 0.0; // avoid the short-circuit
        row[9] = 0.0;
        let p = c.predict(&[row])[0];
        assert!(p <= 0.99);
    }

    fn separable_training_set() -> (Vec<FeatureRow>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let jitter = (i % 7) as f32 * 0.01;
            let mut pos = zero_row();
            pos[0] = 0.9 - jitter;
            pos[1] = 0.95 - jitter;
            pos[2] = 1.0;
            pos[9] = 3.0;
            rows.push(pos);
            labels.push(1);

            let mut neg = zero_row();
            neg[0] = 0.3 + jitter;
            neg[1] = 0.4 + jitter;
            neg[9] = DOB_DELTA_SENTINEL;
            rows.push(neg);
            labels.push(0);
        }
        (rows, labels)
    }

    #[test]
    fn test_trained_classifier_separates_classes() {
        let (rows, labels) = separable_training_set();
        let model = TrainedClassifier::fit(&rows, &labels);
        assert!(model.accuracy(&rows, &labels) > 0.95);

        let probs = model.predict(&rows);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_trained_classifier_orders_by_evidence() {
        let (rows, labels) = separable_training_set();
        let model = TrainedClassifier::fit(&rows, &labels);
        let strong = rows[0]; // positive example
        let weak = rows[1]; // negative example
        let probs = model.predict(&[strong, weak]);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_loaded_classifier_dispatch() {
        let rule = LoadedClassifier::RuleBased(RuleBasedClassifier::new());
        assert!(!rule.is_trained());
        let mut row = zero_row();
        row[4] = 1.0;
        assert!(rule.predict(&[row])[0] >= 0.99);
    }
}
