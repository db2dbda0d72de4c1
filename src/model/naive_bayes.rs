use crate::text::SparseVector;
use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Legitimate,
    Phishing,
}

impl Label {
    pub fn index(self) -> usize {
        match self {
            Label::Legitimate => 0,
            Label::Phishing => 1,
        }
    }

    pub fn is_phishing(self) -> bool {
        self == Label::Phishing
    }
}

/// Multinomial Naive Bayes over non-negative feature weights with additive
/// (Laplace/Lidstone) smoothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    alpha: f64,
    class_log_prior: [f64; 2],
    feature_log_prob: [Vec<f64>; 2],
}

impl MultinomialNb {
    pub fn fit(
        samples: &[SparseVector],
        labels: &[Label],
        n_features: usize,
        alpha: f64,
    ) -> anyhow::Result<Self> {
        if alpha <= 0.0 {
            bail!("Smoothing parameter alpha must be positive, got {alpha}");
        }
        if samples.len() != labels.len() {
            bail!(
                "Sample count ({}) does not match label count ({})",
                samples.len(),
                labels.len()
            );
        }

        let mut class_count = [0usize; 2];
        let mut feature_count = [vec![0.0; n_features], vec![0.0; n_features]];

        for (sample, label) in samples.iter().zip(labels) {
            let class = label.index();
            class_count[class] += 1;
            for &(index, weight) in sample {
                if index >= n_features {
                    bail!("Feature index {index} out of range for {n_features} features");
                }
                feature_count[class][index] += weight;
            }
        }

        if class_count.iter().any(|&c| c == 0) {
            bail!(
                "Training data must contain both classes (legitimate: {}, phishing: {})",
                class_count[0],
                class_count[1]
            );
        }

        let total = samples.len() as f64;
        let class_log_prior = [
            (class_count[0] as f64 / total).ln(),
            (class_count[1] as f64 / total).ln(),
        ];

        let feature_log_prob = feature_count.map(|counts| {
            let denominator: f64 = counts.iter().sum::<f64>() + alpha * n_features as f64;
            counts
                .into_iter()
                .map(|c| ((c + alpha) / denominator).ln())
                .collect::<Vec<f64>>()
        });

        Ok(Self {
            alpha,
            class_log_prior,
            feature_log_prob,
        })
    }

    fn joint_log_likelihood(&self, sample: &SparseVector) -> [f64; 2] {
        let mut jll = self.class_log_prior;
        for (class, score) in jll.iter_mut().enumerate() {
            let log_prob = &self.feature_log_prob[class];
            for &(index, weight) in sample {
                if let Some(lp) = log_prob.get(index) {
                    *score += weight * lp;
                }
            }
        }
        jll
    }

    /// Class probabilities indexed by `Label::index`
    pub fn predict_proba(&self, sample: &SparseVector) -> [f64; 2] {
        let jll = self.joint_log_likelihood(sample);
        let max = jll[0].max(jll[1]);
        let log_sum = max + ((jll[0] - max).exp() + (jll[1] - max).exp()).ln();
        [(jll[0] - log_sum).exp(), (jll[1] - log_sum).exp()]
    }

    pub fn predict(&self, sample: &SparseVector) -> Label {
        let jll = self.joint_log_likelihood(sample);
        if jll[1] > jll[0] {
            Label::Phishing
        } else {
            Label::Legitimate
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn n_features(&self) -> usize {
        self.feature_log_prob[0].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_model() -> MultinomialNb {
        // feature 0 = "invoice", feature 1 = "verify"
        let samples = vec![
            vec![(0, 1.0)],
            vec![(0, 0.8), (1, 0.2)],
            vec![(1, 1.0)],
            vec![(1, 0.9), (0, 0.1)],
        ];
        let labels = vec![
            Label::Legitimate,
            Label::Legitimate,
            Label::Phishing,
            Label::Phishing,
        ];
        MultinomialNb::fit(&samples, &labels, 2, 1.0).unwrap()
    }

    #[test]
    fn test_predicts_dominant_feature_class() {
        let model = toy_model();
        assert_eq!(model.predict(&vec![(1, 1.0)]), Label::Phishing);
        assert_eq!(model.predict(&vec![(0, 1.0)]), Label::Legitimate);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = toy_model();
        let proba = model.predict_proba(&vec![(1, 0.7), (0, 0.3)]);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
        assert!(proba[1] > proba[0]);
    }

    #[test]
    fn test_empty_sample_falls_back_to_prior() {
        let model = toy_model();
        let proba = model.predict_proba(&Vec::new());
        assert!((proba[0] - 0.5).abs() < 1e-12);
        // exact tie resolves to legitimate
        assert_eq!(model.predict(&Vec::new()), Label::Legitimate);
    }

    #[test]
    fn test_smoothed_log_probabilities() {
        let samples = vec![vec![(0, 2.0)], vec![(1, 1.0)]];
        let labels = vec![Label::Legitimate, Label::Phishing];
        let model = MultinomialNb::fit(&samples, &labels, 2, 1.0).unwrap();
        // legitimate: (2+1)/(2+2) and (0+1)/(2+2)
        assert!((model.feature_log_prob[0][0] - (0.75f64).ln()).abs() < 1e-12);
        assert!((model.feature_log_prob[0][1] - (0.25f64).ln()).abs() < 1e-12);
        assert_eq!(model.n_features(), 2);
    }

    #[test]
    fn test_fit_errors() {
        let samples = vec![vec![(0, 1.0)]];
        assert!(MultinomialNb::fit(&samples, &[Label::Phishing], 1, 1.0).is_err());
        assert!(MultinomialNb::fit(&samples, &[], 1, 1.0).is_err());
        let two = vec![vec![(0, 1.0)], vec![(0, 1.0)]];
        let labels = [Label::Phishing, Label::Legitimate];
        assert!(MultinomialNb::fit(&two, &labels, 1, 0.0).is_err());
        assert!(MultinomialNb::fit(&[vec![(5, 1.0)], vec![]], &labels, 1, 1.0).is_err());
    }
}
