//! Multinomial Naive Bayes with add-one smoothing.
//!
//! Word counts are gathered with a rayon fold/reduce over the training set;
//! priors and smoothed probabilities are derived only after the reduction.
//! Prediction sums natural logs so long messages do not underflow.

use crate::error::{Error, Result};
use crate::index::Category;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayes {
    n_categories: usize,
    category_priors: Vec<f64>,
    conditional_word_probability: HashMap<String, Vec<f64>>,
    fallback_probability: Vec<f64>,
}

/// Partial counts produced by one rayon worker.
struct Counts<'a> {
    documents: Vec<usize>,
    tokens: Vec<usize>,
    words: HashMap<&'a str, Vec<usize>>,
}

impl<'a> Counts<'a> {
    fn new(n_categories: usize) -> Self {
        Self { documents: vec![0; n_categories], tokens: vec![0; n_categories], words: HashMap::new() }
    }

    fn add(mut self, tokens: &'a [String], category: Category) -> Self {
        let n_categories = self.documents.len();
        self.documents[category] += 1;
        self.tokens[category] += tokens.len();
        for word in tokens {
            self.words.entry(word.as_str()).or_insert_with(|| vec![0; n_categories])[category] += 1;
        }
        self
    }

    fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.documents.iter_mut().zip(&other.documents) { *a += b; }
        for (a, b) in self.tokens.iter_mut().zip(&other.tokens) { *a += b; }
        for (word, counts) in other.words {
            match self.words.get_mut(word) {
                Some(mine) => {
                    for (a, b) in mine.iter_mut().zip(&counts) { *a += b; }
                }
                None => {
                    self.words.insert(word, counts);
                }
            }
        }
        self
    }
}

impl NaiveBayes {
    /// Trains on `(tokens, category)` pairs.
    pub fn train(labeled_documents: &[(&[String], Category)], n_categories: usize) -> Result<Self> {
        if n_categories == 0 {
            return Err(Error::NoCategories);
        }
        if labeled_documents.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }
        if let Some(&(_, category)) = labeled_documents.iter().find(|(_, c)| *c >= n_categories) {
            return Err(Error::CategoryOutOfRange { category, n_categories });
        }

        let counts = labeled_documents
            .par_iter()
            .fold(|| Counts::new(n_categories), |acc, &(tokens, category)| acc.add(tokens, category))
            .reduce(|| Counts::new(n_categories), Counts::merge);

        let total = labeled_documents.len() as f64;
        let category_priors: Vec<f64> = counts.documents.iter().map(|&c| c as f64 / total).collect();

        let vocabulary_size = counts.words.len();
        let denominators: Vec<f64> = counts.tokens.iter().map(|&t| (t + vocabulary_size) as f64).collect();

        let conditional_word_probability = counts
            .words
            .into_iter()
            .map(|(word, per_category)| {
                let probs = per_category.iter().zip(&denominators).map(|(&c, d)| (c + 1) as f64 / d).collect();
                (word.to_string(), probs)
            })
            .collect();
        let fallback_probability = denominators.iter().map(|d| 1.0 / d).collect();

        tracing::info!(documents = labeled_documents.len(), vocabulary_size, n_categories, "classifier trained");
        Ok(Self { n_categories, category_priors, conditional_word_probability, fallback_probability })
    }

    pub fn n_categories(&self) -> usize { self.n_categories }

    pub fn category_priors(&self) -> &[f64] { &self.category_priors }

    pub fn fallback_probability(&self) -> &[f64] { &self.fallback_probability }

    /// Smoothed `P(word | category)` for each category, or `None` for words never seen in training.
    pub fn word_probability(&self, word: &str) -> Option<&[f64]> {
        self.conditional_word_probability.get(word).map(Vec::as_slice)
    }

    pub fn vocabulary_size(&self) -> usize { self.conditional_word_probability.len() }

    /// Accumulated log score of `tokens` under each category.
    pub fn log_scores<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<f64> {
        (0..self.n_categories)
            .map(|i| {
                tokens.iter().fold(self.category_priors[i].ln(), |score, token| {
                    let p = match self.word_probability(token.as_ref()) {
                        Some(probs) => probs[i],
                        None => self.fallback_probability[i],
                    };
                    score + p.ln()
                })
            })
            .collect()
    }

    /// Most likely category for `tokens`; ties go to the lowest index.
    pub fn predict<S: AsRef<str>>(&self, tokens: &[S]) -> Category {
        let mut best: Option<(Category, f64)> = None;
        for (category, score) in self.log_scores(tokens).into_iter().enumerate() {
            if best.map_or(true, |(_, max)| score > max) {
                best = Some((category, score));
            }
        }
        best.map_or(0, |(category, _)| category)
    }

    /// Predicts every held-out document and tallies the outcome.
    pub fn evaluate(&self, held_out: &[(&[String], Category)]) -> ConfusionMatrix {
        let mut matrix = ConfusionMatrix::new(self.n_categories);
        for &(tokens, actual) in held_out {
            matrix.record(actual, self.predict(tokens));
        }
        matrix
    }
}

/// `counts[actual][predicted]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn new(n_categories: usize) -> Self {
        Self { counts: vec![vec![0; n_categories]; n_categories] }
    }

    pub fn record(&mut self, actual: Category, predicted: Category) {
        if let Some(cell) = self.counts.get_mut(actual).and_then(|row| row.get_mut(predicted)) {
            *cell += 1;
        }
    }

    pub fn total(&self) -> u64 { self.counts.iter().flatten().sum() }

    pub fn correct(&self) -> u64 { (0..self.counts.len()).map(|i| self.counts[i][i]).sum() }

    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.correct() as f64 / total as f64)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>12}", "")?;
        for p in 0..self.counts.len() {
            write!(f, "{:>12}", format!("predicted {p}"))?;
        }
        for (actual, row) in self.counts.iter().enumerate() {
            write!(f, "\n{:>12}", format!("actual {actual}"))?;
            for count in row {
                write!(f, "{count:>12}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> { text.split_whitespace().map(String::from).collect() }

    #[test]
    fn smoothing_uses_global_vocabulary() {
        let spam = words("buy buy cheap");
        let ham = words("team meeting");
        let model = NaiveBayes::train(&[(spam.as_slice(), 1), (ham.as_slice(), 0)], 2).unwrap();
        // |V| = 4; ham has 2 tokens, spam has 3.
        assert_eq!(model.vocabulary_size(), 4);
        assert_eq!(model.word_probability("buy").unwrap(), &[1.0 / 6.0, 3.0 / 7.0]);
        assert_eq!(model.word_probability("team").unwrap(), &[2.0 / 6.0, 1.0 / 7.0]);
        assert_eq!(model.fallback_probability(), &[1.0 / 6.0, 1.0 / 7.0]);
        assert_eq!(model.category_priors(), &[0.5, 0.5]);
        assert!(model.word_probability("missing").is_none());
    }

    #[test]
    fn rejects_bad_training_input() {
        assert!(matches!(NaiveBayes::train(&[], 2), Err(Error::EmptyTrainingSet)));
        let t = words("x");
        assert!(matches!(NaiveBayes::train(&[(t.as_slice(), 0)], 0), Err(Error::NoCategories)));
        assert!(matches!(
            NaiveBayes::train(&[(t.as_slice(), 2)], 2),
            Err(Error::CategoryOutOfRange { category: 2, n_categories: 2 })
        ));
    }

    #[test]
    fn log_scores_match_closed_form() {
        let spam = words("win cash");
        let ham = words("lunch");
        let model = NaiveBayes::train(&[(spam.as_slice(), 1), (ham.as_slice(), 0)], 2).unwrap();
        let scores = model.log_scores(&["cash", "unseen"]);
        // ham: 1 token, spam: 2 tokens, |V| = 3
        let ham = 0.5f64.ln() + (1.0f64 / 4.0).ln() + (1.0f64 / 4.0).ln();
        let spam = 0.5f64.ln() + (2.0f64 / 5.0).ln() + (1.0f64 / 5.0).ln();
        assert!((scores[0] - ham).abs() < 1e-12);
        assert!((scores[1] - spam).abs() < 1e-12);
    }

    #[test]
    fn long_inputs_do_not_underflow() {
        let spam = words("prize prize claim");
        let ham = words("see you later");
        let model = NaiveBayes::train(&[(spam.as_slice(), 1), (ham.as_slice(), 0)], 2).unwrap();
        let long: Vec<&str> = std::iter::repeat("prize").take(5000).collect();
        let scores = model.log_scores(long.as_slice());
        assert!(scores.iter().all(|s| s.is_finite()));
        assert_eq!(model.predict(long.as_slice()), 1);
    }

    #[test]
    fn missing_category_never_wins() {
        let t = words("hello");
        let model = NaiveBayes::train(&[(t.as_slice(), 1)], 3).unwrap();
        assert_eq!(model.category_priors(), &[0.0, 1.0, 0.0]);
        assert_eq!(model.predict(&["anything"]), 1);
    }

    #[test]
    fn confusion_matrix_counts() {
        let spam = words("free entry prize");
        let ham = words("call mum tonight");
        let model = NaiveBayes::train(&[(spam.as_slice(), 1), (ham.as_slice(), 0)], 2).unwrap();
        let a = words("free prize");
        let b = words("mum tonight");
        let c = words("prize");
        let matrix = model.evaluate(&[(a.as_slice(), 1), (b.as_slice(), 0), (c.as_slice(), 0)]);
        assert_eq!(matrix.counts, vec![vec![1, 1], vec![0, 1]]);
        assert_eq!(matrix.total(), 3);
        assert_eq!(matrix.correct(), 2);
        assert!((matrix.accuracy().unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(ConfusionMatrix::new(2).accuracy(), None);
        assert!(matrix.to_string().contains("actual 1"));
    }
}
