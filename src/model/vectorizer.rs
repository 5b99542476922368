//! TF-IDF text vectorizer

use super::{FeatureVector, Vectorizer};
use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Row normalization applied after TF-IDF weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    #[default]
    L2,
    None,
}

/// Fitted TF-IDF parameters as stored in the vectorizer artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfParams {
    /// Term -> column index
    pub vocabulary: HashMap<String, usize>,
    /// Inverse document frequency per column
    pub idf: Vec<f64>,
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub norm: Norm,
}

fn default_lowercase() -> bool {
    true
}

fn default_token_pattern() -> String {
    r"(?u)\b\w\w+\b".to_string()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

pub struct TfidfVectorizer {
    params: TfidfParams,
    token_re: Regex,
}

impl std::fmt::Debug for TfidfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfidfVectorizer")
            .field("vocabulary_size", &self.params.vocabulary.len())
            .field("ngram_range", &self.params.ngram_range)
            .field("norm", &self.params.norm)
            .finish()
    }
}

impl TfidfVectorizer {
    /// Validate fitted parameters and compile the token pattern
    pub fn from_params(params: TfidfParams) -> std::result::Result<Self, String> {
        let dim = params.idf.len();
        if let Some((term, col)) = params.vocabulary.iter().find(|(_, col)| **col >= dim) {
            return Err(format!(
                "vocabulary term {:?} maps to column {} but idf has {} entries",
                term, col, dim
            ));
        }
        let (min_n, max_n) = params.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid ngram_range ({}, {})", min_n, max_n));
        }
        let token_re = Regex::new(&params.token_pattern)
            .map_err(|e| format!("invalid token_pattern: {}", e))?;

        Ok(Self { params, token_re })
    }

    pub fn dim(&self) -> usize {
        self.params.idf.len()
    }

    pub fn params(&self) -> &TfidfParams {
        &self.params
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.params.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        self.token_re
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn ngrams(&self, tokens: &[String]) -> Vec<String> {
        let (min_n, max_n) = self.params.ngram_range;
        let mut grams = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                grams.push(window.join(" "));
            }
        }
        grams
    }
}

impl Vectorizer for TfidfVectorizer {
    fn transform(&self, text: &str) -> Result<FeatureVector> {
        let tokens = self.tokenize(text);

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for gram in self.ngrams(&tokens) {
            if let Some(&col) = self.params.vocabulary.get(&gram) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let mut weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(col, tf)| {
                let tf = if self.params.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (col, tf * self.params.idf[col])
            })
            .collect();

        let norm = match self.params.norm {
            Norm::L1 => weighted.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            Norm::L2 => weighted.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
            Norm::None => 1.0,
        };
        if norm > 0.0 {
            for (_, v) in &mut weighted {
                *v /= norm;
            }
        }

        FeatureVector::from_pairs(self.dim(), weighted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(terms: &[&str]) -> TfidfParams {
        TfidfParams {
            vocabulary: terms
                .iter()
                .enumerate()
                .map(|(i, t)| (t.to_string(), i))
                .collect(),
            idf: vec![1.0; terms.len()],
            lowercase: true,
            token_pattern: default_token_pattern(),
            ngram_range: (1, 1),
            sublinear_tf: false,
            norm: Norm::L2,
        }
    }

    #[test]
    fn test_tokenize_drops_single_chars_and_lowercases() {
        let v = TfidfVectorizer::from_params(params(&["hello"])).unwrap();
        assert_eq!(v.tokenize("Hello, a World!"), vec!["hello", "world"]);
    }

    #[test]
    fn test_transform_l2_normalized() {
        let v = TfidfVectorizer::from_params(params(&["model", "text", "unused"])).unwrap();
        let features = v.transform("Model text text").unwrap();
        let dense = features.to_dense();

        assert_eq!(features.dim(), 3);
        let norm: f64 = dense.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!((dense[1] - 2.0 * dense[0]).abs() < 1e-9);
        assert_eq!(dense[2], 0.0);
    }

    #[test]
    fn test_out_of_vocabulary_text_is_zero_vector() {
        let v = TfidfVectorizer::from_params(params(&["model"])).unwrap();
        let features = v.transform("nothing known here").unwrap();
        assert_eq!(features.nnz(), 0);
        assert_eq!(features.dim(), 1);
    }

    #[test]
    fn test_bigrams_and_idf() {
        let mut p = params(&["large language", "language"]);
        p.ngram_range = (1, 2);
        p.idf = vec![2.0, 1.0];
        p.norm = Norm::None;
        let v = TfidfVectorizer::from_params(p).unwrap();

        let dense = v.transform("large language model").unwrap().to_dense();
        assert_eq!(dense, vec![2.0, 1.0]);
    }

    #[test]
    fn test_sublinear_tf() {
        let mut p = params(&["word"]);
        p.sublinear_tf = true;
        p.norm = Norm::None;
        let v = TfidfVectorizer::from_params(p).unwrap();

        let dense = v.transform("word word word").unwrap().to_dense();
        assert!((dense[0] - (1.0 + 3.0_f64.ln())).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_params() {
        let mut p = params(&["a1"]);
        p.idf.clear();
        assert!(TfidfVectorizer::from_params(p).is_err());

        let mut p = params(&["a1"]);
        p.ngram_range = (2, 1);
        assert!(TfidfVectorizer::from_params(p).is_err());

        let mut p = params(&["a1"]);
        p.token_pattern = "(".to_string();
        assert!(TfidfVectorizer::from_params(p).is_err());
    }
}
