// Shared test fixtures: a deterministic character-level encoder.
//
// Every character is one token. A token's hidden state is a fixed vector
// derived from its code point plus a small share of the sequence mean, so
// the same word reads slightly differently in different contexts.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use framelens::corpus::Document;
use framelens::oracle::{EmbeddingOracle, EncodedSequence};

pub const DIM: usize = 4;
const SPECIAL_ROW: [f64; DIM] = [9.0, 9.0, 9.0, 9.0];

pub fn char_vector(c: char) -> Vec<f64> {
    let n = c as u32;
    vec![
        ((n % 7) + 1) as f64,
        ((n % 11) + 1) as f64,
        ((n % 13) + 1) as f64,
        ((n % 5) + 1) as f64,
    ]
}

pub struct CharOracle {
    pub max_seq_len: usize,
    pub max_batch: usize,
    pub fail: bool,
    /// Words whose tokenization comes back empty.
    pub silent_words: Vec<String>,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl CharOracle {
    pub fn new() -> Self {
        Self {
            max_seq_len: 512,
            max_batch: usize::MAX,
            fail: false,
            silent_words: Vec::new(),
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_max_seq_len(mut self, len: usize) -> Self {
        self.max_seq_len = len;
        self
    }

    pub fn with_max_batch(mut self, n: usize) -> Self {
        self.max_batch = n;
        self
    }

    pub fn with_silent_word(mut self, word: &str) -> Self {
        self.silent_words.push(word.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    fn encode_one(&self, text: &str) -> EncodedSequence {
        let content: Vec<char> = text.chars().take(self.max_seq_len.saturating_sub(2)).collect();

        let rows: Vec<Vec<f64>> = content.iter().map(|&c| char_vector(c)).collect();
        let mut mean = vec![0.0; DIM];
        for row in &rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x / rows.len() as f64;
            }
        }

        let mut tokens = vec!["[CLS]".to_string()];
        let mut special_mask = vec![true];
        let mut hidden_states = vec![SPECIAL_ROW.to_vec()];

        for (c, row) in content.iter().zip(rows) {
            tokens.push(c.to_string());
            special_mask.push(false);
            hidden_states.push(row.iter().zip(&mean).map(|(x, m)| x + 0.1 * m).collect());
        }

        tokens.push("[SEP]".to_string());
        special_mask.push(true);
        hidden_states.push(SPECIAL_ROW.to_vec());

        EncodedSequence {
            tokens,
            special_mask,
            hidden_states,
        }
    }
}

#[async_trait]
impl EmbeddingOracle for CharOracle {
    async fn encode(&self, texts: &[String]) -> Result<Vec<EncodedSequence>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(texts.len());
        if self.fail {
            anyhow::bail!("encoder unavailable");
        }
        if texts.len() > self.max_batch {
            anyhow::bail!("batch of {} exceeds limit {}", texts.len(), self.max_batch);
        }
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }

    fn tokenize(&self, word: &str) -> Result<Vec<String>> {
        if self.silent_words.iter().any(|w| w == word) {
            return Ok(Vec::new());
        }
        Ok(word.chars().map(|c| c.to_string()).collect())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }
}

pub fn doc(id: &str, text: &str) -> Document {
    Document::new(id, text)
}
