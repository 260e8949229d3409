//! Random parallel corpora with a known one-to-one lexicon, to check how well
//! training recovers it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::corpus::{Corpus, DocumentPair, Sentence, WordId};

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub documents: usize,
    pub sentences_per_document: usize,
    pub max_sentence_len: usize,
    /// Real words per language; ids run `1..=vocab_size`.
    pub vocab_size: usize,
    /// Chance of inserting a random target word after each translated one.
    /// Clamped to `[0, 1]`; NaN means no noise.
    pub noise: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        SyntheticConfig {
            documents: 200,
            sentences_per_document: 3,
            max_sentence_len: 8,
            vocab_size: 50,
            noise: 0.1,
            seed: 1,
        }
    }
}

pub struct SyntheticCorpus {
    pub corpus: Corpus,
    /// `lexicon[s]` is the planted translation of source word `s`; index 0 is
    /// the NULL placeholder.
    pub lexicon: Vec<WordId>,
}

impl SyntheticCorpus {
    /// Fraction of source words whose most probable translation is the
    /// planted one. Words the model has no entries for count as misses.
    pub fn lexicon_accuracy(&self, top: impl Fn(WordId) -> Option<WordId>) -> f64 {
        let n = self.lexicon.len().saturating_sub(1);
        if n == 0 {
            return 0.0;
        }
        let correct = (1..self.lexicon.len())
            .filter(|&s| top(s as WordId) == Some(self.lexicon[s]))
            .count();
        correct as f64 / n as f64
    }
}

pub fn generate(config: &SyntheticConfig) -> SyntheticCorpus {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let vocab = config.vocab_size as WordId;
    let noise = if config.noise > 0.0 {
        config.noise.min(1.0)
    } else {
        0.0
    };

    let mut lexicon: Vec<WordId> = (1..=vocab).collect();
    lexicon.shuffle(&mut rng);
    lexicon.insert(0, 0);

    let mut corpus = Corpus::new(config.vocab_size + 1, config.vocab_size + 1);
    if vocab == 0 || config.max_sentence_len == 0 {
        return SyntheticCorpus { corpus, lexicon };
    }

    for _ in 0..config.documents {
        let mut source_sentences = Vec::with_capacity(config.sentences_per_document);
        let mut target_sentences = Vec::with_capacity(config.sentences_per_document);
        for _ in 0..config.sentences_per_document {
            let len = rng.random_range(1..=config.max_sentence_len);
            let source: Vec<WordId> = (0..len).map(|_| rng.random_range(1..=vocab)).collect();
            let mut target = Vec::with_capacity(len);
            for &s in &source {
                target.push(lexicon[s as usize]);
                if rng.random_bool(noise) {
                    target.push(rng.random_range(1..=vocab));
                }
            }
            target.shuffle(&mut rng);
            source_sentences.push(Sentence::new(source));
            target_sentences.push(Sentence::new(target));
        }
        corpus.push(DocumentPair::new(source_sentences, target_sentences));
    }
    log::debug!(
        "generated {} documents, vocab {}, seed {}",
        config.documents,
        config.vocab_size,
        config.seed
    );
    SyntheticCorpus { corpus, lexicon }
}
