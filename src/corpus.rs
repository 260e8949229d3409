use std::fmt;
use std::ops::Deref;

/// Index into a fixed vocabulary. 0 is the NULL source word.
pub type WordId = u32;

pub const NULL_WORD: WordId = 0;

/// Which half of a sentence pair a word belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    pub tokens: Vec<WordId>,
}

impl Sentence {
    pub fn new(tokens: Vec<WordId>) -> Self {
        Sentence { tokens }
    }
}

impl Deref for Sentence {
    type Target = [WordId];

    fn deref(&self) -> &[WordId] {
        &self.tokens
    }
}

impl From<Vec<WordId>> for Sentence {
    fn from(tokens: Vec<WordId>) -> Self {
        Sentence { tokens }
    }
}

impl From<&[WordId]> for Sentence {
    fn from(tokens: &[WordId]) -> Self {
        Sentence {
            tokens: tokens.to_vec(),
        }
    }
}

/// A document and its translation, each a sequence of sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPair {
    pub source: Vec<Sentence>,
    pub target: Vec<Sentence>,
}

impl DocumentPair {
    pub fn new(source: Vec<Sentence>, target: Vec<Sentence>) -> Self {
        DocumentPair { source, target }
    }

    /// Single-sentence document, the usual shape of a sentence-aligned corpus.
    pub fn from_sentences(source: Vec<WordId>, target: Vec<WordId>) -> Self {
        DocumentPair {
            source: vec![Sentence::from(source)],
            target: vec![Sentence::from(target)],
        }
    }
}

/// Read-only view of a parallel corpus. Vocabulary sizes count the NULL slot,
/// so real words are `1..size`.
pub trait ParallelCorpus {
    fn size(&self) -> usize;
    fn source_vocab_size(&self) -> usize;
    fn target_vocab_size(&self) -> usize;
    fn document_pair(&self, i: usize) -> &DocumentPair;
}

/// In-memory parallel corpus.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    source_vocab_size: usize,
    target_vocab_size: usize,
    documents: Vec<DocumentPair>,
}

impl Corpus {
    pub fn new(source_vocab_size: usize, target_vocab_size: usize) -> Self {
        Corpus {
            source_vocab_size,
            target_vocab_size,
            documents: Vec::new(),
        }
    }

    pub fn push(&mut self, doc: DocumentPair) {
        self.documents.push(doc);
    }

    pub fn documents(&self) -> &[DocumentPair] {
        &self.documents
    }
}

impl ParallelCorpus for Corpus {
    fn size(&self) -> usize {
        self.documents.len()
    }

    fn source_vocab_size(&self) -> usize {
        self.source_vocab_size
    }

    fn target_vocab_size(&self) -> usize {
        self.target_vocab_size
    }

    fn document_pair(&self, i: usize) -> &DocumentPair {
        &self.documents[i]
    }
}

/// A sentence pair with its log-domain weight (0.0 = counted once).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPair<'a> {
    pub source: &'a [WordId],
    pub target: &'a [WordId],
    pub weight: f64,
}

impl<'a> WeightedPair<'a> {
    pub fn new(source: &'a [WordId], target: &'a [WordId]) -> Self {
        WeightedPair {
            source,
            target,
            weight: 0.0,
        }
    }
}

/// Training pairs of a corpus: the i-th source sentence of each document with
/// its i-th target sentence, unweighted. Pairs with an empty target are
/// skipped since they cannot be scored.
pub fn weighted_pairs<C: ParallelCorpus + ?Sized>(corpus: &C) -> Vec<WeightedPair<'_>> {
    let mut pairs = Vec::new();
    let mut skipped = 0usize;
    for i in 0..corpus.size() {
        let doc = corpus.document_pair(i);
        if doc.source.len() != doc.target.len() {
            log::warn!(
                "document {i}: {} source vs {} target sentences, pairing the first {}",
                doc.source.len(),
                doc.target.len(),
                doc.source.len().min(doc.target.len())
            );
        }
        for (source, target) in doc.source.iter().zip(&doc.target) {
            if target.is_empty() {
                skipped += 1;
                continue;
            }
            pairs.push(WeightedPair::new(source, target));
        }
    }
    if skipped > 0 {
        log::warn!("skipped {skipped} sentence pairs with an empty target");
    }
    log::debug!("{} training pairs from {} documents", pairs.len(), corpus.size());
    pairs
}
