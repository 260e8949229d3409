use thiserror::Error;

use crate::corpus::{Side, WordId};

/// Precondition violations reported by the model and the trainer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Model1Error {
    #[error("target sentence is empty")]
    EmptyTarget,

    /// The NULL word is implicit; it never appears inside a sentence.
    #[error("reserved NULL word id 0 in {side} sentence at position {position}")]
    ReservedWord { side: Side, position: usize },

    #[error("{side} word {word} is outside the vocabulary of size {vocab_size}")]
    OutOfVocabulary {
        side: Side,
        word: WordId,
        vocab_size: usize,
    },

    #[error("no sentence pairs to train on")]
    NoTrainingPairs,
}
