//! IBM Model 1 word alignment, trained by Expectation-Maximization over a
//! parallel corpus.

pub mod corpus;
pub mod error;
pub mod log_math;
pub mod model;
pub mod synthetic;
pub mod table;
pub mod table_io;
pub mod trainer;

pub use corpus::{
    Corpus, DocumentPair, NULL_WORD, ParallelCorpus, Sentence, Side, WeightedPair, WordId,
    weighted_pairs,
};
pub use error::Model1Error;
pub use log_math::{LOG_ZERO, log_add};
pub use model::{AlignmentModel, MarginalCount};
pub use table_io::{Trec, read_table, write_table, write_table_text};
pub use trainer::{IterationReport, TrainConfig, corpus_log_likelihood, em_iteration, train};
