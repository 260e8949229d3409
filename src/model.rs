use std::cmp::Ordering;
use std::collections::HashSet;
use std::iter;

use crate::corpus::{NULL_WORD, ParallelCorpus, Sentence, Side, WordId};
use crate::error::Model1Error;
use crate::log_math::{LOG_ZERO, log_sum};
use crate::table::LogTable;

/// What the denominator slots `(s, 0)` of the expected-count table sum up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarginalCount {
    /// Expected counts of `s` over all targets it generated. The M-step is
    /// then the maximum-likelihood estimate and `t(. | s)` stays normalized.
    #[default]
    Posterior,
    /// The weight of every occurrence of `s` in a source sentence, and the
    /// weight of every sentence pair for NULL.
    Occurrences,
}

/// IBM Model 1 lexical translation model, trained by EM.
///
/// Holds the translation table `t(t | s)` and the expected counts of the
/// E-step in progress, both in log space. One EM iteration is
/// [`clear_expected_counts`](Self::clear_expected_counts), then
/// [`accumulate`](Self::accumulate) for every sentence pair, then
/// [`reestimate`](Self::reestimate).
#[derive(Debug, Clone, Default)]
pub struct AlignmentModel {
    source_vocab_size: usize,
    target_vocab_size: usize,
    marginal_count: MarginalCount,
    t_table: LogTable,
    expected_counts: LogTable,
}

impl AlignmentModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marginal_count(marginal_count: MarginalCount) -> Self {
        AlignmentModel {
            marginal_count,
            ..Self::default()
        }
    }

    /// Model with a given translation table, e.g. one read back from disk.
    pub(crate) fn from_parts(
        source_vocab_size: usize,
        target_vocab_size: usize,
        t_table: LogTable,
    ) -> Self {
        AlignmentModel {
            source_vocab_size,
            target_vocab_size,
            t_table,
            ..Self::default()
        }
    }

    pub fn source_vocab_size(&self) -> usize {
        self.source_vocab_size
    }

    pub fn target_vocab_size(&self) -> usize {
        self.target_vocab_size
    }

    pub fn marginal_count(&self) -> MarginalCount {
        self.marginal_count
    }

    pub fn translation_table(&self) -> &LogTable {
        &self.t_table
    }

    /// `log t(target | source)`, `None` for pairs the model cannot produce.
    pub fn translation_log_prob(&self, source: WordId, target: WordId) -> Option<f64> {
        self.t_table.entry(source, target)
    }

    /// Log expected count of the current E-step; `(s, 0)` is the denominator
    /// slot of `s`.
    pub fn expected_count(&self, source: WordId, target: WordId) -> f64 {
        self.expected_counts.get(source, target)
    }

    /// Sets up the translation table from the co-occurrences in `corpus`.
    ///
    /// NULL generates every real target word with uniform probability. A real
    /// source word generates, uniformly, every target word that appears in
    /// some document pair together with it, and nothing else.
    pub fn initialize<C: ParallelCorpus + ?Sized>(
        &mut self,
        corpus: &C,
    ) -> Result<(), Model1Error> {
        self.source_vocab_size = corpus.source_vocab_size();
        self.target_vocab_size = corpus.target_vocab_size();
        self.t_table.clear();
        self.expected_counts.clear();

        let mut targets_per_source: Vec<HashSet<WordId>> =
            vec![HashSet::new(); self.source_vocab_size];
        for i in 0..corpus.size() {
            let doc = corpus.document_pair(i);
            let source_words = distinct_words(&doc.source, Side::Source, self.source_vocab_size)?;
            let target_words = distinct_words(&doc.target, Side::Target, self.target_vocab_size)?;
            for &s in &source_words {
                targets_per_source[s as usize].extend(target_words.iter().copied());
            }
        }

        if self.target_vocab_size > 1 {
            let null_prob = (1.0 / (self.target_vocab_size - 1) as f64).ln();
            for t in 1..self.target_vocab_size {
                self.t_table.set(NULL_WORD, t as WordId, null_prob);
            }
        }

        let mut unreachable = 0usize;
        for (s, targets) in targets_per_source.iter().enumerate().skip(1) {
            if targets.is_empty() {
                unreachable += 1;
                continue;
            }
            let uniform_prob = (1.0 / targets.len() as f64).ln();
            for &t in targets {
                self.t_table.set(s as WordId, t, uniform_prob);
            }
        }

        log::info!(
            "initialized translation table: {} entries, source vocab {}, target vocab {}",
            self.t_table.len(),
            self.source_vocab_size,
            self.target_vocab_size
        );
        if unreachable > 0 {
            log::debug!("{unreachable} source words co-occur with no target word");
        }
        Ok(())
    }

    /// Log-likelihood of `target` given `source` under the current table.
    pub fn score_pair(&self, source: &[WordId], target: &[WordId]) -> Result<f64, Model1Error> {
        self.check_pair(source, target)?;
        let alignment_prob = alignment_log_prob(target.len());
        Ok(target
            .iter()
            .map(|&t| self.word_log_prob(source, t) + alignment_prob)
            .sum())
    }

    /// Resets the expected counts of every pair in the translation table and
    /// every denominator slot to zero probability.
    pub fn clear_expected_counts(&mut self) {
        self.expected_counts.clear();
        self.expected_counts.set(NULL_WORD, NULL_WORD, LOG_ZERO);
        for &(s, t) in self.t_table.keys() {
            self.expected_counts.set(s, NULL_WORD, LOG_ZERO);
            self.expected_counts.set(s, t, LOG_ZERO);
        }
    }

    /// E-step for one sentence pair, with log-domain `weight`. Returns the
    /// same log-likelihood as [`score_pair`](Self::score_pair).
    ///
    /// Under [`MarginalCount::Posterior`] every share also goes into the
    /// denominator slot of its generator. [`MarginalCount::Occurrences`]
    /// instead adds `weight` to `(s, 0)` once per source occurrence and to
    /// `(0, 0)` once per pair.
    ///
    /// A target token that no generator can produce contributes `-inf` to the
    /// result and no expected counts.
    pub fn accumulate(
        &mut self,
        source: &[WordId],
        target: &[WordId],
        weight: f64,
    ) -> Result<f64, Model1Error> {
        self.check_pair(source, target)?;

        if self.marginal_count == MarginalCount::Occurrences {
            self.expected_counts.log_add(NULL_WORD, NULL_WORD, weight);
            for &s in source {
                self.expected_counts.log_add(s, NULL_WORD, weight);
            }
        }

        let alignment_prob = alignment_log_prob(target.len());
        let mut result = 0.0;
        let mut unexplained = 0usize;
        for &t in target {
            let denominator = self.word_log_prob(source, t);
            result += denominator + alignment_prob;
            if denominator == LOG_ZERO {
                unexplained += 1;
                continue;
            }

            // each generator's share of this target token
            let null_share = self.t_table.get(NULL_WORD, t) - denominator + weight;
            self.add_count(NULL_WORD, t, null_share);
            for &s in source {
                let share = self.t_table.get(s, t) - denominator + weight;
                self.add_count(s, t, share);
            }
        }
        if unexplained > 0 {
            log::debug!("{unexplained} target tokens have zero probability under the table");
        }
        Ok(result)
    }

    /// M-step: `t(t | s) = c(s, t) / c(s)` for every pair in the table.
    ///
    /// Only meaningful after a complete E-step pass. Entries whose source
    /// received no expected count since the last
    /// [`clear_expected_counts`](Self::clear_expected_counts) end up NaN; they
    /// are reported, not repaired.
    pub fn reestimate(&mut self) {
        let counts = &self.expected_counts;
        let mut undefined = 0usize;
        for (&(s, t), log_prob) in self.t_table.iter_mut() {
            let denominator = counts.get(s, NULL_WORD);
            if denominator == LOG_ZERO {
                undefined += 1;
            }
            *log_prob = counts.get(s, t) - denominator;
        }
        if undefined > 0 {
            log::warn!("{undefined} table entries re-estimated without any expected count");
        }
    }

    /// The `n` most probable translations of `source`, best first.
    pub fn top_translations(&self, source: WordId, n: usize) -> Vec<(WordId, f64)> {
        let mut scores: Vec<(WordId, f64)> = self
            .t_table
            .iter()
            .filter(|((s, _), _)| *s == source)
            .map(|(&(_, t), &log_prob)| (t, log_prob))
            .collect();

        let by_prob = |a: &(WordId, f64), b: &(WordId, f64)| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        };
        if n < scores.len() {
            scores.select_nth_unstable_by(n, by_prob);
            scores.truncate(n);
        }
        scores.sort_by(by_prob);
        scores
    }

    /// `log(t(target | NULL) + sum_s t(target | s))`
    fn word_log_prob(&self, source: &[WordId], target: WordId) -> f64 {
        let null_prob = self.t_table.get(NULL_WORD, target);
        log_sum(iter::once(null_prob).chain(source.iter().map(|&s| self.t_table.get(s, target))))
    }

    fn add_count(&mut self, source: WordId, target: WordId, value: f64) {
        self.expected_counts.log_add(source, target, value);
        if self.marginal_count == MarginalCount::Posterior {
            self.expected_counts.log_add(source, NULL_WORD, value);
        }
    }

    fn check_pair(&self, source: &[WordId], target: &[WordId]) -> Result<(), Model1Error> {
        if target.is_empty() {
            return Err(Model1Error::EmptyTarget);
        }
        if let Some(position) = source.iter().position(|&s| s == NULL_WORD) {
            return Err(Model1Error::ReservedWord {
                side: Side::Source,
                position,
            });
        }
        for (position, &t) in target.iter().enumerate() {
            if t == NULL_WORD {
                return Err(Model1Error::ReservedWord {
                    side: Side::Target,
                    position,
                });
            }
            if t as usize >= self.target_vocab_size {
                return Err(Model1Error::OutOfVocabulary {
                    side: Side::Target,
                    word: t,
                    vocab_size: self.target_vocab_size,
                });
            }
        }
        Ok(())
    }
}

/// Uniform alignment term of a target position, normalized by target length.
#[inline]
fn alignment_log_prob(target_len: usize) -> f64 {
    (1.0 / target_len as f64).ln()
}

fn distinct_words(
    sentences: &[Sentence],
    side: Side,
    vocab_size: usize,
) -> Result<HashSet<WordId>, Model1Error> {
    let mut words = HashSet::new();
    for sentence in sentences {
        for (position, &w) in sentence.iter().enumerate() {
            if w == NULL_WORD {
                return Err(Model1Error::ReservedWord { side, position });
            }
            if w as usize >= vocab_size {
                return Err(Model1Error::OutOfVocabulary {
                    side,
                    word: w,
                    vocab_size,
                });
            }
            words.insert(w);
        }
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Corpus, DocumentPair};
    use approx::assert_abs_diff_eq;

    fn one_pair(source: Vec<WordId>, target: Vec<WordId>, vs: usize, vt: usize) -> Corpus {
        let mut corpus = Corpus::new(vs, vt);
        corpus.push(DocumentPair::from_sentences(source, target));
        corpus
    }

    #[test]
    fn uniform_initialization() {
        let mut corpus = Corpus::new(5, 6);
        corpus.push(DocumentPair::from_sentences(vec![1, 2], vec![1, 2, 3]));
        corpus.push(DocumentPair::new(
            vec![Sentence::new(vec![2]), Sentence::new(vec![2])],
            vec![Sentence::new(vec![4]), Sentence::new(vec![5])],
        ));
        let mut model = AlignmentModel::new();
        model.initialize(&corpus).unwrap();

        for t in 1..6 {
            assert_abs_diff_eq!(
                model.translation_log_prob(NULL_WORD, t).unwrap(),
                (1.0f64 / 5.0).ln(),
                epsilon = 1e-12
            );
        }
        // R(1) = {1, 2, 3}, R(2) = {1, 2, 3, 4, 5}
        for t in 1..4 {
            assert_abs_diff_eq!(
                model.translation_log_prob(1, t).unwrap(),
                (1.0f64 / 3.0).ln(),
                epsilon = 1e-12
            );
        }
        assert_eq!(model.translation_log_prob(1, 4), None);
        for t in 1..6 {
            assert_abs_diff_eq!(
                model.translation_log_prob(2, t).unwrap(),
                (1.0f64 / 5.0).ln(),
                epsilon = 1e-12
            );
        }
        assert_eq!(model.translation_log_prob(NULL_WORD, 0), None);
        assert_eq!(model.translation_table().len(), 5 + 3 + 5);
    }

    #[test]
    fn words_without_cooccurrence_get_no_entries() {
        let mut corpus = Corpus::new(4, 3);
        corpus.push(DocumentPair::from_sentences(vec![1], vec![1]));
        // 2 only appears opposite an empty document side, 3 never appears
        corpus.push(DocumentPair::new(vec![Sentence::new(vec![2])], vec![]));
        let mut model = AlignmentModel::new();
        model.initialize(&corpus).unwrap();
        assert!(model.top_translations(2, 10).is_empty());
        assert!(model.top_translations(3, 10).is_empty());
        assert_eq!(model.translation_table().len(), 2 + 1);
    }

    #[test]
    fn missing_entries_leave_scores_to_null() {
        let mut corpus = Corpus::new(4, 3);
        corpus.push(DocumentPair::from_sentences(vec![1], vec![1]));
        let mut model = AlignmentModel::new();
        model.initialize(&corpus).unwrap();
        assert!(model.top_translations(3, 10).is_empty());

        let null_prob = model.translation_log_prob(NULL_WORD, 1).unwrap();
        let score = model.score_pair(&[3], &[1]).unwrap();
        assert_abs_diff_eq!(score, null_prob + alignment_log_prob(1), epsilon = 1e-12);

        model.clear_expected_counts();
        let ll = model.accumulate(&[3], &[1], 0.0).unwrap();
        assert_eq!(ll, score);
        assert_abs_diff_eq!(model.expected_count(NULL_WORD, 1), 0.0, epsilon = 1e-12);
        assert!(!model.expected_counts.contains(3, 1));
        assert!(!model.expected_counts.contains(3, NULL_WORD));
    }

    #[test]
    fn unexplained_tokens_add_no_counts() {
        let corpus = one_pair(vec![1], vec![1], 3, 3);
        let mut model = AlignmentModel::new();
        model.initialize(&corpus).unwrap();
        model.clear_expected_counts();
        model.accumulate(&[1], &[1], 0.0).unwrap();
        model.reestimate();
        // target 2 never occurred, so nothing generates it any more
        assert_eq!(model.translation_log_prob(NULL_WORD, 2), Some(LOG_ZERO));

        model.clear_expected_counts();
        model.accumulate(&[1], &[1], 0.0).unwrap();
        let ll = model.accumulate(&[1], &[2], 0.0).unwrap();
        assert_eq!(ll, LOG_ZERO);
        assert!(!model.expected_count(NULL_WORD, NULL_WORD).is_nan());
        model.reestimate();
        assert!(model.translation_table().iter().all(|(_, lp)| !lp.is_nan()));
        assert_abs_diff_eq!(model.translation_log_prob(NULL_WORD, 1).unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(model.score_pair(&[1], &[1]).unwrap(), 2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn initialize_rejects_bad_ids() {
        let mut model = AlignmentModel::new();
        let err = model.initialize(&one_pair(vec![1, 0], vec![1], 2, 2)).unwrap_err();
        assert_eq!(
            err,
            Model1Error::ReservedWord {
                side: Side::Source,
                position: 1
            }
        );
        let err = model.initialize(&one_pair(vec![1], vec![2], 2, 2)).unwrap_err();
        assert_eq!(
            err,
            Model1Error::OutOfVocabulary {
                side: Side::Target,
                word: 2,
                vocab_size: 2
            }
        );
    }

    #[test]
    fn single_word_scenario() {
        let corpus = one_pair(vec![1], vec![1], 2, 2);
        let mut model = AlignmentModel::new();
        model.initialize(&corpus).unwrap();
        assert_eq!(model.translation_log_prob(NULL_WORD, 1), Some(0.0));
        assert_eq!(model.translation_log_prob(1, 1), Some(0.0));
        assert_abs_diff_eq!(model.score_pair(&[1], &[1]).unwrap(), 2f64.ln(), epsilon = 1e-12);

        model.clear_expected_counts();
        let ll = model.accumulate(&[1], &[1], 0.0).unwrap();
        assert_abs_diff_eq!(ll, 2f64.ln(), epsilon = 1e-12);
        model.reestimate();
        assert!(model.translation_log_prob(1, 1).unwrap() >= -1e-12);
        assert_abs_diff_eq!(model.score_pair(&[1], &[1]).unwrap(), 2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn occurrence_denominators_follow_source_counts() {
        let corpus = one_pair(vec![1], vec![1], 2, 2);
        let mut model = AlignmentModel::with_marginal_count(MarginalCount::Occurrences);
        model.initialize(&corpus).unwrap();
        model.clear_expected_counts();
        model.accumulate(&[1], &[1], 0.0).unwrap();
        assert_abs_diff_eq!(model.expected_count(NULL_WORD, NULL_WORD), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(model.expected_count(1, NULL_WORD), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(model.expected_count(1, 1), 0.5f64.ln(), epsilon = 1e-12);
        model.reestimate();
        // half the token is credited to NULL, the word occurred once
        assert_abs_diff_eq!(model.translation_log_prob(1, 1).unwrap(), 0.5f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(
            model.translation_log_prob(NULL_WORD, 1).unwrap(),
            0.5f64.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn counts_are_conserved() {
        let mut corpus = Corpus::new(4, 5);
        corpus.push(DocumentPair::from_sentences(vec![1, 2, 1, 3], vec![1, 2, 3, 4, 2]));
        let source = [1, 2, 1, 3];
        let target = [1, 2, 3, 4, 2];
        let mut model = AlignmentModel::new();
        model.initialize(&corpus).unwrap();
        model.clear_expected_counts();
        model.accumulate(&source, &target, 0.0).unwrap();

        let mut total = 0.0;
        for t in 1..5 {
            total += model.expected_count(NULL_WORD, t).exp();
            for s in 1..4 {
                total += model.expected_count(s, t).exp();
            }
        }
        assert_abs_diff_eq!(total, target.len() as f64, epsilon = 1e-9);

        // posterior denominators hold the same mass
        let marginals: f64 = (0..4).map(|s| model.expected_count(s, NULL_WORD).exp()).sum();
        assert_abs_diff_eq!(marginals, target.len() as f64, epsilon = 1e-9);
    }

    #[test]
    fn weight_scales_counts() {
        let corpus = one_pair(vec![1, 2], vec![1, 2], 3, 3);
        let mut model = AlignmentModel::new();
        model.initialize(&corpus).unwrap();
        model.clear_expected_counts();
        let weight = 3f64.ln();
        model.accumulate(&[1, 2], &[1, 2], weight).unwrap();
        let total: f64 = (0..3).map(|s| model.expected_count(s, NULL_WORD).exp()).sum();
        assert_abs_diff_eq!(total, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn score_matches_accumulate_and_has_no_side_effects() {
        let corpus = one_pair(vec![1, 2], vec![2, 1, 1], 3, 3);
        let mut model = AlignmentModel::new();
        model.initialize(&corpus).unwrap();
        let before = model.translation_table().clone();
        let score = model.score_pair(&[1, 2], &[2, 1, 1]).unwrap();
        assert_eq!(model.translation_table(), &before);

        model.clear_expected_counts();
        let ll = model.accumulate(&[1, 2], &[2, 1, 1], 0.0).unwrap();
        assert_eq!(score, ll);
    }

    #[test]
    fn clear_matches_table_keyspace() {
        let corpus = one_pair(vec![1, 2], vec![1], 4, 2);
        let mut model = AlignmentModel::new();
        model.initialize(&corpus).unwrap();
        model.clear_expected_counts();
        // (0,1) (1,1) (2,1) plus slots (0,0) (1,0) (2,0)
        assert_eq!(model.expected_counts.len(), 6);
        assert!(model.expected_counts.iter().all(|(_, &v)| v == LOG_ZERO));
        assert!(!model.expected_counts.contains(3, NULL_WORD));
    }

    #[test]
    fn invalid_pairs_fail_fast() {
        let corpus = one_pair(vec![1], vec![1], 2, 2);
        let mut model = AlignmentModel::new();
        assert!(matches!(
            model.score_pair(&[1], &[1]),
            Err(Model1Error::OutOfVocabulary { .. })
        ));
        model.initialize(&corpus).unwrap();
        assert_eq!(model.score_pair(&[1], &[]), Err(Model1Error::EmptyTarget));
        model.clear_expected_counts();
        assert_eq!(model.accumulate(&[1], &[], 0.0), Err(Model1Error::EmptyTarget));
        assert_eq!(
            model.accumulate(&[1], &[1, 0], 0.0),
            Err(Model1Error::ReservedWord {
                side: Side::Target,
                position: 1
            })
        );
    }

    #[test]
    fn top_translations_are_ranked() {
        let mut table = LogTable::new();
        table.set(1, 1, 0.2f64.ln());
        table.set(1, 2, 0.5f64.ln());
        table.set(1, 3, 0.3f64.ln());
        table.set(2, 1, 0.0);
        let model = AlignmentModel::from_parts(3, 4, table);
        let top = model.top_translations(1, 2);
        assert_eq!(top.iter().map(|&(t, _)| t).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(model.top_translations(1, 10).len(), 3);
    }
}
