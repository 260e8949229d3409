use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use ibm_model1::synthetic::{self, SyntheticConfig};
use ibm_model1::{
    AlignmentModel, MarginalCount, TrainConfig, corpus_log_likelihood, train, weighted_pairs,
    write_table, write_table_text,
};
use log::LevelFilter;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Marginals {
    Posterior,
    Occurrences,
}

impl From<Marginals> for MarginalCount {
    fn from(m: Marginals) -> Self {
        match m {
            Marginals::Posterior => MarginalCount::Posterior,
            Marginals::Occurrences => MarginalCount::Occurrences,
        }
    }
}

/// Train IBM Model 1 on a synthetic parallel corpus with a planted lexicon.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser, default_value_t = 1, help = "0: warn, 1: info, 2: debug, 3: trace")]
    verbose: i32,
    #[clap(long, value_parser, default_value_t = 10)]
    iter: usize,
    #[clap(long, value_parser, default_value_t = 0.0)]
    tolerance: f64,
    #[clap(long, value_enum, default_value = "posterior")]
    marginals: Marginals,
    #[clap(long, value_parser, default_value_t = 500)]
    documents: usize,
    #[clap(long, value_parser, default_value_t = 3)]
    sentences: usize,
    #[clap(long, value_parser, default_value_t = 10)]
    max_len: usize,
    #[clap(long, value_parser, default_value_t = 100)]
    vocab_size: usize,
    #[clap(long, value_parser, default_value_t = 0.1)]
    noise: f64,
    #[clap(long, value_parser, default_value_t = 1)]
    seed: u64,
    #[clap(long, value_parser)]
    save_file: Option<PathBuf>,
    #[clap(
        long,
        value_parser,
        default_value_t = 2,
        help = "0: text, 1: binary, 2: both"
    )]
    binary: i32,
}

/// Configuration parameters, built from command-line arguments.
#[derive(Debug, Clone)]
struct Config {
    corpus: SyntheticConfig,
    train: TrainConfig,
    marginal_count: MarginalCount,
    save_file: Option<PathBuf>,
    use_binary: i32,
}

fn run(config: &Config) -> anyhow::Result<()> {
    let synth = synthetic::generate(&config.corpus);
    let pairs = weighted_pairs(&synth.corpus);

    let mut model = AlignmentModel::with_marginal_count(config.marginal_count);
    model
        .initialize(&synth.corpus)
        .context("initializing translation table")?;

    let reports = train(&mut model, &pairs, &config.train).context("training")?;
    let final_ll = corpus_log_likelihood(&model, &pairs)?;
    if let (Some(first), Some(last)) = (reports.first(), reports.last()) {
        log::info!(
            "log-likelihood {:.4} -> {:.4} after {} iterations",
            first.log_likelihood,
            final_ll,
            last.iteration
        );
    }

    let accuracy = synth.lexicon_accuracy(|s| model.top_translations(s, 1).first().map(|&(t, _)| t));
    println!(
        "planted lexicon recovered for {:.2}% of {} source words",
        100.0 * accuracy,
        config.corpus.vocab_size
    );

    if let Some(save_file) = &config.save_file {
        save_model(&model, save_file, config.use_binary)?;
    }
    Ok(())
}

fn save_model(model: &AlignmentModel, save_file: &Path, use_binary: i32) -> anyhow::Result<()> {
    if use_binary > 0 {
        let bin_filename = save_file.with_extension("bin");
        log::info!("saving translation table to {}", bin_filename.display());
        let mut f_out = BufWriter::new(
            File::create(&bin_filename)
                .with_context(|| format!("creating {}", bin_filename.display()))?,
        );
        write_table(&mut f_out, model)?;
    }
    if use_binary != 1 {
        let txt_filename = save_file.with_extension("txt");
        log::info!("saving translation table to {}", txt_filename.display());
        let mut f_out = BufWriter::new(
            File::create(&txt_filename)
                .with_context(|| format!("creating {}", txt_filename.display()))?,
        );
        write_table_text(&mut f_out, model)?;
    }
    Ok(())
}

fn level_filter(verbose: i32) -> LevelFilter {
    match verbose {
        i32::MIN..=0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_default_env()
        .filter_level(level_filter(cli.verbose))
        .init();

    if !(0.0..=1.0).contains(&cli.noise) {
        bail!("--noise must be within [0, 1], got {}", cli.noise);
    }

    let config = Config {
        corpus: SyntheticConfig {
            documents: cli.documents,
            sentences_per_document: cli.sentences,
            max_sentence_len: cli.max_len,
            vocab_size: cli.vocab_size,
            noise: cli.noise,
            seed: cli.seed,
        },
        train: TrainConfig {
            iterations: cli.iter,
            tolerance: cli.tolerance,
        },
        marginal_count: cli.marginals.into(),
        save_file: cli.save_file,
        use_binary: cli.binary,
    };

    run(&config)
}
