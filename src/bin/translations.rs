use anyhow::Context;
use clap::Parser;
use ibm_model1::{WordId, read_table};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Print the most probable translations of source words from a saved table.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Binary translation table written by `model1`
    #[arg(long, default_value = "model1.bin")]
    table: PathBuf,

    /// Number of translations to list per source word
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Source word ids; 0 lists what NULL generates
    #[arg(value_name = "SOURCE", required = true)]
    sources: Vec<WordId>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut reader = BufReader::new(
        File::open(&args.table).with_context(|| format!("opening {}", args.table.display()))?,
    );
    let model = read_table(&mut reader)
        .with_context(|| format!("reading {}", args.table.display()))?;
    log::info!(
        "loaded {} entries, vocab {}/{}",
        model.translation_table().len(),
        model.source_vocab_size(),
        model.target_vocab_size()
    );

    for &source in &args.sources {
        let topn = model.top_translations(source, args.top);
        if topn.is_empty() {
            println!("\nSource word {source} has no translations");
            continue;
        }
        println!("\nTranslations of source word {source}:");
        println!("{:>4} {:>8} {:>10}", "Rank", "Target", "Prob");
        println!("{}", "-".repeat(25));
        for (i, (target, log_prob)) in topn.iter().enumerate() {
            println!("{:4}: {:>8} {:10.6}", i + 1, target, log_prob.exp());
        }
    }

    Ok(())
}
