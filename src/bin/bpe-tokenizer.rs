//! CLI entry point: trains a vocabulary from a corpus, or encodes/decodes
//! text against a trained one. I/O glue over [`bpe_tokenizer`]; carries no
//! tokenization semantics of its own.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bpe_tokenizer::{persist, train, BpeTokenizer, TrainerConfig};

#[derive(Parser)]
#[command(name = "bpe-tokenizer", about = "Train and run a GPT-2-family BPE tokenizer")]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all logging output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a vocabulary and merge list from a raw UTF-8 corpus.
    Train {
        #[arg(long)]
        input: PathBuf,
        #[arg(long = "vocab-size")]
        vocab_size: usize,
        #[arg(long = "special-token")]
        special_tokens: Vec<String>,
        #[arg(long)]
        vocab: PathBuf,
        #[arg(long)]
        merges: PathBuf,
    },
    /// Encode text into token ids using a trained vocabulary.
    Encode {
        #[arg(long)]
        vocab: PathBuf,
        #[arg(long)]
        merges: PathBuf,
        #[arg(long = "special-token")]
        special_tokens: Vec<String>,
        text: String,
    },
    /// Decode token ids back into text using a trained vocabulary.
    Decode {
        #[arg(long)]
        vocab: PathBuf,
        #[arg(long)]
        merges: PathBuf,
        #[arg(long = "special-token")]
        special_tokens: Vec<String>,
        ids: Vec<u32>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    install_logging(&cli);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn install_logging(cli: &Cli) {
    if cli.quiet {
        return;
    }
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Train { input, vocab_size, special_tokens, vocab, merges } => {
            let config = TrainerConfig::new(vocab_size).with_special_tokens(special_tokens);
            let model = train(&input, &config)?;
            persist::save_vocab(&model.vocab, &vocab)?;
            persist::save_merges(&model.merges, &merges)?;
            println!("trained {} tokens ({} merges)", model.vocab.len(), model.merges.len());
        }
        Command::Encode { vocab, merges, special_tokens, text } => {
            let tokenizer = BpeTokenizer::from_files(vocab, merges, &special_tokens)?;
            let ids = tokenizer.encode(&text);
            let rendered: Vec<String> = ids.iter().map(u32::to_string).collect();
            println!("{}", rendered.join(" "));
        }
        Command::Decode { vocab, merges, special_tokens, ids } => {
            let tokenizer = BpeTokenizer::from_files(vocab, merges, &special_tokens)?;
            println!("{}", tokenizer.decode(&ids)?);
        }
    }
    Ok(())
}
