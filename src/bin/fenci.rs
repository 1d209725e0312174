use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use fenci::decode::decode_input;
use fenci::segmenter::BufferPolicy;
use fenci::{DictionarySource, ModelSource, Tokenizer, TokenizerConfig};

#[derive(Parser)]
#[command(name = "fenci", about = "Chinese word segmentation")]
struct Cli {
    /// Path to the `word freq [tag]` dictionary
    #[arg(long)]
    dict: PathBuf,
    /// User dictionary applied after loading (optional)
    #[arg(long)]
    user_dict: Option<PathBuf>,
    /// HMM counts as JSON; the built-in model when omitted
    #[arg(long)]
    model: Option<PathBuf>,
    /// Emit unknown buffered characters one by one instead of using the HMM
    #[arg(long)]
    no_hmm: bool,
    /// Emit a buffer that spells a dictionary word as that word
    #[arg(long)]
    join_dictionary_buffer: bool,
    /// Snapshot cache directory (defaults to the system temp directory)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Always build from the dictionary source
    #[arg(long)]
    no_cache: bool,
    /// Write a JSON trace to this directory (needs the `trace` feature)
    #[arg(long)]
    trace_dir: Option<PathBuf>,
    /// Token delimiter
    #[arg(short = 'd', long, default_value = " / ")]
    delimiter: String,
    /// Input file; stdin when omitted
    file: Option<PathBuf>,
}

fn read_input(file: &Option<PathBuf>) -> io::Result<Vec<u8>> {
    match file {
        Some(path) => fs::read(path),
        None => {
            let mut buf = Vec::new();
            io::stdin().lock().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn build_tokenizer(cli: &Cli) -> Tokenizer {
    let mut config = TokenizerConfig::new(DictionarySource::file(&cli.dict))
        .hmm(!cli.no_hmm)
        .cache(!cli.no_cache);
    if let Some(model) = &cli.model {
        config = config.model(ModelSource::file(model));
    }
    if let Some(dir) = &cli.cache_dir {
        config = config.cache_dir(dir);
    }
    if cli.join_dictionary_buffer {
        config = config.buffer_policy(BufferPolicy::EmitDictionaryWord);
    }
    Tokenizer::new(config)
}

fn main() {
    let cli = Cli::parse();
    if let Some(dir) = &cli.trace_dir {
        fenci::trace_init::init_tracing(dir);
    }

    let bytes = read_input(&cli.file).unwrap_or_else(|e| {
        eprintln!("Failed to read input: {}", e);
        process::exit(1);
    });
    let text = decode_input(&bytes).unwrap_or_else(|e| {
        eprintln!("Failed to decode input: {}", e);
        process::exit(1);
    });

    let tokenizer = build_tokenizer(&cli);
    if let Err(e) = tokenizer.initialize() {
        eprintln!("Failed to load {}: {}", cli.dict.display(), e);
        process::exit(1);
    }
    if let Some(path) = &cli.user_dict {
        if let Err(e) = tokenizer.load_user_dict(path) {
            eprintln!("Failed to load user dictionary {}: {}", path.display(), e);
            process::exit(1);
        }
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for line in text.lines() {
        let tokens = tokenizer.lcut(line).unwrap_or_else(|e| {
            eprintln!("Segmentation failed: {}", e);
            process::exit(1);
        });
        if let Err(e) = writeln!(out, "{}", tokens.join(&cli.delimiter)) {
            eprintln!("Failed to write output: {}", e);
            process::exit(1);
        }
    }
    if let Err(e) = out.flush() {
        eprintln!("Failed to write output: {}", e);
        process::exit(1);
    }
}
