use std::{
    fs::{self, File},
    io::BufWriter,
    path::PathBuf,
};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use srcfilter::{
    corpus::{read_corpus, read_lines, read_phrase_list, write_phrase_list},
    term_map::TermMap,
    FilterConfig, FilterIndex,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "srcfilter")]
#[command(version)]
#[command(about = "Restrict phrase extraction to the source phrases of a corpus or list", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v for debug, -vv for every restricted phrase)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a filter and report how many phrases it holds
    Build {
        #[command(flatten)]
        source: Source,

        /// Write the filtered phrases, in id order, to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Also build the prefix-tree view of the phrases
        #[arg(long)]
        trie: bool,
    },

    /// Print `keep` or `drop` for every phrase of a query file
    Shard {
        #[command(flatten)]
        source: Source,

        /// First phrase id of the shard
        #[arg(long, default_value_t = 0)]
        start: u32,

        /// End of the shard, exclusive
        #[arg(long, default_value_t = u32::MAX)]
        end: u32,

        /// Phrases to check, one per line
        #[arg(short, long, value_name = "FILE")]
        query: PathBuf,
    },

    /// Time corpus ingestion, sequential and parallel
    Bench {
        #[command(flatten)]
        source: Source,
    },
}

#[derive(Args)]
struct Source {
    /// Mine phrases from this corpus, one sentence per line
    #[arg(long, value_name = "FILE", required_unless_present = "list", conflicts_with = "list")]
    corpus: Option<PathBuf>,

    /// Take phrases from this list, one phrase per line
    #[arg(long, value_name = "FILE")]
    list: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    max_phrase_len: Option<usize>,

    /// Also mine discontinuous phrases spanning at most this many tokens
    #[arg(long)]
    max_span: Option<usize>,

    #[arg(long)]
    max_gaps: Option<usize>,

    /// Wrap corpus lines in <s> ... </s>
    #[arg(long)]
    boundary_markers: bool,

    /// Search corpus lines on all cores
    #[arg(long)]
    parallel: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    filter: FilterConfig,
    parallel: bool,
}

impl Source {
    /// Config file first, flags on top.
    fn settings(&self) -> anyhow::Result<(FilterConfig, bool)> {
        let file: ConfigFile = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
            }
            None => ConfigFile::default(),
        };

        let mut config = file.filter;
        if let Some(max_phrase_len) = self.max_phrase_len {
            config.max_phrase_len = max_phrase_len;
        }
        if self.max_span.is_some() {
            config.max_span = self.max_span;
        }
        if let Some(max_gaps) = self.max_gaps {
            config.max_gaps = max_gaps;
        }
        config.add_boundary_markers |= self.boundary_markers;
        config.validate()?;

        Ok((config, file.parallel || self.parallel))
    }

    fn load(&self) -> anyhow::Result<(FilterIndex, TermMap)> {
        let (config, parallel) = self.settings()?;
        let mut terms = TermMap::default();
        let mut filter = FilterIndex::new();

        if let Some(list) = &self.list {
            info!(list = %list.display(), "filtering against list");
            let phrases = read_phrase_list(list, &mut terms)
                .with_context(|| format!("reading phrase list {}", list.display()))?;
            filter.ingest_list(&phrases);
        } else if let Some(corpus) = &self.corpus {
            info!(corpus = %corpus.display(), max_span = ?config.max_span, "filtering against corpus");
            let lines = read_corpus(corpus, &mut terms)
                .with_context(|| format!("reading corpus {}", corpus.display()))?;

            if config.add_boundary_markers {
                filter.set_boundary_markers(terms.boundaries());
            }

            if parallel {
                filter.ingest_corpus_parallel(&lines, &config)?;
            } else {
                filter.ingest_corpus(&lines, &config)?;
            }
        }

        Ok((filter, terms))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build {
            source,
            output,
            trie,
        } => {
            let (mut filter, terms) = source.load()?;
            println!("phrases\t{}", filter.len());

            if trie {
                let trie = filter.finalize_trie()?;
                println!("trie nodes\t{}", trie.node_count());
            }

            if let Some(path) = output {
                let out = BufWriter::new(
                    File::create(&path).with_context(|| format!("creating {}", path.display()))?,
                );
                write_phrase_list(out, filter.source_table(), &terms)?;
                info!(path = %path.display(), "phrase list written");
            }
        }
        Commands::Shard {
            source,
            start,
            end,
            query,
        } => {
            let (mut filter, terms) = source.load()?;
            filter.set_range(start, end)?;

            for line in read_lines(&query).with_context(|| format!("reading {}", query.display()))? {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }

                // a phrase with unseen terms cannot be in a non-empty filter
                let keep = match terms.lookup_phrase(&line) {
                    Some(phrase) => filter.allows(&phrase),
                    None => !filter.is_enabled(),
                };
                println!("{}\t{}", if keep { "keep" } else { "drop" }, line.trim());
            }
        }
        Commands::Bench { source } => {
            let Some(corpus) = &source.corpus else {
                bail!("bench needs --corpus");
            };
            let (config, _) = source.settings()?;
            let lines = read_corpus(corpus, &mut TermMap::default())?;

            println!(
                "ingest: {}",
                easybench::bench(|| FilterIndex::new().ingest_corpus(&lines, &config))
            );
            println!(
                "ingest (parallel): {}",
                easybench::bench(|| FilterIndex::new().ingest_corpus_parallel(&lines, &config))
            );
        }
    }

    Ok(())
}
