//! # Statute Index CLI (`statute`)
//!
//! ## Usage
//!
//! ```bash
//! statute --config ./config/statute.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `statute extract <source>` | Structure a PDF/text penal code into the corpus JSON file |
//! | `statute build` | Build (or fully replace) the configured collection |
//! | `statute query "<text>"` | Return the sections most similar to a question |
//! | `statute section <number>` | Show a section by number |
//! | `statute stats` | List the collections at the index location |
//! | `statute serve` | Start the HTTP tool server |
//!
//! ## Examples
//!
//! ```bash
//! statute extract ./penal_code.pdf --out ./data/slpc.json --preview 3
//! STATUTE_INDEX_LOCATION=./data/index STATUTE_COLLECTION=slpc statute build
//! statute query "what is the punishment for theft" -k 5
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use statute_index::progress::ProgressMode;
use statute_index::{build, config, corpus, search, server, stats};

/// Statute Index: structure a penal code into sections and retrieve the
/// relevant ones by semantic search.
///
/// All commands accept `--config`; the file is optional and every index
/// setting can also come from `STATUTE_*` environment variables.
#[derive(Parser)]
#[command(
    name = "statute",
    about = "Structure a penal code into sections and retrieve the relevant ones by semantic search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/statute.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Structure a source document into the corpus JSON file.
    ///
    /// Recognizes chapter headings ("CHAPTER IV ...") and section headings
    /// ("Section 12. ...", "§ 12 ...", "12. ...") and writes one record per
    /// section with a non-empty body.
    Extract {
        /// Source document (PDF or UTF-8 text).
        source: PathBuf,

        /// Output file (defaults to `corpus.path`).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the first N sections after writing.
        #[arg(long, default_value_t = 3)]
        preview: usize,

        /// Write the file even if no sections were recognized.
        #[arg(long)]
        allow_empty: bool,
    },

    /// Build the configured collection from the corpus file.
    ///
    /// Always a full replace: the previous contents of the collection are
    /// discarded once every section has been embedded.
    Build {
        /// Corpus file (defaults to `corpus.path`).
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Sections per embedding request.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Progress on stderr: human when stderr is a TTY, otherwise off.
        #[arg(long, value_enum)]
        progress: Option<ProgressArg>,

        /// Build even if the corpus holds no sections.
        #[arg(long)]
        allow_empty: bool,
    },

    /// Query the collection.
    Query {
        /// Free-text question or description of conduct.
        text: String,

        /// Number of sections to return (defaults to `retrieval.top_k`).
        #[arg(short, long)]
        k: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show every entry with a given section number.
    Section {
        number: u32,

        #[arg(long)]
        json: bool,
    },

    /// Show collections, sizes, and embedding setup at the index location.
    Stats,

    /// Start the HTTP tool server on `[server].bind`.
    Serve,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProgressArg {
    Off,
    Human,
    Json,
}

impl From<ProgressArg> for ProgressMode {
    fn from(arg: ProgressArg) -> Self {
        match arg {
            ProgressArg::Off => ProgressMode::Off,
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Extract {
            source,
            out,
            preview,
            allow_empty,
        } => {
            corpus::run_extract(&cfg, &source, out.as_deref(), preview, allow_empty)?;
        }
        Commands::Build {
            corpus,
            batch_size,
            progress,
            allow_empty,
        } => {
            let mode = progress
                .map(ProgressMode::from)
                .unwrap_or_else(ProgressMode::default_for_tty);
            build::run_build(&cfg, corpus.as_deref(), batch_size, mode, allow_empty).await?;
        }
        Commands::Query { text, k, json } => {
            search::run_search(&cfg, &text, k, json).await?;
        }
        Commands::Section { number, json } => {
            search::run_section(&cfg, number, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
