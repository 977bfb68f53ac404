use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use spamdex::loader::{load_file, Source};
use spamdex::persist::{load_index, save_meta, save_model, save_snapshot, IndexPaths, MetaFile, FORMAT_VERSION};
use spamdex::tokenizer::tokenize;
use spamdex::{search, DocumentStore, NaiveBayes};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a searchable, spam-classified SMS index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load labeled and unlabeled messages, train the classifier and write the index
    Build {
        /// Labeled messages, one per line, prefixed by the category digit
        #[arg(long)]
        labeled: String,
        /// Unlabeled messages, one per line
        #[arg(long)]
        unlabeled: Option<String>,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Share of labeled messages used for training; the rest is held out for evaluation
        #[arg(long, default_value_t = 0.9)]
        train_fraction: f64,
        /// Seed for the train/evaluation shuffle
        #[arg(long)]
        seed: Option<u64>,
        /// Number of categories the label digit may take
        #[arg(long, default_value_t = 2)]
        categories: usize,
    },
    /// Run a single phrase query against a built index
    Search {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Query text
        #[arg(long)]
        query: String,
        /// Number of results to print
        #[arg(short, long, default_value_t = 10)]
        k: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { labeled, unlabeled, output, train_fraction, seed, categories } => {
            build_index(&labeled, unlabeled.as_deref(), &output, train_fraction, seed, categories)
        }
        Commands::Search { index, query, k } => run_query(&index, &query, k),
    }
}

fn build_index(labeled: &str, unlabeled: Option<&str>, output: &str, train_fraction: f64, seed: Option<u64>, categories: usize) -> Result<()> {
    let out_paths = IndexPaths::new(output);
    let mut store = DocumentStore::new();

    load_file(labeled, Source::Labeled, categories, &mut store).with_context(|| format!("reading {labeled}"))?;
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    // Split before unlabeled messages join the store so only labeled ids are drawn.
    let split = store.split_labeled(train_fraction, &mut rng);
    if let Some(path) = unlabeled {
        load_file(path, Source::Unlabeled, categories, &mut store).with_context(|| format!("reading {path}"))?;
    }
    tracing::info!(train = split.train.len(), test = split.test.len(), num_docs = store.len(), "corpus loaded");

    let model = NaiveBayes::train(&store.examples(&split.train), categories)?;
    let evaluation = if split.test.is_empty() {
        None
    } else {
        let matrix = model.evaluate(&store.examples(&split.test));
        tracing::info!(accuracy = matrix.accuracy().unwrap_or(0.0), "held-out evaluation\n{matrix}");
        Some(matrix)
    };
    store.classify_unlabeled(&model)?;

    let snapshot = store.into_snapshot();
    save_snapshot(&out_paths, &snapshot)?;
    save_model(&out_paths, &model)?;
    let meta = MetaFile {
        num_docs: snapshot.num_docs() as u32,
        num_keywords: snapshot.vocabulary.len() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
        evaluation,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(output, "index build complete");
    Ok(())
}

fn run_query(index: &str, query: &str, k: usize) -> Result<()> {
    let (snapshot, _model, meta) = load_index(&IndexPaths::new(index))?;
    tracing::debug!(num_docs = meta.num_docs, "index loaded");

    let words = tokenize(query);
    let start = std::time::Instant::now();
    let hits = search(&snapshot, words.as_slice());
    let elapsed = start.elapsed();

    println!("keywords: {}", words.join(" "));
    println!("{} result(s) found in {:.6}s\n", hits.len(), elapsed.as_secs_f64());
    for (rank, hit) in hits.iter().take(k).enumerate() {
        let Some(doc) = snapshot.document(hit.document_id) else { continue };
        println!("#{} (tf-idf {:.6}) {} [{}]\n{}\n", rank + 1, hit.score, doc.title, doc.label(), doc.content);
    }
    Ok(())
}
