use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use topic_explorer::report;
use topic_explorer::topic_modeling::AlphaPrior;
use topic_explorer::{
    CorpusCache, DocumentTopicMatrix, ExplorerConfig, GibbsLda, KeywordCooccurrence, Result,
    Stopwords, TopicAlignment, TopicInferenceEngine,
};

#[derive(Parser, Debug)]
#[command(version, about = "Explore a topic model fitted over a CSV corpus", long_about = None)]
struct Args {
    /// CSV file with `name`, `content` and optional `year` columns
    path: PathBuf,
    #[clap(short, long, help = "JSON configuration file")]
    config: Option<PathBuf>,
    #[clap(short, long, help = "Additional stopwords, one per line")]
    stopwords: Option<PathBuf>,
    #[clap(short = 'k', long, help = "Number of topics (overrides the configuration file)")]
    topics: Option<usize>,
    #[clap(long, help = "Random seed for reproducible fits")]
    seed: Option<u64>,
    #[clap(long, value_enum, help = "Document-topic prior")]
    alpha: Option<AlphaPrior>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the corpus table
    Documents,
    /// Print the effective stopword list
    Stopwords,
    /// Print the top words of every topic
    Topics {
        #[clap(short, long, default_value_t = 5)]
        words: usize,
    },
    /// Print every document's topic weights
    DocumentTopics,
    /// Print the total weight of every topic
    Tally,
    /// Print the topic co-occurrence graph
    TopicGraph {
        #[clap(long)]
        min_weight: Option<f64>,
        #[clap(long)]
        min_edges: Option<usize>,
        #[clap(long, value_enum, default_value_t = GraphFormat::Dot)]
        format: GraphFormat,
    },
    /// Print the keyword co-occurrence graph of a topic's top document
    KeywordGraph {
        #[clap(short, long)]
        topic: usize,
        #[clap(long)]
        min_edges: Option<usize>,
        #[clap(long, value_enum, default_value_t = GraphFormat::Dot)]
        format: GraphFormat,
    },
    /// Print a topic's word weights
    WordCloud {
        #[clap(short, long)]
        topic: usize,
        #[clap(short, long, default_value_t = 10)]
        words: usize,
    },
    /// Print topic weights per year
    Trends,
    /// Print which documents contain the given keywords
    Keywords {
        #[clap(required = true)]
        words: Vec<String>,
    },
    /// Fit several models and align their topics
    Stability {
        #[clap(short, long)]
        runs: Option<usize>,
        #[clap(long)]
        chunks: Option<usize>,
        #[clap(long, help = "Also write the word lists and matches as CSV to this file")]
        table: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GraphFormat {
    Dot,
    Json,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<ExplorerConfig> {
    let mut config = match &args.config {
        Some(path) => ExplorerConfig::from_file(path)?,
        None => ExplorerConfig::default(),
    };
    if let Some(topics) = args.topics {
        config.num_topics = topics;
    }
    if let Some(seed) = args.seed {
        config.model.seed = Some(seed);
    }
    if let Some(alpha) = args.alpha {
        config.model.alpha = alpha;
    }
    match &args.command {
        Command::TopicGraph { min_weight, min_edges, .. } => {
            if let Some(min_weight) = *min_weight {
                config.topic_graph.min_weight = min_weight;
            }
            if let Some(min_edges) = *min_edges {
                config.topic_graph.min_edges = min_edges;
            }
        }
        Command::KeywordGraph { min_edges: Some(min_edges), .. } => {
            config.keyword_graph.min_edges = *min_edges;
        }
        Command::Stability { runs, chunks, .. } => {
            if let Some(runs) = *runs {
                config.stability.runs = runs;
            }
            if let Some(chunks) = *chunks {
                config.stability.chunks = chunks;
            }
        }
        _ => {}
    }
    config.validate()?;
    Ok(config)
}

fn load_stopwords(args: &Args) -> Result<Stopwords> {
    match &args.stopwords {
        Some(path) => Ok(Stopwords::english_with(&fs::read_to_string(path)?)),
        None => Ok(Stopwords::english()),
    }
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let stopwords = load_stopwords(args)?;

    log::info!("Reading corpus from {}", args.path.display());
    let source = fs::read(&args.path)?;
    let mut cache = CorpusCache::new();
    let prepared = cache.get_or_build(&source, &stopwords)?;
    let corpus = &prepared.corpus;
    let bow = &prepared.bow;
    log::info!(
        "Loaded {} documents, dictionary has {} tokens, average document length {:.1}",
        corpus.len(),
        bow.dictionary.len(),
        bow.average_document_length()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Views that need no model
    match &args.command {
        Command::Documents => return report::write_documents_csv(&mut out, corpus),
        Command::Stopwords => {
            writeln!(out, "{}", stopwords.to_text())?;
            return Ok(());
        }
        Command::Keywords { words } => {
            let (keywords, rows) = report::keyword_matches(corpus, &words.join(" "));
            return report::write_keyword_matches_csv(&mut out, &keywords, &rows);
        }
        _ => {}
    }

    if let Command::Stability { table, .. } = &args.command {
        if config.model.seed.is_some() && config.stability.runs > 1 {
            log::warn!("A fixed seed makes every stability run fit the same model");
        }
        let engine = GibbsLda::new(config.stability_model());
        let runs = config.stability.runs;
        let alignment = TopicAlignment::new(&engine, bow, config.num_topics, runs)?;
        let alignment_report = alignment.fit(|run| log::info!("Finished model {}/{}", run + 1, runs))?;
        if let Some(mean) = alignment_report.mean_stability() {
            log::info!("Mean topic stability {:.4}", mean);
        }
        if let Some(path) = table {
            report::write_alignment_csv(fs::File::create(path)?, &alignment_report)?;
        }
        report::write_json(&mut out, "stability", &alignment_report)?;
        writeln!(out)?;
        return Ok(());
    }

    let engine = GibbsLda::new(config.model.clone());
    let model = engine.fit(bow, config.num_topics)?;
    let matrix = DocumentTopicMatrix::build(bow, &model)?;

    match &args.command {
        Command::Topics { words } => {
            let topics = report::topic_keywords(&model, *words)?;
            report::write_topics_csv(&mut out, &topics)?;
        }
        Command::DocumentTopics => report::write_document_topics_csv(&mut out, corpus, &matrix)?,
        Command::Tally => report::write_tally_csv(&mut out, &matrix.column_marginals())?,
        Command::TopicGraph { format, .. } => {
            let graph = config.topic_cooccurrence()?.graph(&matrix);
            log::info!("Topic graph has {} nodes and {} edges", graph.nodes.len(), graph.edges.len());
            match format {
                GraphFormat::Dot => write!(out, "{}", graph.to_dot())?,
                GraphFormat::Json => {
                    report::write_json(&mut out, "topic-graph", &graph)?;
                    writeln!(out)?;
                }
            }
        }
        Command::KeywordGraph { topic, format, .. } => {
            let analyzer = KeywordCooccurrence::new(&stopwords, config.keyword_graph.min_edges)?;
            let graph = analyzer.graph_for_topic(corpus, &matrix, *topic)?;
            log::info!("Keyword graph has {} nodes and {} edges", graph.nodes.len(), graph.edges.len());
            match format {
                GraphFormat::Dot => write!(out, "{}", graph.to_dot())?,
                GraphFormat::Json => {
                    report::write_json(&mut out, "keyword-graph", &graph)?;
                    writeln!(out)?;
                }
            }
        }
        Command::WordCloud { topic, words } => {
            let cloud = report::word_cloud(&model, *topic, *words)?;
            report::write_json(&mut out, "word-cloud", &cloud)?;
            writeln!(out)?;
        }
        Command::Trends => {
            if let Some(trends) = report::topic_trends(corpus, &matrix)? {
                report::write_trends_csv(&mut out, &trends, matrix.num_topics())?;
            }
        }
        Command::Documents | Command::Stopwords | Command::Keywords { .. } | Command::Stability { .. } => {}
    }
    Ok(())
}
