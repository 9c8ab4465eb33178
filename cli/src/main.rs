use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use search_cli::{build_server, load_documents, LogDuration};
use search_core::{paginate, remove_duplicates, DocId, DocumentStatus, Execution, RequestQueue, SearchServer};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "search-cli")]
#[command(about = "Query an in-memory TF-IDF document index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct CorpusArgs {
    /// Input path (JSON/JSONL file or directory)
    #[arg(long, env = "SEARCH_INPUT")]
    input: PathBuf,
    /// Space-separated stop words
    #[arg(long, env = "SEARCH_STOP_WORDS", default_value = "")]
    stop_words: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Actual,
    Irrelevant,
    Banned,
    Removed,
}

impl From<StatusArg> for DocumentStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Actual => DocumentStatus::Actual,
            StatusArg::Irrelevant => DocumentStatus::Irrelevant,
            StatusArg::Banned => DocumentStatus::Banned,
            StatusArg::Removed => DocumentStatus::Removed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or more queries and print the ranked results
    Query {
        #[command(flatten)]
        corpus: CorpusArgs,
        /// Only return documents with this status
        #[arg(long, value_enum, default_value_t = StatusArg::Actual)]
        status: StatusArg,
        /// Score query words on the rayon thread pool
        #[arg(long, default_value_t = false)]
        parallel: bool,
        /// Results per printed page
        #[arg(long, default_value_t = 2)]
        page_size: usize,
        /// Print results as JSON instead of pages
        #[arg(long, default_value_t = false)]
        json: bool,
        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Show which query words a document matches
    Match {
        #[command(flatten)]
        corpus: CorpusArgs,
        #[arg(long)]
        id: DocId,
        query: String,
    },
    /// Remove documents with identical word sets
    Dedup {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Feed a day of requests through a request queue over a built-in corpus
    Demo,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Query { corpus, status, parallel, page_size, json, queries } => {
            let server = load(&corpus)?;
            let execution = if parallel { Execution::Parallel } else { Execution::Sequential };
            let status = DocumentStatus::from(status);
            for query in &queries {
                let _timer = LogDuration::new(format!("query {query:?}"));
                let docs = server
                    .find_top_documents_with(execution, query, |_, s, _| s == status)
                    .with_context(|| format!("query {query:?}"))?;
                if json {
                    println!("{}", serde_json::to_string(&serde_json::json!({ "query": query, "results": docs }))?);
                    continue;
                }
                println!("Results for {query:?}:");
                for page in &paginate(&docs, page_size)? {
                    println!("{page}");
                    println!("Page break");
                }
            }
        }
        Commands::Match { corpus, id, query } => {
            let server = load(&corpus)?;
            let (words, status) = server.match_document(&query, id)?;
            println!("{{ document_id = {id}, status = {status:?}, words = {} }}", words.join(" "));
        }
        Commands::Dedup { corpus } => {
            let mut server = load(&corpus)?;
            let removed = remove_duplicates(&mut server);
            for id in &removed {
                println!("Found duplicate document id {id}");
            }
            println!("Documents remaining: {}", server.document_count());
        }
        Commands::Demo => demo()?,
    }
    Ok(())
}

fn load(corpus: &CorpusArgs) -> Result<SearchServer> {
    let _timer = LogDuration::new("load corpus");
    let docs = load_documents(&corpus.input)?;
    build_server(&corpus.stop_words, &docs)
}

fn demo() -> Result<()> {
    let mut server = SearchServer::from_stop_words_text("and in at")?;
    server.add_document(1, "curly cat curly tail", DocumentStatus::Actual, &[7, 2, 7])?;
    server.add_document(2, "curly dog and fancy collar", DocumentStatus::Actual, &[1, 2, 3])?;
    server.add_document(3, "big cat fancy collar ", DocumentStatus::Actual, &[1, 2, 8])?;
    server.add_document(4, "big dog sparrow Eugene", DocumentStatus::Actual, &[1, 3, 2])?;
    server.add_document(5, "big dog sparrow Vasiliy", DocumentStatus::Actual, &[1, 1, 1])?;

    let mut queue = RequestQueue::new(&server);
    for _ in 0..1439 {
        queue.add_find_request("empty request")?;
    }
    queue.add_find_request("curly dog")?;
    queue.add_find_request("big collar")?;
    queue.add_find_request("sparrow")?;
    println!("Total empty requests: {}", queue.no_result_requests());
    Ok(())
}
