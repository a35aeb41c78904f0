use std::env;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use weave_core::config::{Config, VectorDbKind};
use weave_core::{CallContext, MetadataFilter, QueryRequest, SearchEngine};
use weave_mock::MockSearchEngine;
use weave_weaviate::WeaviateEngine;

const USAGE: &str = "Usage: weave <query|get|delete|count|list|collections|health> [args...]
  query <collection> <text> [--top-k N] [--bm25] [--search-metadata] [--filter k=v]...
  get <collection> k=v...
  delete <collection> k=v...
  count <collection>
  list <collection> [limit]
  collections
  health";

enum Engine {
    Live(WeaviateEngine),
    Mock(MockSearchEngine),
}

impl Engine {
    fn search(&self) -> &dyn SearchEngine {
        match self {
            Engine::Live(e) => e,
            Engine::Mock(e) => e,
        }
    }

    fn health(&self, ctx: &CallContext) -> weave_core::Result<()> {
        match self {
            Engine::Live(e) => e.health(ctx),
            Engine::Mock(e) => e.health(),
        }
    }
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    args.remove(0);
    if args.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

struct QueryArgs {
    collection: String,
    text: String,
    top_k: i64,
    bm25: bool,
    search_metadata: bool,
    filters: Vec<MetadataFilter>,
}

fn parse_query_args(args: &[String], default_top_k: usize) -> anyhow::Result<QueryArgs> {
    let mut positional = Vec::new();
    let mut parsed = QueryArgs {
        collection: String::new(),
        text: String::new(),
        top_k: i64::try_from(default_top_k)?,
        bm25: false,
        search_metadata: false,
        filters: Vec::new(),
    };
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--top-k" => {
                let value = it.next().ok_or_else(|| anyhow::anyhow!("--top-k needs a value"))?;
                parsed.top_k = value.parse()?;
            }
            "--filter" => {
                let value = it.next().ok_or_else(|| anyhow::anyhow!("--filter needs key=value"))?;
                parsed.filters.push(MetadataFilter::parse(value)?);
            }
            "--bm25" => parsed.bm25 = true,
            "--search-metadata" => parsed.search_metadata = true,
            _ => positional.push(arg.clone()),
        }
    }
    if positional.len() < 2 {
        anyhow::bail!("query needs <collection> <text>");
    }
    parsed.collection = positional.remove(0);
    parsed.text = positional.join(" ");
    Ok(parsed)
}

fn collection_arg(args: &[String]) -> anyhow::Result<&str> {
    args.first().map(String::as_str).ok_or_else(|| anyhow::anyhow!("missing <collection>\n{USAGE}"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (cmd, args) = parse_args();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let databases = config.databases()?;
    let db = databases.default_database()?;
    let engine = match db.kind {
        VectorDbKind::Mock => Engine::Mock(MockSearchEngine::from_config(db)),
        VectorDbKind::WeaviateCloud | VectorDbKind::WeaviateLocal => Engine::Live(WeaviateEngine::from_config(db)?),
    };
    info!(database = %db.name, kind = ?db.kind, "engine ready");
    let ctx = CallContext::new();

    debug!(command = %cmd, args = args.len(), "dispatching");
    match cmd.as_str() {
        "query" => {
            let q = parse_query_args(&args, config.query_settings().default_top_k)?;
            let request = QueryRequest::new(&q.collection, &q.text)
                .top_k(q.top_k)
                .force_keyword(q.bm25)
                .search_metadata(q.search_metadata)
                .with_context(ctx);
            let results = if q.filters.is_empty() {
                engine.search().query(&request)?
            } else {
                engine.search().query_with_filters(&request, &q.filters)?
            };
            println!("{} result(s) from {}", results.len(), q.collection);
            for (i, hit) in results.iter().enumerate() {
                println!("{:>2}. [{:.3}] {} - {}", i + 1, hit.score, hit.id, hit.content);
                if !hit.metadata.is_empty() {
                    println!("    {}", serde_json::Value::Object(hit.metadata.clone()));
                }
            }
        }
        "get" => {
            let collection = collection_arg(&args)?;
            let docs = engine.search().get_documents_by_metadata(collection, &args[1..], &ctx)?;
            println!("{} document(s) matched", docs.len());
            for doc in docs {
                println!("{} - {}", doc.id, doc.display_content());
            }
        }
        "delete" => {
            let collection = collection_arg(&args)?;
            let deleted = engine.search().delete_documents_by_metadata(collection, &args[1..], &ctx)?;
            println!("Deleted {} document(s) from {}", deleted, collection);
        }
        "count" => {
            let collection = collection_arg(&args)?;
            println!("{}", engine.search().count_documents(collection, &ctx)?);
        }
        "list" => {
            let collection = collection_arg(&args)?;
            let limit = args.get(1).map(|l| l.parse()).transpose()?.unwrap_or(10);
            for doc in engine.search().list_documents(collection, limit, &ctx)? {
                println!("{} - {}", doc.id, doc.display_content());
            }
        }
        "collections" => {
            for name in engine.search().list_collections(&ctx)? {
                println!("{}", name);
            }
        }
        "health" => {
            engine.health(&ctx)?;
            println!("✅ {} is healthy", db.name);
        }
        _ => { eprintln!("Unknown command: {}\n{USAGE}", cmd); std::process::exit(1); }
    }
    Ok(())
}
