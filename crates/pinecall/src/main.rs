use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use pinecall_common::{logger, AppConfig, EmbeddingBackend, VectorBackend};
use pinecall_embedding::build_embedder;
use pinecall_server::{format_matches_table, IndexAction, PineconeWorkflow, WorkflowSettings};
use pinecall_vector::build_index_client;
use std::path::PathBuf;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    match find_project_root().map(|root| root.join(".env")) {
        Some(env_path) if env_path.exists() => {
            dotenv::from_path(&env_path).ok();
        }
        _ => {
            dotenv::dotenv().ok();
        }
    }
}

#[derive(Parser)]
#[command(name = "pinecall")]
#[command(about = "Store and query text embeddings in a managed vector index", long_about = None)]
struct Cli {
    /// Use the hashing embedder and the in-memory store (no API keys needed)
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run the workflow once: ensure index, store embeddings, query
    Run,

    /// Create or delete the configured index
    Index {
        #[arg(value_enum)]
        action: IndexActionArg,
    },

    /// Embed a text and print its nearest stored records
    Query {
        text: String,

        /// Number of matches to return
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IndexActionArg {
    Create,
    Delete,
}

impl From<IndexActionArg> for IndexAction {
    fn from(arg: IndexActionArg) -> Self {
        match arg {
            IndexActionArg::Create => IndexAction::Create,
            IndexActionArg::Delete => IndexAction::Delete,
        }
    }
}

fn build_workflow(config: &AppConfig) -> Result<PineconeWorkflow> {
    let embedder = build_embedder(config)?;
    let index_client = build_index_client(config)?;
    let settings = WorkflowSettings::from_config(config)?;
    Ok(PineconeWorkflow::new(embedder, index_client, settings))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    let mut config = AppConfig::from_env()?;
    if cli.offline {
        config.embedding_backend = EmbeddingBackend::Hashing;
        config.vector_backend = VectorBackend::Memory;
    }

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server_host = host;
            }
            if let Some(port) = port {
                config.server_port = port;
            }
            serve(config).await?;
        }
        None => serve(config).await?,
        Some(Commands::Run) => {
            config.validate()?;
            logger::setup_console_logging(&config.log_level)?;

            let workflow = build_workflow(&config)?;
            let report = workflow.run().await?;

            println!("Index '{}' {}.", config.index_name, report.index_outcome);
            println!("Stored: {}", report.stored_ids.join(", "));
            println!("Query: \"{}\"", report.query);
            println!("{}", format_matches_table(&report.result));
        }
        Some(Commands::Index { action }) => {
            config.validate()?;
            logger::setup_console_logging(&config.log_level)?;

            let workflow = build_workflow(&config)?;
            let outcome = workflow.manage_index(action.into()).await?;
            println!("Index '{}' {}.", config.index_name, outcome);
        }
        Some(Commands::Query { text, top_k }) => {
            if let Some(top_k) = top_k {
                config.top_k = top_k;
            }
            config.validate()?;
            logger::setup_console_logging(&config.log_level)?;

            let workflow = build_workflow(&config)?;
            let result = workflow.query_embeddings(&text).await?;
            println!("{}", format_matches_table(&result));
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    tracing::info!("pinecall starting...");
    tracing::info!("  Host: {}", config.server_host);
    tracing::info!("  Port: {}", config.server_port);
    tracing::info!("  Index: {} / {}", config.index_name, config.namespace);

    println!("Server listening on http://{}", config.server_bind_address());

    pinecall_server::start_server(config).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_index_action() {
        let cli = Cli::try_parse_from(["pinecall", "index", "delete"]).unwrap();
        match cli.command {
            Some(Commands::Index { action }) => {
                assert_eq!(IndexAction::from(action), IndexAction::Delete)
            }
            _ => panic!("expected index command"),
        }
        assert!(Cli::try_parse_from(["pinecall", "index", "drop"]).is_err());
    }

    #[test]
    fn test_parse_offline_query() {
        let cli = Cli::try_parse_from(["pinecall", "query", "cats?", "--top-k", "2", "--offline"]).unwrap();
        assert!(cli.offline);
        match cli.command {
            Some(Commands::Query { text, top_k }) => {
                assert_eq!(text, "cats?");
                assert_eq!(top_k, Some(2));
            }
            _ => panic!("expected query command"),
        }
    }
}
