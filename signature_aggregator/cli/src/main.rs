//! Command-line front end for the signature aggregator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use sa_engine::aggregator::DEFAULT_NUMBER_OF_NONCES;
use sa_engine::audit::AuditTracker;
use sa_engine::logging::init_logging;
use sa_engine::{AggregatorConfig, DkgKey, FrostEd25519Provider, Party, SignatureAggregator, StaticNodeDirectory};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "sa", version = "0.1", about = "Threshold signature aggregator CLI")]
struct Cli {
    #[arg(long, global = true, help = "JSON config file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "JSON node list: [{\"id\", \"host\", \"port\"}]")]
    nodes: Option<PathBuf>,

    #[arg(long, global = true, help = "Per-peer timeout in seconds")]
    timeout: Option<u64>,

    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[arg(long, global = true, help = "Write the log file as JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask every party member for fresh nonces
    Nonces {
        #[arg(short, long, value_delimiter = ',', help = "Node ids, e.g. 1,2,3")]
        party: Vec<String>,

        #[arg(short, long, default_value_t = DEFAULT_NUMBER_OF_NONCES)]
        count: u32,
    },

    /// Run a signing ceremony and print the aggregated result
    Sign {
        #[arg(long, help = "JSON file: {\"public_key\": ..., \"party\": [...]}")]
        dkg_key: PathBuf,

        #[arg(long, help = "JSON file with the signers' nonce commitments")]
        nonces: PathBuf,

        #[arg(long, help = "Inline JSON payload forwarded to every signer")]
        data: String,

        #[arg(short, long, value_delimiter = ',', help = "Signing subset, e.g. 1,3")]
        party: Vec<String>,
    },
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn party(ids: Vec<String>) -> anyhow::Result<Party> {
    if ids.is_empty() {
        bail!("--party needs at least one node id");
    }
    Ok(Party::new(ids.iter().map(|id| id.trim())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // file, then SA_* environment, then flags
    let mut config = AggregatorConfig::load(cli.config.as_deref())?;
    if let Some(nodes) = cli.nodes {
        config.nodes_file = Some(nodes);
    }
    if let Some(timeout) = cli.timeout {
        config.default_timeout_secs = timeout;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = log_dir;
    }
    config.json_logs |= cli.json_logs;
    config.validate()?;

    // Dropping the guard stops the file writer
    let guard = init_logging(&config.log_dir, config.json_logs);

    let nodes_file = config
        .nodes_file
        .as_deref()
        .context("no node list given (use --nodes, nodes_file or SA_NODES_FILE)")?;
    let directory = StaticNodeDirectory::from_json_file(nodes_file)?;
    let audit = Arc::new(AuditTracker::new(256));
    let aggregator = SignatureAggregator::from_config(&config, Arc::new(directory), Arc::new(FrostEd25519Provider::new()))?
        .with_audit(audit.clone());

    match cli.command {
        // Subcommand: Nonces
        // Prints one reply (or TIMEOUT/ERROR sentinel) per member
        Commands::Nonces { party: ids, count } => {
            let nonces = aggregator.request_nonces(&party(ids)?, count).await?;
            println!("{}", serde_json::to_string_pretty(&nonces)?);
        }

        // Subcommand: Sign
        // Collects shares, checks the aggregated nonce and aggregates
        Commands::Sign { dkg_key, nonces, data, party: ids } => {
            let dkg_key: DkgKey = serde_json::from_value(read_json(&dkg_key)?).context("invalid DKG key file")?;
            let nonces_list = read_json(&nonces)?;
            let data: Value = serde_json::from_str(&data).context("--data must be JSON")?;

            let result = aggregator.request_signature(&dkg_key, &nonces_list, &data, &party(ids)?).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if !result.is_successful() {
                if let Some(request_id) = result.request_id() {
                    for record in audit.for_request(request_id) {
                        tracing::info!(event = record.event_type_label(), node = ?record.node_id, "{}", record.message);
                    }
                }
                drop(guard);
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
