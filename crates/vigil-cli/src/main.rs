//! Vigil CLI
//!
//! Command-line interface for the Vigil incident lifecycle orchestrator.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use vigil_actions::{standard_registry, testing::StubConnector, RegistryDispatcher};
use vigil_api::{ApiServer, ApiServerConfig, AppState};
use vigil_core::{
    all_playbooks, Aes256GcmEncryptor, ChecklistExecutor, Clock, EscalationMonitor, EventBus,
    ForensicsCollector, IncidentRegistry, MemoryStore, NullTelemetry, PatternDetector, QuietFeed,
    RecoveryPlanner, Scheduler, StaticRoster, Store, SystemClock, VigilConfig,
};
use vigil_observability::{describe_metrics, init_logging, AuditLog};

/// Environment variable holding the base64 AES-256 evidence key.
const EVIDENCE_KEY_ENV: &str = "VIGIL_EVIDENCE_KEY";

#[derive(Parser)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Security incident lifecycle orchestrator", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the orchestrator and API server
    Serve {
        /// Bind address, overrides the configuration file
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Validate a configuration file and exit
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the response playbooks as YAML
    Playbooks,
}

fn load_config(path: Option<&PathBuf>) -> Result<VigilConfig> {
    match path {
        Some(path) => VigilConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(VigilConfig::default()),
    }
}

fn evidence_encryptor() -> Result<Aes256GcmEncryptor> {
    match std::env::var(EVIDENCE_KEY_ENV) {
        Ok(key) => Aes256GcmEncryptor::from_base64_key(&key)
            .with_context(|| format!("invalid {} value", EVIDENCE_KEY_ENV)),
        Err(_) => {
            warn!(
                "{} not set, generating an ephemeral evidence key; \
                 encrypted evidence will be unreadable after restart",
                EVIDENCE_KEY_ENV
            );
            Ok(Aes256GcmEncryptor::generate())
        }
    }
}

fn build_registry(config: &VigilConfig) -> Result<Arc<IncidentRegistry>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    // Single stub backs every connector seam until real integrations
    // are wired in deployment-specific builds.
    let connector = Arc::new(StubConnector::new());
    let actions = standard_registry(
        Arc::clone(&connector) as _,
        Arc::clone(&connector) as _,
        Arc::clone(&connector) as _,
        Arc::clone(&connector) as _,
        connector as _,
    );

    Ok(Arc::new(IncidentRegistry::new(
        store,
        Arc::new(EventBus::default()),
        Arc::clone(&clock),
        Arc::new(StaticRoster::example()),
        Arc::new(ForensicsCollector::new(
            Arc::new(NullTelemetry),
            Arc::new(evidence_encryptor()?),
            Arc::clone(&clock),
            config.forensics.clone(),
        )),
        Arc::new(RegistryDispatcher::new(actions)),
        Arc::new(RecoveryPlanner::new(
            Arc::new(ChecklistExecutor),
            Arc::clone(&clock),
        )),
        Arc::new(AuditLog::default()),
    )))
}

async fn serve(config: VigilConfig, bind: Option<SocketAddr>) -> Result<()> {
    describe_metrics();

    let registry = build_registry(&config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let detector = Arc::new(PatternDetector::new(
        Arc::clone(&registry),
        Arc::new(QuietFeed),
        Arc::clone(&clock),
        config.detector.clone(),
    ));
    let monitor = Arc::new(EscalationMonitor::new(Arc::clone(&registry), clock));

    let handle = Scheduler::new(
        detector,
        monitor,
        Duration::from_secs(config.detector.tick_secs),
        Duration::from_secs(config.monitor.tick_secs),
    )
    .spawn();

    let bind_address = match bind {
        Some(addr) => addr,
        None => config
            .api
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: {}", config.api.bind))?,
    };

    info!(%bind_address, "starting vigil");

    let server = ApiServer::new(
        AppState::new(registry),
        ApiServerConfig {
            bind_address,
            ..ApiServerConfig::default()
        },
    );
    server.run().await.context("API server failed")?;

    handle.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => {
            let config = load_config(cli.config.as_ref())?;
            serve(config, bind).await
        }
        Commands::Validate { config } => {
            let path = config.or(cli.config);
            let loaded = load_config(path.as_ref())?;
            println!("configuration OK");
            println!("{}", serde_yaml::to_string(&loaded)?);
            Ok(())
        }
        Commands::Playbooks => {
            println!("{}", serde_yaml::to_string(&all_playbooks())?);
            Ok(())
        }
    }
}
