//! Governator - applies queued deploy requests to etcd
//!
//! Usage:
//!   governator --etcd-uri http://etcd:2379 --redis-uri redis://redis:6379 --redis-queue deploys
//!
//! Every flag can also be given through its GOVERNATOR_* environment variable
//! or in governator.toml.

mod signals;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use governator_core::config::{ConfigError, GovernatorConfig, ResolvedConfig, load_config_file};
use governator_core::coordinator::Deployer;
use governator_core::http::BlockingHttp;
use governator_core::notify::DeployStateNotifier;
use governator_core::queue::{QueueKeys, RedisQueueStore};
use governator_core::runner::{Runner, ShutdownSignal};
use governator_core::store::EtcdConfigStore;

#[derive(Parser)]
#[command(name = "governator", version)]
#[command(about = "Applies queued deploy requests from Redis to etcd", long_about = None)]
struct Cli {
    /// Etcd server to deploy to
    #[arg(long, short = 'e', env = "GOVERNATOR_ETCD_URI")]
    etcd_uri: Option<String>,

    /// Redis server to pull deployments from
    #[arg(long, short = 'r', env = "GOVERNATOR_REDIS_URI")]
    redis_uri: Option<String>,

    /// Redis queue to pull deployments from
    #[arg(long, short = 'q', env = "GOVERNATOR_REDIS_QUEUE")]
    redis_queue: Option<String>,

    /// Deploy-state service to notify after each deploy
    #[arg(long, short = 'd', env = "GOVERNATOR_DEPLOY_STATE_URI")]
    deploy_state_uri: Option<String>,

    /// Cluster name reported to the deploy-state service
    #[arg(long, short = 'c', env = "GOVERNATOR_CLUSTER")]
    cluster: Option<String>,

    /// Delay between queue polls in milliseconds
    #[arg(long, env = "GOVERNATOR_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Config file (defaults to <config dir>/governator/governator.toml when present)
    #[arg(long, env = "GOVERNATOR_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> GovernatorConfig {
        GovernatorConfig {
            etcd_uri: self.etcd_uri.clone(),
            redis_uri: self.redis_uri.clone(),
            redis_queue: self.redis_queue.clone(),
            deploy_state_uri: self.deploy_state_uri.clone(),
            cluster: self.cluster.clone(),
            poll_interval_ms: self.poll_interval_ms,
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "governator_cli=info,governator_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    run(config)
}

/// Merge flags over the config file. Missing required flags print usage and exit 1.
fn resolve_config(cli: &Cli) -> Result<ResolvedConfig> {
    let mut config = load_config_file(cli.config.as_deref())?;
    config.merge(cli.overrides());

    match config.validate() {
        Ok(resolved) => Ok(resolved),
        Err(ConfigError::Missing(missing)) => {
            let _ = Cli::command().print_help();
            eprintln!();
            for setting in missing {
                eprintln!(
                    "{}",
                    console::style(format!("  Missing required flag {}", setting)).red()
                );
            }
            std::process::exit(1);
        }
        Err(err) => Err(err).context("Invalid configuration"),
    }
}

fn run(config: ResolvedConfig) -> Result<()> {
    let http = BlockingHttp::new()?;
    let queue = RedisQueueStore::open(&config.redis_uri).context("Error connecting to redis")?;
    let store = EtcdConfigStore::new(&config.etcd_uri, http.clone())?;

    let mut deployer = Deployer::new(queue, store, QueueKeys::new(config.redis_queue.as_str()));
    if let Some(notifier) = &config.notifier {
        deployer = deployer.with_notifier(DeployStateNotifier::new(
            notifier.base_uri.as_str(),
            notifier.cluster.as_str(),
            http,
        ));
    }

    let shutdown = ShutdownSignal::new();
    signals::install(shutdown.clone())?;

    tracing::info!(
        queue = %config.redis_queue,
        notify = config.notifier.is_some(),
        interval_ms = config.poll_interval.as_millis() as u64,
        "polling for deploys"
    );

    let summary = match Runner::new(config.poll_interval, shutdown).run(&mut deployer) {
        Ok(summary) => summary,
        Err(err) => {
            tracing::error!(
                step = err.step,
                applied = err.summary.applied,
                data_error = err.source.is_data_error(),
                "deploy step failed"
            );
            return Err(err).context("Run error");
        }
    };

    tracing::info!(
        steps = summary.steps,
        applied = summary.applied,
        "stopped polling"
    );
    println!("I'll be back.");
    Ok(())
}
