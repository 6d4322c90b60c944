mod simulated;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use finsight_agent::{AgentCoordinator, Janitor, ProgressCallback};
use finsight_core::config::AppConfig;
use finsight_core::types::{CustomerId, RequestData, StepPhase, WorkflowId};

#[derive(Parser)]
#[command(name = "finsight", version, about = "Workflow coordinator for financial analysis agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "finsight.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and execute a workflow with simulated capabilities
    Run {
        /// Which stock workflow to run
        #[arg(value_enum)]
        workflow: WorkflowKind,
        /// Customer the analysis is for
        #[arg(long)]
        customer: String,
        /// Goal details as key=value (repeatable)
        #[arg(long = "goal", value_name = "KEY=VALUE")]
        goal: Vec<String>,
        /// Simulated latency of every capability call
        #[arg(long, default_value = "200")]
        latency_ms: u64,
    },
    /// List registered capabilities
    Agents,
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WorkflowKind {
    /// Spending analysis and goal planning, then comprehensive advice
    Comprehensive,
    /// Spending analysis only
    Spending,
    /// Goal planning only
    Goal,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "finsight", &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if !cli.config.exists() {
        info!(path = %cli.config.display(), "No config file found, using defaults");
    }

    match cli.command {
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Agents => {
            let coordinator = AgentCoordinator::new(
                simulated::capability_set(Duration::ZERO),
                config.coordinator.clone(),
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&coordinator.list_capabilities())?
            );
        }
        Commands::Run {
            workflow,
            customer,
            goal,
            latency_ms,
        } => {
            let goal_info = parse_goal(&goal)?;
            let coordinator = Arc::new(AgentCoordinator::new(
                simulated::capability_set(Duration::from_millis(latency_ms)),
                config.coordinator.clone(),
            ));
            run_workflow(coordinator, workflow, CustomerId::new(customer), goal_info).await?;
        }
        // Handled before config loading
        Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn run_workflow(
    coordinator: Arc<AgentCoordinator>,
    kind: WorkflowKind,
    customer_id: CustomerId,
    goal_info: RequestData,
) -> anyhow::Result<()> {
    let workflow_id = match kind {
        WorkflowKind::Comprehensive => {
            let goal = (!goal_info.is_empty()).then_some(goal_info);
            coordinator
                .build_comprehensive_analysis(&customer_id, goal)
                .await?
        }
        WorkflowKind::Spending => coordinator.build_spending_analysis_only(&customer_id).await?,
        WorkflowKind::Goal => {
            coordinator
                .build_goal_planning_only(&customer_id, goal_info)
                .await?
        }
    };

    let shutdown = CancellationToken::new();
    let janitor = tokio::spawn(Janitor::new(coordinator.clone(), shutdown.clone()).run());

    let progress: ProgressCallback = Arc::new(|_wf: &WorkflowId, step: &str, phase: StepPhase| {
        eprintln!("  [{phase}] {step}");
    });

    let runner = coordinator.clone();
    let run_id = workflow_id.clone();
    let mut execution =
        tokio::spawn(async move { runner.execute(&run_id, Some(progress)).await });

    let outcome = tokio::select! {
        joined = &mut execution => joined,
        _ = tokio::signal::ctrl_c() => {
            warn!(workflow_id = %workflow_id, "Interrupted, cancelling workflow");
            coordinator.cancel(&workflow_id).await;
            execution.await
        }
    };

    shutdown.cancel();
    let _ = janitor.await;

    let status = coordinator
        .status(&workflow_id)
        .await
        .context("workflow disappeared from the registry")?;
    println!("{}", serde_json::to_string_pretty(&status)?);

    match outcome.context("workflow task panicked")? {
        Ok(results) => {
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse repeated `key=value` pairs. Values that parse as JSON keep their
/// type (`12`, `true`); anything else is taken as a string.
fn parse_goal(pairs: &[String]) -> anyhow::Result<RequestData> {
    let mut goal = RequestData::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got '{pair}'"))?;
        let key = key.trim();
        anyhow::ensure!(!key.is_empty(), "empty key in '{pair}'");

        let value = serde_json::from_str(value.trim())
            .unwrap_or_else(|_| serde_json::Value::String(value.trim().to_string()));
        goal.insert(key.to_string(), value);
    }
    Ok(goal)
}
