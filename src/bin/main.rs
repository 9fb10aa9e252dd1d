//! Entrypoint: parses CLI args, installs logging, registers the built-in producers, and
//! dispatches to the HTTP server, a library-mode bundle run, or a cluster agent lifecycle
//! operation (SPEC_FULL.md §4.9).

use clap::Parser;
use gpu_stack_bundler::agent_config::{AgentConfig, CleanupOptions};
use gpu_stack_bundler::cli::{bundle_scheduling_and_overrides, AgentAction, BundleArgs, Cli, Command};
use gpu_stack_bundler::component::{self, ComponentConfig};
use gpu_stack_bundler::error::{Error, Result};
use gpu_stack_bundler::k8s::{AgentLifecycle, KubeClusterClient};
use gpu_stack_bundler::orchestrator::{BundleOrchestrator, OrchestratorConfig};
use gpu_stack_bundler::recipe::Recipe;
use gpu_stack_bundler::{http, logging};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    logging::init();

    if let Err(err) = gpu_stack_bundler::producers::register_builtin_producers(component::global()) {
        error!(error = %err, "failed to register built-in producers");
        return std::process::ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve { bind } => run_serve(&bind).await,
        Command::Bundle(args) => run_bundle(args).await,
        Command::Agent { action } => run_agent(action).await,
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run_serve(bind: &str) -> Result<()> {
    http::server::run(bind).await.map_err(|e| Error::internal(format!("HTTP server failed: {e}")))
}

async fn run_bundle(args: BundleArgs) -> Result<()> {
    let recipe_bytes = std::fs::read_to_string(&args.recipe)
        .map_err(|e| Error::invalid_request(format!("reading recipe {}: {e}", args.recipe.display())))?;
    let recipe: Recipe = serde_yaml::from_str(&recipe_bytes)
        .map_err(|e| Error::invalid_request(format!("parsing recipe {}: {e}", args.recipe.display())))?;

    let (overrides, scheduling) = bundle_scheduling_and_overrides(&args)?;
    let component_config = ComponentConfig::builder()
        .value_overrides(overrides)
        .scheduling_policy(scheduling)
        .deployer(args.deployer.clone())
        .repo_url(args.repo.clone().unwrap_or_default())
        .build()?;

    let registry = Arc::new(component::global().new_from_global(&component_config));
    let orchestrator = BundleOrchestrator::new(OrchestratorConfig {
        selected_types: args.r#type.clone(),
        fail_fast: args.fail_fast,
        component_config,
        registry,
    });

    let (output, fail_fast_error) = orchestrator
        .make(CancellationToken::new(), &recipe, &args.out)
        .await?;

    if let Some(err) = fail_fast_error {
        return Err(err);
    }
    info!(
        files = output.total_files,
        bytes = output.total_bytes,
        errors = output.errors.len(),
        "bundle written to {}",
        args.out.display()
    );
    if !output.errors.is_empty() {
        for tagged in &output.errors {
            error!(tag = %tagged.tag, error = %tagged.error, "producer reported an error");
        }
    }
    Ok(())
}

async fn run_agent(action: AgentAction) -> Result<()> {
    match action {
        AgentAction::Deploy { namespace, config } => {
            let config = load_agent_config(&config, &namespace)?;
            let client = KubeClusterClient::try_default().await?;
            let lifecycle = AgentLifecycle::new(&client, config);

            lifecycle.deploy(CancellationToken::new()).await?;
            lifecycle
                .wait_for_completion(CancellationToken::new(), std::time::Duration::from_secs(3600))
                .await?;
            let snapshot = lifecycle.get_snapshot().await?;
            println!("{snapshot}");
            Ok(())
        }
        AgentAction::Cleanup { namespace, config } => {
            let config = load_agent_config(&config, &namespace)?;
            let client = KubeClusterClient::try_default().await?;
            let lifecycle = AgentLifecycle::new(&client, config);
            lifecycle.cleanup(CleanupOptions { enabled: true }).await
        }
    }
}

fn load_agent_config(path: &std::path::Path, namespace: &str) -> Result<AgentConfig> {
    let bytes = std::fs::read_to_string(path)
        .map_err(|e| Error::invalid_request(format!("reading agent config {}: {e}", path.display())))?;
    let mut config: AgentConfig = serde_yaml::from_str(&bytes)
        .map_err(|e| Error::invalid_request(format!("parsing agent config {}: {e}", path.display())))?;
    config.namespace = namespace.to_string();
    Ok(config)
}
