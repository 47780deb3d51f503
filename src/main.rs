//! CLI entrypoint: boots the mission orchestration core and exposes the
//! control/streaming APIs, mirroring the grounding codebase's thin
//! `clap::Command` tree over a library crate.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentryai_core::cognitive::{CognitiveEngine, LlmClient};
use sentryai_core::kernel::GlobalBlocklist;
use sentryai_core::sandbox::NativeSandbox;
use sentryai_core::types::{ScopePattern, ScopePolicy};
use sentryai_core::{registry, Config, Runtime};

#[derive(Parser)]
#[command(name = "sentryai")]
#[command(about = "SentryAI mission orchestration core")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (spec.md §6.3).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the control and streaming API server.
    Serve,
    /// Mission lifecycle operations, issued as control-API calls against a running server.
    #[command(subcommand)]
    Mission(MissionCommands),
}

#[derive(Subcommand)]
enum MissionCommands {
    /// Submit a new mission objective.
    Submit {
        objective: String,
        /// Allowed scope pattern, e.g. `*.example.com` or `10.0.0.0/8`. May be repeated.
        #[arg(long = "scope")]
        scope_patterns: Vec<String>,
    },
    Approve {
        mission_id: String,
        /// Step ids to approve. If omitted, all proposed steps are approved.
        #[arg(long = "step")]
        step_ids: Vec<String>,
    },
    Pause {
        mission_id: String,
    },
    Resume {
        mission_id: String,
    },
    Stop {
        mission_id: String,
    },
}

fn build_runtime(config: &Config) -> anyhow::Result<Arc<Runtime>> {
    let tools = registry::load_registry(config.tool_registry_path.as_deref().map(std::path::Path::new))?;
    let sandbox = Arc::new(NativeSandbox::new());
    let llm_client = LlmClient::new(config.llm_config()?);
    let cognitive = CognitiveEngine::new(llm_client);
    let mut blocklist = GlobalBlocklist::default();
    blocklist.hostname_suffixes.extend(config.global_blocklist_extra_suffixes.iter().cloned());

    Ok(Arc::new(Runtime::new(
        tools,
        sandbox,
        config.sandbox_config(),
        cognitive,
        blocklist,
        config.loop_detector_config(),
        config.event_bridge_capacity,
    )))
}

fn parse_scope(patterns: &[String]) -> ScopePolicy {
    let parsed = patterns
        .iter()
        .map(|p| match p.parse::<ipnet::IpNet>() {
            Ok(net) => ScopePattern::Cidr(net),
            Err(_) => ScopePattern::Hostname(p.clone()),
        })
        .collect();
    ScopePolicy::new(parsed)
}

/// Base URL for control-API calls issued by the `mission` subcommands.
fn api_base(config: &Config) -> String {
    let addr = config.bind_address.replace("0.0.0.0", "127.0.0.1");
    format!("http://{addr}")
}

async fn run_mission_command(config: &Config, command: MissionCommands) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let base = api_base(config);

    match command {
        MissionCommands::Submit { objective, scope_patterns } => {
            // Scope patterns are informational at the CLI layer today: the
            // control API derives its own scope from the objective text
            // (spec.md §6.1), so this just validates the patterns parse.
            let _ = parse_scope(&scope_patterns);
            let resp: serde_json::Value = client
                .post(format!("{base}/missions/start"))
                .json(&serde_json::json!({ "prompt": objective }))
                .send()
                .await?
                .json()
                .await?;
            println!("{resp}");
        }
        MissionCommands::Approve { mission_id, step_ids } => {
            client
                .post(format!("{base}/missions/{mission_id}/approve"))
                .json(&serde_json::json!({ "approved_step_ids": step_ids }))
                .send()
                .await?
                .error_for_status()?;
        }
        MissionCommands::Pause { mission_id } => {
            client.post(format!("{base}/missions/{mission_id}/pause")).send().await?.error_for_status()?;
        }
        MissionCommands::Resume { mission_id } => {
            client.post(format!("{base}/missions/{mission_id}/resume")).send().await?.error_for_status()?;
        }
        MissionCommands::Stop { mission_id } => {
            client
                .post(format!("{base}/missions/{mission_id}/stop"))
                .json(&serde_json::json!({}))
                .send()
                .await?
                .error_for_status()?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            let runtime = build_runtime(&config)?;
            let app = sentryai_core::api::build_router(runtime);
            let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
            tracing::info!(address = %config.bind_address, "sentryai listening");
            axum::serve(listener, app).await?;
        }
        Commands::Mission(command) => run_mission_command(&config, command).await?,
    }

    Ok(())
}
