use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use liketoggle::load_test::{LoadTestConfig, run_load_test};
use liketoggle::{ActorId, EngineConfig, PostLikeService, ResourceId};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "liketoggle")]
#[command(about = "Like toggle engine: load test, backoff curve, and walkthrough")]
struct Cli {
    /// JSON engine config; LIKETOGGLE_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Concurrent actors toggling likes on shared resources
    LoadTest {
        #[arg(long, default_value_t = 50)]
        actors: usize,
        #[arg(long, default_value_t = 1)]
        toggles: usize,
        #[arg(long, default_value_t = 1)]
        resources: usize,
        #[arg(long, default_value_t = 0x9e3779b97f4a7c15)]
        seed: u64,
    },
    /// Print the retry backoff curve of the configured policy
    Backoff,
    /// Two actors liking one post, then one of them unliking it
    Scenario,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::LoadTest {
            actors,
            toggles,
            resources,
            seed,
        } => load_test(config, actors, toggles, resources, seed).await,
        Command::Backoff => {
            print_backoff(&config);
            Ok(())
        }
        Command::Scenario => scenario(&config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return EngineConfig::from_env().context("Invalid LIKETOGGLE_* environment");
    };
    EngineConfig::load(path)
        .and_then(|config| config.with_env_overrides(std::env::vars()))
        .with_context(|| format!("Failed to load config '{}'", path.display()))
}

async fn load_test(
    engine: EngineConfig,
    actors: usize,
    toggles: usize,
    resources: usize,
    seed: u64,
) -> Result<()> {
    let report = run_load_test(LoadTestConfig {
        actors,
        toggles_per_actor: toggles,
        resources,
        seed,
        engine,
    })
    .await
    .map_err(|err| anyhow::anyhow!("load test aborted: {err}"))?;

    println!("{report}");
    if !report.converged() {
        bail!("like counters diverged from membership records");
    }
    Ok(())
}

fn print_backoff(config: &EngineConfig) {
    let policy = &config.retry;
    println!(
        "max_attempts={} initial={}ms multiplier={} cap={}ms jitter={}",
        policy.max_attempts,
        policy.initial_interval_ms,
        policy.multiplier,
        policy.max_interval_ms,
        policy.jitter
    );
    for (index, nominal) in policy.curve().iter().enumerate() {
        let retry = index as u32 + 1;
        let (low, high) = policy.backoff_bounds(retry);
        println!(
            "  after attempt {}: {}ms (jittered {}..={}ms)",
            retry,
            nominal.as_millis(),
            low.as_millis(),
            high.as_millis()
        );
    }
}

async fn scenario(config: &EngineConfig) -> Result<()> {
    let service = PostLikeService::in_memory(config);
    let post = ResourceId(1);
    service.engine().store().create_resource(post)?;

    let alice = ActorId::from("alice");
    let bob = ActorId::from("bob");

    let (first, second) = tokio::join!(
        service.toggle_like(post, Some(&alice)),
        service.toggle_like(post, Some(&bob))
    );
    println!("alice likes: {}", serde_json::to_string(&first?)?);
    println!("bob likes:   {}", serde_json::to_string(&second?)?);

    let again = service.toggle_like(post, Some(&alice)).await?;
    println!("alice again: {}", serde_json::to_string(&again)?);

    let anonymous = service.like_info(post, None).await?;
    println!("anonymous:   {}", serde_json::to_string(&anonymous)?);
    println!("{}", service.engine().stats());
    Ok(())
}
