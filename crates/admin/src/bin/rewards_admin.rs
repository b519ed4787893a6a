use std::path::PathBuf;

use admin::{
    AdminError,
    results::{ResultsFile, ResultsValidator},
};
use clap::{Parser, Subcommand};
use storage::{
    Database, EngineConfig,
    dto::desync::SyncDirection,
    ledger::PgLedgerWriter,
    services::{desync, finalize_session, record_round_results, rewards},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "rewards-admin")]
#[command(about = "Tournament results and rewards operator tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// JSON reward policy; the built-in policy is used when unset.
    #[arg(long, env = "REWARD_POLICY_PATH")]
    reward_policy: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Record a session's results from an exported file, then finalize
    Results {
        file: PathBuf,

        #[arg(long)]
        validate_only: bool,

        /// Store the results without finalizing; other sessions are still to come
        #[arg(long, conflicts_with = "validate_only")]
        record_only: bool,
    },
    /// Distribute rewards for a completed tournament
    Distribute {
        tournament_id: Uuid,

        #[arg(long, default_value = "rewards-admin")]
        actor: String,
    },
    /// Progress ladder and license reconciliation
    Desync {
        #[command(subcommand)]
        command: DesyncCommands,
    },
    /// Reward policy checks
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },
}

#[derive(Subcommand)]
enum DesyncCommands {
    Scan {
        #[arg(long)]
        specialization: Option<String>,
    },
    Sync {
        user_id: Uuid,

        /// progress_to_license or license_to_progress
        #[arg(long)]
        direction: SyncDirection,
    },
}

#[derive(Subcommand)]
enum PolicyCommands {
    Check { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("rewards_admin={log_level},admin={log_level},storage={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Migrate => {
            let db = connect(cli.database_url.as_deref()).await?;
            db.run_migrations().await?;
            tracing::info!("✓ Migrations applied");
        }
        Commands::Results {
            file,
            validate_only,
            record_only,
        } => {
            let config = EngineConfig::load(cli.reward_policy.as_deref())?;
            handle_results(
                file,
                validate_only,
                record_only,
                &config,
                cli.database_url.as_deref(),
            )
            .await?;
        }
        Commands::Distribute {
            tournament_id,
            actor,
        } => {
            let config = EngineConfig::load(cli.reward_policy.as_deref())?;
            let db = connect(cli.database_url.as_deref()).await?;
            handle_distribute(&db, &config, tournament_id, &actor).await?;
        }
        Commands::Desync { command } => {
            let db = connect(cli.database_url.as_deref()).await?;
            handle_desync(&db, command).await?;
        }
        Commands::Policy {
            command: PolicyCommands::Check { file },
        } => {
            handle_policy_check(file)?;
        }
    }

    Ok(())
}

async fn connect(database_url: Option<&str>) -> Result<Database, AdminError> {
    let url = database_url.ok_or_else(|| {
        AdminError::ConfigError("DATABASE_URL or --database-url is required".to_string())
    })?;

    tracing::info!("Connecting to database...");
    Ok(Database::with_max_connections(url, 5).await?)
}

async fn handle_results(
    file: PathBuf,
    validate_only: bool,
    record_only: bool,
    config: &EngineConfig,
    database_url: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Loading results from: {}", file.display());

    let json_content = tokio::fs::read_to_string(&file).await?;
    let results: ResultsFile = serde_json::from_str(&json_content)?;

    tracing::info!(
        "Loaded {} result(s) in {} round(s) for tournament {} (v{})",
        results.result_count(),
        results.rounds.len(),
        results.tournament_id,
        results.format_version
    );

    tracing::info!("Validating results file...");
    let validation_report = ResultsValidator::validate(&results, config.skills.max_round_points)?;
    validation_report.log_warnings();
    tracing::info!("✓ Validation successful!");

    if validate_only {
        return Ok(());
    }

    let db = connect(database_url).await?;

    if record_only {
        let appended = record_round_results(
            db.pool(),
            config,
            results.tournament_id,
            results.session_id,
            &results.to_inputs(),
        )
        .await?;
        tracing::info!(
            "✓ Recorded {} result(s) for session {}",
            appended,
            results.session_id
        );
        return Ok(());
    }

    let outcome = finalize_session(
        db.pool(),
        config,
        results.tournament_id,
        results.session_id,
        &results.to_inputs(),
    )
    .await?;

    if outcome.is_duplicate() {
        tracing::info!("Rankings already existed; nothing written");
    }
    for ranking in outcome.get() {
        tracing::info!(
            "  #{} {} ({} points, {} losses)",
            ranking.rank,
            ranking.user_id,
            ranking.points,
            ranking.losses
        );
    }
    tracing::info!("✓ Tournament finalized with {} ranking(s)", outcome.get().len());

    Ok(())
}

async fn handle_distribute(
    db: &Database,
    config: &EngineConfig,
    tournament_id: Uuid,
    actor: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome =
        rewards::distribute_rewards(db.pool(), config, &PgLedgerWriter, tournament_id, actor)
            .await?;

    if outcome.is_duplicate() {
        tracing::info!("Rewards were already distributed; showing recorded ledger");
    }

    let summary = outcome.get();
    for user in &summary.users {
        tracing::info!(
            "  {}: {} credits, {} XP, {} skill reward(s)",
            user.user_id,
            user.credits_awarded,
            user.xp_awarded,
            user.skill_deltas.len()
        );
    }
    tracing::info!(
        "✓ {} user(s), {} credits, {} XP",
        summary.users.len(),
        summary.total_credits(),
        summary.total_xp()
    );

    Ok(())
}

async fn handle_desync(
    db: &Database,
    command: DesyncCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        DesyncCommands::Scan { specialization } => {
            let issues = desync::find_desync_issues(db.pool(), specialization.as_deref()).await?;

            for issue in &issues {
                tracing::warn!(
                    "  {} / {}: {:?} (progress {:?}, license {:?})",
                    issue.user_id,
                    issue.specialization,
                    issue.kind,
                    issue.progress_level,
                    issue.license_level
                );
            }
            tracing::info!("Found {} desynced record(s)", issues.len());
        }
        DesyncCommands::Sync { user_id, direction } => {
            let result = desync::sync_user(db.pool(), user_id, direction).await?;

            if result.already_in_sync() {
                tracing::info!("User {} already in sync", user_id);
            }
            for change in &result.changes {
                tracing::info!(
                    "  {}: {:?} -> {}",
                    change.specialization,
                    change.before,
                    change.after
                );
            }
        }
    }

    Ok(())
}

fn handle_policy_check(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::load(Some(&file))?;

    tracing::info!("✓ Policy {} is valid", config.version);
    for tier in &config.rewards.tiers {
        let ranks = match tier.max_rank {
            Some(max) if max == tier.min_rank => format!("rank {}", tier.min_rank),
            Some(max) => format!("ranks {}-{}", tier.min_rank, max),
            None => format!("ranks {}+", tier.min_rank),
        };
        tracing::info!(
            "  {}: {} credits, {} XP, {} skill points",
            ranks,
            tier.credits,
            tier.xp,
            tier.skill_points
        );
    }

    Ok(())
}
