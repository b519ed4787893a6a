use anyhow::Context;
use axum::Router;
use storage::{Database, EngineConfig};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod routes;
mod state;

use config::Config;
use features::{assessments, desync, skills, tournaments};
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        tournaments::handlers::get_tournament,
        tournaments::handlers::get_status_history,
        tournaments::handlers::transition_tournament,
        tournaments::handlers::finalize_session,
        tournaments::handlers::record_results,
        tournaments::handlers::get_rankings,
        tournaments::handlers::distribute_rewards,
        tournaments::handlers::get_reward_summary,
        assessments::handlers::create_assessment,
        assessments::handlers::list_assessments,
        assessments::handlers::get_assessment,
        assessments::handlers::validate_assessment,
        assessments::handlers::archive_assessment,
        desync::handlers::list_desync_issues,
        desync::handlers::sync_user,
        skills::handlers::list_skill_ratings,
    ),
    components(
        schemas(
            storage::dto::tournament::TransitionRequest,
            storage::dto::tournament::TransitionResponse,
            storage::dto::tournament::TournamentResponse,
            storage::dto::tournament::StatusHistoryResponse,
            storage::dto::ranking::RoundResultInput,
            storage::dto::ranking::FinalizeSessionRequest,
            storage::dto::ranking::RecordedResultsResponse,
            storage::dto::ranking::RankingEntry,
            storage::dto::ranking::RankingsResponse,
            storage::dto::reward::DistributeRewardsRequest,
            storage::dto::reward::DistributionResponse,
            storage::dto::reward::RewardSummary,
            storage::dto::reward::UserReward,
            storage::dto::reward::SkillDelta,
            storage::dto::assessment::CreateAssessmentRequest,
            storage::dto::assessment::ValidateAssessmentRequest,
            storage::dto::assessment::ArchiveAssessmentRequest,
            storage::dto::assessment::AssessmentResponse,
            storage::dto::desync::DesyncIssue,
            storage::dto::desync::DesyncKind,
            storage::dto::desync::SyncDirection,
            storage::dto::desync::SyncRequest,
            storage::dto::desync::SyncResult,
            storage::dto::desync::SpecializationChange,
            storage::dto::common::PaginationMeta,
            storage::models::TournamentStatus,
            storage::models::ParticipantType,
            storage::models::RoundOutcome,
            storage::models::StatusChange,
            storage::models::AssessmentStatus,
            storage::models::SkillAssessment,
            storage::models::SkillRating,
        )
    ),
    tags(
        (name = "tournaments", description = "Lifecycle, finalization, rankings and rewards"),
        (name = "assessments", description = "Instructor skill assessments"),
        (name = "desync", description = "Progress ladder and license reconciliation"),
        (name = "skills", description = "Skill ratings"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting tournament rewards API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    let engine = EngineConfig::load(config.reward_policy_path.as_deref())
        .context("Failed to load reward policy")?;
    tracing::info!(
        version = %engine.version,
        tiers = engine.rewards.tiers.len(),
        "Reward policy loaded"
    );

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::with_max_connections(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    let state = AppState::new(db, engine);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", routes::api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let bind_address = config.bind_address();
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
