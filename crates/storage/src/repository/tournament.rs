use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{
    Participant, SkillMapping, StatusChange, Tournament, TournamentSession, TournamentStatus,
};

const TOURNAMENT_COLUMNS: &str =
    "tournament_id, name, status, rewards_distributed_at, created_at, updated_at";

/// Repository for tournaments and the inputs attached to them
pub struct TournamentRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> TournamentRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Get a tournament by ID
    pub async fn find_by_id(&mut self, id: Uuid) -> Result<Tournament> {
        let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE tournament_id = $1");

        sqlx::query_as::<_, Tournament>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or(StorageError::NotFound)
    }

    /// Get a tournament and hold its row lock until the surrounding transaction ends.
    pub async fn lock(&mut self, id: Uuid) -> Result<Tournament> {
        let sql = format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE tournament_id = $1 FOR UPDATE"
        );

        sqlx::query_as::<_, Tournament>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or(StorageError::NotFound)
    }

    /// Move the status column and append the matching history row.
    pub async fn set_status(
        &mut self,
        id: Uuid,
        from: TournamentStatus,
        to: TournamentStatus,
        actor: &str,
    ) -> Result<Tournament> {
        let sql = format!(
            r#"
            UPDATE tournaments
            SET status = $2, updated_at = NOW()
            WHERE tournament_id = $1 AND status = $3
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        );

        let tournament = sqlx::query_as::<_, Tournament>(&sql)
            .bind(id)
            .bind(to)
            .bind(from)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| {
                StorageError::ConcurrencyConflict(format!(
                    "tournament {id} left {from} before the update"
                ))
            })?;

        self.append_history(id, from, to, actor).await?;

        Ok(tournament)
    }

    /// Stamp `rewards_distributed_at` and enter the terminal state in one statement.
    pub async fn mark_rewards_distributed(&mut self, id: Uuid, actor: &str) -> Result<Tournament> {
        let sql = format!(
            r#"
            UPDATE tournaments
            SET status = 'REWARDS_DISTRIBUTED',
                rewards_distributed_at = NOW(),
                updated_at = NOW()
            WHERE tournament_id = $1 AND status = 'COMPLETED'
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        );

        let tournament = sqlx::query_as::<_, Tournament>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| {
                StorageError::ConcurrencyConflict(format!(
                    "tournament {id} left COMPLETED before rewards were stamped"
                ))
            })?;

        self.append_history(
            id,
            TournamentStatus::Completed,
            TournamentStatus::RewardsDistributed,
            actor,
        )
        .await?;

        Ok(tournament)
    }

    async fn append_history(
        &mut self,
        id: Uuid,
        from: TournamentStatus,
        to: TournamentStatus,
        actor: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tournament_status_history (tournament_id, from_status, to_status, actor)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(actor)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Status history, oldest first
    pub async fn history(&mut self, id: Uuid) -> Result<Vec<StatusChange>> {
        let history = sqlx::query_as::<_, StatusChange>(
            r#"
            SELECT history_id, tournament_id, from_status, to_status, actor, changed_at
            FROM tournament_status_history
            WHERE tournament_id = $1
            ORDER BY history_id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(history)
    }

    /// Enrolled participants in enrollment order
    pub async fn participants(&mut self, id: Uuid) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT tournament_id, user_id, participant_type, enrolled_at
            FROM tournament_participants
            WHERE tournament_id = $1
            ORDER BY enrolled_at, user_id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(participants)
    }

    pub async fn session(&mut self, tournament_id: Uuid, session_id: Uuid) -> Result<TournamentSession> {
        sqlx::query_as::<_, TournamentSession>(
            r#"
            SELECT session_id, tournament_id, rounds_configured
            FROM tournament_sessions
            WHERE tournament_id = $1 AND session_id = $2
            "#,
        )
        .bind(tournament_id)
        .bind(session_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or(StorageError::NotFound)
    }

    pub async fn sessions(&mut self, tournament_id: Uuid) -> Result<Vec<TournamentSession>> {
        let sessions = sqlx::query_as::<_, TournamentSession>(
            r#"
            SELECT session_id, tournament_id, rounds_configured
            FROM tournament_sessions
            WHERE tournament_id = $1
            ORDER BY session_id
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(sessions)
    }

    pub async fn skill_mappings(&mut self, id: Uuid) -> Result<Vec<SkillMapping>> {
        let mappings = sqlx::query_as::<_, SkillMapping>(
            r#"
            SELECT tournament_id, skill_name, role
            FROM tournament_skill_mappings
            WHERE tournament_id = $1
            ORDER BY skill_name
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(mappings)
    }
}
