use sqlx::{PgConnection, QueryBuilder};
use uuid::Uuid;

use crate::dto::ranking::RoundResultInput;
use crate::error::Result;
use crate::models::RoundResult;

pub struct RoundResultRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> RoundResultRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Append results; rows already submitted for the same round and participant are kept as-is.
    pub async fn append(
        &mut self,
        tournament_id: Uuid,
        session_id: Uuid,
        results: &[RoundResultInput],
    ) -> Result<u64> {
        if results.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::new(
            r#"
            INSERT INTO round_results (
                tournament_id, session_id, round_number, user_id, participant_type, points, outcome
            )
            "#,
        );
        query.push_values(results, |mut row, result| {
            row.push_bind(tournament_id)
                .push_bind(session_id)
                .push_bind(result.round_number)
                .push_bind(result.user_id)
                .push_bind(result.participant_type)
                .push_bind(result.points)
                .push_bind(result.outcome);
        });
        query.push(" ON CONFLICT ON CONSTRAINT uq_round_results_entry DO NOTHING");

        let inserted = query.build().execute(&mut *self.conn).await?;

        Ok(inserted.rows_affected())
    }

    /// Every stored result of the tournament, across all of its sessions.
    pub async fn list_for_tournament(&mut self, tournament_id: Uuid) -> Result<Vec<RoundResult>> {
        let results = sqlx::query_as::<_, RoundResult>(
            r#"
            SELECT result_id, tournament_id, session_id, round_number, user_id,
                   participant_type, points, outcome, submitted_at
            FROM round_results
            WHERE tournament_id = $1
            ORDER BY session_id, round_number, result_id
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(results)
    }
}
