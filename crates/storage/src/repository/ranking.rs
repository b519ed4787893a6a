use sqlx::{PgConnection, QueryBuilder};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Ranking;

pub struct RankingRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> RankingRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_tournament(&mut self, tournament_id: Uuid) -> Result<Vec<Ranking>> {
        let rankings = sqlx::query_as::<_, Ranking>(
            r#"
            SELECT tournament_id, user_id, participant_type, rank, points, losses
            FROM rankings
            WHERE tournament_id = $1
            ORDER BY rank
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rankings)
    }

    pub async fn exists_for_tournament(&mut self, tournament_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM rankings WHERE tournament_id = $1)",
        )
        .bind(tournament_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(exists)
    }

    /// Plain insert: a second writer hits `uq_rankings_participant` instead of
    /// silently merging into the first writer's set.
    pub async fn insert_all(&mut self, rankings: &[Ranking]) -> Result<u64> {
        if rankings.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::new(
            "INSERT INTO rankings (tournament_id, user_id, participant_type, rank, points, losses) ",
        );
        query.push_values(rankings, |mut row, ranking| {
            row.push_bind(ranking.tournament_id)
                .push_bind(ranking.user_id)
                .push_bind(ranking.participant_type)
                .push_bind(ranking.rank)
                .push_bind(ranking.points)
                .push_bind(ranking.losses);
        });

        let result = query.build().execute(&mut *self.conn).await?;

        Ok(result.rows_affected())
    }
}
