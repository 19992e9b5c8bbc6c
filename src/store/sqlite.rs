//! SQLite store backed by diesel.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};

use crate::decision::{DecisionId, DecisionRequest};
use crate::game::Game;
use crate::store::models::{DecisionRow, GameRow, NewDecisionRow, NewGameRow};
use crate::store::{DbError, GameStore, StoredGame, schema};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Game store persisted in a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteGameStore {
    db_path: String,
}

impl SqliteGameStore {
    /// Creates a store for the database at `db_path`.
    ///
    /// Call [`SqliteGameStore::run_migrations`] once before first use.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating SqliteGameStore");
        Ok(Self { db_path })
    }

    /// Opens the store and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, DbError> {
        let store = Self::new(db_path)?;
        store.run_migrations()?;
        Ok(store)
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migrations failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    fn decode(row: &DecisionRow) -> Result<DecisionRequest, DbError> {
        Ok(serde_json::from_str(row.payload())?)
    }
}

impl GameStore for SqliteGameStore {
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    fn create_game(&self, game: &Game) -> Result<i64, DbError> {
        let mut conn = self.connection()?;
        let row = NewGameRow::new(game.id().clone(), 1, serde_json::to_string(game)?);
        diesel::insert_into(schema::games::table)
            .values(&row)
            .execute(&mut conn)?;
        info!("Game created");
        Ok(1)
    }

    #[instrument(skip(self))]
    fn load_game(&self, id: &str) -> Result<Option<StoredGame>, DbError> {
        let mut conn = self.connection()?;
        let row = schema::games::table
            .find(id)
            .select(GameRow::as_select())
            .first(&mut conn)
            .optional()?;
        let Some(row) = row else {
            debug!("Game not found");
            return Ok(None);
        };
        let game: Game = serde_json::from_str(row.state())?;
        debug!(version = row.version(), "Game loaded");
        Ok(Some(StoredGame {
            game,
            version: *row.version(),
        }))
    }

    #[instrument(skip(self))]
    fn game_version(&self, id: &str) -> Result<Option<i64>, DbError> {
        let mut conn = self.connection()?;
        Ok(schema::games::table
            .find(id)
            .select(schema::games::version)
            .first::<i64>(&mut conn)
            .optional()?)
    }

    #[instrument(skip(self), fields(decision_id = %id))]
    fn load_decision(&self, id: &DecisionId) -> Result<Option<DecisionRequest>, DbError> {
        let mut conn = self.connection()?;
        let row = schema::decision_requests::table
            .find(id.as_str())
            .select(DecisionRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.as_ref().map(Self::decode).transpose()
    }

    #[instrument(skip(self))]
    fn pending_decisions(&self, game_id: &str) -> Result<Vec<DecisionRequest>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::decision_requests::table
            .filter(schema::decision_requests::game_id.eq(game_id))
            .order(schema::decision_requests::position.asc())
            .select(DecisionRow::as_select())
            .load(&mut conn)?;
        debug!(count = rows.len(), "Pending decisions loaded");
        rows.iter().map(Self::decode).collect()
    }

    #[instrument(skip(self, game, requests), fields(game_id = %game.id(), requests = requests.len()))]
    fn commit(
        &self,
        game: &Game,
        expected_version: i64,
        requests: &[DecisionRequest],
    ) -> Result<i64, DbError> {
        let state = serde_json::to_string(game)?;
        let rows = requests
            .iter()
            .enumerate()
            .map(|(position, request)| {
                Ok(NewDecisionRow::new(
                    request.id().as_str().to_string(),
                    request.game_id().clone(),
                    *request.epoch() as i64,
                    position as i32,
                    serde_json::to_string(request)?,
                ))
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        let mut conn = self.connection()?;
        let game_id = game.id().as_str();
        let version = conn.transaction::<i64, DbError, _>(|conn| {
            let current = schema::games::table
                .find(game_id)
                .select(schema::games::version)
                .first::<i64>(conn)
                .optional()?
                .ok_or_else(|| DbError::new(format!("Unknown game '{}'", game_id)))?;
            if current != expected_version {
                warn!(expected = expected_version, found = current, "Version conflict");
                return Err(DbError::version_conflict(game_id, expected_version, current));
            }
            let next = current + 1;
            diesel::update(schema::games::table.find(game_id))
                .set((
                    schema::games::version.eq(next),
                    schema::games::state.eq(&state),
                    schema::games::updated_at.eq(chrono::Utc::now().naive_utc()),
                ))
                .execute(conn)?;
            diesel::delete(
                schema::decision_requests::table
                    .filter(schema::decision_requests::game_id.eq(game_id)),
            )
            .execute(conn)?;
            if !rows.is_empty() {
                diesel::insert_into(schema::decision_requests::table)
                    .values(&rows)
                    .execute(conn)?;
            }
            Ok(next)
        })?;
        info!(version, "Game committed");
        Ok(version)
    }
}
