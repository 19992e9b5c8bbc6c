//! Database row models.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;

use crate::store::schema;

/// Stored game row.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::games)]
pub struct GameRow {
    id: String,
    version: i64,
    state: String,
    updated_at: NaiveDateTime,
}

/// Insertable game row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::games)]
pub struct NewGameRow {
    id: String,
    version: i64,
    state: String,
}

/// Stored decision request row; `payload` holds the whole request as JSON.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::decision_requests)]
pub struct DecisionRow {
    id: String,
    game_id: String,
    epoch: i64,
    position: i32,
    payload: String,
    created_at: NaiveDateTime,
}

/// Insertable decision request row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::decision_requests)]
pub struct NewDecisionRow {
    id: String,
    game_id: String,
    epoch: i64,
    position: i32,
    payload: String,
}
