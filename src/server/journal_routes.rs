use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::api_error::ApiError;
use super::session::Session;
use super::state::{GuardedJournalManager, ServerState};
use crate::user::{JournalEntryUpdate, NewJournalEntry};

#[derive(Deserialize)]
struct CategoryBody {
    name: String,
}

async fn create_entry(
    session: Session,
    State(journal): State<GuardedJournalManager>,
    Json(body): Json<NewJournalEntry>,
) -> Result<Response, ApiError> {
    let entry = journal.create_entry(session.user_id, body)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Journal entry created", "entry": entry })),
    )
        .into_response())
}

async fn list_entries(
    session: Session,
    State(journal): State<GuardedJournalManager>,
) -> Result<Response, ApiError> {
    let entries = journal.list_entries(session.user_id)?;
    Ok(Json(json!({ "entries": entries })).into_response())
}

async fn get_entry(
    session: Session,
    State(journal): State<GuardedJournalManager>,
    Path(id): Path<usize>,
) -> Result<Response, ApiError> {
    Ok(Json(journal.get_entry(session.user_id, id)?).into_response())
}

async fn update_entry(
    session: Session,
    State(journal): State<GuardedJournalManager>,
    Path(id): Path<usize>,
    Json(body): Json<JournalEntryUpdate>,
) -> Result<Response, ApiError> {
    let entry = journal.update_entry(session.user_id, id, body)?;
    Ok(Json(json!({ "message": "Journal entry updated", "entry": entry })).into_response())
}

async fn delete_entry(
    session: Session,
    State(journal): State<GuardedJournalManager>,
    Path(id): Path<usize>,
) -> Result<Response, ApiError> {
    journal.delete_entry(session.user_id, id)?;
    Ok(Json(json!({ "message": "Journal entry deleted" })).into_response())
}

async fn create_category(
    session: Session,
    State(journal): State<GuardedJournalManager>,
    Json(body): Json<CategoryBody>,
) -> Result<Response, ApiError> {
    let category = journal.create_category(session.user_id, &body.name)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Category created", "category": category })),
    )
        .into_response())
}

async fn list_categories(
    session: Session,
    State(journal): State<GuardedJournalManager>,
) -> Result<Response, ApiError> {
    let categories = journal.list_categories(session.user_id)?;
    Ok(Json(json!({ "categories": categories })).into_response())
}

async fn list_category_entries(
    session: Session,
    State(journal): State<GuardedJournalManager>,
    Path(id): Path<usize>,
) -> Result<Response, ApiError> {
    let entries = journal.list_entries_in_category(session.user_id, id)?;
    Ok(Json(json!({ "entries": entries })).into_response())
}

async fn rename_category(
    session: Session,
    State(journal): State<GuardedJournalManager>,
    Path(id): Path<usize>,
    Json(body): Json<CategoryBody>,
) -> Result<Response, ApiError> {
    let category = journal.rename_category(session.user_id, id, &body.name)?;
    Ok(Json(json!({ "message": "Category updated", "category": category })).into_response())
}

async fn delete_category(
    session: Session,
    State(journal): State<GuardedJournalManager>,
    Path(id): Path<usize>,
) -> Result<Response, ApiError> {
    journal.delete_category(session.user_id, id)?;
    Ok(Json(json!({ "message": "Category deleted" })).into_response())
}

pub fn make_journal_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route(
            "/category",
            get(list_categories).post(create_category),
        )
        .route(
            "/category/{id}",
            get(list_category_entries)
                .put(rename_category)
                .delete(delete_category),
        )
        .route(
            "/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .with_state(state)
}
