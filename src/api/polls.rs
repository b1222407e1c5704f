use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::db::models::{CreatePollRequest, NewPoll, Poll, PollResults, VoteRequest, VoteResponse};
use crate::db::repository::PollRepository;
use crate::error::AppError;

fn invalid_option_index() -> AppError {
    AppError::BadRequest("Invalid option index".into())
}

/// List every poll, newest first.
pub async fn list_polls(repo: &dyn PollRepository) -> Result<Vec<Poll>, AppError> {
    repo.list_newest_first()
        .await
        .map_err(|e| e.with_public_message("Failed to fetch polls"))
}

/// Fetch a single poll, failing with `NotFound` for unknown identifiers.
pub async fn get_poll(repo: &dyn PollRepository, id: &str) -> Result<Poll, AppError> {
    repo.find_by_id(id)
        .await
        .map_err(|e| e.with_public_message("Failed to fetch poll"))?
        .ok_or_else(|| AppError::NotFound("Poll not found".into()))
}

/// Validate the payload and store a new poll.
pub async fn create_poll(
    repo: &dyn PollRepository,
    request: CreatePollRequest,
) -> Result<Poll, AppError> {
    let (Some(question), Some(options)) = (request.question, request.options) else {
        return Err(AppError::BadRequest("Invalid poll data".into()));
    };
    let new_poll = NewPoll::parse(&question, &options)?;

    let poll = repo
        .insert(new_poll)
        .await
        .map_err(|e| e.with_public_message("Failed to create poll"))?;

    tracing::info!(poll_id = %poll.id, options = poll.options.len(), "Poll created");
    Ok(poll)
}

/// Record one vote.
///
/// Checks run in order: the index must be present and non-negative before
/// the store is touched, the poll must exist, and the index must fall within
/// the stored options. The increment itself is atomic in the store.
pub async fn cast_vote(
    repo: &dyn PollRepository,
    id: &str,
    request: VoteRequest,
) -> Result<VoteResponse, AppError> {
    let option_index = request
        .option_index
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(invalid_option_index)?;

    let poll = repo
        .find_by_id(id)
        .await
        .map_err(|e| e.with_public_message("Failed to update poll"))?
        .ok_or_else(|| AppError::NotFound("Poll not found".into()))?;
    if option_index >= poll.options.len() {
        return Err(invalid_option_index());
    }

    let poll = repo
        .increment_vote(id, option_index)
        .await
        .map_err(|e| e.with_public_message("Failed to update poll"))?;

    tracing::info!(poll_id = %poll.id, option_index, "Vote recorded");
    Ok(VoteResponse {
        message: "Vote recorded".to_string(),
        poll,
    })
}

/// Compute the chart tally for a poll.
pub async fn poll_results(repo: &dyn PollRepository, id: &str) -> Result<PollResults, AppError> {
    let poll = get_poll(repo, id).await?;
    Ok(PollResults::from(&poll))
}

/// Axum handler for `GET /polls`.
pub async fn list_polls_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Poll>>, AppError> {
    let polls = list_polls(state.poll_repo.as_ref()).await?;
    Ok(Json(polls))
}

/// Axum handler for `GET /polls/{id}`.
pub async fn get_poll_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Poll>, AppError> {
    let poll = get_poll(state.poll_repo.as_ref(), &id).await?;
    Ok(Json(poll))
}

/// Axum handler for `POST /polls` and `POST /polls/create`.
pub async fn create_poll_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreatePollRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Poll>), AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!("Rejected poll payload: {rejection}");
        AppError::BadRequest("Invalid poll data".into())
    })?;

    let poll = create_poll(state.poll_repo.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(poll)))
}

/// Axum handler for `PUT /polls/{id}`.
pub async fn vote_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!("Rejected vote payload: {rejection}");
        invalid_option_index()
    })?;

    let response = cast_vote(state.poll_repo.as_ref(), &id, request).await?;
    Ok(Json(response))
}

/// Axum handler for `GET /polls/{id}/results`.
pub async fn poll_results_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PollResults>, AppError> {
    let results = poll_results(state.poll_repo.as_ref(), &id).await?;
    Ok(Json(results))
}
