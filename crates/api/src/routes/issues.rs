//! Issue endpoints.
//!
//! Each handler turns a request into a command and hands it to the
//! [`IssueService`]; none of them touches aggregate state directly.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::AggregateId;
use domain::{
    Aggregate, CloseIssue, CommentIssue, Entity, Issue, IssueCommented, IssueEvent, IssueService,
    OpenIssue,
};
use event_store::{EventEnvelope, EventStore};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub issue_service: IssueService<S>,
}

impl<S: EventStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            issue_service: IssueService::new(store),
        }
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct OpenIssueRequest {
    pub title: String,
}

#[derive(Deserialize)]
pub struct CommentIssueRequest {
    pub message: String,
}

#[derive(Deserialize)]
pub struct CloseIssueRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct IssueOpenedResponse {
    pub issue_id: String,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct IssueResponse {
    pub id: String,
    pub title: Option<String>,
    pub state: String,
    pub opened_at: Option<String>,
    pub comments: Vec<CommentResponse>,
    pub version: u64,
}

impl From<&Issue> for IssueResponse {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id().to_string(),
            title: issue.title().map(String::from),
            state: issue.state().to_string(),
            opened_at: issue.opened_at().map(|at| at.to_rfc3339()),
            comments: issue
                .comments()
                .iter()
                .map(|comment| CommentResponse {
                    id: comment.id().to_string(),
                    message: comment.message().to_string(),
                })
                .collect(),
            version: issue.version().as_u64(),
        }
    }
}

/// Outcome of a comment request. `recorded` is false when the message was
/// blank and nothing was stored.
#[derive(Serialize)]
pub struct CommentRecordedResponse {
    pub issue_id: String,
    pub recorded: bool,
    pub comment_id: Option<String>,
}

#[derive(Serialize)]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub version: u64,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

impl From<EventEnvelope> for EventEnvelopeResponse {
    fn from(e: EventEnvelope) -> Self {
        Self {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            aggregate_id: e.aggregate_id.to_string(),
            version: e.version.as_u64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
        }
    }
}

// -- Handlers --

/// POST /issues: open a new issue.
#[tracing::instrument(skip(state, req))]
pub async fn open<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<OpenIssueRequest>,
) -> Result<(StatusCode, Json<IssueOpenedResponse>), ApiError> {
    let cmd = OpenIssue::titled(req.title);
    let issue_id = cmd.issue_id;
    state.issue_service.open_issue(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(IssueOpenedResponse {
            issue_id: issue_id.to_string(),
        }),
    ))
}

/// GET /issues: every opened issue, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<IssueResponse>>, ApiError> {
    let service = &state.issue_service;
    let ids = service.list_issue_ids().await?;
    let issues = try_join_all(ids.into_iter().map(|id| service.get_issue(id))).await?;

    Ok(Json(issues.iter().flatten().map(IssueResponse::from).collect()))
}

/// GET /issues/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<IssueResponse>, ApiError> {
    let issue = load(&state.issue_service, &id).await?;
    Ok(Json(IssueResponse::from(&issue)))
}

/// POST /issues/{id}/comments: leave a comment.
///
/// A blank message is accepted and records nothing.
#[tracing::instrument(skip(state, req))]
pub async fn comment<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CommentIssueRequest>,
) -> Result<Json<CommentRecordedResponse>, ApiError> {
    let issue_id = parse_issue_id(&id)?;
    let result = state
        .issue_service
        .comment_issue(CommentIssue::new(issue_id, req.message))
        .await?;

    let comment_id = result.events.iter().find_map(|event| match event {
        IssueEvent::IssueCommented(IssueCommented { comment_id, .. }) => Some(*comment_id),
        _ => None,
    });

    Ok(Json(CommentRecordedResponse {
        issue_id: issue_id.to_string(),
        recorded: comment_id.is_some(),
        comment_id: comment_id.map(|id| id.to_string()),
    }))
}

/// POST /issues/{id}/close: close an issue; the body is optional.
#[tracing::instrument(skip(state, req))]
pub async fn close<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    req: Option<Json<CloseIssueRequest>>,
) -> Result<Json<IssueResponse>, ApiError> {
    let issue_id = parse_issue_id(&id)?;
    let reason = req.and_then(|Json(req)| req.reason);

    let result = state
        .issue_service
        .close_issue(CloseIssue::new(issue_id, reason))
        .await?;

    Ok(Json(IssueResponse::from(&result.aggregate)))
}

/// GET /issues/{id}/events: the stored event stream of an issue.
#[tracing::instrument(skip(state))]
pub async fn events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let issue_id = parse_issue_id(&id)?;

    let envelopes = state
        .issue_service
        .store()
        .get_events_for_aggregate(issue_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    if envelopes.is_empty() {
        return Err(ApiError::NotFound(format!("Issue {id} not found")));
    }

    Ok(Json(
        envelopes.into_iter().map(EventEnvelopeResponse::from).collect(),
    ))
}

async fn load<S: EventStore>(service: &IssueService<S>, id: &str) -> Result<Issue, ApiError> {
    service
        .get_issue(parse_issue_id(id)?)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Issue {id} not found")))
}

fn parse_issue_id(id: &str) -> Result<AggregateId, ApiError> {
    id.parse::<AggregateId>().map_err(ApiError::from)
}
