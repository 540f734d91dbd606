use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tally_ledger::{AuditReport, LedgerError, VoteCaster, VoteReader};
use tally_types::{Direction, Tally, TargetId, TargetRef, TargetType, VoteOutcome};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

type AppStateRef = State<Arc<AppState>>;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserVoteResponse {
    pub user_vote: Option<Direction>,
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    /// Comma-separated target ids.
    #[serde(default)]
    pub ids: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub votes: BTreeMap<TargetId, Option<Direction>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TallyResponse {
    pub vote_count: i64,
    pub upvotes: i64,
    pub downvotes: i64,
}

impl From<Tally> for TallyResponse {
    fn from(t: Tally) -> Self {
        Self {
            vote_count: t.vote_count(),
            upvotes: t.upvotes,
            downvotes: t.downvotes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub repair: bool,
}

fn target_ref(target_type: &str, target_id: &str) -> ServerResult<TargetRef> {
    let target_type: TargetType = target_type.parse()?;
    Ok(TargetRef::new(target_type, TargetId::parse(target_id)?))
}

fn parse_ids(raw: &str, max: usize) -> ServerResult<Vec<TargetId>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(TargetId::parse)
        .collect::<Result<Vec<_>, _>>()?;
    if ids.len() > max {
        return Err(ServerError::BadRequest(format!(
            "batch of {} ids exceeds limit of {max}",
            ids.len()
        )));
    }
    Ok(ids)
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// `POST /v1/votes/:target_type/:target_id`
///
/// The body is checked after the caller, so an anonymous request is 401
/// whatever it carries, and a malformed body is `invalid_argument`.
pub async fn cast_vote_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
    Path((target_type, target_id)): Path<(String, String)>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> ServerResult<Json<VoteOutcome>> {
    let identity = state
        .identify(&headers)
        .await?
        .ok_or(LedgerError::Unauthorized)?;
    let Json(request) = body.map_err(|e| LedgerError::InvalidArgument(e.body_text()))?;
    let target = target_ref(&target_type, &target_id)?;
    let outcome = state
        .ledger
        .cast_vote(Some(&identity.user_id), &target, &request.direction)?;
    Ok(Json(outcome))
}

/// `GET /v1/votes/:target_type/:target_id`
///
/// Anonymous callers have no votes, so they get `null` rather than 401.
pub async fn user_vote_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
    Path((target_type, target_id)): Path<(String, String)>,
) -> ServerResult<Json<UserVoteResponse>> {
    let target = target_ref(&target_type, &target_id)?;
    let user_vote = match state.identify(&headers).await? {
        Some(identity) => state.ledger.user_vote(&identity.user_id, &target)?,
        None => None,
    };
    Ok(Json(UserVoteResponse { user_vote }))
}

/// `GET /v1/votes/:target_type?ids=a,b,c`
pub async fn user_votes_batch_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
    Path(target_type): Path<String>,
    Query(query): Query<BatchQuery>,
) -> ServerResult<Json<BatchResponse>> {
    let target_type: TargetType = target_type.parse()?;
    let ids = parse_ids(&query.ids, state.config.max_batch_size)?;
    let votes = match state.identify(&headers).await? {
        Some(identity) => state.ledger.user_votes(&identity.user_id, target_type, &ids)?,
        None => ids.into_iter().map(|id| (id, None)).collect(),
    };
    Ok(Json(BatchResponse { votes }))
}

/// `PUT /v1/targets/:target_type/:target_id`
///
/// Stand-in for the content store announcing a new post or comment.
/// Requires the admin token.
pub async fn register_target_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
    Path((target_type, target_id)): Path<(String, String)>,
) -> ServerResult<(StatusCode, Json<TallyResponse>)> {
    state.require_admin(&headers)?;
    let target = target_ref(&target_type, &target_id)?;
    state.ledger.store().register_target(target)?;
    Ok((StatusCode::CREATED, Json(Tally::default().into())))
}

/// `GET /v1/targets/:target_type/:target_id`
pub async fn tally_handler(
    State(state): AppStateRef,
    Path((target_type, target_id)): Path<(String, String)>,
) -> ServerResult<Json<TallyResponse>> {
    let target = target_ref(&target_type, &target_id)?;
    Ok(Json(state.ledger.tally(&target)?.into()))
}

/// `POST /v1/targets/:target_type/:target_id/audit?repair=true`
///
/// Requires the admin token.
pub async fn audit_handler(
    State(state): AppStateRef,
    headers: HeaderMap,
    Path((target_type, target_id)): Path<(String, String)>,
    Query(query): Query<AuditQuery>,
) -> ServerResult<Json<AuditReport>> {
    state.require_admin(&headers)?;
    let target = target_ref(&target_type, &target_id)?;
    let report = if query.repair {
        state.ledger.repair(&target)?
    } else {
        state.ledger.audit(&target)?
    };
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_trims_and_skips_blanks() {
        let ids = parse_ids(" a, b,,c ", 10).unwrap();
        let raw: Vec<&str> = ids.iter().map(TargetId::as_str).collect();
        assert_eq!(raw, vec!["a", "b", "c"]);
        assert!(parse_ids("", 10).unwrap().is_empty());
    }

    #[test]
    fn parse_ids_enforces_limit() {
        let err = parse_ids("a,b,c", 2).unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
    }

    #[test]
    fn target_ref_rejects_unknown_type() {
        let err = target_ref("communities", "x").unwrap_err();
        assert!(matches!(err, ServerError::Ledger(LedgerError::InvalidArgument(_))));
    }
}
