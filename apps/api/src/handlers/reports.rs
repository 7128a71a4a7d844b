use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use hourglass_domain::{PlanLevel, TeamRole};
use tracing::info;
use uuid::Uuid;

use crate::dto::{ReportGenerationAccepted, ReportGenerationRequest, ReportQuotaResponse};
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Queues a report for a Pro caller, subject to the per-user report quota.
///
/// The body is parsed only after the plan gate and the quota check, so a
/// malformed request from a free caller still answers 403. A report scoped
/// to a team also requires membership in that team.
pub async fn generate_report_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ReportGenerationAccepted>)> {
    let grant = state
        .access_gate_service
        .require_user_with_plan(user.as_ref(), PlanLevel::Pro)
        .await
        .into_result()?;

    state
        .report_rate_limiter
        .check(grant.user.subject())
        .await?;

    let request = ReportGenerationRequest::from_body(&body)?;
    if let Some(team_id) = request.team_id {
        state
            .access_gate_service
            .require_team_role(Some(&grant.user), Some(team_id), TeamRole::Member)
            .await
            .into_result()?;
    }
    let request_id = Uuid::new_v4();

    info!(
        subject = grant.user.subject(),
        %request_id,
        team_id = ?request.team_id,
        kind = ?request.kind,
        period_start = %request.period_start,
        period_end = %request.period_end,
        "report generation queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ReportGenerationAccepted {
            request_id,
            status: "queued",
            kind: request.kind,
        }),
    ))
}

/// Reports the caller's remaining report quota without spending any.
pub async fn report_quota_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<ReportQuotaResponse>> {
    let grant = state
        .access_gate_service
        .require_user_with_plan(user.as_ref(), PlanLevel::Pro)
        .await
        .into_result()?;

    let limiter = &state.report_rate_limiter;
    let quota = limiter.peek(grant.user.subject()).await?;
    let limit = limiter.rule().max_requests();

    Ok(Json(match quota {
        Some(decision) => ReportQuotaResponse {
            limit,
            remaining: decision.remaining,
            reset_at: Some(decision.reset_at),
        },
        None => ReportQuotaResponse {
            limit,
            remaining: limit,
            reset_at: None,
        },
    }))
}
