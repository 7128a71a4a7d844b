use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use hourglass_core::{AppError, AppResult, TeamId};
use hourglass_domain::{PlanLevel, TeamRole};

use crate::dto::{PlanAccessResponse, TeamAccessResponse};
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Header selecting the team a team-role check applies to.
pub const TEAM_ID_HEADER: &str = "x-team-id";

pub async fn plan_access_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(min_plan): Path<String>,
) -> ApiResult<Json<PlanAccessResponse>> {
    let min_plan = PlanLevel::parse(min_plan.as_str())?;
    let grant = state
        .access_gate_service
        .require_user_with_plan(user.as_ref(), min_plan)
        .await
        .into_result()?;

    Ok(Json(PlanAccessResponse {
        subject: grant.user.subject().to_owned(),
        plan: grant.plan,
    }))
}

pub async fn team_access_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(min_role): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<TeamAccessResponse>> {
    let min_role = TeamRole::parse(min_role.as_str())?;
    let requested_team = requested_team(&headers)?;
    let grant = state
        .access_gate_service
        .require_team_role(user.as_ref(), requested_team, min_role)
        .await
        .into_result()?;

    Ok(Json(TeamAccessResponse {
        subject: grant.user.subject().to_owned(),
        team_id: grant.team_id,
        role: grant.role,
    }))
}

pub(crate) fn requested_team(headers: &HeaderMap) -> AppResult<Option<TeamId>> {
    let Some(value) = headers.get(TEAM_ID_HEADER) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AppError::Validation("X-Team-Id must be valid ASCII".to_owned()))?;
    if value.trim().is_empty() {
        return Ok(None);
    }

    value.parse::<TeamId>().map(Some)
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use hourglass_core::{AppError, TeamId};

    use super::{TEAM_ID_HEADER, requested_team};

    #[test]
    fn missing_or_blank_team_header_selects_default_team() {
        let mut headers = HeaderMap::new();
        assert!(matches!(requested_team(&headers), Ok(None)));

        headers.insert(TEAM_ID_HEADER, HeaderValue::from_static("  "));
        assert!(matches!(requested_team(&headers), Ok(None)));
    }

    #[test]
    fn team_header_parses_uuid_and_rejects_garbage() {
        let team_id = TeamId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            TEAM_ID_HEADER,
            HeaderValue::from_str(team_id.to_string().as_str())
                .unwrap_or_else(|error| panic!("header should be valid: {error}")),
        );
        assert!(matches!(requested_team(&headers), Ok(Some(value)) if value == team_id));

        headers.insert(TEAM_ID_HEADER, HeaderValue::from_static("team-one"));
        assert!(matches!(
            requested_team(&headers),
            Err(AppError::Validation(_))
        ));
    }
}
