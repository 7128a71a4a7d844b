use chrono::{DateTime, NaiveDate, Utc};
use hourglass_core::{AppError, AppResult, TeamId};
use hourglass_domain::{PlanLevel, TeamRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_REPORT_PERIOD_DAYS: i64 = 366;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PlanAccessResponse {
    pub subject: String,
    pub plan: PlanLevel,
}

#[derive(Debug, Serialize)]
pub struct TeamAccessResponse {
    pub subject: String,
    pub team_id: TeamId,
    pub role: TeamRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    TimeSummary,
    ClientBreakdown,
    ProjectProfitability,
}

#[derive(Debug, Deserialize)]
pub struct ReportGenerationRequest {
    pub kind: ReportKind,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

impl ReportGenerationRequest {
    /// Parses and validates a raw request body.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|error| AppError::Validation(format!("invalid report request: {error}")))?;
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> AppResult<()> {
        if self.period_end < self.period_start {
            return Err(AppError::Validation(
                "period_end must not be before period_start".to_owned(),
            ));
        }

        let days = (self.period_end - self.period_start).num_days() + 1;
        if days > MAX_REPORT_PERIOD_DAYS {
            return Err(AppError::Validation(format!(
                "report period must not exceed {MAX_REPORT_PERIOD_DAYS} days"
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ReportGenerationAccepted {
    pub request_id: Uuid,
    pub status: &'static str,
    pub kind: ReportKind,
}

#[derive(Debug, Serialize)]
pub struct ReportQuotaResponse {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use hourglass_core::AppError;

    use super::{ReportGenerationRequest, ReportKind};

    #[test]
    fn report_request_accepts_a_one_month_period() {
        let body = br#"{"kind":"client_breakdown","period_start":"2026-09-01","period_end":"2026-09-30"}"#;

        let request = ReportGenerationRequest::from_body(body)
            .unwrap_or_else(|error| panic!("request should be valid: {error}"));

        assert_eq!(request.kind, ReportKind::ClientBreakdown);
        assert!(request.team_id.is_none());
    }

    #[test]
    fn report_request_rejects_inverted_and_oversized_periods() {
        let inverted = br#"{"kind":"time_summary","period_start":"2026-09-30","period_end":"2026-09-01"}"#;
        let oversized = br#"{"kind":"time_summary","period_start":"2024-01-01","period_end":"2026-01-01"}"#;

        assert!(matches!(
            ReportGenerationRequest::from_body(inverted),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ReportGenerationRequest::from_body(oversized),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn report_request_rejects_malformed_json() {
        assert!(matches!(
            ReportGenerationRequest::from_body(b"{not json"),
            Err(AppError::Validation(_))
        ));
    }
}
