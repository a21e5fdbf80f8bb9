use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use super::state::AppState;
use crate::error::{MurmurError, Result};
use crate::intercept::LogEntry;
use crate::room::ClientId;
use crate::validation_error;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(rename = "clientID")]
    pub client_id: Option<String>,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
}

fn parse_start_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| validation_error!("Invalid startTime format: {}", err))
}

/// Without filters every record is returned. With filters, a record matches
/// on either its client id or its exact start time.
#[instrument(skip(state), level = "debug")]
pub async fn logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<LogEntry>>> {
    let client_id = query
        .client_id
        .filter(|id| !id.trim().is_empty())
        .map(ClientId::from);
    let start_time = match query.start_time.as_deref() {
        Some(raw) if !raw.is_empty() => Some(parse_start_time(raw)?),
        _ => None,
    };

    if client_id.is_none() && start_time.is_none() {
        return Ok(Json(state.logs.all()));
    }

    let entries = state.logs.query(client_id.as_ref(), start_time);
    if entries.is_empty() {
        return Err(MurmurError::NotFound(
            "No logs found for the specified criteria".to_string(),
        ));
    }
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_time_must_be_rfc3339() {
        assert!(parse_start_time("2024-05-01T10:00:00Z").is_ok());
        assert!(parse_start_time("2024-05-01T12:00:00+02:00").is_ok());
        assert!(matches!(
            parse_start_time("yesterday"),
            Err(MurmurError::Validation(_))
        ));
    }
}
