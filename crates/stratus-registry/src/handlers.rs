use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use stratus_common::{ResolveError, VersionState};

use crate::state::AppState;

pub async fn healthz() -> &'static str {
    "ok"
}

/// Version metadata for every known image type: the version each type would
/// currently resolve to, with the selection rationale and the active rampup
/// plan where one applies.
pub async fn list_image_versions(State(st): State<AppState>) -> Response {
    let metadata = st.resolver.resolve_metadata().await;
    let body: serde_json::Map<String, serde_json::Value> = metadata
        .into_iter()
        .map(|(image_type, m)| {
            (
                image_type,
                json!({
                    "selection": m.selection,
                    "message": m.selection.message(),
                    "version": m.version,
                    "rampup": m.rampup,
                }),
            )
        })
        .collect();
    (StatusCode::OK, Json(serde_json::Value::Object(body))).into_response()
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct VersionInfoQuery {
    /// Comma-separated state filter, e.g. "active,new". Empty means any.
    states: Option<String>,
}

pub async fn get_version_info(
    State(st): State<AppState>,
    Path((image_type, version)): Path<(String, String)>,
    Query(query): Query<VersionInfoQuery>,
) -> Response {
    let states = match parse_states(query.states.as_deref()) {
        Ok(states) => states,
        Err(msg) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
        }
    };

    match st.resolver.version_info(&image_type, &version, &states).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e @ ResolveError::VersionNotFound { .. }) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": e.to_string() }))).into_response()
        }
        Err(e) => {
            tracing::error!(image_type=%image_type, version=%version, error=%e, "version info lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn parse_states(raw: Option<&str>) -> Result<Vec<VersionState>, String> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_states_accepts_lists_and_rejects_unknowns() {
        assert!(parse_states(None).unwrap().is_empty());
        assert!(parse_states(Some("")).unwrap().is_empty());
        assert_eq!(
            parse_states(Some("active, new")).unwrap(),
            vec![VersionState::Active, VersionState::New]
        );
        assert!(parse_states(Some("active,bogus")).is_err());
    }
}
