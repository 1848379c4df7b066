//! REST-Steuerschnittstelle (/v1/...)
//!
//! Erlaubt der Host-Anwendung, Sessions zu starten und zu stoppen und
//! Floor-Entscheidungen an Endpunkte weiterzuleiten.
//!
//! Fehler werden als `{"error": {"code", "message"}}` mit dem Statuscode aus
//! `SessionError::http_status` beantwortet.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use podium_core::types::{ConferenceId, EndpointId};
use podium_observability::FloorMetrics;
use podium_session::{SessionAnfrage, SessionError, SessionKoordinator};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

/// Axum-State der REST-API
#[derive(Clone)]
pub struct ApiState {
    pub koordinator: SessionKoordinator,
    pub metriken: FloorMetrics,
}

/// Body der Entscheidungs-Endpunkte
#[derive(Debug, Deserialize)]
pub struct EntscheidungBody {
    pub granted: bool,
}

/// Antwort von `floor-status`
#[derive(Debug, Serialize, Deserialize)]
pub struct RundsendeAntwort {
    pub empfaenger: usize,
}

/// Antwort von `GET /v1/conferences/:conference_id`
#[derive(Debug, Serialize, Deserialize)]
pub struct KonferenzAntwort {
    pub conference_id: ConferenceId,
    pub mitglieder: Vec<EndpointId>,
}

/// Fehler-Antwort der REST-API
pub struct ApiFehler(SessionError);

impl From<SessionError> for ApiFehler {
    fn from(fehler: SessionError) -> Self {
        Self(fehler)
    }
}

impl IntoResponse for ApiFehler {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!(fehler = %self.0, "REST-Anfrage fehlgeschlagen");
        }
        (
            status,
            Json(json!({ "error": { "code": self.0.code(), "message": self.0.to_string() } })),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiFehler>;

/// Erstellt den vollstaendigen /v1/-Router
pub fn v1_router(state: ApiState) -> Router {
    Router::new()
        // Sessions
        .route("/v1/sessions", post(session_starten))
        .route("/v1/sessions/:endpoint_id", delete(session_stoppen))
        // Floor-Entscheidungen
        .route(
            "/v1/conferences/:conference_id/endpoints/:endpoint_id/floor-request-response",
            post(floor_request_beantworten),
        )
        .route(
            "/v1/conferences/:conference_id/endpoints/:endpoint_id/floor-status",
            post(floor_status_rundsenden),
        )
        .route(
            "/v1/conferences/:conference_id/endpoints/:endpoint_id/floor-query-response",
            post(floor_query_beantworten),
        )
        // Abfragen
        .route("/v1/conferences/:conference_id", get(konferenz_abfragen))
        .route("/v1/stats", get(statistik))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn session_starten(
    State(state): State<ApiState>,
    Json(anfrage): Json<SessionAnfrage>,
) -> ApiResult<Response> {
    let antwort = state.koordinator.session_starten(anfrage).await?;
    Ok((StatusCode::CREATED, Json(antwort)).into_response())
}

async fn session_stoppen(
    State(state): State<ApiState>,
    Path(endpoint_id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.koordinator.session_stoppen(EndpointId(endpoint_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn floor_request_beantworten(
    State(state): State<ApiState>,
    Path((conference_id, endpoint_id)): Path<(u64, u64)>,
    Json(body): Json<EntscheidungBody>,
) -> ApiResult<StatusCode> {
    state.koordinator.floor_request_beantworten(
        ConferenceId(conference_id),
        EndpointId(endpoint_id),
        body.granted,
    )?;
    state.metriken.entscheidung_zaehlen(body.granted);
    Ok(StatusCode::NO_CONTENT)
}

async fn floor_status_rundsenden(
    State(state): State<ApiState>,
    Path((conference_id, endpoint_id)): Path<(u64, u64)>,
    Json(body): Json<EntscheidungBody>,
) -> ApiResult<Json<RundsendeAntwort>> {
    let empfaenger = state.koordinator.floor_status_rundsenden(
        ConferenceId(conference_id),
        EndpointId(endpoint_id),
        body.granted,
    )?;
    Ok(Json(RundsendeAntwort { empfaenger }))
}

async fn floor_query_beantworten(
    State(state): State<ApiState>,
    Path((conference_id, endpoint_id)): Path<(u64, u64)>,
    Json(body): Json<EntscheidungBody>,
) -> ApiResult<StatusCode> {
    state.koordinator.floor_query_beantworten(
        ConferenceId(conference_id),
        EndpointId(endpoint_id),
        body.granted,
    )?;
    Ok(StatusCode::NO_CONTENT)
}

async fn konferenz_abfragen(
    State(state): State<ApiState>,
    Path(conference_id): Path<u64>,
) -> ApiResult<Json<KonferenzAntwort>> {
    let conference_id = ConferenceId(conference_id);
    let mitglieder = state.koordinator.konferenz_mitglieder(conference_id);
    if mitglieder.is_empty() {
        return Err(SessionError::UnbekannteKonferenz(conference_id).into());
    }
    Ok(Json(KonferenzAntwort {
        conference_id,
        mitglieder,
    }))
}

async fn statistik(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.koordinator.statistik())
}
