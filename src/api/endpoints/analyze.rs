//! Vital-signs analysis endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{AnalyzeResponse, ApiContext, VitalSigns};

/// Returned when the advisory task itself dies.
pub const ADVICE_FALLBACK: &str = "Erro na IA. Consulte médico imediatamente.";

/// `POST /analyze`: advisory for one vital-signs event.
///
/// Retrieval runs on the blocking pool. Retrieval failures already degrade
/// inside the assistant; only a panicked task reaches the fallback text.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    payload: Result<Json<VitalSigns>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(vitals) = payload?;

    tracing::info!(
        ecg_status = %vitals.ecg_status,
        location = %vitals.location_type,
        timestamp = %vitals.timestamp,
        "Vital signs received"
    );

    let query = vitals.to_query();
    let assistant = ctx.assistant.clone();
    let medical_advice = match tokio::task::spawn_blocking(move || assistant.get_advice(&query)).await
    {
        Ok(advice) => advice,
        Err(e) => {
            tracing::error!("Advisory task failed: {e}");
            ADVICE_FALLBACK.to_string()
        }
    };

    Ok(Json(AnalyzeResponse {
        status: "received".to_string(),
        medical_advice,
    }))
}
