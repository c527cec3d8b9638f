//! Shared state and wire types for the HTTP layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::pipeline::rag::{AdvisoryQuery, MedicalAssistant};

/// Shared context for all routes.
#[derive(Clone)]
pub struct ApiContext {
    pub assistant: Arc<MedicalAssistant>,
}

impl ApiContext {
    pub fn new(assistant: Arc<MedicalAssistant>) -> Self {
        Self { assistant }
    }
}

/// Vital-signs event posted by the wearable/mobile client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalSigns {
    pub patient_name: String,
    pub ecg_status: String,
    pub bp_value: String,
    pub spo2_value: String,
    pub location_type: String,
    pub timestamp: String,
}

impl VitalSigns {
    pub fn to_query(&self) -> AdvisoryQuery {
        AdvisoryQuery::new(
            self.ecg_status.clone(),
            self.bp_value.clone(),
            self.spo2_value.clone(),
            self.location_type.clone(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub status: String,
    pub medical_advice: String,
}
