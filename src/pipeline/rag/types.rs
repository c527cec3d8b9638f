use serde::{Deserialize, Serialize};

use super::RagError;
pub use crate::pipeline::storage::types::ScoredChunk;

/// Where the patient is, as reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentContext {
    Urban,
    RuralRemote,
}

impl DeploymentContext {
    /// `RURAL_REMOTA` (client spelling) and `RURAL_REMOTE` are rural;
    /// anything else, including unknown values, is urban.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "RURAL_REMOTA" | "RURAL_REMOTE" => DeploymentContext::RuralRemote,
            _ => DeploymentContext::Urban,
        }
    }
}

/// Severity assigned to a signal classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    Critical,
    Moderate,
    Stable,
}

impl SeverityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Critical => "critical",
            SeverityTier::Moderate => "moderate",
            SeverityTier::Stable => "stable",
        }
    }
}

/// A vital-signs event to advise on. All fields are passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryQuery {
    pub signal_classification: String,
    /// "SYS/DIA"
    pub blood_pressure: String,
    /// "NN%"
    pub oxygen_saturation: String,
    pub deployment_context: String,
}

impl AdvisoryQuery {
    pub fn new(
        signal_classification: impl Into<String>,
        blood_pressure: impl Into<String>,
        oxygen_saturation: impl Into<String>,
        deployment_context: impl Into<String>,
    ) -> Self {
        Self {
            signal_classification: signal_classification.into(),
            blood_pressure: blood_pressure.into(),
            oxygen_saturation: oxygen_saturation.into(),
            deployment_context: deployment_context.into(),
        }
    }

    /// Text embedded to retrieve supporting protocol passages.
    pub fn search_text(&self) -> String {
        format!(
            "treatment and protocol for arrhythmia {} with pressure {} and SpO2 {} in context {}",
            self.signal_classification,
            self.blood_pressure,
            self.oxygen_saturation,
            self.deployment_context
        )
    }

    pub fn context(&self) -> DeploymentContext {
        DeploymentContext::parse(&self.deployment_context)
    }
}

/// Vector search abstraction for the retrieval step.
pub trait VectorSearch: Send + Sync {
    fn search(&self, query_embedding: &[f32], top_k: usize)
        -> Result<Vec<ScoredChunk>, RagError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
