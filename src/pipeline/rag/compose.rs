//! Advisory text templates.
//!
//! Output is Portuguese: it is read by clinicians on the client dashboard.

use super::types::{DeploymentContext, SeverityTier};

pub const ADVISORY_HEADER: &str = "ANÁLISE IA (Baseada em Protocolos SBC/MS):\n";
pub const CRITICAL_ALERT: &str = "🚨 ALERTA CRÍTICO: Padrão ventricular detectado.";
pub const RURAL_PROTOCOL: &str = "📍 PROTOCOLO RURAL: Estabilização imediata necessária. \
     Acionar telemedicina via satélite. Considerar uso de Amiodarona se disponível \
     (conforme Consenso Chagas).";
pub const URBAN_PROTOCOL: &str =
    "📍 PROTOCOLO URBANO: Remoção imediata via SAMU (192) para centro com suporte de desfibrilação.";
pub const EVIDENCE_HEADER: &str = "\n📚 EVIDÊNCIA ENCONTRADA NOS MANUAIS:\n";
pub const MODERATE_ALERT: &str = "⚠️ ATENÇÃO: Arritmia Supraventricular/Extrassístole.";
pub const MODERATE_GUIDANCE: &str =
    "Monitorar evolução. Se paciente chagásico, investigar progressão da cardiopatia.";
pub const STABLE_MESSAGE: &str = "✅ Sinais estáveis. Manter monitoramento de rotina.";

/// Build the advisory for a tier. `context` is only surfaced for Critical,
/// truncated to `evidence_chars` characters.
pub fn compose_advisory(
    tier: SeverityTier,
    deployment: DeploymentContext,
    context: &str,
    evidence_chars: usize,
) -> String {
    let mut text = String::from(ADVISORY_HEADER);

    match tier {
        SeverityTier::Critical => {
            text.push_str(CRITICAL_ALERT);
            text.push('\n');
            text.push_str(match deployment {
                DeploymentContext::RuralRemote => RURAL_PROTOCOL,
                DeploymentContext::Urban => URBAN_PROTOCOL,
            });
            text.push('\n');

            if !context.trim().is_empty() {
                text.push_str(EVIDENCE_HEADER);
                text.push_str(truncate_chars(context, evidence_chars));
                text.push_str("...");
            }
        }
        SeverityTier::Moderate => {
            text.push_str(MODERATE_ALERT);
            text.push('\n');
            text.push_str(MODERATE_GUIDANCE);
        }
        SeverityTier::Stable => {
            text.push_str(STABLE_MESSAGE);
        }
    }

    text
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
