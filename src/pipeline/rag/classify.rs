use super::types::SeverityTier;

const CRITICAL_MARKERS: &[&str] = &["VENTRICULAR", "PERIGO"];
const MODERATE_MARKERS: &[&str] = &["ARRITMIA"];

/// Supraventricular rhythms are not a ventricular pattern, even though the
/// label contains "VENTRICULAR".
const SUPRAVENTRICULAR: &str = "SUPRAVENTRICULAR";

/// Map a signal classification to a severity tier.
///
/// Case-insensitive substring match, checked Critical first, so
/// "ARRITMIA VENTRICULAR" is Critical.
pub fn classify_signal(signal_classification: &str) -> SeverityTier {
    let upper = signal_classification.to_uppercase();
    let without_supra = upper.replace(SUPRAVENTRICULAR, " ");

    if contains_any(&without_supra, CRITICAL_MARKERS) {
        return SeverityTier::Critical;
    }

    if contains_any(&upper, MODERATE_MARKERS) {
        return SeverityTier::Moderate;
    }

    SeverityTier::Stable
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ventricular_and_danger_are_critical() {
        assert_eq!(classify_signal("TAQUICARDIA VENTRICULAR"), SeverityTier::Critical);
        assert_eq!(classify_signal("Fibrilação Ventricular"), SeverityTier::Critical);
        assert_eq!(classify_signal("PERIGO"), SeverityTier::Critical);
        assert_eq!(classify_signal("sinal de perigo"), SeverityTier::Critical);
        assert_eq!(classify_signal("PERIGO: Arritmia\nVentricular Detectada!"), SeverityTier::Critical);
        assert_eq!(classify_signal("EXTRASSISTOLES VENTRICULARES"), SeverityTier::Critical);
    }

    #[test]
    fn joined_labels_stay_critical() {
        assert_eq!(classify_signal("TAQUICARDIA_VENTRICULAR"), SeverityTier::Critical);
        assert_eq!(classify_signal("FIBRILACAO_VENTRICULAR"), SeverityTier::Critical);
        assert_eq!(classify_signal("ARRITMIA_VENTRICULAR"), SeverityTier::Critical);
        assert_eq!(classify_signal("SINAL_PERIGO"), SeverityTier::Critical);
        assert_eq!(classify_signal("taquicardiaventricular"), SeverityTier::Critical);
        assert_eq!(classify_signal("ECG2PERIGO"), SeverityTier::Critical);
    }

    #[test]
    fn arrhythmia_is_moderate() {
        assert_eq!(classify_signal("ARRITMIA SUPRAVENTRICULAR"), SeverityTier::Moderate);
        assert_eq!(classify_signal("Alerta: Arritmia\nSupraventricular"), SeverityTier::Moderate);
        assert_eq!(classify_signal("arritmia"), SeverityTier::Moderate);
        assert_eq!(classify_signal("ARRITMIA_SUPRAVENTRICULAR"), SeverityTier::Moderate);
        assert_eq!(classify_signal("EXTRASSISTOLE_ARRITMIA"), SeverityTier::Moderate);
    }

    #[test]
    fn critical_wins_over_moderate() {
        assert_eq!(classify_signal("ARRITMIA VENTRICULAR"), SeverityTier::Critical);
        assert_eq!(classify_signal("PERIGO VENTRICULAR"), SeverityTier::Critical);
        assert_eq!(classify_signal("ARRITMIA SUPRAVENTRICULAR PERIGO"), SeverityTier::Critical);
    }

    #[test]
    fn supraventricular_does_not_hide_a_ventricular_marker() {
        assert_eq!(
            classify_signal("SUPRAVENTRICULAR E TAQUICARDIA VENTRICULAR"),
            SeverityTier::Critical
        );
    }

    #[test]
    fn everything_else_is_stable() {
        assert_eq!(classify_signal("ESTAVEL"), SeverityTier::Stable);
        assert_eq!(classify_signal("RITMO SINUSAL NORMAL"), SeverityTier::Stable);
        assert_eq!(classify_signal("SUPRAVENTRICULAR"), SeverityTier::Stable);
        assert_eq!(classify_signal(""), SeverityTier::Stable);
    }
}
