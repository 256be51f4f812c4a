use crate::RiskThresholds;
use chrono::NaiveDate;
use scintel_common::feeds::FxObservation;
use scintel_common::types::RagScore;

/// `|latest - reference| / reference * 100`, or `None` when the reference
/// cannot be divided by.
pub fn volatility_pct(latest: f64, reference: f64) -> Option<f64> {
    if !latest.is_finite() || !reference.is_finite() || reference == 0.0 {
        return None;
    }
    Some(((latest - reference) / reference).abs() * 100.0)
}

/// Band a volatility reading. Both band edges are inclusive.
pub fn fx_rag(volatility: Option<f64>, thresholds: &RiskThresholds) -> RagScore {
    match volatility {
        None => RagScore::Unknown,
        Some(v) if v >= thresholds.fx_red_pct => RagScore::Red,
        Some(v) if v <= thresholds.fx_green_pct => RagScore::Green,
        Some(_) => RagScore::Amber,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FxAssessment {
    pub current_rate: Option<f64>,
    pub reference_rate: Option<f64>,
    pub volatility_pct: Option<f64>,
    pub observation_date: Option<NaiveDate>,
    pub rag: RagScore,
}

/// Score a date-ordered observation window.
///
/// The reference is the earliest valued observation. With a single valued
/// observation, `previous_rate` (the last published rate) is used instead.
pub fn assess_fx(
    observations: &[FxObservation],
    previous_rate: Option<f64>,
    thresholds: &RiskThresholds,
) -> FxAssessment {
    let valued: Vec<(Option<NaiveDate>, f64)> = observations
        .iter()
        .filter_map(|o| o.rate.map(|r| (o.date, r)))
        .collect();

    let latest = valued.last().copied();
    let reference = match valued.len() {
        0 => None,
        1 => previous_rate.filter(|r| r.is_finite() && *r > 0.0),
        _ => valued.first().map(|(_, r)| *r),
    };

    let volatility = match (latest, reference) {
        (Some((_, current)), Some(reference)) => volatility_pct(current, reference),
        _ => None,
    };

    FxAssessment {
        current_rate: latest.map(|(_, r)| r),
        reference_rate: reference,
        volatility_pct: volatility,
        observation_date: latest.and_then(|(d, _)| d),
        rag: fx_rag(volatility, thresholds),
    }
}

/// Readable macro digest for `pair`.
pub fn macro_summary(pair: &str, fx: &FxAssessment, thresholds: &RiskThresholds) -> String {
    let Some(current) = fx.current_rate else {
        return format!("{pair}: no reference rate published in the observation window.");
    };
    let date = fx
        .observation_date
        .map(|d| format!(" on {d}"))
        .unwrap_or_default();

    match (fx.reference_rate, fx.volatility_pct) {
        (Some(reference), Some(volatility)) => {
            let band = match fx.rag {
                RagScore::Red => {
                    format!("High volatility (at or above {:.1}%)", thresholds.fx_red_pct)
                }
                RagScore::Green => format!("Stable (at or below {:.1}%)", thresholds.fx_green_pct),
                _ => "Elevated volatility".to_string(),
            };
            format!(
                "{pair} at {current:.4}{date}, {volatility:.2}% move from {reference:.4}. {band}."
            )
        }
        _ => format!("{pair} at {current:.4}{date}. Not enough history to measure volatility."),
    }
}
