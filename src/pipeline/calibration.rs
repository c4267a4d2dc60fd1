//! Deterministic score calibration applied to rubric results

/// Lift mid-range dimension scores by half a point.
///
/// Zero means "not assessed" and scores of 9 or above are already at the top
/// of the scale; both pass through unchanged.
pub fn calibrate_score(raw: f64) -> f64 {
    if raw == 0.0 || raw >= 9.0 {
        raw
    } else {
        raw + 0.5
    }
}

/// Piecewise-linear calibration of the narrative quality index.
pub fn calibrate_nqi(raw: f64) -> f64 {
    if raw == 0.0 {
        return raw;
    }
    let adjusted = if raw >= 95.0 {
        raw * 0.95 + 5.0
    } else if raw >= 75.0 {
        raw * 1.10 - 3.0
    } else if raw >= 50.0 {
        raw * 1.20 - 5.0
    } else if raw >= 25.0 {
        raw * 1.30 - 8.0
    } else {
        raw * 1.80 + 15.0
    };
    adjusted.round()
}
