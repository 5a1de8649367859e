/// Exponential smoothing of the raw alertness score.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    alpha: f64,
    previous: Option<f64>,
}

impl TemporalSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: clamp_alpha(alpha),
            previous: None,
        }
    }

    /// Re-clamp on config reload. Smoothing memory is kept.
    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = clamp_alpha(alpha);
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    /// `alpha * raw + (1 - alpha) * previous`; the first call seeds with `raw`.
    pub fn smooth(&mut self, raw_score: f64) -> f64 {
        let previous = self.previous.unwrap_or(raw_score);
        let smoothed = smooth(raw_score, previous, self.alpha);
        self.previous = Some(smoothed);
        smoothed
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

pub fn smooth(raw_score: f64, previous_smoothed: f64, alpha: f64) -> f64 {
    let alpha = clamp_alpha(alpha);
    (alpha * raw_score + (1.0 - alpha) * previous_smoothed).clamp(0.0, 100.0)
}

fn clamp_alpha(alpha: f64) -> f64 {
    if alpha.is_finite() {
        alpha.clamp(f64::EPSILON, 1.0)
    } else {
        1.0
    }
}
