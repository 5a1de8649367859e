use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::config::ForecastConfig;

const DEFAULT_HISTORY_SIZE: usize = 600;

/// Time-bounded, strictly time-ordered buffer of smoothed scores.
#[derive(Debug, Clone)]
pub struct ScoreHistory {
    capacity: usize,
    lookback: Duration,
    points: VecDeque<(DateTime<Utc>, f64)>,
}

impl ScoreHistory {
    pub fn new(lookback: Duration) -> Self {
        Self::with_capacity(lookback, DEFAULT_HISTORY_SIZE)
    }

    pub fn with_capacity(lookback: Duration, capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            lookback,
            points: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a point, evicting anything older than the lookback window.
    ///
    /// Returns false (and keeps the buffer untouched) when `at` does not
    /// advance past the newest point.
    pub fn push(&mut self, at: DateTime<Utc>, score: f64) -> bool {
        if let Some((last, _)) = self.points.back() {
            if at <= *last {
                return false;
            }
        }

        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back((at, score));
        // a window reaching past the calendar range keeps everything
        if let Some(cutoff) = at.checked_sub_signed(self.lookback) {
            self.evict_before(cutoff);
        }
        true
    }

    fn evict_before(&mut self, cutoff: DateTime<Utc>) {
        while let Some((t, _)) = self.points.front() {
            if *t < cutoff {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    /// Apply a new window; shrinking evicts immediately.
    pub fn reconfigure(&mut self, lookback: Duration, capacity: usize) {
        self.lookback = lookback;
        self.capacity = capacity.max(2);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
        if let Some(cutoff) = self
            .points
            .back()
            .and_then(|(newest, _)| newest.checked_sub_signed(lookback))
        {
            self.evict_before(cutoff);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(DateTime<Utc>, f64)> {
        self.points.iter()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub forecast_score: f64,
    /// Coefficient of determination of the fit, in [0,1].
    pub confidence: f64,
    /// Fitted slope in score points per minute.
    pub rate_per_min: f64,
}

impl Trend {
    pub fn neutral(score: f64) -> Self {
        Self {
            direction: TrendDirection::Stable,
            forecast_score: score,
            confidence: 0.0,
            rate_per_min: 0.0,
        }
    }
}

/// Ordinary least squares fit `y = a + b*x`, plus R².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Returns `None` with fewer than 2 points or no spread in `x`.
pub fn fit_line(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx <= f64::EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = points
        .iter()
        .map(|(x, y)| {
            let r = y - (intercept + slope * x);
            r * r
        })
        .sum();

    // a flat series is fitted perfectly by a flat line
    let r_squared = if syy <= f64::EPSILON {
        if ss_res <= f64::EPSILON {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / syy
    };

    Some(LinearFit {
        intercept,
        slope,
        r_squared: r_squared.clamp(0.0, 1.0),
    })
}

/// Short-horizon forecaster over the recent smoothed scores.
#[derive(Debug, Clone)]
pub struct TrendForecaster {
    history: ScoreHistory,
    horizon_secs: f64,
    epsilon: f64,
}

impl TrendForecaster {
    pub fn new(config: &ForecastConfig) -> Self {
        Self {
            history: ScoreHistory::with_capacity(lookback_of(config), config.max_points),
            horizon_secs: config.horizon_secs,
            epsilon: config.epsilon,
        }
    }

    pub fn reconfigure(&mut self, config: &ForecastConfig) {
        self.history.reconfigure(lookback_of(config), config.max_points);
        self.horizon_secs = config.horizon_secs;
        self.epsilon = config.epsilon;
    }

    pub fn history(&self) -> &ScoreHistory {
        &self.history
    }

    pub fn update_and_forecast(&mut self, at: DateTime<Utc>, smoothed_score: f64) -> Trend {
        if !self.history.push(at, smoothed_score) {
            log::warn!("Dropping out-of-order history point at {}", at);
        }

        let Some((origin, _)) = self.history.iter().next().copied() else {
            return Trend::neutral(smoothed_score);
        };

        // seconds relative to the oldest retained point keep the fit well conditioned
        let points: Vec<(f64, f64)> = self
            .history
            .iter()
            .map(|(t, s)| (seconds_between(origin, *t), *s))
            .collect();

        let Some(fit) = fit_line(&points) else {
            return Trend::neutral(smoothed_score);
        };

        let t_now = seconds_between(origin, at);
        let forecast_score = fit.at(t_now + self.horizon_secs).clamp(0.0, 100.0);

        let direction = if forecast_score < smoothed_score - self.epsilon {
            TrendDirection::Declining
        } else if forecast_score > smoothed_score + self.epsilon {
            TrendDirection::Improving
        } else {
            TrendDirection::Stable
        };

        Trend {
            direction,
            forecast_score,
            confidence: fit.r_squared,
            rate_per_min: fit.slope * 60.0,
        }
    }
}

fn lookback_of(config: &ForecastConfig) -> Duration {
    Duration::try_milliseconds((config.lookback_secs * 1000.0).round() as i64).unwrap_or(Duration::MAX)
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
}
