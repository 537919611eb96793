use statrs::statistics::Statistics;

/// Highest value any quality, speed or cost score can take.
pub const SCORE_SCALE: f64 = 10.0;

/// Score used when a signal is missing altogether.
pub const NEUTRAL_SCORE: f64 = 5.0;

pub struct ScoreAggregator;

impl ScoreAggregator {
    /// Arithmetic mean, `None` for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.mean())
    }

    /// Population variance. Fewer than two observations have no spread.
    pub fn population_variance(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        values.population_variance()
    }

    /// Maps `value` in `[0, max]` to `[10, 0]`, lower being better.
    ///
    /// A zero maximum means every observation is zero, which scores 10.
    pub fn inverse_normalized(value: f64, max: f64) -> f64 {
        if max <= 0.0 {
            return SCORE_SCALE;
        }
        (SCORE_SCALE * (1.0 - value / max)).clamp(0.0, SCORE_SCALE)
    }

    /// Maps a 0-based position in a list of `len` items to `10 - p*10/len`.
    pub fn position_score(position: usize, len: usize) -> f64 {
        if len == 0 {
            return NEUTRAL_SCORE;
        }
        SCORE_SCALE - (position as f64 * SCORE_SCALE / len as f64)
    }

    pub fn min(values: impl IntoIterator<Item = f64>) -> Option<f64> {
        values.into_iter().fold(None, |acc, v| match acc {
            Some(m) if m <= v => Some(m),
            _ => Some(v),
        })
    }

    pub fn max(values: impl IntoIterator<Item = f64>) -> Option<f64> {
        values.into_iter().fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean() {
        assert_eq!(ScoreAggregator::mean(&[]), None);
        assert_relative_eq!(ScoreAggregator::mean(&[2.0, 4.0, 9.0]).unwrap(), 5.0);
    }

    #[test]
    fn test_population_variance() {
        assert_eq!(ScoreAggregator::population_variance(&[3.0]), 0.0);
        assert_relative_eq!(ScoreAggregator::population_variance(&[0.0, 2.0]), 1.0);
        assert_relative_eq!(ScoreAggregator::population_variance(&[1.0, 1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_inverse_normalized() {
        assert_relative_eq!(ScoreAggregator::inverse_normalized(10.0, 20.0), 5.0);
        assert_relative_eq!(ScoreAggregator::inverse_normalized(20.0, 20.0), 0.0);
        assert_relative_eq!(ScoreAggregator::inverse_normalized(0.0, 0.0), 10.0);
    }

    #[test]
    fn test_position_score() {
        assert_relative_eq!(ScoreAggregator::position_score(0, 4), 10.0);
        assert_relative_eq!(ScoreAggregator::position_score(3, 4), 2.5);
    }

    #[test]
    fn test_max() {
        assert_eq!(ScoreAggregator::max(Vec::<f64>::new()), None);
        assert_eq!(ScoreAggregator::max(vec![1.0, 7.5, 3.0]), Some(7.5));
        assert_eq!(ScoreAggregator::min(vec![4.0, 1.5, 3.0]), Some(1.5));
    }
}
