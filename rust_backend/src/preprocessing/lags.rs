//! Per-airport lag features.
//!
//! `lag_k` of an observation is the passenger count `k` positions earlier in
//! the same airport's chronological sequence. Rows without `lag_depth` prior
//! observations are excluded, so the first `lag_depth` rows of every airport
//! never reach the model.

use std::borrow::Cow;

use tracing::{info, warn};

use crate::core::domain::{FeatureObservation, Observation};
use crate::error::{ForecastError, ForecastResult};
use crate::preprocessing::reshape::{is_chronological, sort_chronologically};

/// Deepest lag the pipeline supports.
pub const MAX_LAG_DEPTH: usize = 3;

/// Default lag depth.
pub const DEFAULT_LAG_DEPTH: usize = 3;

/// Check that `lag_depth` lies in `1..=MAX_LAG_DEPTH`.
pub fn validate_lag_depth(lag_depth: usize) -> ForecastResult<()> {
    if (1..=MAX_LAG_DEPTH).contains(&lag_depth) {
        Ok(())
    } else {
        Err(ForecastError::ConfigurationError(format!(
            "lag depth must be between 1 and {}, got {}",
            MAX_LAG_DEPTH, lag_depth
        )))
    }
}

/// Build lag-augmented rows from observations ordered by airport and date.
///
/// Unordered input is sorted on a private copy first. Airports with at most
/// `lag_depth` observations contribute no rows.
pub fn build_lag_features(
    observations: &[Observation],
    lag_depth: usize,
) -> ForecastResult<Vec<FeatureObservation>> {
    validate_lag_depth(lag_depth)?;

    let ordered: Cow<'_, [Observation]> = if is_chronological(observations) {
        Cow::Borrowed(observations)
    } else {
        warn!("Observations were not in chronological order; sorting before lag construction");
        let mut owned = observations.to_vec();
        sort_chronologically(&mut owned);
        Cow::Owned(owned)
    };

    let mut rows = Vec::with_capacity(ordered.len());
    let mut airports = 0usize;

    for group in ordered.chunk_by(|a, b| a.airport == b.airport) {
        airports += 1;
        for (pos, obs) in group.iter().enumerate().skip(lag_depth) {
            let lags = (1..=lag_depth)
                .map(|k| group[pos - k].passengers)
                .collect();
            rows.push(FeatureObservation {
                airport: obs.airport.clone(),
                date: obs.date,
                month: obs.month(),
                passengers: obs.passengers,
                lags,
            });
        }
    }

    info!(
        lag_depth,
        airports,
        observations = ordered.len(),
        rows = rows.len(),
        "Built lag features"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(airport: &str, values: &[f64]) -> Vec<Observation> {
        values
            .iter()
            .enumerate()
            .map(|(idx, v)| {
                let date = NaiveDate::from_ymd_opt(2010 + (idx / 12) as i32, (idx % 12) as u32 + 1, 1)
                    .unwrap();
                Observation::new(airport, date, *v)
            })
            .collect()
    }

    #[test]
    fn test_lags_match_preceding_observations() {
        let observations = series("Abakan", &[10.0, 20.0, 30.0, 40.0, 50.0]);

        let rows = build_lag_features(&observations, 3).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].passengers, 40.0);
        assert_eq!(rows[0].lags, vec![30.0, 20.0, 10.0]);
        assert_eq!(rows[1].passengers, 50.0);
        assert_eq!(rows[1].lag(1), Some(40.0));
        assert_eq!(rows[1].lag(3), Some(20.0));
    }

    #[test]
    fn test_first_n_observations_excluded_per_airport() {
        let mut observations = series("Abakan", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        observations.extend(series("Vnukovo", &[7.0, 8.0, 9.0, 10.0]));

        for depth in 1..=MAX_LAG_DEPTH {
            let rows = build_lag_features(&observations, depth).unwrap();
            let abakan: Vec<_> = rows.iter().filter(|r| r.airport == "Abakan").collect();
            let vnukovo: Vec<_> = rows.iter().filter(|r| r.airport == "Vnukovo").collect();

            assert_eq!(abakan.len(), 6 - depth);
            assert_eq!(vnukovo.len(), 4 - depth);
            assert_eq!(abakan[0].date, observations[depth].date);
            assert!(rows.iter().all(|r| r.lags.len() == depth));
        }
    }

    #[test]
    fn test_lags_do_not_cross_airports() {
        let mut observations = series("Abakan", &[1.0, 2.0]);
        observations.extend(series("Vnukovo", &[100.0, 200.0]));

        let rows = build_lag_features(&observations, 1).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].airport, "Vnukovo");
        assert_eq!(rows[1].lags, vec![100.0]);
    }

    #[test]
    fn test_short_history_contributes_nothing() {
        let observations = series("Anadyr", &[1.0, 2.0, 3.0]);
        let rows = build_lag_features(&observations, 3).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unsorted_input_is_ordered_first() {
        let mut observations = series("Abakan", &[1.0, 2.0, 3.0]);
        observations.reverse();

        let rows = build_lag_features(&observations, 1).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].passengers, 2.0);
        assert_eq!(rows[0].lags, vec![1.0]);
    }

    #[test]
    fn test_rejects_unsupported_depth() {
        let observations = series("Abakan", &[1.0, 2.0]);
        assert!(matches!(
            build_lag_features(&observations, 0),
            Err(ForecastError::ConfigurationError(_))
        ));
        assert!(matches!(
            build_lag_features(&observations, 4),
            Err(ForecastError::ConfigurationError(_))
        ));
    }
}
