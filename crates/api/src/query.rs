//! Query parameter types for API handlers.

use chemviz_core::error::CoreError;
use chemviz_core::retention::RETENTION_CAP;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;

/// `?limit=` for the history listing. At most the retention cap is ever
/// stored, so larger limits are rejected rather than silently clamped.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct HistoryParams {
    #[validate(range(min = 1, max = 5, message = "limit must be between 1 and 5"))]
    pub limit: Option<usize>,
}

impl HistoryParams {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(RETENTION_CAP)
    }
}

/// Run `validator` checks and report failures as a validation error.
pub fn validated<T: Validate>(params: T) -> Result<T, AppError> {
    params
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn missing_limit_defaults_to_retention_cap() {
        let params = validated(HistoryParams::default()).unwrap();
        assert_eq!(params.limit(), RETENTION_CAP);
    }

    #[test]
    fn limit_outside_range_is_rejected() {
        for limit in [0, 6, 100] {
            let result = validated(HistoryParams { limit: Some(limit) });
            assert_matches!(result, Err(AppError::Core(CoreError::Validation(_))));
        }
        assert_eq!(validated(HistoryParams { limit: Some(3) }).unwrap().limit(), 3);
    }
}
