use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Per-user settings, stored as a single document in the external store.
///
/// Saved wholesale on every change — there is no partial merge. When the
/// document does not exist yet, [`UserSettings::default`] applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Display currency code (e.g. "USD", "EUR", "IDR").
    pub currency: String,

    /// Net-profit goal for a calendar month; 0 disables the progress bar.
    #[serde(rename = "monthlyTarget")]
    pub monthly_target: f64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            monthly_target: 0.0,
        }
    }
}

impl UserSettings {
    /// Validate before saving.
    /// Currency must be exactly 3 ASCII letters; the target non-negative.
    pub fn validate(&self) -> Result<(), CoreError> {
        let code = self.currency.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::validation(
                "currency",
                format!("invalid currency code '{}': must be exactly 3 ASCII letters", self.currency),
            ));
        }
        if !self.monthly_target.is_finite() || self.monthly_target < 0.0 {
            return Err(CoreError::validation(
                "monthly_target",
                "monthly target must be a non-negative finite number",
            ));
        }
        Ok(())
    }

    /// Upper-cased copy of the currency code, for display.
    pub fn currency_code(&self) -> String {
        self.currency.trim().to_uppercase()
    }
}
