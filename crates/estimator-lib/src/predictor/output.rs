//! Prediction output post-processing
//!
//! The regressor was trained on `ln(price)`, so its output is mapped back
//! with the natural exponent before being rounded and formatted.

use crate::error::{EstimatorError, Result};
use crate::models::PricePrediction;

/// Currency code prefixed to every formatted price
pub const CURRENCY_CODE: &str = "AED";

/// Largest price that still rounds exactly into a `u64`
const MAX_PRICE: f64 = 9.0e15;

/// Formats raw log-space model outputs into prices
#[derive(Debug, Clone)]
pub struct PriceFormatter {
    currency: String,
}

impl Default for PriceFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceFormatter {
    pub fn new() -> Self {
        Self {
            currency: CURRENCY_CODE.to_string(),
        }
    }

    /// Invert the log transform and format the result
    pub fn format(&self, log_price: f64) -> Result<PricePrediction> {
        let price = log_price.exp();
        if !price.is_finite() || price > MAX_PRICE {
            return Err(EstimatorError::Prediction(format!(
                "model output {} does not map to a representable price",
                log_price
            )));
        }

        let rounded = price.round() as u64;
        Ok(PricePrediction {
            log_price,
            price: rounded,
            formatted: format!("{} {}", self.currency, group_thousands(rounded)),
        })
    }
}

/// Render an integer with `,` between groups of three digits
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
