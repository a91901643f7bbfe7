use rust_decimal::Decimal;
use serde::Serialize;

/// Fixed price of every subscription, in minor units (30.00 EUR).
pub const SUBSCRIPTION_PRICE_CENTS: i64 = 3000;
pub const SUBSCRIPTION_DURATION_DAYS: i64 = 30;
pub const CURRENCY: &str = "EUR";

/// Stamp tiled over previews served to non-subscribers.
pub const WATERMARK_TEXT: &str = "Subscribe to see this image!";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error),
        }
    }
}

/// Converts minor units to a two-decimal amount for display.
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn subscription_price() -> Decimal {
    cents_to_decimal(SUBSCRIPTION_PRICE_CENTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_display() {
        assert_eq!(subscription_price().to_string(), "30.00");
        assert_eq!(cents_to_decimal(4 * SUBSCRIPTION_PRICE_CENTS).to_string(), "120.00");
    }

    #[test]
    fn test_error_envelope() {
        let response = ApiResponse::error("boom".to_string());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error.as_deref(), Some("boom"));
    }
}
