use rust_decimal::Decimal;

use crate::{CoreError, CoreResult};

/// Money columns are stored as `NUMERIC(12,2)`.
pub const MONEY_SCALE: u32 = 2;

/// Rejects amounts that carry more than two significant decimal places.
/// Trailing zeros do not count, so `118.000` passes.
pub fn check_money_scale(field: &str, amount: Decimal) -> CoreResult<()> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(CoreError::ValidationError(format!(
            "{} must have at most {} decimal places",
            field, MONEY_SCALE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_places_accepted() {
        assert!(check_money_scale("amount", Decimal::new(11800, 2)).is_ok());
        assert!(check_money_scale("amount", Decimal::new(118000, 3)).is_ok());
        assert!(check_money_scale("amount", Decimal::from(7)).is_ok());
    }

    #[test]
    fn test_third_place_rejected() {
        let err = check_money_scale("gst", Decimal::new(18005, 3)).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(ref m) if m.starts_with("gst")));
    }
}
