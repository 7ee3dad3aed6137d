use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const NANOS_PER_UNIT: i32 = 1_000_000_000;
const NANO_SCALE: u32 = 9;

/// Provider fixed-point price: whole units plus a billionth-of-a-unit fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotation {
    units: i64,
    nano: i32,
}

impl Quotation {
    pub fn new(units: i64, nano: i32) -> Result<Self, PriceError> {
        if nano <= -NANOS_PER_UNIT || nano >= NANOS_PER_UNIT {
            return Err(PriceError::FractionOutOfRange(nano));
        }
        Ok(Self { units, nano })
    }

    pub fn units(&self) -> i64 {
        self.units
    }

    pub fn nano(&self) -> i32 {
        self.nano
    }

    /// `units + nano / 10^9`, exact.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from(self.units) + Decimal::new(i64::from(self.nano), NANO_SCALE)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("Fractional part out of range: {0}")]
    FractionOutOfRange(i32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reconstructs_price() {
        let price = Quotation::new(150, 250_000_000).unwrap();
        assert_eq!(price.to_decimal(), dec!(150.25));
    }

    #[test]
    fn test_sub_unit_precision_preserved() {
        let price = Quotation::new(0, 1).unwrap();
        assert_eq!(price.to_decimal(), dec!(0.000000001));

        let price = Quotation::new(273, 999_999_999).unwrap();
        assert_eq!(price.to_decimal(), dec!(273.999999999));
    }

    #[test]
    fn test_negative_quotation() {
        let price = Quotation::new(-3, -500_000_000).unwrap();
        assert_eq!(price.to_decimal(), dec!(-3.5));
    }

    #[test]
    fn test_fraction_out_of_range_rejected() {
        assert_eq!(
            Quotation::new(1, 1_000_000_000),
            Err(PriceError::FractionOutOfRange(1_000_000_000))
        );
    }
}
