use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-reported trading status of a security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradingStatus {
    #[serde(rename = "SECURITY_TRADING_STATUS_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "SECURITY_TRADING_STATUS_NOT_AVAILABLE_FOR_TRADING")]
    NotAvailableForTrading,
    #[serde(rename = "SECURITY_TRADING_STATUS_OPENING_PERIOD")]
    OpeningPeriod,
    #[serde(rename = "SECURITY_TRADING_STATUS_CLOSING_PERIOD")]
    ClosingPeriod,
    #[serde(rename = "SECURITY_TRADING_STATUS_BREAK_IN_TRADING")]
    BreakInTrading,
    #[serde(rename = "SECURITY_TRADING_STATUS_NORMAL_TRADING")]
    NormalTrading,
    #[serde(rename = "SECURITY_TRADING_STATUS_CLOSING_AUCTION")]
    ClosingAuction,
    #[serde(rename = "SECURITY_TRADING_STATUS_DARK_POOL_AUCTION")]
    DarkPoolAuction,
    #[serde(rename = "SECURITY_TRADING_STATUS_DISCRETE_AUCTION")]
    DiscreteAuction,
    #[serde(rename = "SECURITY_TRADING_STATUS_OPENING_AUCTION_PERIOD")]
    OpeningAuctionPeriod,
    #[serde(rename = "SECURITY_TRADING_STATUS_TRADING_AT_CLOSING_AUCTION_PRICE")]
    TradingAtClosingAuctionPrice,
    #[serde(rename = "SECURITY_TRADING_STATUS_SESSION_ASSIGNED")]
    SessionAssigned,
    #[serde(rename = "SECURITY_TRADING_STATUS_SESSION_CLOSE")]
    SessionClose,
    #[serde(rename = "SECURITY_TRADING_STATUS_SESSION_OPEN")]
    SessionOpen,
    #[serde(rename = "SECURITY_TRADING_STATUS_DEALER_NORMAL_TRADING")]
    DealerNormalTrading,
    #[serde(rename = "SECURITY_TRADING_STATUS_DEALER_BREAK_IN_TRADING")]
    DealerBreakInTrading,
    #[serde(rename = "SECURITY_TRADING_STATUS_DEALER_NOT_AVAILABLE_FOR_TRADING")]
    DealerNotAvailableForTrading,
    #[serde(other)]
    Unknown,
}

/// Statuses that qualify an instrument for the regular-hours segment.
pub const REGULAR_SEGMENT_STATUSES: [TradingStatus; 2] =
    [TradingStatus::NormalTrading, TradingStatus::BreakInTrading];

impl TradingStatus {
    pub fn is_regular_tradeable(&self) -> bool {
        REGULAR_SEGMENT_STATUSES.contains(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Regular,
    Weekend,
}

impl Segment {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Segment::Regular => "regular",
            Segment::Weekend => "weekend",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    figi: String,
    ticker: String,
    trading_status: TradingStatus,
    weekend_eligible: bool,
}

impl Instrument {
    pub fn new(
        figi: impl Into<String>,
        ticker: impl Into<String>,
        trading_status: TradingStatus,
        weekend_eligible: bool,
    ) -> Self {
        Self {
            figi: figi.into(),
            ticker: ticker.into(),
            trading_status,
            weekend_eligible,
        }
    }

    /// Opaque provider identifier used for upstream requests.
    pub fn figi(&self) -> &str {
        &self.figi
    }

    /// Human-readable symbol persisted with every candle.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn trading_status(&self) -> TradingStatus {
        self.trading_status
    }

    pub fn weekend_eligible(&self) -> bool {
        self.weekend_eligible
    }

    pub fn belongs_to(&self, segment: Segment) -> bool {
        match segment {
            Segment::Regular => self.trading_status.is_regular_tradeable(),
            Segment::Weekend => self.weekend_eligible,
        }
    }

    pub fn segments(&self) -> Vec<Segment> {
        [Segment::Regular, Segment::Weekend]
            .into_iter()
            .filter(|segment| self.belongs_to(*segment))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_trading_is_regular() {
        let sber = Instrument::new("BBG004730N88", "SBER", TradingStatus::NormalTrading, false);
        assert_eq!(sber.segments(), vec![Segment::Regular]);
    }

    #[test]
    fn test_break_in_trading_is_regular() {
        let gazp = Instrument::new("BBG004730RP0", "GAZP", TradingStatus::BreakInTrading, false);
        assert!(gazp.belongs_to(Segment::Regular));
    }

    #[test]
    fn test_weekend_flag_independent_of_status() {
        let ydex = Instrument::new(
            "TCS00A107T19",
            "YDEX",
            TradingStatus::NotAvailableForTrading,
            true,
        );
        assert_eq!(ydex.segments(), vec![Segment::Weekend]);
    }

    #[test]
    fn test_both_segments() {
        let lkoh = Instrument::new("BBG004731032", "LKOH", TradingStatus::NormalTrading, true);
        assert_eq!(lkoh.segments(), vec![Segment::Regular, Segment::Weekend]);
    }

    #[test]
    fn test_no_segment() {
        let halted = Instrument::new(
            "BBG000000001",
            "HALT",
            TradingStatus::NotAvailableForTrading,
            false,
        );
        assert!(halted.segments().is_empty());
    }
}
