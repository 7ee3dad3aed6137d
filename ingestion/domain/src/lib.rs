pub mod calendar;
pub mod candle;
pub mod granularity;
pub mod instrument;
pub mod price;
pub mod target;
pub mod time_window;

pub use calendar::{next_boundary, CalendarError, SessionGate, TRADING_TZ};
pub use candle::{CandleError, CandlePrice, CandleRow, CandleTimestamp, FetchedCandle};
pub use granularity::Granularity;
pub use instrument::{Instrument, Segment, TradingStatus, REGULAR_SEGMENT_STATUSES};
pub use price::{PriceError, Quotation};
pub use target::{IngestionTarget, TableName, TableNameError};
pub use time_window::{FetchWindow, TimeWindow, TimeWindowError};
