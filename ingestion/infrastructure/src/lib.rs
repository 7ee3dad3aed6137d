pub mod clock;
pub mod gateways;
pub mod logging;
pub mod repositories;
pub mod settings;

pub use clock::SystemClock;
pub use gateways::TinkoffRestProvider;
pub use logging::{init_logging, LoggingError};
pub use repositories::PostgresCandleRepository;
pub use settings::{ApiSettings, DatabaseSettings, Settings, SettingsError};
