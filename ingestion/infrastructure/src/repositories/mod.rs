pub mod postgres;

pub use postgres::PostgresCandleRepository;
