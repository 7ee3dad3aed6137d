pub mod tinkoff;

pub use tinkoff::TinkoffRestProvider;
