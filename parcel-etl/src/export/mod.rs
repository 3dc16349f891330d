//! Sorties (PostGIS, xlsx, carte HTML)

pub mod ewkb;
pub mod map;
pub mod pool;
pub mod postgres;
pub mod spreadsheet;

pub use map::MapOptions;
pub use pool::{DatabaseConfig, SslMode};
pub use postgres::TableRef;
pub use spreadsheet::SheetSpec;
