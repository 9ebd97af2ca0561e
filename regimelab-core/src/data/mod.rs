//! Price-table input: file readers and synthetic generation.

pub mod synthetic;
pub mod table;

pub use synthetic::{synthetic_series, synthetic_table, SyntheticConfig};
pub use table::{DataError, PriceTable};
