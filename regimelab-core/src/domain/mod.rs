//! Domain types shared by every pipeline stage.

pub mod ev;
pub mod label;
pub mod run;
pub mod series;

pub use ev::EvResult;
pub use label::Label;
pub use run::Run;
pub use series::{PricePoint, PriceSeries, SeriesError};
