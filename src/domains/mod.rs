pub mod broadcast;
pub mod logger;
pub mod tracking;

pub use broadcast::*;
pub use logger::*;
pub use tracking::*;
