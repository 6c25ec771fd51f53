pub mod hub;
pub mod snapshot;
pub mod subscription;
pub mod writer;

pub use hub::*;
pub use snapshot::*;
pub use subscription::*;
pub use writer::*;
