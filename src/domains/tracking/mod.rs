pub mod directions;
pub mod ports;
pub mod route;
pub mod route_cache;
pub mod simulator;
pub mod smoothing;
pub mod state;

pub use directions::*;
pub use ports::*;
pub use route::*;
pub use route_cache::*;
pub use simulator::*;
pub use smoothing::*;
pub use state::*;
