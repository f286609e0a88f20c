mod engine;
mod interval;
mod sequence;

pub use engine::TICK;
pub use interval::{Category, Interval, State};
pub use sequence::{get_interval, next_category};
