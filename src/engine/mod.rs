pub mod levels;
pub mod scoring;
pub mod symbol_unlock;

pub use levels::{LevelConfig, Mode, RouteParams};
pub use symbol_unlock::Symbol;
