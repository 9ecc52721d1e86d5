pub mod boss_quiz;
pub mod game;
pub mod input;
pub mod result;
pub mod snapshot;
pub mod timer;

pub use game::{GameSession, Phase};
pub use input::GameEvent;
pub use snapshot::SessionSnapshot;
