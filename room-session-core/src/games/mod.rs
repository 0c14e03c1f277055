//! Built-in game content. Kept small: each game is a call site of the
//! lifecycle, board and orchestration machinery.

mod lap_race;
mod one_vs_one;
mod point_race;

pub use lap_race::LapRace;
pub use one_vs_one::OneVsOne;
pub use point_race::PointRace;

use crate::application::{BoardGame, Game, GameCatalog};

/// Register every built-in format that can be created directly.
/// [`OneVsOne`] is created by the challenge command instead.
pub fn register_all(catalog: &mut GameCatalog) {
    catalog.register(PointRace::FORMAT, "Point Race", |_| {
        Some(Box::new(PointRace::new()) as Box<dyn Game>)
    });
    catalog.register(LapRace::FORMAT, "Lap Race", |_| {
        LapRace::new()
            .ok()
            .map(|rules| Box::new(BoardGame::new(rules)) as Box<dyn Game>)
    });
}
