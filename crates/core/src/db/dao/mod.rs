pub mod achievements;
pub mod games;
pub mod run_log;
pub mod snapshots;

pub use achievements::AchievementsDao;
pub use games::GamesDao;
pub use run_log::RunLogDao;
pub use snapshots::SnapshotsDao;
