pub mod load;
pub mod save;
pub mod types;

pub use load::SETTINGS_FILE;
pub use save::save_settings_to;
pub use types::{Algorithm, AspectRatio, CandidateScan, Config, GridSpec, UserSettings};
