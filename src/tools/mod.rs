mod deadzone_store;

pub use deadzone_store::{DeadzoneStore, Interval, deadzone_path_for};
