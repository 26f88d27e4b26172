//! Historical forecasting.
//!
//! Logged observations are folded into 96-bin median profiles per tunnel,
//! direction and weekday (plus an all-days profile), which answer
//! time-of-week predictions and best-arrival-window searches.

pub mod bins;
pub mod heatmap;
pub mod predict;
pub mod profile;
pub mod window;

pub use bins::{BINS_PER_DAY, bin_label, parse_bin_label};
pub use heatmap::{Heatmap, weekly_heatmap};
pub use predict::{Confidence, MIN_SAMPLES, Prediction, predict_wait};
pub use profile::{DayKey, DayProfile, Profiles, build_profiles};
pub use window::{WindowBest, find_min_in_window};
