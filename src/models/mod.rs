pub mod category;
pub mod history;
pub mod workout;

pub use category::{ActivityClass, Category};
pub use history::{History, SplitTime};
pub use workout::{Exercise, Workout};
