// Library surface for the binary, headless tests and other front ends.
pub mod app;
pub mod app_dirs;
pub mod bindings;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod movement;
pub mod runtime;
pub mod server;
pub mod session;
pub mod shot;
pub mod sink;
pub mod transition;
pub mod ui;

pub use classifier::{ClassificationPolicy, MovementClassifier, Thresholds};
pub use movement::MovementKey;
pub use session::InputSession;
pub use shot::{ShotResult, ShotType, WireShot};
