pub mod app;
pub mod builder;
pub mod logs;

pub use app::{App, LifecycleErrors, Phase, PhaseError};
pub use builder::AppBuilder;
