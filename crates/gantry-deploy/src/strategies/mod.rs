//! Rollout strategy implementations

pub mod blue_green;
pub mod canary;
pub mod rolling;

pub use blue_green::BlueGreenStrategy;
pub use canary::CanaryStrategy;
pub use rolling::RollingStrategy;
