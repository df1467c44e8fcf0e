pub mod ecs;
pub mod math;
pub mod components;

// Re-exports
pub use ecs::{EntityId, World};
pub use components::{Transform, Name};
pub use math::{Color3, Color4};
