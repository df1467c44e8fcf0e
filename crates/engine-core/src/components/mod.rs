mod name;
mod transform;

pub use name::Name;
pub use transform::Transform;
