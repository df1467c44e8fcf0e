/// Marker trait for data that can be attached to an entity.
///
/// Components own their data (`'static`) and must be shareable across
/// threads, so handles such as shared mesh geometry have to use
/// `Arc`-based synchronization rather than `Rc`.
pub trait Component: 'static + Send + Sync {}
