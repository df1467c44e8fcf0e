use std::num::NonZeroU32;

/// Generational entity handle.
///
/// `index` addresses the slot in the world's entity table and `generation`
/// tells a live entity apart from an older one that used the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    index: u32,
    generation: NonZeroU32,
}

impl EntityId {
    /// Create a handle. Generation 0 is reserved as invalid.
    pub fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation: NonZeroU32::new(generation).expect("generation must be >= 1"),
        }
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation.get()
    }

    /// Pack into a single `u32` for the JS boundary:
    /// upper 12 bits generation, lower 20 bits index.
    #[inline]
    pub fn to_u32(&self) -> u32 {
        let generation_bits = (self.generation.get() & 0xFFF) << 20;
        let index_bits = self.index & 0xFFFFF;
        generation_bits | index_bits
    }

    /// Inverse of [`EntityId::to_u32`]. A packed generation of 0 maps to 1.
    #[inline]
    pub fn from_u32(id: u32) -> Self {
        let generation = (id >> 20) & 0xFFF;
        let index = id & 0xFFFFF;
        Self::new(index, generation.max(1))
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_accessors() {
        let entity = EntityId::new(42, 1);
        assert_eq!(entity.index(), 42);
        assert_eq!(entity.generation(), 1);
    }

    #[test]
    fn test_generation_distinguishes_handles() {
        let a = EntityId::new(1, 1);
        let b = EntityId::new(1, 2);
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn test_packed_id() {
        let original = EntityId::new(12345, 7);
        let restored = EntityId::from_u32(original.to_u32());
        assert_eq!(original, restored);

        let max_index = EntityId::new(0xFFFFF, 4095);
        assert_eq!(EntityId::from_u32(max_index.to_u32()), max_index);
    }

    #[test]
    fn test_display() {
        assert_eq!(EntityId::new(3, 2).to_string(), "3v2");
    }

    #[test]
    #[should_panic(expected = "generation must be >= 1")]
    fn test_generation_zero_panics() {
        EntityId::new(0, 0);
    }
}
