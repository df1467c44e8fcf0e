use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ecs::Component;

/// Label a scene mesh is looked up by.
///
/// Cloning shares the text; meshes built from the same source keep one copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(Arc<str>);

impl Name {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name with the lowest `<base>_<n>` suffix that `taken` rejects.
    pub fn unique(base: &str, mut taken: impl FnMut(&str) -> bool) -> Self {
        if !taken(base) {
            return Self::new(base);
        }
        (1u32..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !taken(candidate))
            .map(Self::new)
            .unwrap_or_else(|| Self::new(base))
    }
}

impl Component for Name {}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Name {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
