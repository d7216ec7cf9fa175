use serde::{Deserialize, Serialize};
use std::{any::TypeId, fmt, sync::Arc};

/// A type whose rows can be queried. The name identifies the entity's
/// collection in query trees and in the store.
pub trait Entity: 'static {
    const NAME: &'static str;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityType(Arc<str>);

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::from(name.into()))
    }

    pub fn of<T: Entity>() -> Self {
        Self::new(T::NAME)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EntityType {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for EntityType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FilterName(Arc<str>);

impl FilterName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::from(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for FilterName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for FilterName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies the Rust type that produced a filter descriptor, so callers can
/// ignore every filter of one kind without knowing its names.
#[derive(Clone, Copy, Debug)]
pub struct FilterKind {
    id: TypeId,
    name: &'static str,
}

impl FilterKind {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Full type path of the kind, used only for rendering.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for FilterKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FilterKind {}

impl std::hash::Hash for FilterKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
