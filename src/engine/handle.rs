use super::ObjectType;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::num::NonZeroU64;

/// Type tag carried by each handle flavour.
pub trait HandleKind {
    const TYPE: ObjectType;
}

#[derive(Debug)]
pub enum ImageKind {}
#[derive(Debug)]
pub enum ScalarKind {}
#[derive(Debug)]
pub enum GraphKind {}
#[derive(Debug)]
pub enum NodeKind {}

impl HandleKind for ImageKind {
    const TYPE: ObjectType = ObjectType::Image;
}
impl HandleKind for ScalarKind {
    const TYPE: ObjectType = ObjectType::Scalar;
}
impl HandleKind for GraphKind {
    const TYPE: ObjectType = ObjectType::Graph;
}
impl HandleKind for NodeKind {
    const TYPE: ObjectType = ObjectType::Node;
}

/// Opaque, nullable reference to an engine object.
///
/// Handles are plain values: copies do not keep the object alive, and
/// releasing through one copy nulls only that copy.
pub struct Handle<K> {
    raw: Option<NonZeroU64>,
    _kind: PhantomData<fn() -> K>,
}

pub type ImageHandle = Handle<ImageKind>;
pub type ScalarHandle = Handle<ScalarKind>;
pub type GraphHandle = Handle<GraphKind>;
pub type NodeHandle = Handle<NodeKind>;

impl<K> Handle<K> {
    pub const NULL: Self = Self {
        raw: None,
        _kind: PhantomData,
    };

    /// Wrap a raw id; zero is the null handle.
    pub fn from_raw(raw: u64) -> Self {
        Self {
            raw: NonZeroU64::new(raw),
            _kind: PhantomData,
        }
    }

    #[inline]
    pub fn raw(&self) -> Option<u64> {
        self.raw.map(NonZeroU64::get)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.raw.is_none()
    }

    /// Null this handle, returning the id it held.
    pub fn take(&mut self) -> Option<u64> {
        self.raw.take().map(NonZeroU64::get)
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K> Default for Handle<K> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw() {
            Some(id) => write!(f, "{:?}#{id}", K::TYPE),
            None => write!(f, "{:?}#null", K::TYPE),
        }
    }
}
