//! Content types, capabilities and cache keys
//!
//! Capabilities are declared by the content type itself and captured once
//! into its [`ContentType`] tag, together with the monomorphized helpers the
//! type-erased cache needs to wrap, swap and dispose objects of that type.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use bitflags::bitflags;

use super::error::ContentError;
use super::path::NormalizedPath;

/// Shared handle to a loaded content object
///
/// Identity is pointer identity (`Rc::ptr_eq`). Hot swapping mutates the
/// object through the `RefCell`, so every holder observes the new state.
pub type ContentRef<T> = Rc<RefCell<T>>;

/// Type-erased [`ContentRef`]: an `Rc<RefCell<T>>` viewed as `Rc<dyn Any>`
pub type ErasedContent = Rc<dyn Any>;

/// Type-erased handle used for bulk disposal
pub type DisposableRef = Rc<RefCell<dyn Content>>;

bitflags! {
    /// Optional behaviour a content type supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// The type can absorb a freshly read replacement in place
        const HOT_SWAP = 1 << 0;
        /// The type owns resources that must be released on unload
        const DISPOSE = 1 << 1;
    }
}

/// Implemented by every type the content pipeline can produce
pub trait Content: Any {
    /// Capabilities of this type; none by default
    fn capabilities() -> Capabilities
    where
        Self: Sized,
    {
        Capabilities::empty()
    }

    /// Copy state from `replacement` into `self`
    ///
    /// Only called for types declaring [`Capabilities::HOT_SWAP`]. Types that
    /// own native handles override this to keep their handle and adopt the
    /// replacement's data.
    fn hot_swap(&mut self, replacement: Self)
    where
        Self: Sized,
    {
        *self = replacement;
    }

    /// Release owned resources; called at most once per object
    fn dispose(&mut self) {}
}

/// Runtime tag for a content type
///
/// Equality and hashing use the `TypeId` only.
#[derive(Clone, Copy)]
pub struct ContentType {
    id: TypeId,
    name: &'static str,
    capabilities: Capabilities,
    wrap: fn(Box<dyn Any>) -> Result<ErasedContent, ContentError>,
    swap: fn(&ErasedContent, Box<dyn Any>) -> Result<(), ContentError>,
    disposable: fn(&ErasedContent) -> Option<DisposableRef>,
}

impl ContentType {
    /// Tag for `T`
    pub fn of<T: Content>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            capabilities: T::capabilities(),
            wrap: wrap_erased::<T>,
            swap: swap_erased::<T>,
            disposable: disposable_erased::<T>,
        }
    }

    /// Rust type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared capabilities
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether the type swaps itself in place
    pub fn is_hot_swappable(&self) -> bool {
        self.capabilities.contains(Capabilities::HOT_SWAP)
    }

    /// Whether objects of this type are tracked for disposal
    pub fn is_disposable(&self) -> bool {
        self.capabilities.contains(Capabilities::DISPOSE)
    }

    /// Wrap a boxed `T` into a shared [`ContentRef`]
    pub(crate) fn wrap(&self, value: Box<dyn Any>) -> Result<ErasedContent, ContentError> {
        (self.wrap)(value)
    }

    /// Apply `replacement` onto `existing` via [`Content::hot_swap`]
    pub(crate) fn swap(&self, existing: &ErasedContent, replacement: Box<dyn Any>) -> Result<(), ContentError> {
        (self.swap)(existing, replacement)
    }

    /// View an erased object as a disposal handle
    pub(crate) fn disposable(&self, object: &ErasedContent) -> Option<DisposableRef> {
        (self.disposable)(object)
    }
}

fn wrap_erased<T: Content>(value: Box<dyn Any>) -> Result<ErasedContent, ContentError> {
    let value = value
        .downcast::<T>()
        .map_err(|_| ContentError::TypeMismatch { expected: type_name::<T>() })?;
    let shared: ErasedContent = Rc::new(RefCell::new(*value));
    Ok(shared)
}

fn swap_erased<T: Content>(existing: &ErasedContent, replacement: Box<dyn Any>) -> Result<(), ContentError> {
    let cell = existing
        .downcast_ref::<RefCell<T>>()
        .ok_or(ContentError::TypeMismatch { expected: type_name::<T>() })?;
    let replacement = replacement
        .downcast::<T>()
        .map_err(|_| ContentError::TypeMismatch { expected: type_name::<T>() })?;
    let mut target = cell
        .try_borrow_mut()
        .map_err(|_| ContentError::Busy { type_name: type_name::<T>() })?;
    target.hot_swap(*replacement);
    Ok(())
}

fn disposable_erased<T: Content>(object: &ErasedContent) -> Option<DisposableRef> {
    let typed: ContentRef<T> = Rc::clone(object).downcast::<RefCell<T>>().ok()?;
    let handle: DisposableRef = typed;
    Some(handle)
}

/// Recover a typed handle from an erased one
pub(crate) fn downcast_content<T: Content>(object: ErasedContent) -> Result<ContentRef<T>, ContentError> {
    object
        .downcast::<RefCell<T>>()
        .map_err(|_| ContentError::TypeMismatch { expected: type_name::<T>() })
}

impl PartialEq for ContentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContentType {}

impl Hash for ContentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identifies one cached content object: (type, normalized path)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CachingKey {
    /// Requested content type
    pub content_type: ContentType,
    /// Source path
    pub path: NormalizedPath,
}

impl CachingKey {
    /// Create a key
    pub fn new(content_type: ContentType, path: NormalizedPath) -> Self {
        Self { content_type, path }
    }

    /// Key for `T` at `path`
    pub fn of<T: Content>(path: &str) -> Self {
        Self::new(ContentType::of::<T>(), NormalizedPath::new(path))
    }
}

impl fmt::Display for CachingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.content_type, self.path)
    }
}
