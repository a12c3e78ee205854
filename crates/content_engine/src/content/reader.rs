//! Content readers and the reader registry
//!
//! A reader turns a byte stream into one content type. Readers may also
//! offer the optional [`InPlaceReader`] capability, re-reading into an
//! existing instance so its identity survives a hot swap.
//!
//! Lookup is by [`ContentType`]. When no reader is registered for the exact
//! type, the registry walks the type's fallback chain, declared up front with
//! [`ReaderRegistry::declare_subtype`], and uses the first ancestor reader
//! that accepts subtypes. The value that reader produces is converted into
//! the requested type with the `From` impl captured at declaration time.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Read;
use std::marker::PhantomData;
use std::rc::Rc;

use super::error::ContentError;
use super::key::{Content, ContentType, ErasedContent};
use super::provider::ContentProvider;

/// Produces content of type `T` from a stream
pub trait ContentReader<T: Content> {
    /// Read a new instance
    fn read(&self, stream: &mut dyn Read, provider: &mut dyn ContentProvider) -> Result<T, ContentError>;

    /// In-place re-read capability, if this reader has one
    fn in_place(&self) -> Option<&dyn InPlaceReader<T>> {
        None
    }

    /// Whether this reader may serve subtypes declared against `T`
    fn supports_subtypes(&self) -> bool {
        false
    }
}

/// Re-reads a stream into an existing instance
pub trait InPlaceReader<T: Content> {
    /// Overwrite `existing` with the stream's content
    ///
    /// On error `existing` must be left as it was: parse into locals first,
    /// assign last.
    fn read_into(
        &self,
        existing: &mut T,
        stream: &mut dyn Read,
        provider: &mut dyn ContentProvider,
    ) -> Result<(), ContentError>;
}

/// Type-erased reader as stored in the registry
pub(crate) trait ErasedReader {
    fn read(&self, stream: &mut dyn Read, provider: &mut dyn ContentProvider) -> Result<Box<dyn Any>, ContentError>;

    fn supports_in_place(&self) -> bool;

    fn read_into(
        &self,
        existing: &ErasedContent,
        stream: &mut dyn Read,
        provider: &mut dyn ContentProvider,
    ) -> Result<(), ContentError>;

    fn supports_subtypes(&self) -> bool;
}

struct TypedReader<T, R> {
    reader: R,
    in_place: bool,
    subtypes: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Content, R: ContentReader<T>> ErasedReader for TypedReader<T, R> {
    fn read(&self, stream: &mut dyn Read, provider: &mut dyn ContentProvider) -> Result<Box<dyn Any>, ContentError> {
        let value = self.reader.read(stream, provider)?;
        Ok(Box::new(value))
    }

    fn supports_in_place(&self) -> bool {
        self.in_place
    }

    fn read_into(
        &self,
        existing: &ErasedContent,
        stream: &mut dyn Read,
        provider: &mut dyn ContentProvider,
    ) -> Result<(), ContentError> {
        let in_place = self
            .reader
            .in_place()
            .ok_or_else(|| ContentError::invalid_data(format!("{} reader cannot read in place", type_name::<T>())))?;
        let cell = existing
            .downcast_ref::<RefCell<T>>()
            .ok_or(ContentError::TypeMismatch { expected: type_name::<T>() })?;
        let mut target = cell
            .try_borrow_mut()
            .map_err(|_| ContentError::Busy { type_name: type_name::<T>() })?;
        in_place.read_into(&mut target, stream, provider)
    }

    fn supports_subtypes(&self) -> bool {
        self.subtypes
    }
}

type Conversion = Rc<dyn Fn(Box<dyn Any>) -> Result<Box<dyn Any>, ContentError>>;

#[derive(Clone)]
struct Fallback {
    ancestor: ContentType,
    convert: Conversion,
}

/// Reader chosen for one requested type
#[derive(Clone)]
pub(crate) struct ResolvedReader {
    reader: Rc<dyn ErasedReader>,
    convert: Option<Conversion>,
}

impl ResolvedReader {
    /// Read a new boxed instance of the requested type
    pub(crate) fn read(
        &self,
        stream: &mut dyn Read,
        provider: &mut dyn ContentProvider,
    ) -> Result<Box<dyn Any>, ContentError> {
        let value = self.reader.read(stream, provider)?;
        match &self.convert {
            Some(convert) => convert(value),
            None => Ok(value),
        }
    }

    /// In-place reads only apply to exact-type readers
    pub(crate) fn supports_in_place(&self) -> bool {
        self.convert.is_none() && self.reader.supports_in_place()
    }

    pub(crate) fn read_into(
        &self,
        existing: &ErasedContent,
        stream: &mut dyn Read,
        provider: &mut dyn ContentProvider,
    ) -> Result<(), ContentError> {
        self.reader.read_into(existing, stream, provider)
    }
}

/// Registry mapping content types to readers
#[derive(Default)]
pub struct ReaderRegistry {
    readers: HashMap<ContentType, Rc<dyn ErasedReader>>,
    fallbacks: HashMap<ContentType, Vec<Fallback>>,
}

impl ReaderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `reader` for `T`; the last registration for a type wins
    pub fn set_reader<T, R>(&mut self, reader: R)
    where
        T: Content,
        R: ContentReader<T> + 'static,
    {
        let content_type = ContentType::of::<T>();
        let in_place = reader.in_place().is_some();
        let subtypes = reader.supports_subtypes();
        let erased: Rc<dyn ErasedReader> = Rc::new(TypedReader::<T, R> {
            reader,
            in_place,
            subtypes,
            _marker: PhantomData,
        });

        if self.readers.insert(content_type, erased).is_some() {
            log::debug!("Replaced content reader for {}", content_type);
        } else {
            log::debug!(
                "Registered content reader for {} (in-place: {}, subtypes: {})",
                content_type,
                in_place,
                subtypes
            );
        }
    }

    /// Declare `S` a subtype of `B`
    ///
    /// `S` inherits `B`'s fallback chain as it is at the time of the call, so
    /// declare base relationships before derived ones.
    pub fn declare_subtype<S, B>(&mut self)
    where
        S: Content + From<B>,
        B: Content,
    {
        let to_sub: Conversion = Rc::new(|value: Box<dyn Any>| -> Result<Box<dyn Any>, ContentError> {
            let base = value
                .downcast::<B>()
                .map_err(|_| ContentError::TypeMismatch { expected: type_name::<B>() })?;
            let sub: Box<dyn Any> = Box::new(S::from(*base));
            Ok(sub)
        });

        let base_type = ContentType::of::<B>();
        let mut chain = vec![Fallback {
            ancestor: base_type,
            convert: Rc::clone(&to_sub),
        }];

        if let Some(base_chain) = self.fallbacks.get(&base_type) {
            for fallback in base_chain {
                let to_base = Rc::clone(&fallback.convert);
                let to_sub = Rc::clone(&to_sub);
                chain.push(Fallback {
                    ancestor: fallback.ancestor,
                    convert: Rc::new(move |value: Box<dyn Any>| -> Result<Box<dyn Any>, ContentError> {
                        to_sub(to_base(value)?)
                    }),
                });
            }
        }

        log::debug!("Declared {} as subtype of {} ({} fallbacks)", type_name::<S>(), base_type, chain.len());
        self.fallbacks.insert(ContentType::of::<S>(), chain);
    }

    /// Whether a reader (exact or via fallback) exists for `T`
    pub fn has_reader<T: Content>(&self) -> bool {
        self.resolve(ContentType::of::<T>()).is_ok()
    }

    /// Ancestors searched for `content_type`, nearest first
    pub fn fallback_chain(&self, content_type: ContentType) -> Vec<ContentType> {
        self.fallbacks
            .get(&content_type)
            .map(|chain| chain.iter().map(|fallback| fallback.ancestor).collect())
            .unwrap_or_default()
    }

    /// Number of registered readers
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    /// Whether no reader is registered
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    pub(crate) fn resolve(&self, requested: ContentType) -> Result<ResolvedReader, ContentError> {
        if let Some(reader) = self.readers.get(&requested) {
            return Ok(ResolvedReader {
                reader: Rc::clone(reader),
                convert: None,
            });
        }

        let fallbacks = self.fallbacks.get(&requested).map_or(&[][..], Vec::as_slice);
        for fallback in fallbacks {
            match self.readers.get(&fallback.ancestor) {
                Some(reader) if reader.supports_subtypes() => {
                    log::trace!("Reading {} through {} reader", requested, fallback.ancestor);
                    return Ok(ResolvedReader {
                        reader: Rc::clone(reader),
                        convert: Some(Rc::clone(&fallback.convert)),
                    });
                }
                _ => {}
            }
        }

        Err(ContentError::NoReader {
            type_name: requested.name(),
        })
    }
}
