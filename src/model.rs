//! Dispatch surface of a `PolyValue`.
//!
//! A [`Model`] says what currently lives in a container's buffer and knows
//! how to reach, clone, move, and destroy it. The concrete payload type is
//! erased: everything type-specific goes through a [`Vtable`] built once
//! per payload type, and the interface metadata (the `dyn` vtable or slice
//! length of `T`) rides along in a metadata-only pointer.
//!
//! # Buffer contents
//!
//! - [`Model::Empty`]: nothing. The buffer bytes are uninitialized.
//! - [`Model::Inline`]: a live payload starts at the first byte of the
//!   buffer.
//! - [`Model::Heap`]: the first pointer-width bytes of the buffer hold the
//!   owning handle of a single heap allocation, stored unaligned so any
//!   `Space` at least one pointer wide can carry it.
//!
//! Every function here that takes buffer pointers requires that they point
//! to the buffer the model describes, unless stated otherwise.

use alloc::boxed::Box;
use core::any::TypeId;
use core::mem;
use core::ptr::{self, NonNull};

use crate::sptr;

/// Type-specific operations for one payload type `D`.
///
/// Vtables are `&'static` and created only through [`Vtable::new`], which
/// pairs every function pointer with the same `D`.
pub(crate) struct Vtable {
    type_id: fn() -> TypeId,
    size: usize,
    align: usize,
    drop_inline: unsafe fn(*mut u8),
    drop_heap: unsafe fn(*mut u8),
    clone_inline: unsafe fn(*const u8, *mut u8),
    clone_heap: unsafe fn(*const u8) -> *mut u8,
    spill: unsafe fn(*mut u8) -> *mut u8,
}

impl Vtable {
    pub(crate) const fn new<D: Clone + 'static>() -> &'static Self {
        const {
            &Self {
                type_id: TypeId::of::<D>,
                size: mem::size_of::<D>(),
                align: mem::align_of::<D>(),
                drop_inline: drop_inline::<D>,
                drop_heap: drop_heap::<D>,
                clone_inline: clone_inline::<D>,
                clone_heap: clone_heap::<D>,
                spill: spill::<D>,
            }
        }
    }

    #[inline]
    pub(crate) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Whether a payload of this type can live inline in `Space`.
    #[inline]
    pub(crate) fn fits<Space>(&self) -> bool {
        self.size <= mem::size_of::<Space>() && self.align <= mem::align_of::<Space>()
    }
}

/// Compile-time storage decision for payload `D` in buffer `Space`.
pub(crate) struct Placement<D, Space>(core::marker::PhantomData<(D, Space)>);

impl<D, Space> Placement<D, Space> {
    pub(crate) const INLINE: bool =
        mem::size_of::<D>() <= mem::size_of::<Space>() && mem::align_of::<D>() <= mem::align_of::<Space>();
}

/// Ties a payload type's [`Vtable`] to the metadata of the interface `T`
/// it is viewed through.
///
/// `meta` only carries metadata; its address is meaningless.
pub(crate) struct Binding<T: ?Sized> {
    meta: NonNull<T>,
    vtable: &'static Vtable,
}

impl<T: ?Sized> Clone for Binding<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Binding<T> {}

impl<T: ?Sized> Binding<T> {
    /// # Safety
    ///
    /// `meta` must carry the metadata of a `*const T` obtained by coercing
    /// a pointer to the payload type `vtable` was built for.
    pub(crate) unsafe fn new(meta: NonNull<T>, vtable: &'static Vtable) -> Self {
        Binding { meta, vtable }
    }

    fn attach(&self, addr: *mut u8) -> NonNull<T> {
        let ptr = sptr::with_metadata_of_mut(addr, self.meta.as_ptr());
        // SAFETY: `addr` is a buffer or allocation address, never null.
        unsafe { NonNull::new_unchecked(ptr) }
    }
}

/// What the buffer of a container currently holds.
pub(crate) enum Model<T: ?Sized> {
    Empty,
    Inline(Binding<T>),
    Heap(Binding<T>),
}

impl<T: ?Sized> Model<T> {
    #[inline]
    pub(crate) fn is_present(&self) -> bool {
        !matches!(self, Model::Empty)
    }

    #[inline]
    pub(crate) fn is_heap(&self) -> bool {
        matches!(self, Model::Heap(_))
    }

    #[inline]
    pub(crate) fn is_inline(&self) -> bool {
        matches!(self, Model::Inline(_))
    }

    pub(crate) fn vtable(&self) -> Option<&'static Vtable> {
        match self {
            Model::Empty => None,
            Model::Inline(binding) | Model::Heap(binding) => Some(binding.vtable),
        }
    }

    /// Address of the live payload, or `None` when empty.
    ///
    /// # Safety
    ///
    /// `space` must point to the buffer this model describes.
    pub(crate) unsafe fn reference(&self, space: *mut u8) -> Option<NonNull<T>> {
        match self {
            Model::Empty => None,
            Model::Inline(binding) => Some(binding.attach(space)),
            Model::Heap(binding) => Some(binding.attach(read_handle(space))),
        }
    }

    /// Clones the payload into the uninitialized buffer at `dst` and
    /// returns the model describing it. Empty clones to empty.
    ///
    /// # Safety
    ///
    /// `src` must point to the buffer this model describes. `dst` must be
    /// a distinct buffer of the same `Space`, with no live contents.
    pub(crate) unsafe fn clone_into(&self, src: *const u8, dst: *mut u8) -> Model<T> {
        match *self {
            Model::Empty => Model::Empty,
            Model::Inline(binding) => {
                (binding.vtable.clone_inline)(src, dst);
                Model::Inline(binding)
            }
            Model::Heap(binding) => {
                let handle = (binding.vtable.clone_heap)(read_handle(src));
                write_handle(dst, handle);
                Model::Heap(binding)
            }
        }
    }

    /// Moves the payload out of `src` into the uninitialized buffer at
    /// `dst`, spilling an inline payload to the heap unless `dst_fits`.
    /// A heap payload keeps its allocation; only the handle moves.
    ///
    /// # Safety
    ///
    /// `src` must point to the buffer this model describes, and the caller
    /// must treat it as empty afterwards. `dst` must not overlap `src`, and
    /// if `dst_fits` the payload must fit the destination buffer.
    pub(crate) unsafe fn move_into(self, src: *mut u8, dst: *mut u8, dst_fits: bool) -> Model<T> {
        match self {
            Model::Empty => Model::Empty,
            Model::Inline(binding) if dst_fits => {
                ptr::copy_nonoverlapping(src, dst, binding.vtable.size);
                Model::Inline(binding)
            }
            Model::Inline(binding) => {
                log::trace!(
                    "spilling {}-byte inline payload to the heap",
                    binding.vtable.size
                );
                write_handle(dst, (binding.vtable.spill)(src));
                Model::Heap(binding)
            }
            Model::Heap(binding) => {
                write_handle(dst, read_handle(src));
                Model::Heap(binding)
            }
        }
    }

    /// Moves the payload into a heap allocation (reusing the existing one
    /// when heap-backed) and returns it with full `T` metadata.
    ///
    /// # Safety
    ///
    /// `space` must point to the buffer this model describes. Ownership of
    /// the allocation passes to the caller, which must treat the buffer as
    /// empty afterwards.
    pub(crate) unsafe fn into_heap(self, space: *mut u8) -> Option<NonNull<T>> {
        match self {
            Model::Empty => None,
            Model::Inline(binding) => {
                log::trace!(
                    "spilling {}-byte inline payload to the heap",
                    binding.vtable.size
                );
                Some(binding.attach((binding.vtable.spill)(space)))
            }
            Model::Heap(binding) => Some(binding.attach(read_handle(space))),
        }
    }

    /// Drops the payload, frees its allocation if any, and leaves the model
    /// empty.
    ///
    /// # Safety
    ///
    /// `space` must point to the buffer this model describes.
    pub(crate) unsafe fn destroy(&mut self, space: *mut u8) {
        match mem::replace(self, Model::Empty) {
            Model::Empty => {}
            Model::Inline(binding) => (binding.vtable.drop_inline)(space),
            Model::Heap(binding) => (binding.vtable.drop_heap)(read_handle(space)),
        }
    }

    /// Reinterprets the payload through another interface `U`.
    ///
    /// # Safety
    ///
    /// `meta` must carry the metadata of a `*const U` obtained by coercing
    /// a pointer to this model's payload.
    pub(crate) unsafe fn cast<U: ?Sized>(self, meta: NonNull<U>) -> Model<U> {
        match self {
            Model::Empty => Model::Empty,
            Model::Inline(binding) => Model::Inline(Binding::new(meta, binding.vtable)),
            Model::Heap(binding) => Model::Heap(Binding::new(meta, binding.vtable)),
        }
    }
}

#[inline]
unsafe fn read_handle(space: *const u8) -> *mut u8 {
    space.cast::<*mut u8>().read_unaligned()
}

#[inline]
unsafe fn write_handle(space: *mut u8, handle: *mut u8) {
    space.cast::<*mut u8>().write_unaligned(handle)
}

/// # Safety
///
/// `data` must point to a live, properly aligned `D` that is not used
/// again.
unsafe fn drop_inline<D>(data: *mut u8) {
    ptr::drop_in_place(data.cast::<D>());
}

/// # Safety
///
/// `handle` must come from `Box::<D>::into_raw` and not be used again.
unsafe fn drop_heap<D>(handle: *mut u8) {
    drop(Box::from_raw(handle.cast::<D>()));
}

/// # Safety
///
/// `src` must point to a live, aligned `D`; `dst` must be valid for an
/// aligned write of a `D`.
unsafe fn clone_inline<D: Clone>(src: *const u8, dst: *mut u8) {
    let value = (*src.cast::<D>()).clone();
    dst.cast::<D>().write(value);
}

/// # Safety
///
/// `handle` must come from `Box::<D>::into_raw` and still be live.
unsafe fn clone_heap<D: Clone>(handle: *const u8) -> *mut u8 {
    let value = (*handle.cast::<D>()).clone();
    Box::into_raw(Box::new(value)).cast()
}

/// # Safety
///
/// `data` must point to a live, aligned `D`, which is moved out.
unsafe fn spill<D>(data: *mut u8) -> *mut u8 {
    Box::into_raw(Box::new(data.cast::<D>().read())).cast()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::*;

    #[test]
    fn test_vtable_per_type() {
        let first = Vtable::new::<u32>();
        let second = Vtable::new::<u32>();
        assert_eq!(first.type_id(), second.type_id());
        assert_eq!((first.size, first.align), (second.size, second.align));

        let other = Vtable::new::<u64>();
        assert_ne!(first.type_id(), other.type_id());
        assert_eq!(other.size, 8);
    }

    #[test]
    fn test_vtable_records_type() {
        let vtable = Vtable::new::<[u16; 3]>();
        assert_eq!(vtable.type_id(), TypeId::of::<[u16; 3]>());
        assert_eq!(vtable.size, 6);
    }

    #[test]
    fn test_placement_matches_vtable() {
        assert!(Placement::<[usize; 2], S2>::INLINE);
        assert!(Vtable::new::<[usize; 2]>().fits::<S2>());

        assert!(!Placement::<[usize; 3], S2>::INLINE);
        assert!(!Vtable::new::<[usize; 3]>().fits::<S2>());

        // same size, stricter alignment
        assert!(!Placement::<u64, [u8; 8]>::INLINE);
        assert!(!Vtable::new::<u64>().fits::<[u8; 8]>());

        assert!(Placement::<(), S1>::INLINE);
    }

    #[test]
    fn test_empty_model() {
        let mut model = Model::<u32>::Empty;
        let mut space = core::mem::MaybeUninit::<S1>::uninit();
        let space = space.as_mut_ptr().cast::<u8>();

        assert!(!model.is_present());
        assert!(model.vtable().is_none());
        unsafe {
            assert!(model.reference(space).is_none());
            model.destroy(space);
        }
        assert!(!model.is_heap() && !model.is_inline());
    }
}
