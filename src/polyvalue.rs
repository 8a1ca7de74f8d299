use core::any::Any;
use core::cell::UnsafeCell;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{self, Hash};
use core::marker::PhantomData;
use core::mem::{self, MaybeUninit};
use core::ops;
use core::ptr::{self, NonNull};

use alloc::boxed::Box;

use crate::model::{Binding, Model, Placement, Vtable};
use crate::space::S8;

/// Bind a value to a `PolyValue`, inline or on the heap depending on its size.
///
/// This macro is similar to `PolyValue::new`, but relaxes `T: Sized`: the
/// value is coerced to the container's interface type, so it can build a
/// `PolyValue<dyn Trait, _>` or a `PolyValue<[T], _>` on stable Rust.
/// Invalid coercions are compile errors.
///
/// You can think that it has the signature of
/// `poly!<D: Clone + 'static, T: ?Sized>(val: D) -> PolyValue<T, Space>`
///
/// # Example
///
/// ```
/// #[macro_use]
/// extern crate polyvalue;
///
/// # fn main() {
/// use polyvalue::PolyValue;
/// use polyvalue::space::*;
///
/// let small: PolyValue<[usize], S4> = poly!([0usize; 2]);
/// let large: PolyValue<[usize], S4> = poly!([1usize; 8]);
///
/// assert_eq!(small.len(), 2);
/// assert_eq!(large[7], 1);
///
/// assert!(large.is_heap());
/// # }
/// ```
///
/// The payload must be `Clone`, since every `PolyValue` can be copied:
///
/// ```compile_fail
/// #[macro_use]
/// extern crate polyvalue;
///
/// # fn main() {
/// use polyvalue::PolyValue;
///
/// struct Unique;
/// let value: PolyValue<dyn core::any::Any> = poly!(Unique);
/// # }
/// ```
#[macro_export]
macro_rules! poly {
    ( $e: expr ) => {{
        let val = $e;
        let ptr = &val as *const _;
        #[allow(unsafe_code)]
        unsafe {
            $crate::PolyValue::new_unchecked(val, ptr)
        }
    }};
}

/// View a `PolyValue` through a wider interface, keeping its storage.
///
/// The payload pointer is coerced from `PolyValue<T, Space>` to
/// `PolyValue<U, Space>`, so only unsizing coercions are accepted: a
/// concrete type to a trait it implements, a trait object to one of its
/// supertraits, or an array to a slice. An empty value stays empty.
///
/// The target interface is inferred, or named with `poly_upcast!(value => U)`.
///
/// # Example
///
/// ```
/// #[macro_use]
/// extern crate polyvalue;
///
/// # fn main() {
/// use core::fmt::Debug;
/// use polyvalue::PolyValue;
///
/// trait Named: Debug {
///     fn name(&self) -> &'static str;
/// }
///
/// #[derive(Debug, Clone)]
/// struct Rock;
/// impl Named for Rock {
///     fn name(&self) -> &'static str {
///         "rock"
///     }
/// }
///
/// let named: PolyValue<dyn Named> = poly!(Rock);
/// let copy = poly_upcast!(named.clone() => dyn Debug);
/// let debug: PolyValue<dyn Debug> = poly_upcast!(named);
/// assert_eq!(format!("{:?}", debug), "Rock");
/// assert_eq!(format!("{:?}", copy), "Rock");
/// # }
/// ```
///
/// Viewing the value as one of its fields is not a coercion:
///
/// ```compile_fail
/// #[macro_use]
/// extern crate polyvalue;
///
/// # fn main() {
/// use polyvalue::PolyValue;
/// use polyvalue::space::S4;
/// use std::rc::Rc;
///
/// #[derive(Clone)]
/// #[repr(C)]
/// struct Shared {
///     head: u64,
///     rc: Rc<u8>,
/// }
///
/// let value = PolyValue::<Shared, S4>::new(Shared { head: 1, rc: Rc::new(0) });
/// let head: PolyValue<u64, S4> = poly_upcast!(value);
/// # }
/// ```
///
/// Nor is adding an auto trait the payload was not checked for:
///
/// ```compile_fail
/// #[macro_use]
/// extern crate polyvalue;
///
/// # fn main() {
/// use core::fmt::Debug;
/// use polyvalue::PolyValue;
///
/// let local: PolyValue<dyn Debug> = poly!(std::rc::Rc::new(0u8));
/// let sendable: PolyValue<dyn Debug + Send> = poly_upcast!(local);
/// # }
/// ```
#[macro_export]
macro_rules! poly_upcast {
    ( $e: expr => $t: ty ) => {{
        let val = $e;
        #[allow(unsafe_code)]
        unsafe {
            $crate::PolyValue::upcast_unchecked::<$t>(val, |ptr| ptr)
        }
    }};
    ( $e: expr ) => {{
        let val = $e;
        #[allow(unsafe_code)]
        unsafe {
            $crate::PolyValue::upcast_unchecked(val, |ptr| ptr)
        }
    }};
}

/// A value of some type implementing the interface `T`, stored inline in
/// `Space` when it fits and on the heap otherwise.
///
/// A `PolyValue` behaves like the value it holds: cloning it clones the
/// payload, moving it moves the payload, and dropping it drops the payload.
/// It may also be empty, which is the [`Default`].
pub struct PolyValue<T: ?Sized, Space = S8> {
    space: MaybeUninit<UnsafeCell<Space>>,
    model: Model<T>,
    _phantom: PhantomData<T>,
}

impl<T: ?Sized, Space> PolyValue<T, Space> {
    const CAPACITY_CHECK: () = assert!(
        mem::size_of::<Space>() >= mem::size_of::<*mut u8>(),
        "PolyValue space must be able to hold at least one pointer"
    );

    /// Creates an empty `PolyValue`. Does not allocate.
    ///
    /// # Example
    ///
    /// ```
    /// use polyvalue::PolyValue;
    ///
    /// let value = PolyValue::<dyn core::fmt::Debug>::empty();
    /// assert!(!value.has_value());
    /// ```
    ///
    /// A space too small for the heap handle is rejected at compile time:
    ///
    /// ```compile_fail
    /// use polyvalue::PolyValue;
    ///
    /// let value = PolyValue::<dyn core::fmt::Debug, [u8; 2]>::empty();
    /// ```
    pub const fn empty() -> PolyValue<T, Space> {
        let () = Self::CAPACITY_CHECK;
        PolyValue {
            space: MaybeUninit::uninit(),
            model: Model::Empty,
            _phantom: PhantomData,
        }
    }

    /// Bind a value inline or on the heap depending on its size.
    ///
    /// # Example
    ///
    /// ```
    /// use polyvalue::PolyValue;
    /// use polyvalue::space::*;
    ///
    /// let small: PolyValue<_, S4> = PolyValue::new([0usize; 2]);
    /// let large: PolyValue<_, S4> = PolyValue::new([1usize; 8]);
    ///
    /// assert_eq!(small.len(), 2);
    /// assert_eq!(large[7], 1);
    ///
    /// assert!(large.is_heap());
    /// ```
    pub fn new(val: T) -> PolyValue<T, Space>
    where
        T: Sized + Clone + 'static,
    {
        poly!(val)
    }

    #[doc(hidden)]
    #[inline]
    pub unsafe fn new_unchecked<D>(val: D, ptr: *const T) -> PolyValue<T, Space>
    where
        D: Clone + 'static,
    {
        let mut result = Self::empty();
        let binding = Binding::new(NonNull::new_unchecked(ptr.cast_mut()), Vtable::new::<D>());
        let space = result.space_mut_ptr();

        result.model = if Placement::<D, Space>::INLINE {
            space.cast::<D>().write(val);
            Model::Inline(binding)
        } else {
            log::trace!(
                "{} ({} bytes) does not fit {} bytes of inline space, boxing it",
                core::any::type_name::<D>(),
                mem::size_of::<D>(),
                mem::size_of::<Space>()
            );
            let handle = Box::into_raw(Box::new(val));
            space.cast::<*mut D>().write_unaligned(handle);
            Model::Heap(binding)
        };

        result
    }

    /// Returns true if a value is bound.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.model.is_present()
    }

    /// Returns true if the value is heap-allocated.
    #[inline]
    pub fn is_heap(&self) -> bool {
        self.model.is_heap()
    }

    /// Returns true if the value is stored inline.
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.model.is_inline()
    }

    /// Returns the bound value.
    ///
    /// # Panics
    ///
    /// Panics if the `PolyValue` is empty.
    #[inline]
    #[track_caller]
    pub fn get(&self) -> &T {
        match self.try_get() {
            Some(val) => val,
            None => empty_deref(),
        }
    }

    /// Returns the bound value mutably.
    ///
    /// # Panics
    ///
    /// Panics if the `PolyValue` is empty.
    #[inline]
    #[track_caller]
    pub fn get_mut(&mut self) -> &mut T {
        match self.try_get_mut() {
            Some(val) => val,
            None => empty_deref(),
        }
    }

    /// Returns the bound value, or `None` if empty.
    pub fn try_get(&self) -> Option<&T> {
        unsafe { self.model.reference(self.space_ptr()).map(|ptr| &*ptr.as_ptr()) }
    }

    /// Returns the bound value mutably, or `None` if empty.
    pub fn try_get_mut(&mut self) -> Option<&mut T> {
        let space = self.space_mut_ptr();
        unsafe { self.model.reference(space).map(|ptr| &mut *ptr.as_ptr()) }
    }

    /// Drops the bound value, if any, and leaves the `PolyValue` empty.
    pub fn reset(&mut self) {
        let space = self.space_mut_ptr();
        unsafe { self.model.destroy(space) }
    }

    /// Moves the bound value out, leaving this `PolyValue` empty.
    ///
    /// # Example
    ///
    /// ```
    /// use polyvalue::PolyValue;
    /// use polyvalue::space::S1;
    ///
    /// let mut source: PolyValue<_, S1> = PolyValue::new([7usize; 4]);
    /// let target = source.take();
    ///
    /// assert!(!source.has_value());
    /// assert_eq!(*target, [7; 4]);
    /// ```
    pub fn take(&mut self) -> PolyValue<T, Space> {
        mem::replace(self, Self::empty())
    }

    /// Binds `other` in place of the current value and returns the old one.
    pub fn replace(&mut self, other: PolyValue<T, Space>) -> PolyValue<T, Space> {
        mem::replace(self, other)
    }

    /// Change the capacity of `PolyValue`
    ///
    /// This method may move inline data to the heap if the target space is
    /// not sufficient. Once the data is stored on the heap, it'll never be
    /// moved again.
    ///
    /// # Example
    ///
    /// ```
    /// use polyvalue::PolyValue;
    /// use polyvalue::space::{S2, S4};
    ///
    /// let s: PolyValue<_, S4> = PolyValue::new([0usize; 4]);
    /// let m: PolyValue<_, S2> = s.resize();
    /// assert!(m.is_heap());
    /// ```
    pub fn resize<ToSpace>(mut self) -> PolyValue<T, ToSpace> {
        let mut result = PolyValue::<T, ToSpace>::empty();
        let model = mem::replace(&mut self.model, Model::Empty);
        let dst_fits = model.vtable().is_some_and(|vtable| vtable.fits::<ToSpace>());

        result.model = unsafe { model.move_into(self.space_mut_ptr(), result.space_mut_ptr(), dst_fits) };
        result
    }

    // `coerce` must return a pointer to the same payload; `poly_upcast!`
    // only ever passes an identity closure, so the compiler checks the
    // coercion.
    #[doc(hidden)]
    pub unsafe fn upcast_unchecked<U: ?Sized>(
        mut self,
        coerce: fn(*const T) -> *const U,
    ) -> PolyValue<U, Space> {
        let mut result = PolyValue::<U, Space>::empty();

        if let Some(payload) = self.model.reference(self.space_ptr()) {
            let target = coerce(payload.as_ptr().cast_const());
            debug_assert!(ptr::eq(target.cast::<u8>(), payload.as_ptr().cast::<u8>()));
            let meta = NonNull::new_unchecked(target.cast_mut());

            let model = mem::replace(&mut self.model, Model::Empty);
            ptr::copy_nonoverlapping(self.space_ptr(), result.space_mut_ptr(), mem::size_of::<Space>());
            result.model = model.cast(meta);
        }

        result
    }

    /// Moves the value into a [`Box`]. A heap-backed value keeps its
    /// allocation; an inline value is moved to a new one.
    ///
    /// Returns `None` if empty.
    ///
    /// # Example
    ///
    /// ```
    /// use polyvalue::PolyValue;
    /// use polyvalue::space::S4;
    ///
    /// let value: PolyValue<_, S4> = PolyValue::new([1, 2, 3, 4]);
    /// let boxed: Box<[i32; 4]> = value.into_box().unwrap();
    /// assert_eq!(*boxed, [1, 2, 3, 4]);
    /// ```
    pub fn into_box(mut self) -> Option<Box<T>> {
        let model = mem::replace(&mut self.model, Model::Empty);
        unsafe {
            model
                .into_heap(self.space_mut_ptr())
                .map(|ptr| Box::from_raw(ptr.as_ptr()))
        }
    }

    /// Returns true if the bound value is of type `D`.
    pub fn is<D: Any>(&self) -> bool {
        self.model
            .vtable()
            .is_some_and(|vtable| vtable.type_id() == core::any::TypeId::of::<D>())
    }

    /// Returns a reference to the bound value if it is of type `D`.
    pub fn downcast_ref<D: Any>(&self) -> Option<&D> {
        if self.is::<D>() {
            self.try_get().map(|val| unsafe { &*ptr::from_ref(val).cast::<D>() })
        } else {
            None
        }
    }

    /// Returns a mutable reference to the bound value if it is of type `D`.
    pub fn downcast_mut<D: Any>(&mut self) -> Option<&mut D> {
        if self.is::<D>() {
            self.try_get_mut().map(|val| unsafe { &mut *ptr::from_mut(val).cast::<D>() })
        } else {
            None
        }
    }

    // Shared access still needs a writable pointer: payloads may have
    // interior mutability.
    #[inline]
    fn space_ptr(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.space.as_ptr()).cast()
    }

    #[inline]
    fn space_mut_ptr(&mut self) -> *mut u8 {
        self.space.as_mut_ptr().cast()
    }
}

#[cold]
#[track_caller]
fn empty_deref() -> ! {
    panic!("dereferenced an empty PolyValue")
}

impl<T: ?Sized, Space> Default for PolyValue<T, Space> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized, Space> ops::Deref for PolyValue<T, Space> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T: ?Sized, Space> ops::DerefMut for PolyValue<T, Space> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        self.get_mut()
    }
}

impl<T: ?Sized, Space> ops::Drop for PolyValue<T, Space> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized, Space> Clone for PolyValue<T, Space> {
    fn clone(&self) -> Self {
        let mut result = Self::empty();
        result.model = unsafe { self.model.clone_into(self.space_ptr(), result.space_mut_ptr()) };
        result
    }
}

impl<T: ?Sized + fmt::Display, Space> fmt::Display for PolyValue<T, Space> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl<T: ?Sized + fmt::Debug, Space> fmt::Debug for PolyValue<T, Space> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.try_get() {
            Some(val) => fmt::Debug::fmt(val, f),
            None => f.write_str("PolyValue(<empty>)"),
        }
    }
}

impl<T: ?Sized + PartialEq, Space> PartialEq for PolyValue<T, Space> {
    #[inline]
    fn eq(&self, other: &PolyValue<T, Space>) -> bool {
        self.try_get() == other.try_get()
    }
}

impl<T: ?Sized + Eq, Space> Eq for PolyValue<T, Space> {}

impl<T: ?Sized + PartialOrd, Space> PartialOrd for PolyValue<T, Space> {
    #[inline]
    fn partial_cmp(&self, other: &PolyValue<T, Space>) -> Option<Ordering> {
        self.try_get().partial_cmp(&other.try_get())
    }
}

impl<T: ?Sized + Ord, Space> Ord for PolyValue<T, Space> {
    #[inline]
    fn cmp(&self, other: &PolyValue<T, Space>) -> Ordering {
        self.try_get().cmp(&other.try_get())
    }
}

impl<T: ?Sized + Hash, Space> Hash for PolyValue<T, Space> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.try_get().hash(state);
    }
}

unsafe impl<T: ?Sized + Send, Space> Send for PolyValue<T, Space> {}
unsafe impl<T: ?Sized + Sync, Space> Sync for PolyValue<T, Space> {}
