//! Pointer metadata helpers.
//!
//! A `PolyValue` keeps the metadata of its interface pointer (vtable or
//! slice length) apart from the payload address, because an inline
//! payload's address changes every time the container moves. This glues an
//! address back onto stored metadata.

#[cfg(feature = "nightly")]
mod implementation {
    pub fn with_metadata_of_mut<U: ?Sized>(addr: *mut u8, meta: *const U) -> *mut U {
        addr.with_metadata_of(meta)
    }
}

#[cfg(not(feature = "nightly"))]
#[allow(clippy::as_conversions)]
mod implementation {
    use core::ptr::addr_of_mut;

    // Relies on the data address being the first word of every pointer,
    // thin or fat. `build.rs` checks this for trait objects and slices.
    pub fn with_metadata_of_mut<U: ?Sized>(addr: *mut u8, mut meta: *const U) -> *mut U {
        let meta_ptr = addr_of_mut!(meta).cast::<usize>();
        unsafe { meta_ptr.write(addr as usize) }
        meta.cast_mut()
    }
}

pub use implementation::*;
