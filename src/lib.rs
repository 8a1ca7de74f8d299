//! # PolyValue: Polymorphic Values with Value Semantics
//!
//! [`PolyValue`] holds exactly one value of some concrete type behind an
//! interface type such as `dyn Trait`, and behaves like a plain value: it
//! can be cloned, moved, reassigned, and left empty. Small payloads live
//! inline in a configurable buffer; larger ones fall back to a single heap
//! allocation. Callers only ever see the interface.
//!
//! ## Quick Start
//!
//! ```rust
//! #[macro_use]
//! extern crate polyvalue;
//!
//! # fn main() {
//! use polyvalue::PolyValue;
//! use polyvalue::space::S6;
//!
//! trait Shape {
//!     fn area(&self) -> f64;
//! }
//!
//! #[derive(Clone)]
//! struct Square {
//!     side: f64,
//! }
//!
//! impl Shape for Square {
//!     fn area(&self) -> f64 {
//!         self.side * self.side
//!     }
//! }
//!
//! let a: PolyValue<dyn Shape, S6> = poly!(Square { side: 4.0 });
//! assert_eq!(a.area(), 16.0);
//! assert!(a.is_inline());
//!
//! // Copies are deep
//! let b = a.clone();
//! assert_eq!(b.area(), 16.0);
//! # }
//! ```
//!
//! ## Storage
//!
//! A payload of type `D` is stored inline when
//! `size_of::<D>() <= size_of::<Space>()` and
//! `align_of::<D>() <= align_of::<Space>()`. Otherwise it is boxed and the
//! buffer keeps the owning handle. The choice is made at compile time for
//! each `(D, Space)` pair, so binding the same type always picks the same
//! storage.
//!
//! ```rust
//! use polyvalue::PolyValue;
//! use polyvalue::space::S4;
//!
//! let small: PolyValue<[u32; 2], S4> = PolyValue::new([1, 2]);
//! assert!(!small.is_heap());
//!
//! let large: PolyValue<[u32; 32], S4> = PolyValue::new([0; 32]);
//! assert!(large.is_heap());
//! ```
//!
//! ### Custom Space Types
//!
//! Any sized type can serve as the buffer. It must be at least as large as
//! a pointer; smaller spaces are rejected at compile time.
//!
//! ```rust
//! use polyvalue::PolyValue;
//!
//! type MySpace = [u64; 16];
//! type MyValue<T> = PolyValue<T, MySpace>;
//!
//! let value: MyValue<[u8; 100]> = PolyValue::new([0; 100]);
//! assert!(!value.is_heap());
//! ```
//!
//! **Important**: Space alignment matters! If the space alignment is smaller
//! than the value's required alignment, the value will be heap-allocated
//! regardless of size.
//!
//! ## Value Semantics
//!
//! - **Empty**: [`PolyValue::empty`] and [`Default`] hold nothing and never
//!   allocate. Dereferencing an empty value panics; use
//!   [`PolyValue::try_get`] or [`PolyValue::has_value`] to check first.
//! - **Copy**: [`Clone`] clones the payload into fresh storage. Payloads
//!   must be `Clone`, which is checked when they are bound.
//! - **Move**: moving a `PolyValue` moves its payload. A heap payload's
//!   allocation is handed over, never copied or freed twice.
//!   [`PolyValue::take`] moves the payload out and leaves the source empty.
//! - **Conversion**: [`poly_upcast!`] re-views the payload through another
//!   interface the payload coerces to; [`PolyValue::resize`] moves it into
//!   a different space.
//!
//! ## Configuration
//!
//! ### Feature Flags
//!
//! - **`std`** (enabled by default)
//!   - Links to the standard library
//!   - Disable for `#![no_std]` environments: `default-features = false`
//!
//! - **`nightly`** (optional, requires nightly)
//!   - Uses the standard pointer metadata API instead of relying on the
//!     layout of fat pointers
//!
//! ### Logging
//!
//! Heap fallbacks and spills are reported at `trace` level through the
//! [`log`](https://docs.rs/log) facade.

#![cfg_attr(feature = "nightly", feature(set_ptr_value))]
#![cfg_attr(not(feature = "std"), no_std)]
#![allow(stable_features)]
#![deny(missing_docs)]
#![deny(clippy::as_conversions)]

extern crate alloc;

mod model;
mod polyvalue;
pub mod space;
mod sptr;

pub use crate::polyvalue::PolyValue;
