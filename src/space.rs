//! Ready-made inline buffers.
//!
//! A `PolyValue<T, Space>` can hold a payload inline when the payload is no
//! larger than `Space` and no more strictly aligned. Any sized type works
//! as a `Space`; these aliases cover the common pointer-word multiples.
//!
//! The buffer must be at least one pointer wide, because a heap-backed
//! payload keeps its owning handle inside it.

/// Space with the size of 1 pointer word.
pub type S1 = [usize; 1];
/// Space with the size of 2 pointer words.
pub type S2 = [usize; 2];
/// Space with the size of 4 pointer words.
pub type S4 = [usize; 4];
/// Space with the size of 6 pointer words (48 bytes on 64-bit targets).
pub type S6 = [usize; 6];
/// Space with the size of 8 pointer words.
pub type S8 = [usize; 8];
/// Space with the size of 16 pointer words.
pub type S16 = [usize; 16];
/// Space with the size of 32 pointer words.
pub type S32 = [usize; 32];
/// Space with the size of 64 pointer words.
pub type S64 = [usize; 64];
