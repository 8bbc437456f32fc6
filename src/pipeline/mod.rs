//! Input stages shared by every operation.
//!
//! ```text
//!  PdfSource ──▶ validate ──▶ resolve ──▶ bytes view
//!  (path/bytes/stream)  (exists, size, sniff)  (Cow<[u8]>)
//! ```
//!
//! 1. [`validate`] — existence, then the size ceiling, then a MIME sniff of
//!    the leading bytes. The first failing check wins.
//! 2. [`input`]    — read the validated source into memory. Byte buffers are
//!    borrowed as-is; streams are read from the start and their cursor is
//!    put back where the caller left it.

pub mod input;
pub mod validate;
