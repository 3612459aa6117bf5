//! Bounded memory for sandboxed script execution.
//!
//! Each execution context owns one [`Arena`]: a fixed pool (or, on trusted
//! hosts, the system allocator) that backs the interpreter heap and every
//! cryptographic value. Byte buffers are [`Octet`]s, fixed-capacity
//! containers allocated from the arena, wiped on drop and compared in
//! constant time.
//!
//! # Example
//!
//! ```
//! use sandkey_arena::{Arena, MemoryProfile, Octet};
//!
//! let arena = Arena::init(MemoryProfile::sandbox(64 * 1024))?;
//! let mut key = Octet::new(&arena, 4)?;
//! assert_eq!(key.write(b"too long"), 4);
//! assert_eq!(key.to_vec().as_slice(), b"too ");
//! # Ok::<(), sandkey_arena::ArenaError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod arena;
mod config;
mod error;
mod octet;
mod value;

pub use arena::{ALIGNMENT, Arena, ArenaStats, Ptr};
pub use config::{DEFAULT_HEAP_SIZE, MIN_HEAP_SIZE, MemoryProfile};
pub use error::{ArenaError, OctetError};
pub use octet::Octet;
pub use value::Value;
