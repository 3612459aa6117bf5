//! Fixed-capacity byte buffers allocated from an [`Arena`].
//!
//! Every cryptographic value (keys, ciphertexts, digests, tags) is an
//! [`Octet`]. Capacity is fixed at creation: writes past it truncate instead
//! of reallocating, so a script can never grow a buffer behind the arena's
//! back. Storage is wiped and returned to the arena on drop.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::{
    arena::{Arena, Ptr},
    error::{ArenaError, OctetError},
    value::Value,
};

/// Bounded byte container with explicit length and capacity.
///
/// `0 <= len() <= capacity()` always holds.
pub struct Octet {
    arena: Arena,
    ptr: Ptr,
    len: usize,
    capacity: usize,
}

impl Octet {
    /// Empty buffer able to hold `capacity` bytes.
    pub fn new(arena: &Arena, capacity: usize) -> Result<Self, ArenaError> {
        let ptr = arena.alloc(capacity)?;
        Ok(Self { arena: arena.clone(), ptr, len: 0, capacity })
    }

    /// Buffer holding exactly `bytes`.
    pub fn from_slice(arena: &Arena, bytes: &[u8]) -> Result<Self, ArenaError> {
        Self::with_contents(arena, bytes.len(), bytes)
    }

    /// Buffer of `capacity` bytes filled with as much of `bytes` as fits.
    pub fn with_contents(arena: &Arena, capacity: usize, bytes: &[u8]) -> Result<Self, ArenaError> {
        let mut octet = Self::new(arena, capacity)?;
        octet.write(bytes);
        Ok(octet)
    }

    /// Import a script value.
    ///
    /// Octets are duplicated and strings are copied byte for byte. Any other
    /// kind is rejected.
    pub fn from_value(arena: &Arena, value: &Value) -> Result<Self, OctetError> {
        match value {
            Value::Octet(octet) => {
                let bytes = octet.to_vec();
                Ok(Self::from_slice(arena, &bytes)?)
            },
            Value::Str(bytes) => Ok(Self::from_slice(arena, bytes)?),
            other => Err(OctetError::TypeMismatch {
                expected: "octet or string",
                found: other.type_name(),
            }),
        }
    }

    /// Bytes currently held.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Maximum number of bytes this buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when no bytes are held.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes that can still be appended.
    pub fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    /// Arena the storage lives in.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Replace the contents with `bytes`, truncated to capacity.
    ///
    /// Returns the number of bytes written.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.capacity);
        self.arena.with_block_mut(self.ptr, |block| {
            block[..n].copy_from_slice(&bytes[..n]);
            block[n..].zeroize();
        });
        self.len = n;
        n
    }

    /// Append `bytes` after the current contents, truncated to capacity.
    ///
    /// Returns the number of bytes appended.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining());
        let start = self.len;
        self.arena.with_block_mut(self.ptr, |block| {
            block[start..start + n].copy_from_slice(&bytes[..n]);
        });
        self.len += n;
        n
    }

    /// Fill the whole capacity through `f`, which sees zeroed storage.
    ///
    /// Afterwards the buffer is full. `f` must not touch this buffer's arena.
    pub fn fill_with<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let out = self.arena.with_block_mut(self.ptr, |block| {
            block.zeroize();
            f(block)
        });
        self.len = self.capacity;
        out
    }

    /// Wipe the contents, keeping the capacity.
    pub fn clear(&mut self) {
        self.arena.with_block_mut(self.ptr, Zeroize::zeroize);
        self.len = 0;
    }

    /// Copy of the contents whose capacity equals the current length.
    pub fn duplicate(&self) -> Result<Self, ArenaError> {
        let bytes = self.to_vec();
        Self::from_slice(&self.arena, &bytes)
    }

    /// Run `f` over the held bytes.
    ///
    /// `f` must not allocate from this buffer's arena.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let len = self.len;
        self.arena.with_block(self.ptr, |block| f(&block[..len]))
    }

    /// Copy of the held bytes that is wiped when dropped.
    pub fn to_vec(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.with_bytes(<[u8]>::to_vec))
    }

    /// Byte-for-byte comparison, constant time in the content.
    ///
    /// Buffers of different length compare unequal without inspecting content.
    pub fn ct_eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let theirs = other.to_vec();
        self.with_bytes(|ours| bool::from(ours.ct_eq(theirs.as_slice())))
    }
}

impl PartialEq for Octet {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other)
    }
}

impl Eq for Octet {}

impl fmt::Debug for Octet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Octet")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl Drop for Octet {
    fn drop(&mut self) {
        self.arena.free(self.ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena {
        Arena::sandbox(4096).unwrap()
    }

    #[test]
    fn new_is_empty_with_fixed_capacity() {
        let arena = arena();
        let octet = Octet::new(&arena, 16).unwrap();

        assert!(octet.is_empty());
        assert_eq!(octet.capacity(), 16);
        assert_eq!(octet.remaining(), 16);
    }

    #[test]
    fn write_truncates_to_capacity() {
        let arena = arena();
        let mut octet = Octet::new(&arena, 4).unwrap();

        assert_eq!(octet.write(b"abcdef"), 4);
        assert_eq!(octet.to_vec().as_slice(), b"abcd");
    }

    #[test]
    fn shorter_write_wipes_previous_tail() {
        let arena = arena();
        let mut octet = Octet::from_slice(&arena, b"secret").unwrap();
        octet.write(b"ab");

        assert_eq!(octet.len(), 2);
        arena.with_block(octet.ptr, |block| assert_eq!(block, b"ab\0\0\0\0"));
    }

    #[test]
    fn append_fills_remaining_capacity() {
        let arena = arena();
        let mut octet = Octet::with_contents(&arena, 6, b"abc").unwrap();

        assert_eq!(octet.append(b"defgh"), 3);
        assert_eq!(octet.append(b"x"), 0);
        assert_eq!(octet.to_vec().as_slice(), b"abcdef");
    }

    #[test]
    fn fill_with_writes_whole_capacity_in_place() {
        let arena = arena();
        let mut octet = Octet::from_slice(&arena, b"old").unwrap();

        let seen = octet.fill_with(|block| {
            let zeroed = block.iter().all(|&b| b == 0);
            block.copy_from_slice(b"new");
            zeroed
        });

        assert!(seen);
        assert_eq!(octet.len(), 3);
        assert_eq!(octet.to_vec().as_slice(), b"new");
    }

    #[test]
    fn duplicate_shrinks_capacity_to_length() {
        let arena = arena();
        let octet = Octet::with_contents(&arena, 64, b"abc").unwrap();
        let copy = octet.duplicate().unwrap();

        assert_eq!(copy.capacity(), 3);
        assert_eq!(copy, octet);
    }

    #[test]
    fn equality_includes_length() {
        let arena = arena();
        let a = Octet::from_slice(&arena, b"abc").unwrap();
        let b = Octet::from_slice(&arena, b"abcd").unwrap();
        let c = Octet::from_slice(&arena, b"abd").unwrap();

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, Octet::from_slice(&arena, b"abc").unwrap());
    }

    #[test]
    fn from_value_accepts_octets_and_strings_only() {
        let arena = arena();
        let source = Octet::from_slice(&arena, b"key").unwrap();

        let from_octet = Octet::from_value(&arena, &Value::Octet(source)).unwrap();
        let from_str = Octet::from_value(&arena, &Value::from("key")).unwrap();
        assert_eq!(from_octet, from_str);

        let err = Octet::from_value(&arena, &Value::Integer(3)).unwrap_err();
        assert_eq!(err, OctetError::TypeMismatch { expected: "octet or string", found: "integer" });
    }

    #[test]
    fn drop_returns_storage_to_arena() {
        let arena = arena();
        {
            let _octet = Octet::new(&arena, 100).unwrap();
            assert_eq!(arena.stats().live_allocations, 1);
        }
        assert_eq!(arena.stats().live_allocations, 0);
        assert_eq!(arena.stats().in_use, 0);
    }

    #[test]
    fn allocation_failure_is_reported() {
        let arena = Arena::sandbox(64).unwrap();
        let err = Octet::new(&arena, 65).unwrap_err();
        assert!(matches!(err, ArenaError::OutOfMemory { requested: 65, .. }));
    }

    #[test]
    fn debug_hides_content() {
        let arena = arena();
        let octet = Octet::from_slice(&arena, b"hunter2").unwrap();
        let shown = format!("{octet:?}");

        assert!(shown.contains("len: 7"));
        assert!(!shown.contains("hunter2"));
    }
}
