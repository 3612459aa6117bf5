//! Execution context configuration

use sandkey_arena::{Arena, ArenaError, MemoryProfile};

use crate::backend::Curve;

/// Settings for one sandboxed execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Allocator behind the context's arena
    pub memory: MemoryProfile,
    /// Curve used when a script creates a keyring without naming one
    pub default_curve: Curve,
}

impl SandboxConfig {
    /// Host profile: system allocator, default curve.
    pub fn host() -> Self {
        Self { memory: MemoryProfile::Host, ..Self::default() }
    }

    /// Create the arena for a new context.
    pub fn arena(&self) -> Result<Arena, ArenaError> {
        Arena::init(self.memory)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self { memory: MemoryProfile::default(), default_curve: Curve::Ed25519 }
    }
}
