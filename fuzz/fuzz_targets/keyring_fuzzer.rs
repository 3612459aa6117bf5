//! Fuzz target for the script-facing keyring surface
//!
//! # Strategy
//!
//! - Arbitrary method sequences against two keyrings sharing one small arena
//! - Arguments: nil, booleans, full-range integers and byte strings, so
//!   lengths far beyond the arena are exercised
//! - Peers: the other keyring's exported public key, or raw bytes
//!
//! # Invariants
//!
//! - No method panics on any input
//! - Key slots only ever fill: a keyring never loses a key it had
//! - Only `InvalidKeyGenerated` is fatal, and it never occurs
//! - Dropping both keyrings returns every byte to the arena

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sandkey_arena::{Arena, Value};
use sandkey_ecdh::{Keyring, KeyringState, METHODS, new_keyring};

#[derive(Debug, Arbitrary)]
enum Arg {
    Nil,
    Boolean(bool),
    Integer(i64),
    Bytes(Vec<u8>),
    PeerPublic,
}

#[derive(Debug, Arbitrary)]
struct Call {
    second: bool,
    method: u8,
    args: Vec<Arg>,
}

#[derive(Debug, Arbitrary)]
struct Input {
    secp256k1: bool,
    calls: Vec<Call>,
}

fn filled(state: KeyringState) -> (bool, bool) {
    match state {
        KeyringState::Fresh => (false, false),
        KeyringState::HasSecret => (true, false),
        KeyringState::HasPublic => (false, true),
        KeyringState::HasBoth => (true, true),
    }
}

fn peer_public(ring: &mut Keyring) -> Value {
    ring.invoke_named("public", &[]).ok().and_then(|mut out| out.pop()).unwrap_or(Value::Nil)
}

fuzz_target!(|input: Input| {
    let Ok(arena) = Arena::sandbox(16 * 1024) else {
        return;
    };
    let curve = Value::from(if input.secp256k1 { "secp256k1" } else { "ed25519" });
    let (Ok(mut first), Ok(mut second)) = (
        new_keyring(&arena, std::slice::from_ref(&curve)),
        new_keyring(&arena, std::slice::from_ref(&curve)),
    ) else {
        return;
    };

    for call in input.calls.into_iter().take(64) {
        let (ring, other) =
            if call.second { (&mut second, &mut first) } else { (&mut first, &mut second) };
        let method = METHODS[usize::from(call.method) % METHODS.len()];

        let args: Vec<Value> = call
            .args
            .into_iter()
            .take(6)
            .map(|arg| match arg {
                Arg::Nil => Value::Nil,
                Arg::Boolean(b) => Value::Boolean(b),
                // Keep iteration counts small enough to finish
                Arg::Integer(n) if method == "pbkdf2" => Value::Integer(n.min(4096)),
                Arg::Integer(n) => Value::Integer(n),
                Arg::Bytes(bytes) => Value::Str(bytes),
                Arg::PeerPublic => peer_public(other),
            })
            .collect();

        let before = filled(ring.state());
        if let Err(err) = ring.invoke_named(method, &args) {
            assert!(!err.is_fatal(), "{method}: {err}");
        }
        let after = filled(ring.state());
        assert!(after.0 >= before.0 && after.1 >= before.1, "{method} emptied a key slot");
    }

    drop(first);
    drop(second);
    assert_eq!(arena.stats().live_allocations, 0);
});
