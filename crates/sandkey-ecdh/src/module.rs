//! Script-facing method registry
//!
//! The interpreter registers a module named [`MODULE_NAME`] whose constructor
//! is [`new_keyring`] and whose instance methods are [`METHODS`]. Each call is
//! routed through [`Keyring::invoke`], which converts script [`Value`]s to
//! octets and wraps results back into values.
//!
//! Argument conventions (the keyring itself is not counted):
//!
//! | Method | Arguments | Results |
//! |---|---|---|
//! | `keygen` | | public, secret |
//! | `public` | key? | public, or nothing when importing |
//! | `private` | key? | secret, or the derived public key when importing |
//! | `checkpub` | key? | boolean |
//! | `session` | peer public key | shared secret |
//! | `encrypt` / `decrypt` | key, data | octet |
//! | `aead_encrypt` | key, plaintext, iv, header? | ciphertext, tag |
//! | `aead_decrypt` | key, ciphertext, iv, header?, tag | plaintext |
//! | `hash` | data | digest |
//! | `hmac` | key, data, length? | tag |
//! | `kdf2` | params?, key, length? | derived key |
//! | `pbkdf2` | key, salt, iterations?, length? | derived key |
//! | `random` | length? | octet |
//! | `sign` | message | signature |
//! | `verify` | message, signature, key? | boolean |

use std::{fmt, str::FromStr};

use sandkey_arena::{Arena, Octet, Value};

use crate::{
    backend::Curve,
    config::SandboxConfig,
    error::KeyringError,
    keyring::{Keyring, Peer},
};

/// Name the module is registered under.
pub const MODULE_NAME: &str = "ecdh";

/// Instance methods exposed to scripts.
pub const METHODS: [&str; 16] = [
    "keygen",
    "session",
    "public",
    "private",
    "encrypt",
    "aead_encrypt",
    "decrypt",
    "aead_decrypt",
    "hash",
    "hmac",
    "kdf2",
    "pbkdf2",
    "checkpub",
    "random",
    "sign",
    "verify",
];

/// A keyring method callable from scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Generate a key pair
    Keygen,
    /// Key agreement with a peer public key
    Session,
    /// Export or import the public key
    Public,
    /// Export or import the secret key
    Private,
    /// AES-CBC encrypt
    Encrypt,
    /// AEAD encrypt
    AeadEncrypt,
    /// AES-CBC decrypt
    Decrypt,
    /// AEAD decrypt
    AeadDecrypt,
    /// Hash
    Hash,
    /// HMAC
    Hmac,
    /// KDF2
    Kdf2,
    /// PBKDF2
    Pbkdf2,
    /// Validate a public key
    CheckPub,
    /// Random bytes from the keyring generator
    Random,
    /// Sign with the secret key
    Sign,
    /// Verify a signature
    Verify,
}

impl Method {
    /// Every method, in [`METHODS`] order.
    pub const ALL: [Self; 16] = [
        Self::Keygen,
        Self::Session,
        Self::Public,
        Self::Private,
        Self::Encrypt,
        Self::AeadEncrypt,
        Self::Decrypt,
        Self::AeadDecrypt,
        Self::Hash,
        Self::Hmac,
        Self::Kdf2,
        Self::Pbkdf2,
        Self::CheckPub,
        Self::Random,
        Self::Sign,
        Self::Verify,
    ];

    /// Name the method is registered under.
    pub fn name(self) -> &'static str {
        match self {
            Self::Keygen => "keygen",
            Self::Session => "session",
            Self::Public => "public",
            Self::Private => "private",
            Self::Encrypt => "encrypt",
            Self::AeadEncrypt => "aead_encrypt",
            Self::Decrypt => "decrypt",
            Self::AeadDecrypt => "aead_decrypt",
            Self::Hash => "hash",
            Self::Hmac => "hmac",
            Self::Kdf2 => "kdf2",
            Self::Pbkdf2 => "pbkdf2",
            Self::CheckPub => "checkpub",
            Self::Random => "random",
            Self::Sign => "sign",
            Self::Verify => "verify",
        }
    }
}

impl FromStr for Method {
    type Err = KeyringError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|method| method.name() == name).ok_or_else(|| {
            KeyringError::InvalidArgument { reason: format!("unknown method: {name}") }
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Module constructor: `ecdh.new(curve?)`, defaulting to `ed25519`.
pub fn new_keyring(arena: &Arena, args: &[Value]) -> Result<Keyring, KeyringError> {
    open_keyring(arena, Curve::Ed25519, args)
}

/// Module constructor falling back to the context's configured curve.
pub fn new_keyring_with(
    arena: &Arena,
    config: &SandboxConfig,
    args: &[Value],
) -> Result<Keyring, KeyringError> {
    open_keyring(arena, config.default_curve, args)
}

fn open_keyring(arena: &Arena, default: Curve, args: &[Value]) -> Result<Keyring, KeyringError> {
    match arg(args, 0) {
        None => Keyring::new(arena, default.name()),
        Some(Value::Str(name)) => {
            let name = String::from_utf8_lossy(name);
            Keyring::new(arena, &name)
        },
        Some(other) => Err(type_mismatch("string", other)),
    }
}

/// Argument `index`; missing trailing arguments and nil both read as `None`.
fn arg(args: &[Value], index: usize) -> Option<&Value> {
    args.get(index).filter(|value| !value.is_nil())
}

fn type_mismatch(expected: &'static str, found: &Value) -> KeyringError {
    KeyringError::TypeMismatch { expected, found: found.type_name() }
}

fn optional_length(args: &[Value], index: usize) -> Result<Option<usize>, KeyringError> {
    match arg(args, index) {
        None => Ok(None),
        Some(Value::Integer(n)) => usize::try_from(*n).map(Some).map_err(|_| {
            KeyringError::InvalidArgument { reason: format!("length must not be negative: {n}") }
        }),
        Some(other) => Err(type_mismatch("integer", other)),
    }
}

fn optional_iterations(args: &[Value], index: usize) -> Result<Option<u32>, KeyringError> {
    match arg(args, index) {
        None => Ok(None),
        Some(Value::Integer(n)) => u32::try_from(*n).map(Some).map_err(|_| {
            KeyringError::InvalidArgument { reason: format!("iterations out of range: {n}") }
        }),
        Some(other) => Err(type_mismatch("integer", other)),
    }
}

impl Keyring {
    fn octet_arg(&self, args: &[Value], index: usize) -> Result<Octet, KeyringError> {
        self.optional_octet(args, index)?.ok_or(KeyringError::TypeMismatch {
            expected: "octet or string",
            found: Value::Nil.type_name(),
        })
    }

    fn optional_octet(&self, args: &[Value], index: usize) -> Result<Option<Octet>, KeyringError> {
        match arg(args, index) {
            None => Ok(None),
            Some(value) => Ok(Some(Octet::from_value(self.arena(), value)?)),
        }
    }

    fn octet_or_empty(&self, args: &[Value], index: usize) -> Result<Octet, KeyringError> {
        match self.optional_octet(args, index)? {
            Some(octet) => Ok(octet),
            None => Ok(Octet::new(self.arena(), 0)?),
        }
    }

    /// Run `method` with script arguments, returning its script results.
    #[allow(clippy::too_many_lines)]
    pub fn invoke(&mut self, method: Method, args: &[Value]) -> Result<Vec<Value>, KeyringError> {
        let results = match method {
            Method::Keygen => {
                let (public, secret) = self.keygen()?;
                vec![public.into(), secret.into()]
            },
            Method::Public => match self.optional_octet(args, 0)? {
                Some(key) => {
                    self.import_public_key(&key)?;
                    Vec::new()
                },
                None => vec![self.public_key()?.into()],
            },
            Method::Private => match self.optional_octet(args, 0)? {
                Some(key) => vec![self.import_secret_key(&key)?.into()],
                None => vec![self.secret_key()?.into()],
            },
            Method::CheckPub => {
                let key = self.optional_octet(args, 0)?;
                vec![self.check_public_key(key.as_ref())?.into()]
            },
            Method::Session => {
                let peer = self.octet_arg(args, 0)?;
                vec![self.session(Peer::Key(&peer))?.into()]
            },
            Method::Encrypt => {
                let (key, data) = (self.octet_arg(args, 0)?, self.octet_arg(args, 1)?);
                vec![self.encrypt(&key, &data)?.into()]
            },
            Method::Decrypt => {
                let (key, data) = (self.octet_arg(args, 0)?, self.octet_arg(args, 1)?);
                vec![self.decrypt(&key, &data)?.into()]
            },
            Method::AeadEncrypt => {
                let key = self.octet_arg(args, 0)?;
                let plaintext = self.octet_arg(args, 1)?;
                let iv = self.octet_arg(args, 2)?;
                let header = self.octet_or_empty(args, 3)?;

                let (ciphertext, tag) = self.aead_encrypt(&key, &plaintext, &iv, &header)?;
                vec![ciphertext.into(), tag.into()]
            },
            Method::AeadDecrypt => {
                let key = self.octet_arg(args, 0)?;
                let ciphertext = self.octet_arg(args, 1)?;
                let iv = self.octet_arg(args, 2)?;
                let header = self.octet_or_empty(args, 3)?;
                let tag = self.octet_arg(args, 4)?;

                vec![self.aead_decrypt(&key, &ciphertext, &iv, &header, &tag)?.into()]
            },
            Method::Hash => {
                let data = self.octet_arg(args, 0)?;
                vec![self.hash(&data)?.into()]
            },
            Method::Hmac => {
                let (key, data) = (self.octet_arg(args, 0)?, self.octet_arg(args, 1)?);
                let len = optional_length(args, 2)?;
                vec![self.hmac(&key, &data, len)?.into()]
            },
            Method::Kdf2 => {
                let params = self.optional_octet(args, 0)?;
                let key = self.octet_arg(args, 1)?;
                let len = optional_length(args, 2)?;
                vec![self.kdf2(params.as_ref(), &key, len)?.into()]
            },
            Method::Pbkdf2 => {
                let (key, salt) = (self.octet_arg(args, 0)?, self.octet_arg(args, 1)?);
                let iterations = optional_iterations(args, 2)?;
                let len = optional_length(args, 3)?;
                vec![self.pbkdf2(&key, &salt, iterations, len)?.into()]
            },
            Method::Random => {
                let len = optional_length(args, 0)?;
                vec![self.random(len)?.into()]
            },
            Method::Sign => {
                let message = self.octet_arg(args, 0)?;
                vec![self.sign(&message)?.into()]
            },
            Method::Verify => {
                let (message, signature) = (self.octet_arg(args, 0)?, self.octet_arg(args, 1)?);
                let key = self.optional_octet(args, 2)?;
                vec![self.verify(&message, &signature, key.as_ref())?.into()]
            },
        };

        Ok(results)
    }

    /// [`Keyring::invoke`] by method name.
    pub fn invoke_named(&mut self, method: &str, args: &[Value]) -> Result<Vec<Value>, KeyringError> {
        self.invoke(method.parse()?, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_table_matches_enum() {
        assert_eq!(METHODS.len(), Method::ALL.len());
        for (name, method) in METHODS.iter().zip(Method::ALL) {
            assert_eq!(name.parse::<Method>().unwrap(), method);
            assert_eq!(method.to_string(), *name);
        }
    }

    #[test]
    fn unknown_method_is_invalid_argument() {
        let err = "explode".parse::<Method>().unwrap_err();
        assert!(matches!(err, KeyringError::InvalidArgument { .. }));
    }

    #[test]
    fn missing_arguments_read_as_nil() {
        assert!(arg(&[], 3).is_none());
        assert!(arg(&[Value::Nil], 0).is_none());
        assert_eq!(optional_length(&[Value::Integer(12)], 0).unwrap(), Some(12));
        assert!(optional_length(&[], 0).unwrap().is_none());
    }

    #[test]
    fn negative_lengths_are_rejected() {
        let err = optional_length(&[Value::Integer(-1)], 0).unwrap_err();
        assert!(matches!(err, KeyringError::InvalidArgument { .. }));

        let err = optional_iterations(&[Value::Integer(-5)], 0).unwrap_err();
        assert!(matches!(err, KeyringError::InvalidArgument { .. }));
    }

    #[test]
    fn lengths_must_be_integers() {
        let err = optional_length(&[Value::from("12")], 0).unwrap_err();
        assert!(matches!(err, KeyringError::TypeMismatch { expected: "integer", found: "string" }));
    }
}
