//! Key material generation.
//!
//! [`KeyGenerator`] is the seam where real validator key derivation (e.g. BLS)
//! would plug in. The bundled [`RandomKeyGenerator`] only produces opaque
//! random values; it does not derive usable signing keys.

use crate::{Error, Result};
use rand::{TryRngCore, rngs::OsRng};

/// Size in bytes of the key material produced by [`RandomKeyGenerator`].
pub const KEY_SIZE: usize = 32;

/// Produces one key value per call.
///
/// Implementations must be safe to share across concurrently running
/// processing tasks.
pub trait KeyGenerator: Send + Sync + 'static {
    /// Returns a fresh printable key value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntropyUnavailable`] if the randomness source fails.
    fn generate(&self) -> Result<String>;
}

/// Emits [`KEY_SIZE`] bytes from the OS CSPRNG, hex encoded (64 chars).
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> Result<String> {
        let mut bytes = [0_u8; KEY_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::EntropyUnavailable {
                reason: e.to_string(),
            })?;
        Ok(hex::encode(bytes))
    }
}
