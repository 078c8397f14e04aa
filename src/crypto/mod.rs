//! Archive encryption for backup-service
//!
//! Archives are encrypted with an external symmetric cipher tool before
//! upload and decrypted after download during restore.

pub mod cipher;
pub mod secure_memory;

pub use cipher::{Cipher, GpgCipher};
pub use secure_memory::SecureString;
