//! Per-object encryption of strings and streams.

use super::aes;
use super::algorithms;
use super::rc4;
use super::{Algorithm, StandardSecurityHandler};
use crate::error::{Error, Result};
use md5::{Digest, Md5};

/// Handler for encrypting PDF objects during write operations.
#[derive(Debug, Clone)]
pub struct EncryptionWriteHandler {
    /// The file encryption key
    encryption_key: Vec<u8>,
    /// The encryption algorithm in use
    algorithm: Algorithm,
    /// Whether to encrypt metadata streams
    encrypt_metadata: bool,
}

impl EncryptionWriteHandler {
    /// Create a handler from computed security handler values.
    pub fn new(handler: &StandardSecurityHandler) -> Self {
        Self::from_key(handler.file_key().to_vec(), handler.algorithm(), handler.encrypt_metadata())
    }

    /// Create a handler from an already computed file key.
    pub fn from_key(encryption_key: Vec<u8>, algorithm: Algorithm, encrypt_metadata: bool) -> Self {
        Self {
            encryption_key,
            algorithm,
            encrypt_metadata,
        }
    }

    /// Derive the object-specific encryption key.
    ///
    /// PDF Spec: Algorithm 1. For AES-256 the file key is used as is.
    pub fn derive_object_key(&self, obj_num: u32, gen_num: u16) -> Vec<u8> {
        if self.algorithm == Algorithm::Aes256 {
            return self.encryption_key.clone();
        }

        let mut hasher = Md5::new();
        hasher.update(&self.encryption_key);
        hasher.update(&obj_num.to_le_bytes()[..3]);
        hasher.update(gen_num.to_le_bytes());
        if self.algorithm.is_aes() {
            hasher.update(b"sAlT");
        }
        let hash = hasher.finalize();

        let key_length = (self.encryption_key.len() + 5).min(16);
        hash[..key_length].to_vec()
    }

    /// Encrypt a string belonging to object `obj_num`.
    pub fn encrypt_string(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        let key = self.derive_object_key(obj_num, gen_num);
        self.encrypt_with_key(&key, data)
    }

    /// Encrypt the data of stream object `obj_num`.
    ///
    /// For AES a random 16-byte IV is prepended to the ciphertext.
    pub fn encrypt_stream(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        let key = self.derive_object_key(obj_num, gen_num);
        self.encrypt_with_key(&key, data)
    }

    fn encrypt_with_key(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        match self.algorithm {
            Algorithm::RC4_40 | Algorithm::Rc4_128 => Ok(rc4::rc4_crypt(key, data)),
            Algorithm::Aes128 | Algorithm::Aes256 => {
                let iv = Self::generate_iv();
                let ciphertext = if self.algorithm == Algorithm::Aes128 {
                    aes::aes128_encrypt(key, &iv, data)
                } else {
                    aes::aes256_encrypt(key, &iv, data)
                }
                .map_err(|e| Error::Encryption(e.to_string()))?;
                let mut result = Vec::with_capacity(16 + ciphertext.len());
                result.extend_from_slice(&iv);
                result.extend(ciphertext);
                Ok(result)
            },
        }
    }

    /// Generate a random 16-byte IV for AES encryption.
    fn generate_iv() -> [u8; 16] {
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&algorithms::generate_random_bytes(16));
        iv
    }

    /// Get the encryption algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Check if metadata should be encrypted.
    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_derivation_rc4() {
        let handler = EncryptionWriteHandler::from_key(vec![1, 2, 3, 4, 5], Algorithm::RC4_40, true);
        let k1 = handler.derive_object_key(1, 0);
        assert_ne!(k1, handler.derive_object_key(2, 0));
        assert_ne!(k1, handler.derive_object_key(1, 1));
        assert_eq!(k1.len(), 10);
    }

    #[test]
    fn test_object_key_derivation_aes() {
        let aes128 = EncryptionWriteHandler::from_key(vec![0u8; 16], Algorithm::Aes128, true);
        assert_eq!(aes128.derive_object_key(1, 0).len(), 16);
        let aes256 = EncryptionWriteHandler::from_key(vec![7u8; 32], Algorithm::Aes256, true);
        assert_eq!(aes256.derive_object_key(1, 0), vec![7u8; 32]);
        assert_eq!(aes256.derive_object_key(9, 0), vec![7u8; 32]);
    }

    #[test]
    fn test_rc4_string_roundtrip() {
        let handler = EncryptionWriteHandler::from_key(vec![1, 2, 3, 4, 5], Algorithm::RC4_40, true);
        let cipher = handler.encrypt_string(b"Hello, encrypted world!", 4, 0).unwrap();
        let key = handler.derive_object_key(4, 0);
        assert_eq!(rc4::rc4_crypt(&key, &cipher), b"Hello, encrypted world!");
    }

    #[test]
    fn test_aes_stream_roundtrip() {
        let handler = EncryptionWriteHandler::from_key(vec![0u8; 16], Algorithm::Aes128, true);
        let cipher = handler.encrypt_stream(b"BT /F1 12 Tf ET", 3, 0).unwrap();
        let key = handler.derive_object_key(3, 0);
        let plain = aes::aes128_decrypt(&key, &cipher[..16], &cipher[16..]).unwrap();
        assert_eq!(plain, b"BT /F1 12 Tf ET");
    }

    #[test]
    fn test_aes256_uses_fresh_iv() {
        let handler = EncryptionWriteHandler::from_key(vec![9u8; 32], Algorithm::Aes256, true);
        let a = handler.encrypt_string(b"same", 1, 0).unwrap();
        let b = handler.encrypt_string(b"same", 1, 0).unwrap();
        assert_ne!(a[..16], b[..16]);
        assert_eq!(aes::aes256_decrypt(&[9u8; 32], &a[..16], &a[16..]).unwrap(), b"same");
    }
}
