//! AES encryption/decryption for PDF.
//!
//! Strings and streams use CBC mode with PKCS#7 padding and the IV
//! prepended to the ciphertext. The AES-256 key schedule values (`/UE`,
//! `/OE`, `/Perms`) and the revision 6 hash use CBC without padding.
//!
//! PDF Spec: Section 7.6.2 - General Encryption Algorithm

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes256};
use cbc::{Decryptor, Encryptor};

type Aes128CbcEnc = Encryptor<Aes128>;
type Aes128CbcDec = Decryptor<Aes128>;
type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let padding_len = 16 - (data.len() % 16);
    let mut padded = Vec::with_capacity(data.len() + padding_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding_len, padding_len as u8);
    padded
}

fn pkcs7_unpad(decrypted: &[u8]) -> Result<Vec<u8>, &'static str> {
    let padding_len = match decrypted.last() {
        Some(&n) => n as usize,
        None => return Ok(Vec::new()),
    };
    if padding_len == 0 || padding_len > 16 || padding_len > decrypted.len() {
        return Err("Invalid PKCS#7 padding");
    }
    let data_len = decrypted.len() - padding_len;
    if decrypted[data_len..].iter().any(|&b| b as usize != padding_len) {
        return Err("Invalid PKCS#7 padding");
    }
    Ok(decrypted[..data_len].to_vec())
}

/// Encrypt data using AES-128 in CBC mode with PKCS#7 padding.
pub fn aes128_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, &'static str> {
    let mut padded = pkcs7_pad(data);
    aes128_cbc_encrypt_no_pad_in_place(key, iv, &mut padded)?;
    Ok(padded)
}

/// Encrypt block-aligned data with AES-128-CBC, no padding.
pub fn aes128_cbc_encrypt_no_pad(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, &'static str> {
    let mut buffer = data.to_vec();
    aes128_cbc_encrypt_no_pad_in_place(key, iv, &mut buffer)?;
    Ok(buffer)
}

fn aes128_cbc_encrypt_no_pad_in_place(
    key: &[u8],
    iv: &[u8],
    buffer: &mut [u8],
) -> Result<(), &'static str> {
    if key.len() != 16 {
        return Err("AES-128 key must be 16 bytes");
    }
    if iv.len() != 16 {
        return Err("IV must be 16 bytes");
    }
    if buffer.len() % 16 != 0 {
        return Err("Data length must be multiple of 16");
    }
    let len = buffer.len();
    let cipher = Aes128CbcEnc::new(key.into(), iv.into());
    cipher
        .encrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(buffer, len)
        .map_err(|_| "Encryption failed")?;
    Ok(())
}

/// Decrypt data using AES-128 in CBC mode and remove PKCS#7 padding.
pub fn aes128_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, &'static str> {
    if key.len() != 16 {
        return Err("AES-128 key must be 16 bytes");
    }
    if iv.len() != 16 {
        return Err("IV must be 16 bytes");
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() % 16 != 0 {
        return Err("Encrypted data length must be multiple of 16");
    }

    let mut buffer = data.to_vec();
    let cipher = Aes128CbcDec::new(key.into(), iv.into());
    let decrypted = cipher
        .decrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buffer)
        .map_err(|_| "Decryption failed")?;
    pkcs7_unpad(decrypted)
}

/// Encrypt data using AES-256 in CBC mode with PKCS#7 padding.
pub fn aes256_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, &'static str> {
    let padded = pkcs7_pad(data);
    aes256_cbc_encrypt_no_pad(key, iv, &padded)
}

/// Encrypt block-aligned data with AES-256-CBC, no padding.
pub fn aes256_cbc_encrypt_no_pad(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, &'static str> {
    if key.len() != 32 {
        return Err("AES-256 key must be 32 bytes");
    }
    if iv.len() != 16 {
        return Err("IV must be 16 bytes");
    }
    if data.len() % 16 != 0 {
        return Err("Data length must be multiple of 16");
    }
    let mut buffer = data.to_vec();
    let len = buffer.len();
    let cipher = Aes256CbcEnc::new(key.into(), iv.into());
    cipher
        .encrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buffer, len)
        .map_err(|_| "Encryption failed")?;
    Ok(buffer)
}

/// Decrypt block-aligned data with AES-256-CBC, no padding.
pub fn aes256_cbc_decrypt_no_pad(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, &'static str> {
    if key.len() != 32 {
        return Err("AES-256 key must be 32 bytes");
    }
    if iv.len() != 16 {
        return Err("IV must be 16 bytes");
    }
    if data.len() % 16 != 0 {
        return Err("Encrypted data length must be multiple of 16");
    }
    let mut buffer = data.to_vec();
    let cipher = Aes256CbcDec::new(key.into(), iv.into());
    let decrypted = cipher
        .decrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buffer)
        .map_err(|_| "Decryption failed")?;
    Ok(decrypted.to_vec())
}

/// Decrypt data using AES-256 in CBC mode and remove PKCS#7 padding.
pub fn aes256_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, &'static str> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let decrypted = aes256_cbc_decrypt_no_pad(key, iv, data)?;
    pkcs7_unpad(&decrypted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes128_roundtrip() {
        let key = [7u8; 16];
        let iv = [1u8; 16];
        let plain = b"Hello, AES!";
        let cipher = aes128_encrypt(&key, &iv, plain).unwrap();
        assert_eq!(cipher.len(), 16);
        assert_eq!(aes128_decrypt(&key, &iv, &cipher).unwrap(), plain);
    }

    #[test]
    fn test_aes256_roundtrip_block_aligned() {
        let key = [3u8; 32];
        let iv = [9u8; 16];
        let plain = [0x42u8; 32];
        // a full block of padding is appended
        let cipher = aes256_encrypt(&key, &iv, &plain).unwrap();
        assert_eq!(cipher.len(), 48);
        assert_eq!(aes256_decrypt(&key, &iv, &cipher).unwrap(), plain.to_vec());
    }

    #[test]
    fn test_no_pad_roundtrip() {
        let key = [5u8; 32];
        let iv = [0u8; 16];
        let data = [0xAAu8; 32];
        let enc = aes256_cbc_encrypt_no_pad(&key, &iv, &data).unwrap();
        assert_eq!(enc.len(), 32);
        assert_eq!(aes256_cbc_decrypt_no_pad(&key, &iv, &enc).unwrap(), data.to_vec());
    }

    #[test]
    fn test_invalid_key_length() {
        assert!(aes128_encrypt(&[0u8; 15], &[0u8; 16], b"x").is_err());
        assert!(aes256_cbc_encrypt_no_pad(&[0u8; 32], &[0u8; 16], &[0u8; 15]).is_err());
    }

    #[test]
    fn test_bad_padding_rejected() {
        let key = [7u8; 16];
        let iv = [1u8; 16];
        // encrypt a block whose last byte is not valid padding
        let raw = aes128_cbc_encrypt_no_pad(&key, &iv, &[0u8; 16]).unwrap();
        assert!(aes128_decrypt(&key, &iv, &raw).is_err());
    }
}
