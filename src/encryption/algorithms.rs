//! Standard security handler algorithms.
//!
//! PDF Spec: Section 7.6.3 - Standard Security Handler (revisions 2-4)
//! PDF 2.0 Spec (ISO 32000-2:2020): Section 7.6.4.3 - Algorithms 2.A, 2.B,
//! 8, 9, 10, 11 and 12 (revision 6)

use super::aes::{aes128_cbc_encrypt_no_pad, aes256_cbc_decrypt_no_pad, aes256_cbc_encrypt_no_pad};
use super::rc4::rc4_crypt;
use md5::{Digest, Md5};
use sha2::{Sha256, Sha384, Sha512};

/// Padding string used in PDF encryption (32 bytes).
///
/// PDF Spec: Algorithm 2, step 1
const PADDING: &[u8; 32] = b"\x28\xBF\x4E\x5E\x4E\x75\x8A\x41\
                              \x64\x00\x4E\x56\xFF\xFA\x01\x08\
                              \x2E\x2E\x00\xB6\xD0\x68\x3E\x80\
                              \x2F\x0C\xA9\xFE\x64\x53\x69\x7A";

/// Pad or truncate a password to 32 bytes using the standard padding.
pub fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let pass_len = password.len().min(32);
    padded[..pass_len].copy_from_slice(&password[..pass_len]);
    padded[pass_len..].copy_from_slice(&PADDING[..32 - pass_len]);
    padded
}

/// Encode a password for revisions 2-4 (PDFDocEncoding, Latin-1 subset).
pub fn encode_password_legacy(password: &str) -> Vec<u8> {
    password
        .chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Encode a password for revision 6 (UTF-8, at most 127 bytes on a char boundary).
pub fn encode_password_utf8(password: &str) -> Vec<u8> {
    let mut end = password.len().min(127);
    while !password.is_char_boundary(end) {
        end -= 1;
    }
    password.as_bytes()[..end].to_vec()
}

/// Compute the file encryption key from a password (Algorithm 2, R<=4).
pub fn compute_encryption_key(
    password: &[u8],
    owner_key: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: u32,
    key_length: usize,
    encrypt_metadata: bool,
) -> Vec<u8> {
    let key_length = key_length.min(16);
    let mut hasher = Md5::new();
    hasher.update(pad_password(password));
    hasher.update(owner_key);
    hasher.update(permissions.to_le_bytes());
    hasher.update(file_id);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut hash = hasher.finalize().to_vec();

    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash[..key_length]).to_vec();
        }
    }
    hash.truncate(if revision >= 3 { key_length } else { 5 });
    hash
}

/// RC4 key derived from the owner password (Algorithm 3 steps a-e).
fn owner_rc4_key(owner_password: &[u8], user_password: &[u8], revision: u32, key_length: usize) -> Vec<u8> {
    let password = if owner_password.is_empty() {
        user_password
    } else {
        owner_password
    };
    let key_length = key_length.min(16);
    let mut hash = Md5::digest(pad_password(password)).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash).to_vec();
        }
    }
    hash.truncate(if revision >= 3 { key_length } else { 5 });
    hash
}

fn xor_key(key: &[u8], value: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ value).collect()
}

/// Compute the `/O` value (Algorithm 3, R<=4).
pub fn compute_owner_password_hash(
    owner_password: &[u8],
    user_password: &[u8],
    revision: u32,
    key_length: usize,
) -> Vec<u8> {
    let rc4_key = owner_rc4_key(owner_password, user_password, revision, key_length);
    let mut result = rc4_crypt(&rc4_key, &pad_password(user_password));
    if revision >= 3 {
        for i in 1..=19u8 {
            result = rc4_crypt(&xor_key(&rc4_key, i), &result);
        }
    }
    result
}

/// Compute the `/U` value (Algorithm 4 for R=2, Algorithm 5 for R=3/4).
pub fn compute_user_password_hash(encryption_key: &[u8], file_id: &[u8], revision: u32) -> Vec<u8> {
    if revision == 2 {
        return rc4_crypt(encryption_key, PADDING);
    }
    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut hash = hasher.finalize().to_vec();
    for i in 0..20u8 {
        hash = rc4_crypt(&xor_key(encryption_key, i), &hash);
    }
    // 16 arbitrary padding bytes
    hash.extend_from_slice(&[0u8; 16]);
    hash
}

/// Authenticate a user password (Algorithm 6, R<=4). Returns the file key on success.
#[allow(clippy::too_many_arguments)]
pub fn authenticate_user_password(
    password: &[u8],
    user_key: &[u8],
    owner_key: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: u32,
    key_length: usize,
    encrypt_metadata: bool,
) -> Option<Vec<u8>> {
    let key = compute_encryption_key(
        password,
        owner_key,
        permissions,
        file_id,
        revision,
        key_length,
        encrypt_metadata,
    );
    let expected = compute_user_password_hash(&key, file_id, revision);
    let compare_len = if revision >= 3 { 16 } else { 32 };
    if user_key.len() < compare_len {
        return None;
    }
    constant_time_compare(&user_key[..compare_len], &expected[..compare_len]).then_some(key)
}

/// Authenticate an owner password (Algorithm 7, R<=4). Returns the file key on success.
#[allow(clippy::too_many_arguments)]
pub fn authenticate_owner_password(
    password: &[u8],
    user_key: &[u8],
    owner_key: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: u32,
    key_length: usize,
    encrypt_metadata: bool,
) -> Option<Vec<u8>> {
    let rc4_key = owner_rc4_key(password, password, revision, key_length);
    let mut user_password = owner_key.to_vec();
    if revision == 2 {
        user_password = rc4_crypt(&rc4_key, &user_password);
    } else {
        for i in (0..=19u8).rev() {
            user_password = rc4_crypt(&xor_key(&rc4_key, i), &user_password);
        }
    }
    authenticate_user_password(
        &user_password,
        user_key,
        owner_key,
        permissions,
        file_id,
        revision,
        key_length,
        encrypt_metadata,
    )
}

/// Revision 6 password hash (Algorithm 2.B).
///
/// `user_key` is the 48-byte `/U` value when hashing an owner password and
/// empty for user passwords.
pub fn hash_r6(password: &[u8], salt: &[u8], user_key: &[u8]) -> Result<[u8; 32], &'static str> {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    hasher.update(user_key);
    let mut k: Vec<u8> = hasher.finalize().to_vec();

    let mut round: u32 = 0;
    loop {
        let mut sequence = Vec::with_capacity(password.len() + k.len() + user_key.len());
        sequence.extend_from_slice(password);
        sequence.extend_from_slice(&k);
        sequence.extend_from_slice(user_key);
        let k1 = sequence.repeat(64);

        let e = aes128_cbc_encrypt_no_pad(&k[..16], &k[16..32], &k1)?;
        let selector = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
        k = match selector {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };
        round += 1;

        let last = u32::from(*e.last().unwrap_or(&0));
        if round >= 64 && last <= round - 32 {
            break;
        }
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&k[..32]);
    Ok(out)
}

/// `/U` and `/UE` for revision 6 (Algorithm 8).
pub fn compute_user_values_r6(
    password: &[u8],
    file_key: &[u8],
    validation_salt: &[u8; 8],
    key_salt: &[u8; 8],
) -> Result<(Vec<u8>, Vec<u8>), &'static str> {
    let mut u = hash_r6(password, validation_salt, &[])?.to_vec();
    u.extend_from_slice(validation_salt);
    u.extend_from_slice(key_salt);

    let intermediate = hash_r6(password, key_salt, &[])?;
    let ue = aes256_cbc_encrypt_no_pad(&intermediate, &[0u8; 16], file_key)?;
    Ok((u, ue))
}

/// `/O` and `/OE` for revision 6 (Algorithm 9). `user_key` is the full 48-byte `/U`.
pub fn compute_owner_values_r6(
    password: &[u8],
    file_key: &[u8],
    user_key: &[u8],
    validation_salt: &[u8; 8],
    key_salt: &[u8; 8],
) -> Result<(Vec<u8>, Vec<u8>), &'static str> {
    let mut o = hash_r6(password, validation_salt, user_key)?.to_vec();
    o.extend_from_slice(validation_salt);
    o.extend_from_slice(key_salt);

    let intermediate = hash_r6(password, key_salt, user_key)?;
    let oe = aes256_cbc_encrypt_no_pad(&intermediate, &[0u8; 16], file_key)?;
    Ok((o, oe))
}

/// `/Perms` for revision 6 (Algorithm 10).
pub fn compute_perms_r6(
    file_key: &[u8],
    permissions: i32,
    encrypt_metadata: bool,
) -> Result<Vec<u8>, &'static str> {
    let mut block = [0u8; 16];
    block[..4].copy_from_slice(&permissions.to_le_bytes());
    block[4..8].copy_from_slice(&[0xFF; 4]);
    block[8] = if encrypt_metadata { b'T' } else { b'F' };
    block[9..12].copy_from_slice(b"adb");
    block[12..16].copy_from_slice(&generate_random_bytes(4));
    // a single block in CBC with a zero IV is ECB
    aes256_cbc_encrypt_no_pad(file_key, &[0u8; 16], &block)
}

/// Validate a user password and recover the file key (Algorithms 11 and 2.A).
pub fn authenticate_user_password_r6(password: &[u8], user_key: &[u8], user_encryption: &[u8]) -> Option<Vec<u8>> {
    if user_key.len() < 48 || user_encryption.len() != 32 {
        return None;
    }
    let hash = hash_r6(password, &user_key[32..40], &[]).ok()?;
    if !constant_time_compare(&hash, &user_key[..32]) {
        return None;
    }
    let intermediate = hash_r6(password, &user_key[40..48], &[]).ok()?;
    aes256_cbc_decrypt_no_pad(&intermediate, &[0u8; 16], user_encryption).ok()
}

/// Validate an owner password and recover the file key (Algorithms 12 and 2.A).
pub fn authenticate_owner_password_r6(
    password: &[u8],
    owner_key: &[u8],
    user_key: &[u8],
    owner_encryption: &[u8],
) -> Option<Vec<u8>> {
    if owner_key.len() < 48 || user_key.len() < 48 || owner_encryption.len() != 32 {
        return None;
    }
    let u48 = &user_key[..48];
    let hash = hash_r6(password, &owner_key[32..40], u48).ok()?;
    if !constant_time_compare(&hash, &owner_key[..32]) {
        return None;
    }
    let intermediate = hash_r6(password, &owner_key[40..48], u48).ok()?;
    aes256_cbc_decrypt_no_pad(&intermediate, &[0u8; 16], owner_encryption).ok()
}

/// Generate random bytes using UUID v4 and timestamp mixing.
pub fn generate_random_bytes(len: usize) -> Vec<u8> {
    let mut result = Vec::with_capacity(len);
    while result.len() < len {
        let uuid = uuid::Uuid::new_v4();
        let mut hasher = Md5::new();
        hasher.update(uuid.as_bytes());
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        hasher.update(now.as_nanos().to_le_bytes());
        let hash = hasher.finalize();
        let remaining = len - result.len();
        result.extend_from_slice(&hash[..remaining.min(16)]);
    }
    result
}

/// Eight random salt bytes.
pub fn random_salt() -> [u8; 8] {
    let mut salt = [0u8; 8];
    salt.copy_from_slice(&generate_random_bytes(8));
    salt
}

/// Constant-time comparison of two byte slices.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
