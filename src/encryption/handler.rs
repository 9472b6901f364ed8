//! Standard security handler for writing encrypted PDFs.
//!
//! Derives the file encryption key and every value of the `/Encrypt`
//! dictionary from the requested passwords and permissions, and can check
//! passwords against those values the way a reader would.

use super::algorithms;
use super::{Algorithm, Permissions};
use crate::config::EncryptionConfig;
use crate::error::{Error, Result};
use crate::object::{Dict, Object};

/// Computed security handler state for one document.
#[derive(Debug, Clone)]
pub struct StandardSecurityHandler {
    algorithm: Algorithm,
    permissions: Permissions,
    encrypt_metadata: bool,
    file_key: Vec<u8>,
    /// `/O`
    owner_key: Vec<u8>,
    /// `/U`
    user_key: Vec<u8>,
    /// `/OE` (revision 6)
    owner_encryption: Option<Vec<u8>>,
    /// `/UE` (revision 6)
    user_encryption: Option<Vec<u8>>,
    /// `/Perms` (revision 6)
    perms: Option<Vec<u8>>,
}

impl StandardSecurityHandler {
    /// Compute keys for `config`. `file_id` is the first element of `/ID`.
    pub fn new(config: &EncryptionConfig, file_id: &[u8]) -> Result<Self> {
        let algorithm = config.algorithm;
        let (_, revision) = algorithm.version_revision();
        let p = config.permissions.p_value();
        let owner_password = if config.owner_password.is_empty() {
            &config.user_password
        } else {
            &config.owner_password
        };

        log::debug!("computing security handler values for {:?} (R={})", algorithm, revision);

        if revision >= 6 {
            let user = algorithms::encode_password_utf8(&config.user_password);
            let owner = algorithms::encode_password_utf8(owner_password);
            let file_key = algorithms::generate_random_bytes(32);

            let (user_key, user_encryption) = algorithms::compute_user_values_r6(
                &user,
                &file_key,
                &algorithms::random_salt(),
                &algorithms::random_salt(),
            )
            .map_err(|e| Error::Encryption(e.to_string()))?;
            let (owner_key, owner_encryption) = algorithms::compute_owner_values_r6(
                &owner,
                &file_key,
                &user_key,
                &algorithms::random_salt(),
                &algorithms::random_salt(),
            )
            .map_err(|e| Error::Encryption(e.to_string()))?;
            let perms = algorithms::compute_perms_r6(&file_key, p, config.encrypt_metadata)
                .map_err(|e| Error::Encryption(e.to_string()))?;

            return Ok(Self {
                algorithm,
                permissions: config.permissions,
                encrypt_metadata: config.encrypt_metadata,
                file_key,
                owner_key,
                user_key,
                owner_encryption: Some(owner_encryption),
                user_encryption: Some(user_encryption),
                perms: Some(perms),
            });
        }

        let user = algorithms::encode_password_legacy(&config.user_password);
        let owner = algorithms::encode_password_legacy(owner_password);
        let key_length = algorithm.key_length();
        let owner_key = algorithms::compute_owner_password_hash(&owner, &user, revision, key_length);
        let file_key = algorithms::compute_encryption_key(
            &user,
            &owner_key,
            p,
            file_id,
            revision,
            key_length,
            config.encrypt_metadata,
        );
        let user_key = algorithms::compute_user_password_hash(&file_key, file_id, revision);

        Ok(Self {
            algorithm,
            permissions: config.permissions,
            encrypt_metadata: config.encrypt_metadata,
            file_key,
            owner_key,
            user_key,
            owner_encryption: None,
            user_encryption: None,
            perms: None,
        })
    }

    /// The algorithm in use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The file encryption key.
    pub fn file_key(&self) -> &[u8] {
        &self.file_key
    }

    /// Whether the metadata stream is encrypted.
    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// `/O` value.
    pub fn owner_key(&self) -> &[u8] {
        &self.owner_key
    }

    /// `/U` value.
    pub fn user_key(&self) -> &[u8] {
        &self.user_key
    }

    /// `/OE` value (revision 6 only).
    pub fn owner_encryption(&self) -> Option<&[u8]> {
        self.owner_encryption.as_deref()
    }

    /// `/UE` value (revision 6 only).
    pub fn user_encryption(&self) -> Option<&[u8]> {
        self.user_encryption.as_deref()
    }

    /// `/Perms` value (revision 6 only).
    pub fn perms(&self) -> Option<&[u8]> {
        self.perms.as_deref()
    }

    /// Check a user password; returns the file key it unlocks.
    pub fn authenticate_user(&self, password: &str, file_id: &[u8]) -> Option<Vec<u8>> {
        let (_, revision) = self.algorithm.version_revision();
        if revision >= 6 {
            let pw = algorithms::encode_password_utf8(password);
            return algorithms::authenticate_user_password_r6(&pw, &self.user_key, self.user_encryption.as_deref()?);
        }
        algorithms::authenticate_user_password(
            &algorithms::encode_password_legacy(password),
            &self.user_key,
            &self.owner_key,
            self.permissions.p_value(),
            file_id,
            revision,
            self.algorithm.key_length(),
            self.encrypt_metadata,
        )
    }

    /// Check an owner password; returns the file key it unlocks.
    pub fn authenticate_owner(&self, password: &str, file_id: &[u8]) -> Option<Vec<u8>> {
        let (_, revision) = self.algorithm.version_revision();
        if revision >= 6 {
            let pw = algorithms::encode_password_utf8(password);
            return algorithms::authenticate_owner_password_r6(
                &pw,
                &self.owner_key,
                &self.user_key,
                self.owner_encryption.as_deref()?,
            );
        }
        algorithms::authenticate_owner_password(
            &algorithms::encode_password_legacy(password),
            &self.user_key,
            &self.owner_key,
            self.permissions.p_value(),
            file_id,
            revision,
            self.algorithm.key_length(),
            self.encrypt_metadata,
        )
    }

    /// Build the `/Encrypt` dictionary.
    pub fn to_object(&self) -> Object {
        let (version, revision) = self.algorithm.version_revision();
        let mut dict = Dict::new();
        dict.insert("Filter".into(), Object::Name("Standard".into()));
        dict.insert("V".into(), Object::Integer(i64::from(version)));
        dict.insert("R".into(), Object::Integer(i64::from(revision)));
        dict.insert("Length".into(), Object::Integer(self.algorithm.key_length() as i64 * 8));

        if self.algorithm.is_aes() {
            let cfm = if revision >= 6 { "AESV3" } else { "AESV2" };
            let mut std_cf = Dict::new();
            std_cf.insert("CFM".into(), Object::Name(cfm.into()));
            std_cf.insert("AuthEvent".into(), Object::Name("DocOpen".into()));
            std_cf.insert("Length".into(), Object::Integer(self.algorithm.key_length() as i64));
            let mut cf = Dict::new();
            cf.insert("StdCF".into(), Object::Dictionary(std_cf));
            dict.insert("CF".into(), Object::Dictionary(cf));
            dict.insert("StmF".into(), Object::Name("StdCF".into()));
            dict.insert("StrF".into(), Object::Name("StdCF".into()));
        }

        dict.insert("O".into(), Object::String(self.owner_key.clone()));
        dict.insert("U".into(), Object::String(self.user_key.clone()));
        if let Some(oe) = &self.owner_encryption {
            dict.insert("OE".into(), Object::String(oe.clone()));
        }
        if let Some(ue) = &self.user_encryption {
            dict.insert("UE".into(), Object::String(ue.clone()));
        }
        if let Some(perms) = &self.perms {
            dict.insert("Perms".into(), Object::String(perms.clone()));
        }
        dict.insert("P".into(), Object::Integer(i64::from(self.permissions.p_value())));
        if revision >= 4 && !self.encrypt_metadata {
            dict.insert("EncryptMetadata".into(), Object::Boolean(false));
        }
        Object::Dictionary(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(algorithm: Algorithm) -> EncryptionConfig {
        EncryptionConfig::new("user", "owner").with_algorithm(algorithm)
    }

    #[test]
    fn test_rc4_128_handler() {
        let id = [0xABu8; 16];
        let handler = StandardSecurityHandler::new(&config(Algorithm::Rc4_128), &id).unwrap();
        assert_eq!(handler.file_key().len(), 16);
        assert_eq!(handler.authenticate_user("user", &id).as_deref(), Some(handler.file_key()));
        assert_eq!(handler.authenticate_owner("owner", &id).as_deref(), Some(handler.file_key()));
        assert!(handler.authenticate_user("nope", &id).is_none());
    }

    #[test]
    fn test_aes256_handler() {
        let handler = StandardSecurityHandler::new(&config(Algorithm::Aes256), b"ignored").unwrap();
        assert_eq!(handler.file_key().len(), 32);
        assert_eq!(handler.user_key().len(), 48);
        assert_eq!(handler.owner_key().len(), 48);
        assert_eq!(handler.perms().map(|p| p.len()), Some(16));
        assert_eq!(handler.authenticate_user("user", b"").as_deref(), Some(handler.file_key()));
        assert_eq!(handler.authenticate_owner("owner", b"").as_deref(), Some(handler.file_key()));
        assert!(handler.authenticate_owner("user", b"").is_none());
    }

    #[test]
    fn test_encrypt_dict_entries() {
        let handler = StandardSecurityHandler::new(
            &config(Algorithm::Aes128).with_encrypt_metadata(false),
            &[1u8; 16],
        )
        .unwrap();
        let obj = handler.to_object();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict["V"].as_integer(), Some(4));
        assert_eq!(dict["R"].as_integer(), Some(4));
        assert_eq!(dict["StmF"].as_name(), Some("StdCF"));
        assert_eq!(dict["EncryptMetadata"].as_bool(), Some(false));
        let std_cf = dict["CF"].as_dict().unwrap()["StdCF"].as_dict().unwrap();
        assert_eq!(std_cf["CFM"].as_name(), Some("AESV2"));
    }
}
