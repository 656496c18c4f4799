use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{info, warn};
use uuid::Uuid;

use tabrelay_core::config::CryptoConfig;
use tabrelay_core::{site_name, AutomationError, NewCredential, SavedCredential};
use tabrelay_storage::CredentialVault;

use crate::identity::Identity;

const ENVELOPE_PREFIX: &str = "enc:v1:";

/// Symmetric protection for stored passwords.
pub trait CredentialCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, AutomationError>;
    fn decrypt(&self, envelope: &str) -> Result<String, AutomationError>;
}

/// ChaCha20-Poly1305 with `enc:v1:<key_id>:<nonce>:<ciphertext>` envelopes.
pub struct ChaChaCipher {
    key_id: String,
    aead: ChaCha20Poly1305,
}

impl ChaChaCipher {
    /// The key id is embedded in every envelope, so it may not be empty or contain `:`.
    pub fn new(key_id: impl Into<String>, key: [u8; 32]) -> Result<Self, AutomationError> {
        let key_id = key_id.into();
        if key_id.trim().is_empty() || key_id.contains(':') {
            return Err(AutomationError::Config(format!(
                "credential key id {:?} must be non-empty and must not contain ':'",
                key_id
            )));
        }
        Ok(Self::sealed_with(key_id, key))
    }

    fn sealed_with(key_id: String, key: [u8; 32]) -> Self {
        Self {
            key_id,
            aead: ChaCha20Poly1305::new(Key::from_slice(&key)),
        }
    }

    /// Refuses to start without a key so plaintext is never written.
    pub fn from_config(config: &CryptoConfig) -> Result<Self, AutomationError> {
        let encoded = config.key.trim();
        if encoded.is_empty() {
            return Err(AutomationError::Config(
                "credential encryption key is not configured (set CREDENTIAL_KEY)".to_string(),
            ));
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.as_bytes())
            .or_else(|_| STANDARD.decode(encoded.as_bytes()))
            .map_err(|e| AutomationError::Config(format!("credential key is not base64: {}", e)))?;

        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            AutomationError::Config(format!("credential key must be 32 bytes, got {}", bytes.len()))
        })?;

        Self::new(config.key_id.clone(), key)
    }

    /// Random process-lifetime key. Anything sealed with it dies with the process.
    pub fn ephemeral() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        warn!("using an ephemeral credential key, stored passwords will not be recoverable after exit");
        Self::sealed_with("ephemeral".to_string(), key)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl CredentialCipher for ChaChaCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, AutomationError> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .aead
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| AutomationError::Crypto(format!("encrypt: {}", e)))?;

        Ok(format!(
            "{ENVELOPE_PREFIX}{}:{}:{}",
            self.key_id,
            URL_SAFE_NO_PAD.encode(nonce_bytes),
            URL_SAFE_NO_PAD.encode(ciphertext)
        ))
    }

    fn decrypt(&self, envelope: &str) -> Result<String, AutomationError> {
        let rest = envelope
            .strip_prefix(ENVELOPE_PREFIX)
            .ok_or_else(|| AutomationError::Crypto("not an encrypted envelope".to_string()))?;

        let mut parts = rest.split(':');
        let (Some(key_id), Some(nonce_b64), Some(ct_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AutomationError::Crypto("malformed envelope".to_string()));
        };

        if key_id != self.key_id {
            return Err(AutomationError::Crypto(format!("key id {} is not configured", key_id)));
        }

        let nonce = URL_SAFE_NO_PAD
            .decode(nonce_b64)
            .map_err(|e| AutomationError::Crypto(format!("nonce: {}", e)))?;
        if nonce.len() != 12 {
            return Err(AutomationError::Crypto("nonce length is invalid".to_string()));
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(ct_b64)
            .map_err(|e| AutomationError::Crypto(format!("payload: {}", e)))?;

        let plaintext = self
            .aead
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|e| AutomationError::Crypto(format!("decrypt: {}", e)))?;

        String::from_utf8(plaintext).map_err(|e| AutomationError::Crypto(format!("plaintext: {}", e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialFlags {
    pub successfully_registered: bool,
    pub manual_needed: bool,
}

impl CredentialFlags {
    pub const MANUAL: Self = Self { successfully_registered: false, manual_needed: true };
    pub const REGISTERED: Self = Self { successfully_registered: true, manual_needed: false };
}

/// Encrypts and persists identities; decrypts only for their owner.
#[derive(Clone)]
pub struct CredentialStore {
    vault: Arc<dyn CredentialVault>,
    cipher: Arc<dyn CredentialCipher>,
}

impl CredentialStore {
    pub fn new(vault: Arc<dyn CredentialVault>, cipher: Arc<dyn CredentialCipher>) -> Self {
        Self { vault, cipher }
    }

    /// `url` is stored as given; the site name is derived from it when it parses.
    pub async fn save(
        &self,
        owner_user_id: &str,
        url: &str,
        identity: &Identity,
        flags: CredentialFlags,
    ) -> Result<SavedCredential, AutomationError> {
        let password_ciphertext = self.cipher.encrypt(&identity.password)?;

        let saved = self
            .vault
            .insert_credential(NewCredential {
                owner_user_id: owner_user_id.to_string(),
                url: url.to_string(),
                email: identity.email.clone(),
                password_ciphertext,
                site_name: site_name(url),
                successfully_registered: flags.successfully_registered,
                manual_needed: flags.manual_needed,
            })
            .await
            .map_err(|e| AutomationError::Storage(format!("save credential: {}", e)))?;

        info!(
            credential_id = %saved.id,
            site = %saved.site_name,
            manual_needed = saved.manual_needed,
            "credential saved"
        );
        Ok(saved)
    }

    pub async fn list(&self, owner_user_id: &str) -> Result<Vec<SavedCredential>, AutomationError> {
        self.vault
            .list_credentials(owner_user_id)
            .await
            .map_err(|e| AutomationError::Storage(format!("list credentials: {}", e)))
    }

    /// Plaintext password for a credential the caller owns; `None` for anything else.
    pub async fn reveal(&self, owner_user_id: &str, id: Uuid) -> Result<Option<(SavedCredential, String)>, AutomationError> {
        let Some(credential) = self
            .vault
            .credential(owner_user_id, id)
            .await
            .map_err(|e| AutomationError::Storage(format!("load credential: {}", e)))?
        else {
            return Ok(None);
        };

        let password = self.cipher.decrypt(&credential.password_ciphertext)?;
        info!(credential_id = %id, "credential revealed to owner");
        Ok(Some((credential, password)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabrelay_storage::MemoryStore;

    fn identity() -> Identity {
        Identity {
            email: "user_x@tempmailgen.com".into(),
            password: "S3cret!S3cret!ab".into(),
            birthdate: "1995-02-03".into(),
        }
    }

    #[test]
    fn test_envelope_round_trip_and_tamper_detection() {
        let cipher = ChaChaCipher::new("v1", [7u8; 32]).unwrap();
        let sealed = cipher.encrypt("hunter2").unwrap();

        assert!(sealed.starts_with("enc:v1:v1:"));
        assert!(!sealed.contains("hunter2"));
        assert_ne!(sealed, cipher.encrypt("hunter2").unwrap());
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "hunter2");

        let mut tampered = sealed.clone();
        tampered.pop();
        tampered.push(if sealed.ends_with('A') { 'B' } else { 'A' });
        assert!(cipher.decrypt(&tampered).is_err());

        let other = ChaChaCipher::new("v2", [7u8; 32]).unwrap();
        assert!(other.decrypt(&sealed).is_err());
        assert!(cipher.decrypt("hunter2").is_err());
    }

    #[test]
    fn test_from_config_requires_a_32_byte_key() {
        let missing = CryptoConfig { key: String::new(), ..CryptoConfig::default() };
        assert!(matches!(ChaChaCipher::from_config(&missing), Err(AutomationError::Config(_))));

        let short = CryptoConfig { key: STANDARD.encode([1u8; 16]), ..CryptoConfig::default() };
        assert!(ChaChaCipher::from_config(&short).is_err());

        let good = CryptoConfig { key: STANDARD.encode([1u8; 32]), ..CryptoConfig::default() };
        assert_eq!(ChaChaCipher::from_config(&good).unwrap().key_id(), "v1");
    }

    #[test]
    fn test_key_id_must_fit_the_envelope() {
        for bad in ["k:1", "", "  "] {
            assert!(
                matches!(ChaChaCipher::new(bad, [7u8; 32]), Err(AutomationError::Config(_))),
                "{:?} accepted",
                bad
            );
        }

        let colon = CryptoConfig {
            key_id: "2024:rotated".into(),
            key: STANDARD.encode([1u8; 32]),
        };
        assert!(matches!(ChaChaCipher::from_config(&colon), Err(AutomationError::Config(_))));

        let cipher = ChaChaCipher::new("k-1", [7u8; 32]).unwrap();
        let sealed = cipher.encrypt("pw").unwrap();
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "pw");
    }

    #[tokio::test]
    async fn test_store_encrypts_and_reveals_to_owner_only() {
        let vault = Arc::new(MemoryStore::new());
        let store = CredentialStore::new(vault.clone(), Arc::new(ChaChaCipher::ephemeral()));

        let saved = store
            .save("alice", "https://shop.test/signup", &identity(), CredentialFlags::MANUAL)
            .await
            .unwrap();
        assert_eq!(saved.site_name, "shop.test");
        assert!(saved.manual_needed);
        assert!(!saved.successfully_registered);
        assert!(saved.password_ciphertext.starts_with("enc:v1:"));

        let (_, password) = store.reveal("alice", saved.id).await.unwrap().unwrap();
        assert_eq!(password, "S3cret!S3cret!ab");
        assert!(store.reveal("mallory", saved.id).await.unwrap().is_none());

        let listed = store.list("alice").await.unwrap();
        assert_eq!(listed.len(), 1);
        let json = serde_json::to_string(&listed[0]).unwrap();
        assert!(!json.contains("enc:v1"));
    }
}
