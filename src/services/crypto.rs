//! At-rest encryption and display masking for attendee data.
//!
//! Names and phone numbers are stored twice: plaintext for admin staff and
//! an AES-256-GCM copy for everything else. Viewer dashboards decrypt the
//! at-rest copy and mask the result before display, so the full values never
//! leave the admin surface.
//!
//! Wire format for encrypted fields: `base64(nonce || ciphertext)` with a
//! fresh 96-bit nonce per encryption.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Length of the AES-GCM nonce prefixed to every ciphertext.
const NONCE_LEN: usize = 12;

/// Symmetric cipher for check-in name/phone fields.
///
/// Constructed once at startup from the configured passphrase and shared
/// through [`crate::state::AppState`]. Cloning is cheap (32-byte key copy).
#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    /// Derive the 256-bit key from an operator passphrase with SHA-256.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(passphrase.as_bytes());
        Self {
            key: hasher.finalize().into(),
        }
    }

    /// Encrypt a field value, producing `base64(nonce || ciphertext)`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| AppError::Encryption)?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt a previously encrypted field value.
    ///
    /// Fails on malformed base64, truncated input, or an authentication-tag
    /// mismatch (wrong key or tampered data).
    pub fn decrypt(&self, encoded: &str) -> Result<String, AppError> {
        let combined = BASE64.decode(encoded).map_err(|_| AppError::Encryption)?;
        if combined.len() <= NONCE_LEN {
            return Err(AppError::Encryption);
        }
        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| AppError::Encryption)?;

        String::from_utf8(plaintext).map_err(|_| AppError::Encryption)
    }
}

/// Mask a phone number for display: `0901234567` -> `090***4567`.
///
/// Numbers shorter than ten characters are returned unchanged.
pub fn mask_phone_number(phone: &str) -> String {
    if phone.chars().count() < 10 {
        return phone.to_string();
    }
    let chars: Vec<char> = phone.chars().collect();
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[7..].iter().collect();
    format!("{head}***{tail}")
}

/// Mask a name for display: `Nguyen Van A` -> `Nguyen V** A*`.
///
/// The first word is kept; each following word keeps its first letter with
/// the rest starred out. Single-word names keep two letters.
pub fn mask_name(name: &str) -> String {
    let parts: Vec<&str> = name.split(' ').collect();

    if parts.len() == 1 {
        let kept: String = parts[0].chars().take(2).collect();
        return format!("{kept}***");
    }

    parts
        .iter()
        .enumerate()
        .map(|(index, part)| {
            if index == 0 {
                (*part).to_string()
            } else {
                let first = part.chars().next().map(String::from).unwrap_or_default();
                let stars = "*".repeat(part.chars().count().saturating_sub(1).max(1));
                format!("{first}{stars}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> FieldCipher {
        FieldCipher::from_passphrase("test-passphrase")
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let c = cipher();
        let encrypted = c.encrypt("Nguyễn Văn A").unwrap();
        assert_ne!(encrypted, "Nguyễn Văn A");
        assert_eq!(c.decrypt(&encrypted).unwrap(), "Nguyễn Văn A");
    }

    #[test]
    fn fresh_nonce_per_encryption() {
        let c = cipher();
        let a = c.encrypt("0901234567").unwrap();
        let b = c.encrypt("0901234567").unwrap();
        assert_ne!(a, b);
        assert_eq!(c.decrypt(&a).unwrap(), c.decrypt(&b).unwrap());
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let encrypted = cipher().encrypt("secret").unwrap();
        let other = FieldCipher::from_passphrase("different-passphrase");
        assert!(other.decrypt(&encrypted).is_err());
    }

    #[test]
    fn malformed_input_fails_to_decrypt() {
        let c = cipher();
        assert!(c.decrypt("not base64 at all!!!").is_err());
        assert!(c.decrypt("aGVsbG8=").is_err()); // too short for nonce + tag
    }

    #[test]
    fn masks_phone_numbers() {
        assert_eq!(mask_phone_number("0901234567"), "090***4567");
        assert_eq!(mask_phone_number("090123"), "090123");
    }

    #[test]
    fn masks_multi_word_names() {
        assert_eq!(mask_name("Nguyen Van A"), "Nguyen V** A*");
        assert_eq!(mask_name("Tran Binh"), "Tran B***");
    }

    #[test]
    fn masks_single_word_names() {
        assert_eq!(mask_name("Nguyen"), "Ng***");
    }
}
