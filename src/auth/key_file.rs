use super::SigningMaterial;
use crate::error::{OciLogsError, Result};
use crate::settings::TenancyProfile;
use pkcs8::DecodePrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use std::sync::Arc;

/// Decode an RSA private key from PEM text.
///
/// Accepts PKCS#1 (`RSA PRIVATE KEY`), PKCS#8 (`PRIVATE KEY`) and encrypted
/// PKCS#8 (`ENCRYPTED PRIVATE KEY`, which requires `passphrase`).
pub fn parse_private_key(
    profile: &str,
    pem_text: &str,
    passphrase: Option<&str>,
) -> Result<RsaPrivateKey> {
    let invalid = |reason: String| OciLogsError::InvalidCredential {
        profile: profile.to_string(),
        reason,
    };

    if pem_text.contains("Proc-Type: 4,ENCRYPTED") {
        return Err(invalid(
            "legacy encrypted PKCS#1 keys are not supported, convert the key to PKCS#8".into(),
        ));
    }

    let (_, pem) = x509_parser::pem::parse_x509_pem(pem_text.trim().as_bytes())
        .map_err(|e| invalid(format!("private key is not a valid PEM block: {}", e)))?;

    match pem.label.as_str() {
        "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_der(&pem.contents)
            .map_err(|e| invalid(format!("failed to decode PKCS#1 key: {}", e))),
        "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_der(&pem.contents)
            .map_err(|e| invalid(format!("failed to decode PKCS#8 key: {}", e))),
        "ENCRYPTED PRIVATE KEY" => {
            let passphrase = passphrase
                .filter(|p| !p.is_empty())
                .ok_or_else(|| invalid("encrypted key requires a passphrase".into()))?;
            RsaPrivateKey::from_pkcs8_encrypted_der(&pem.contents, passphrase)
                .map_err(|e| invalid(format!("failed to decrypt PKCS#8 key: {}", e)))
        }
        other => Err(invalid(format!("unsupported PEM label '{}'", other))),
    }
}

/// API-key credentials read from a settings profile.
pub struct KeyFileProvider {
    tenancy_ocid: String,
    user_ocid: String,
    fingerprint: String,
    region: String,
    key: Arc<SigningKey<Sha256>>,
}

impl KeyFileProvider {
    pub fn from_profile(profile: &TenancyProfile) -> Result<Self> {
        for (name, value) in [
            ("tenancy", &profile.tenancy_ocid),
            ("user", &profile.user_ocid),
            ("fingerprint", &profile.fingerprint),
            ("region", &profile.region),
        ] {
            if value.is_empty() {
                return Err(OciLogsError::Config(format!(
                    "Profile '{}' is missing its {}",
                    profile.profile_key, name
                )));
            }
        }

        let key = parse_private_key(
            &profile.profile_key,
            &profile.private_key_pem,
            profile.private_key_passphrase.as_deref(),
        )?;

        Ok(Self {
            tenancy_ocid: profile.tenancy_ocid.clone(),
            user_ocid: profile.user_ocid.clone(),
            fingerprint: profile.fingerprint.clone(),
            region: profile.region.clone(),
            key: Arc::new(SigningKey::<Sha256>::new(key)),
        })
    }

    pub fn tenancy_ocid(&self) -> &str {
        &self.tenancy_ocid
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy_ocid, self.user_ocid, self.fingerprint)
    }

    pub fn signing_material(&self) -> SigningMaterial {
        SigningMaterial {
            key_id: self.key_id(),
            key: Arc::clone(&self.key),
        }
    }
}
