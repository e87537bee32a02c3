//! Credentials and OCI HTTP-signature request signing.

pub mod instance_principal;
pub mod key_file;
pub mod signer;

use crate::error::Result;
use rsa::pkcs1v15::SigningKey;
use sha2::Sha256;
use std::sync::Arc;

pub use instance_principal::InstancePrincipalProvider;
pub use key_file::{parse_private_key, KeyFileProvider};
pub use signer::sign_request;

/// Key material used to sign one request.
#[derive(Clone)]
pub struct SigningMaterial {
    pub key_id: String,
    pub key: Arc<SigningKey<Sha256>>,
}

impl std::fmt::Debug for SigningMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningMaterial")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Source of signing credentials for one tenancy.
pub enum CredentialProvider {
    KeyFile(KeyFileProvider),
    InstancePrincipal(InstancePrincipalProvider),
}

impl CredentialProvider {
    pub fn tenancy_ocid(&self) -> &str {
        match self {
            CredentialProvider::KeyFile(p) => p.tenancy_ocid(),
            CredentialProvider::InstancePrincipal(p) => p.tenancy_ocid(),
        }
    }

    pub fn region(&self) -> &str {
        match self {
            CredentialProvider::KeyFile(p) => p.region(),
            CredentialProvider::InstancePrincipal(p) => p.region(),
        }
    }

    /// Current signing material. Instance principals refresh their session
    /// token here when it is close to expiry.
    pub async fn signing_material(&self) -> Result<SigningMaterial> {
        match self {
            CredentialProvider::KeyFile(p) => Ok(p.signing_material()),
            CredentialProvider::InstancePrincipal(p) => p.signing_material().await,
        }
    }
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialProvider::KeyFile(_) => write!(f, "KeyFile({})", self.tenancy_ocid()),
            CredentialProvider::InstancePrincipal(_) => {
                write!(f, "InstancePrincipal({})", self.tenancy_ocid())
            }
        }
    }
}
