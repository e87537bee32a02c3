use super::{key_file::parse_private_key, sign_request, SigningMaterial};
use crate::client::{Service, ServiceEndpoints};
use crate::error::{OciLogsError, Result};
use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use pkcs8::{EncodePublicKey, LineEnding};
use rsa::pkcs1v15::SigningKey;
use rsa::RsaPrivateKey;
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use tokio::sync::RwLock;

const METADATA_AUTH_HEADER: &str = "Bearer Oracle";
const SESSION_KEY_BITS: usize = 2048;
/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

struct Session {
    token: String,
    expires_at: DateTime<Utc>,
    key: Arc<SigningKey<Sha256>>,
}

#[derive(Deserialize)]
struct FederationResponse {
    token: String,
}

#[derive(Deserialize)]
struct TokenClaims {
    exp: i64,
}

/// Credentials derived from the compute instance's identity certificates.
///
/// The leaf certificate, its key and the intermediate certificate come from
/// the instance metadata service. They are exchanged at the auth service for
/// a short-lived security token bound to a freshly generated session key.
pub struct InstancePrincipalProvider {
    http: reqwest::Client,
    metadata_url: String,
    endpoints: ServiceEndpoints,
    region: String,
    tenancy_ocid: String,
    session: RwLock<Option<Session>>,
}

impl InstancePrincipalProvider {
    /// Discover the instance region and tenancy and federate once.
    pub async fn new(metadata_url: &str, endpoints: ServiceEndpoints) -> Result<Self> {
        let http = reqwest::Client::new();
        let metadata_url = metadata_url.trim_end_matches('/').to_string();

        let region = fetch_metadata(&http, &metadata_url, "/opc/v2/instance/canonicalRegionName")
            .await?
            .trim()
            .to_string();
        let leaf_pem = fetch_metadata(&http, &metadata_url, "/opc/v2/identity/cert.pem").await?;
        let tenancy_ocid = tenancy_from_certificate(&leaf_pem)?;

        tracing::info!(
            region = %region,
            tenancy = %tenancy_ocid,
            "Instance principal identity discovered"
        );

        let provider = Self {
            http,
            metadata_url,
            endpoints,
            region,
            tenancy_ocid,
            session: RwLock::new(None),
        };
        provider.signing_material().await?;
        Ok(provider)
    }

    pub fn tenancy_ocid(&self) -> &str {
        &self.tenancy_ocid
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub async fn signing_material(&self) -> Result<SigningMaterial> {
        {
            let session = self.session.read().await;
            if let Some(s) = session.as_ref().filter(|s| is_fresh(s)) {
                return Ok(material_for(s));
            }
        }

        let mut session = self.session.write().await;
        if let Some(s) = session.as_ref().filter(|s| is_fresh(s)) {
            return Ok(material_for(s));
        }
        let fresh = self.federate().await?;
        let material = material_for(&fresh);
        *session = Some(fresh);
        Ok(material)
    }

    async fn federate(&self) -> Result<Session> {
        let construction =
            |what: &str, e: &dyn std::fmt::Display| OciLogsError::ClientConstruction(format!("{}: {}", what, e));

        let leaf_pem =
            fetch_metadata(&self.http, &self.metadata_url, "/opc/v2/identity/cert.pem").await?;
        let leaf_key_pem =
            fetch_metadata(&self.http, &self.metadata_url, "/opc/v2/identity/key.pem").await?;
        let intermediate_pem = fetch_metadata(
            &self.http,
            &self.metadata_url,
            "/opc/v2/identity/intermediate.pem",
        )
        .await?;

        let leaf_der = pem_contents(&leaf_pem)?;
        let intermediate_der = pem_contents(&intermediate_pem)?;
        let leaf_key = parse_private_key("instance principal", &leaf_key_pem, None)?;

        let session_key = tokio::task::spawn_blocking(|| {
            let mut rng = rand::rngs::OsRng;
            RsaPrivateKey::new(&mut rng, SESSION_KEY_BITS)
        })
        .await
        .map_err(|e| construction("Session key generation aborted", &e))?
        .map_err(|e| construction("Failed to generate session key", &e))?;
        let public_pem = session_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| construction("Failed to encode session public key", &e))?;

        let body = serde_json::json!({
            "certificate": BASE64.encode(&leaf_der),
            "publicKey": strip_pem_armor(&public_pem),
            "intermediateCertificates": [BASE64.encode(&intermediate_der)],
        });

        let url = format!(
            "{}/v1/x509",
            self.endpoints.base_url(Service::Auth, &self.region)?
        );
        let mut request = self
            .http
            .post(&url)
            .json(&body)
            .build()
            .map_err(|e| construction("Failed to build federation request", &e))?;
        let federation_material = SigningMaterial {
            key_id: format!(
                "{}/fed-x509/{}",
                self.tenancy_ocid,
                certificate_fingerprint(&leaf_der)
            ),
            key: Arc::new(SigningKey::<Sha256>::new(leaf_key)),
        };
        sign_request(&mut request, &federation_material)?;

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| construction("Federation request failed", &e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OciLogsError::ClientConstruction(format!(
                "Federation returned {}: {}",
                status, text
            )));
        }
        let federation: FederationResponse = response
            .json()
            .await
            .map_err(|e| construction("Failed to parse federation response", &e))?;

        let expires_at = token_expiry(&federation.token)?;
        tracing::info!(expires_at = %expires_at, "Instance principal session token refreshed");

        Ok(Session {
            token: federation.token,
            expires_at,
            key: Arc::new(SigningKey::<Sha256>::new(session_key)),
        })
    }
}

fn is_fresh(session: &Session) -> bool {
    session.expires_at - ChronoDuration::seconds(REFRESH_MARGIN_SECS) > Utc::now()
}

fn material_for(session: &Session) -> SigningMaterial {
    SigningMaterial {
        key_id: format!("ST${}", session.token),
        key: Arc::clone(&session.key),
    }
}

async fn fetch_metadata(http: &reqwest::Client, base: &str, path: &str) -> Result<String> {
    let url = format!("{}{}", base, path);
    let response = http
        .get(&url)
        .header(http::header::AUTHORIZATION, METADATA_AUTH_HEADER)
        .send()
        .await
        .map_err(|e| {
            OciLogsError::ClientConstruction(format!("Metadata request {} failed: {}", path, e))
        })?;
    if !response.status().is_success() {
        return Err(OciLogsError::ClientConstruction(format!(
            "Metadata request {} returned {}",
            path,
            response.status()
        )));
    }
    response.text().await.map_err(|e| {
        OciLogsError::ClientConstruction(format!("Metadata response {} unreadable: {}", path, e))
    })
}

fn pem_contents(pem_text: &str) -> Result<Vec<u8>> {
    x509_parser::pem::parse_x509_pem(pem_text.trim().as_bytes())
        .map(|(_, pem)| pem.contents)
        .map_err(|e| OciLogsError::ClientConstruction(format!("Invalid PEM from metadata: {}", e)))
}

/// Tenancy OCID carried in the leaf certificate subject as
/// `opc-tenant:<ocid>` or `opc-identity:<ocid>`.
pub fn tenancy_from_certificate(leaf_pem: &str) -> Result<String> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(leaf_pem.trim().as_bytes()).map_err(|e| {
        OciLogsError::ClientConstruction(format!("Invalid leaf certificate PEM: {}", e))
    })?;
    let cert = pem.parse_x509().map_err(|e| {
        OciLogsError::ClientConstruction(format!("Invalid leaf certificate: {}", e))
    })?;

    let tenancy = cert
        .subject()
        .iter_attributes()
        .filter_map(|attr| attr.as_str().ok())
        .find_map(|value| {
            value
                .strip_prefix("opc-tenant:")
                .or_else(|| value.strip_prefix("opc-identity:"))
                .map(str::to_string)
        })
        .ok_or_else(|| {
            OciLogsError::ClientConstruction(
                "Leaf certificate subject carries no tenancy".to_string(),
            )
        });
    tenancy
}

/// SHA-1 fingerprint of a DER certificate as colon-separated upper-case hex.
pub fn certificate_fingerprint(der: &[u8]) -> String {
    use sha1::{Digest as _, Sha1};
    let hex = hex::encode_upper(Sha1::digest(der));
    hex.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

fn strip_pem_armor(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.starts_with("-----"))
        .collect::<Vec<_>>()
        .concat()
}

/// Expiry (`exp` claim) of a JWT security token.
pub fn token_expiry(token: &str) -> Result<DateTime<Utc>> {
    let invalid = |reason: &str| {
        OciLogsError::ClientConstruction(format!("Invalid security token: {}", reason))
    };
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| invalid("not a JWT"))?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| invalid("payload is not base64url"))?;
    let claims: TokenClaims =
        serde_json::from_slice(&decoded).map_err(|_| invalid("payload has no exp claim"))?;
    DateTime::from_timestamp(claims.exp, 0).ok_or_else(|| invalid("exp out of range"))
}
