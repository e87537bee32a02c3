use super::SigningMaterial;
use crate::error::{OciLogsError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use http::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, HOST};
use rsa::signature::{SignatureEncoding, Signer};
use sha2::{Digest, Sha256};

const CONTENT_SHA256: &str = "x-content-sha256";

/// Sign a request in place with the OCI HTTP-signature scheme.
///
/// Every request signs `date (request-target) host`; requests carrying a body
/// additionally sign `content-length content-type x-content-sha256`.
pub fn sign_request(request: &mut reqwest::Request, material: &SigningMaterial) -> Result<()> {
    let url = request.url().clone();
    let host = match (url.host_str(), url.port()) {
        (Some(h), Some(p)) => format!("{}:{}", h, p),
        (Some(h), None) => h.to_string(),
        (None, _) => {
            return Err(OciLogsError::ClientConstruction(format!(
                "Cannot sign request without host: {}",
                url
            )))
        }
    };
    let target = match url.query() {
        Some(q) => format!("{} {}?{}", request.method().as_str().to_lowercase(), url.path(), q),
        None => format!("{} {}", request.method().as_str().to_lowercase(), url.path()),
    };
    let date = chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    let body = request
        .body()
        .map(|b| b.as_bytes().map(<[u8]>::to_vec).unwrap_or_default());

    let mut signed_headers = vec!["date", "(request-target)", "host"];
    let mut signing_lines = vec![
        format!("date: {}", date),
        format!("(request-target): {}", target),
        format!("host: {}", host),
    ];

    let headers = request.headers_mut();
    headers.insert(DATE, header_value(&date)?);
    headers.insert(HOST, header_value(&host)?);

    if let Some(body) = body {
        let content_sha = BASE64.encode(Sha256::digest(&body));
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        headers.insert(CONTENT_LENGTH, header_value(&body.len().to_string())?);
        headers.insert(CONTENT_TYPE, header_value(&content_type)?);
        headers.insert(
            HeaderName::from_static(CONTENT_SHA256),
            header_value(&content_sha)?,
        );

        signed_headers.extend(["content-length", "content-type", CONTENT_SHA256]);
        signing_lines.push(format!("content-length: {}", body.len()));
        signing_lines.push(format!("content-type: {}", content_type));
        signing_lines.push(format!("{}: {}", CONTENT_SHA256, content_sha));
    }

    let signing_string = signing_lines.join("\n");
    let signature = material.key.sign(signing_string.as_bytes());
    let authorization = format!(
        "Signature version=\"1\",keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
        material.key_id,
        signed_headers.join(" "),
        BASE64.encode(signature.to_bytes())
    );
    headers.insert(AUTHORIZATION, header_value(&authorization)?);

    Ok(())
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| OciLogsError::ClientConstruction(format!("Invalid header value: {}", e)))
}
