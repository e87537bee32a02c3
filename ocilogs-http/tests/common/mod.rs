#![allow(dead_code)]

use ocilogs::{Datasource, DatasourceConfig, RawSettings};
use ocilogs_http::handlers::AppState;
use pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANCY: &str = "ocid1.tenancy.oc1..http";

pub fn settings() -> RawSettings {
    let mut rng = rand::rngs::OsRng;
    let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
    let pem = key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
    serde_json::from_value(json!({
        "jsonData": {
            "environment": "local",
            "profile_0": "DEFAULT",
            "region_0": "us-phoenix-1"
        },
        "secureJsonData": {
            "tenancy_0": TENANCY,
            "user_0": "ocid1.user.oc1..http",
            "fingerprint_0": "11:22:33",
            "privkey_0": pem
        }
    }))
    .unwrap()
}

/// App state over a datasource backed by a mock OCI.
pub async fn app_state(oci: &MockServer) -> Arc<AppState> {
    Mock::given(method("GET"))
        .and(path_regex(r"^/20160918/tenancies/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": TENANCY, "name": "acme"})))
        .mount(oci)
        .await;

    let datasource = Datasource::new(&settings(), DatasourceConfig::with_endpoint(&oci.uri()))
        .await
        .unwrap();
    Arc::new(AppState {
        datasource: Arc::new(datasource),
    })
}
