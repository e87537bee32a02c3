#![allow(dead_code)]

use ocilogs::{Datasource, DatasourceConfig, RawSettings};
use pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use std::sync::OnceLock;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A PKCS#8 PEM RSA key, generated once per test binary.
pub fn test_key_pem() -> &'static str {
    static PEM: OnceLock<String> = OnceLock::new();
    PEM.get_or_init(|| {
        let mut rng = rand::rngs::OsRng;
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string()
    })
}

pub fn tenancy_ocid(index: usize) -> String {
    format!("ocid1.tenancy.oc1..tenancy{}", index)
}

/// Settings blob with one profile per name, in slot order.
pub fn local_settings(profiles: &[&str], tenancy_mode: &str) -> RawSettings {
    let mut json_data = serde_json::Map::new();
    json_data.insert("environment".into(), json!("local"));
    json_data.insert("tenancyMode".into(), json!(tenancy_mode));
    let mut secure = serde_json::Map::new();

    for (i, name) in profiles.iter().enumerate() {
        json_data.insert(format!("profile_{}", i), json!(name));
        json_data.insert(format!("region_{}", i), json!("us-ashburn-1"));
        secure.insert(format!("tenancy_{}", i), json!(tenancy_ocid(i)));
        secure.insert(format!("user_{}", i), json!(format!("ocid1.user.oc1..user{}", i)));
        secure.insert(format!("fingerprint_{}", i), json!("aa:bb:cc"));
        secure.insert(format!("privkey_{}", i), json!(test_key_pem()));
    }

    serde_json::from_value(json!({"jsonData": json_data, "secureJsonData": secure})).unwrap()
}

/// Answer every tenancy self-report with a minimal tenancy document.
pub async fn mount_tenancy_self_report(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/20160918/tenancies/[^/]+$"))
        .respond_with(|req: &wiremock::Request| {
            let id = req.url.path().rsplit('/').next().unwrap_or_default().to_string();
            ResponseTemplate::new(200).set_body_json(json!({"id": id, "name": "acme"}))
        })
        .mount(server)
        .await;
}

pub async fn single_tenancy_datasource(server: &MockServer) -> Datasource {
    mount_tenancy_self_report(server).await;
    Datasource::new(
        &local_settings(&["DEFAULT"], ""),
        DatasourceConfig::with_endpoint(&server.uri()),
    )
    .await
    .unwrap()
}

pub fn compartment(name: &str, state: &str) -> Value {
    json!({
        "id": format!("ocid1.compartment.oc1..{}", name),
        "name": name,
        "lifecycleState": state,
    })
}

pub fn request(query_type: &str, extra: Value) -> ocilogs::QueryRequest {
    let mut base = json!({
        "refId": "A",
        "queryType": query_type,
        "timeRange": {"fromEpochMs": 0, "toEpochMs": 600000}
    });
    if let (Value::Object(base_map), Value::Object(extra_map)) = (&mut base, extra) {
        base_map.extend(extra_map);
    }
    serde_json::from_value(base).unwrap()
}

pub async fn mount_search(server: &MockServer, results: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/20190909/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": results.into_iter().map(|r| json!({"data": r})).collect::<Vec<_>>(),
            "summary": {"resultCount": 0}
        })))
        .mount(server)
        .await;
}
