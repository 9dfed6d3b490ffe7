//! Building clients from configuration.

use dreamweaver_vectorization::{Dream, DreamweaverConfig, Mood, SimilarityRequest};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn index_name_is_resolved_through_control_plane() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/dreamweaver"))
        .and(header("Api-Key", "pc-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "dreamweaver",
            "host": "dreamweaver-abc123.svc.pinecone.io",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = DreamweaverConfig::default().with_env(|key| match key {
        "PINECONE_API_KEY" => Some("pc-key".to_string()),
        "PINECONE_INDEX_NAME" => Some("dreamweaver".to_string()),
        _ => None,
    });
    config.store.control_plane_url = server.uri();

    let store = config.build_store().await.unwrap();
    assert_eq!(store.name(), "pinecone");
}

#[tokio::test]
async fn offline_service_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dreamweaver.toml");
    std::fs::write(
        &path,
        r#"
[embedding]
provider = "hashing"
hashing_dimension = 512

[store]
backend = "memory"

[search]
max_limit = 3
"#,
    )
    .unwrap();

    let config = DreamweaverConfig::load(&path).unwrap();
    let service = config.build_service().await.unwrap();

    for i in 0..5 {
        let dream = Dream::new(
            format!("d{i}"),
            "u1",
            format!("Flying over mountain number {i}"),
            Mood::Adventurous,
        );
        service.vectorize(&dream).await.unwrap();
    }

    let matches = service
        .similar_dreams(&SimilarityRequest::new("flying over mountains", "u1").with_limit(10))
        .await
        .unwrap();
    assert_eq!(matches.len(), 3);
}
