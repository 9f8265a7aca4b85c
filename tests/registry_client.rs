use httpmock::prelude::*;
use image_blob_sizer::config::AuthConfig;
use image_blob_sizer::image::manifest::{
    ACCEPTED_MANIFEST_TYPES, MEDIA_TYPE_OCI_INDEX, MEDIA_TYPE_OCI_MANIFEST, ManifestNode,
};
use image_blob_sizer::image::{BlobDigest, ImageReference};
use image_blob_sizer::registry::RegistryClient;
use image_blob_sizer::{ManifestSource, SizerError};

const IMAGE_BODY: &str = r#"{
    "schemaVersion": 2,
    "mediaType": "application/vnd.oci.image.manifest.v1+json",
    "config": {"digest": "sha256:cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc", "size": 1469},
    "layers": [
        {"digest": "sha256:bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", "size": 700000}
    ]
}"#;

fn reference(server: &MockServer, suffix: &str) -> ImageReference {
    ImageReference::parse(&format!("127.0.0.1:{}/team/app{}", server.port(), suffix)).unwrap()
}

fn client() -> RegistryClient {
    RegistryClient::builder().build().unwrap()
}

#[tokio::test]
async fn tags_follow_link_pagination() {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/team/app/tags/list")
                .query_param("n", "1000")
                .query_param_missing("last");
            then.status(200)
                .header("content-type", "application/json")
                .header(
                    "link",
                    r#"</v2/team/app/tags/list?last=1.1&n=1000>; rel="next""#,
                )
                .body(r#"{"name":"team/app","tags":["1.0","1.1"]}"#);
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/team/app/tags/list")
                .query_param("last", "1.1");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"name":"team/app","tags":["2.0"]}"#);
        })
        .await;

    let tags = client().list_tags(&reference(&server, "")).await.unwrap();

    assert_eq!(tags, vec!["1.0", "1.1", "2.0"]);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn null_tag_list_is_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/team/app/tags/list");
            then.status(200).body(r#"{"name":"team/app","tags":null}"#);
        })
        .await;

    let tags = client().list_tags(&reference(&server, "")).await.unwrap();
    assert!(tags.is_empty());
}

#[tokio::test]
async fn tag_list_error_names_repository() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/team/app/tags/list");
            then.status(500).body("boom");
        })
        .await;

    let err = client().list_tags(&reference(&server, "")).await.unwrap_err();
    match err {
        SizerError::TagList { repository, source } => {
            assert_eq!(repository, format!("127.0.0.1:{}/team/app", server.port()));
            assert!(source.to_string().contains("500"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn manifest_is_requested_with_all_accept_types() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/team/app/manifests/1.0")
                .header("accept", ACCEPTED_MANIFEST_TYPES.join(", "));
            then.status(200)
                .header("content-type", MEDIA_TYPE_OCI_MANIFEST)
                .body(IMAGE_BODY);
        })
        .await;

    let manifest = client()
        .fetch_manifest(&reference(&server, ":1.0"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(manifest.media_type, MEDIA_TYPE_OCI_MANIFEST);
    assert_eq!(manifest.size(), IMAGE_BODY.len() as u64);
    assert_eq!(manifest.digest, BlobDigest::sha256_of(IMAGE_BODY.as_bytes()));
    assert!(matches!(manifest.classify("app").unwrap(), ManifestNode::Image(_)));
}

#[tokio::test]
async fn content_type_parameters_are_ignored() {
    let server = MockServer::start_async().await;
    let body = r#"{"schemaVersion":2,"manifests":[]}"#;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/team/app/manifests/multi");
            then.status(200)
                .header("content-type", format!("{}; charset=utf-8", MEDIA_TYPE_OCI_INDEX))
                .body(body);
        })
        .await;

    let manifest = client()
        .fetch_manifest(&reference(&server, ":multi"))
        .await
        .unwrap();

    assert_eq!(manifest.media_type, MEDIA_TYPE_OCI_INDEX);
    assert!(matches!(manifest.classify("multi").unwrap(), ManifestNode::Index(_)));
}

#[tokio::test]
async fn generic_content_type_uses_body_media_type() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/team/app/manifests/1.0");
            then.status(200)
                .header("content-type", "application/json")
                .body(IMAGE_BODY);
        })
        .await;

    let manifest = client()
        .fetch_manifest(&reference(&server, ":1.0"))
        .await
        .unwrap();

    assert_eq!(manifest.media_type, MEDIA_TYPE_OCI_MANIFEST);
}

#[tokio::test]
async fn digest_fetch_is_verified() {
    let server = MockServer::start_async().await;
    let claimed = format!("sha256:{}", "a".repeat(64));
    let path = format!("/v2/team/app/manifests/{}", claimed);
    server
        .mock_async(|when, then| {
            when.method(GET).path(path.as_str());
            then.status(200)
                .header("content-type", MEDIA_TYPE_OCI_MANIFEST)
                .body(IMAGE_BODY);
        })
        .await;

    let err = client()
        .fetch_manifest(&reference(&server, &format!("@{}", claimed)))
        .await
        .unwrap_err();

    match err {
        SizerError::Fetch { reference, source } => {
            assert!(reference.ends_with(&claimed));
            assert!(source.to_string().contains("Digest mismatch"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn digest_fetch_accepts_matching_body() {
    let server = MockServer::start_async().await;
    let digest = BlobDigest::sha256_of(IMAGE_BODY.as_bytes());
    let path = format!("/v2/team/app/manifests/{}", digest);
    server
        .mock_async(|when, then| {
            when.method(GET).path(path.as_str());
            then.status(200)
                .header("content-type", MEDIA_TYPE_OCI_MANIFEST)
                .body(IMAGE_BODY);
        })
        .await;

    let manifest = client()
        .fetch_manifest(&reference(&server, &format!("@{}", digest)))
        .await
        .unwrap();
    assert_eq!(manifest.digest, digest);
}

#[tokio::test]
async fn non_sha256_digest_fetch_keeps_requested_digest() {
    let server = MockServer::start_async().await;
    let requested = BlobDigest::parse(&format!("sha512:{}", "d".repeat(128))).unwrap();
    let path = format!("/v2/team/app/manifests/{}", requested);
    server
        .mock_async(|when, then| {
            when.method(GET).path(path.as_str());
            then.status(200)
                .header("content-type", MEDIA_TYPE_OCI_MANIFEST)
                .body(IMAGE_BODY);
        })
        .await;

    let manifest = client()
        .fetch_manifest(&reference(&server, &format!("@{}", requested)))
        .await
        .unwrap();

    assert_eq!(manifest.digest, requested);
    assert_eq!(manifest.size(), IMAGE_BODY.len() as u64);
}

#[tokio::test]
async fn missing_manifest_is_a_fetch_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/team/app/manifests/gone");
            then.status(404).body(r#"{"errors":[{"code":"MANIFEST_UNKNOWN"}]}"#);
        })
        .await;

    let err = client()
        .fetch_manifest(&reference(&server, ":gone"))
        .await
        .unwrap_err();

    match err {
        SizerError::Fetch { source, .. } => assert!(source.to_string().contains("Not found")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn bearer_challenge_fetches_and_reuses_token() {
    let server = MockServer::start_async().await;
    let challenge = format!(
        r#"Bearer realm="{}",service="test-registry",scope="repository:team/app:pull""#,
        server.url("/token")
    );

    let anonymous = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/team/app/manifests/1.0")
                .header_missing("authorization");
            then.status(401).header("www-authenticate", challenge.as_str());
        })
        .await;
    let token = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/token")
                .query_param("service", "test-registry")
                .query_param("scope", "repository:team/app:pull");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"token":"secret-token"}"#);
        })
        .await;
    let authorized = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/team/app/manifests/1.0")
                .header("authorization", "Bearer secret-token");
            then.status(200)
                .header("content-type", MEDIA_TYPE_OCI_MANIFEST)
                .body(IMAGE_BODY);
        })
        .await;
    // Only answers requests that already carry the cached token.
    let tags = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/team/app/tags/list")
                .header("authorization", "Bearer secret-token");
            then.status(200).body(r#"{"name":"team/app","tags":["1.0"]}"#);
        })
        .await;

    let client = client();
    let manifest = client
        .fetch_manifest(&reference(&server, ":1.0"))
        .await
        .unwrap();
    assert_eq!(manifest.size(), IMAGE_BODY.len() as u64);

    let listed = client.list_tags(&reference(&server, "")).await.unwrap();
    assert_eq!(listed, vec!["1.0"]);

    anonymous.assert_async().await;
    token.assert_async().await;
    authorized.assert_async().await;
    tags.assert_async().await;
}

#[tokio::test]
async fn rejected_token_request_is_an_authentication_error() {
    let server = MockServer::start_async().await;
    let challenge = format!(r#"Bearer realm="{}",service="test-registry""#, server.url("/token"));
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/team/app/manifests/1.0");
            then.status(401).header("www-authenticate", challenge.as_str());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/token");
            then.status(403).body("denied");
        })
        .await;

    let err = client()
        .fetch_manifest(&reference(&server, ":1.0"))
        .await
        .unwrap_err();

    match err {
        SizerError::Fetch { source, .. } => {
            assert!(matches!(*source, SizerError::Authentication(_)), "got {:?}", source)
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn basic_challenge_uses_configured_credentials() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/team/app/manifests/1.0")
                .header_missing("authorization");
            then.status(401).header("www-authenticate", r#"Basic realm="registry""#);
        })
        .await;
    let authorized = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/team/app/manifests/1.0")
                .header("authorization", "Basic dXNlcjpwYXNz");
            then.status(200)
                .header("content-type", MEDIA_TYPE_OCI_MANIFEST)
                .body(IMAGE_BODY);
        })
        .await;

    let client = RegistryClient::builder()
        .with_auth(AuthConfig::new(Some("user".to_string()), Some("pass".to_string())))
        .build()
        .unwrap();
    client
        .fetch_manifest(&reference(&server, ":1.0"))
        .await
        .unwrap();

    authorized.assert_async().await;
}

#[tokio::test]
async fn basic_challenge_without_credentials_fails() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/team/app/manifests/1.0");
            then.status(401).header("www-authenticate", r#"Basic realm="registry""#);
        })
        .await;

    let err = client()
        .fetch_manifest(&reference(&server, ":1.0"))
        .await
        .unwrap_err();

    match err {
        SizerError::Fetch { source, .. } => {
            assert!(matches!(*source, SizerError::Authentication(_)))
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
