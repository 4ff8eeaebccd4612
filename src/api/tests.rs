// Gateway tests against a throwaway HTTP responder on 127.0.0.1.
// Run with: cargo test --lib api::tests

use super::*;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A request as the responder saw it.
#[derive(Debug, Clone)]
struct Recorded {
    request_line: String,
    body: String,
}

/// Serve each canned `(status, body)` once, in order, recording requests.
async fn spawn_stub(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_task = seen.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let recorded = read_request(&mut stream).await;
            seen_task.lock().unwrap().push(recorded);

            let reason = match status {
                200 => "OK",
                201 => "Created",
                202 => "Accepted",
                204 => "No Content",
                404 => "Not Found",
                409 => "Conflict",
                _ => "Error",
            };
            let response = if status == 204 {
                format!("HTTP/1.1 204 {}\r\nConnection: close\r\n\r\n", reason)
            } else {
                format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                )
            };
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{}", addr), seen)
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Recorded {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Recorded {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    }
}

/// Accept every connection and read the request, then never answer.
async fn spawn_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut stream, _)) = listener.accept().await {
            read_request(&mut stream).await;
            held.push(stream);
        }
    });

    format!("http://{}", addr)
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(GatewayOptions {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_list_feeds_decodes_and_hits_exact_path() {
    let (base, seen) = spawn_stub(vec![(
        200,
        r#"[{"id":"f1","rss_url":"https://a.example/rss","title":"Pod A","image_url":null,
             "last_polled_at":null,"created_at":"2024-01-01T00:00:00Z","episode_count":2}]"#,
    )])
    .await;

    let feeds = client(&base).list_feeds().await.unwrap();

    assert_eq!(feeds.len(), 1);
    assert_eq!(feeds[0].display_name(), "Pod A");
    assert_eq!(feeds[0].episode_count, 2);
    assert_eq!(
        seen.lock().unwrap()[0].request_line,
        "GET /api/v1/feeds HTTP/1.1"
    );
}

#[tokio::test]
async fn test_non_2xx_preserves_status_and_raw_body() {
    let (base, _seen) = spawn_stub(vec![(404, r#"{"detail":"Episode not found"}"#)]).await;

    let err = client(&base).get_episode("e-missing").await.unwrap_err();

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, r#"{"detail":"Episode not found"}"#);
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hung_request_hits_deadline_as_transport_error() {
    let base = spawn_silent().await;
    let api = ApiClient::new(GatewayOptions {
        base_url: base,
        timeout: Duration::from_millis(300),
    })
    .unwrap();

    let started = std::time::Instant::now();
    let err = api.list_feeds().await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_delete_feed_accepts_204_without_decoding() {
    let (base, seen) = spawn_stub(vec![(204, "")]).await;

    client(&base).delete_feed("f1").await.unwrap();

    assert_eq!(
        seen.lock().unwrap()[0].request_line,
        "DELETE /api/v1/feeds/f1 HTTP/1.1"
    );
}

#[tokio::test]
async fn test_resource_call_reports_204_as_no_content() {
    let (base, _seen) = spawn_stub(vec![(204, "")]).await;

    let err = client(&base).list_keywords().await.unwrap_err();

    assert!(matches!(err, ApiError::UnexpectedNoContent { .. }));
}

#[tokio::test]
async fn test_malformed_json_is_a_decode_error() {
    let (base, _seen) = spawn_stub(vec![(200, "{not json")]).await;

    let err = client(&base).dashboard_stats().await.unwrap_err();

    match err {
        ApiError::Decode { path, .. } => assert_eq!(path, "/api/v1/dashboard/stats"),
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_episode_paths() {
    let (base, seen) = spawn_stub(vec![
        (200, "[]"),
        (200, r#"{"id":"e1","guid":"g1","status":"completed","transcript_text":"hi"}"#),
        (202, r#"{"status":"reprocessing","episode_id":"e1"}"#),
        (202, r#"{"status":"retrying_enrichment","episode_id":"e1"}"#),
    ])
    .await;
    let api = client(&base);

    assert!(api.list_episodes("f1").await.unwrap().is_empty());
    let detail = api.get_episode("e1").await.unwrap();
    assert_eq!(detail.transcript_text.as_deref(), Some("hi"));
    assert_eq!(api.reprocess_episode("e1").await.unwrap().status, "reprocessing");
    assert_eq!(
        api.retry_enrichment("e1").await.unwrap().status,
        "retrying_enrichment"
    );

    let lines: Vec<String> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.request_line.clone())
        .collect();
    assert_eq!(
        lines,
        vec![
            "GET /api/v1/episodes/by-feed/f1 HTTP/1.1",
            "GET /api/v1/episodes/e1 HTTP/1.1",
            "POST /api/v1/episodes/e1/reprocess HTTP/1.1",
            "POST /api/v1/episodes/e1/retry-enrichment HTTP/1.1",
        ]
    );
}

#[tokio::test]
async fn test_create_keyword_sends_phrase_and_match_type() {
    let (base, seen) = spawn_stub(vec![(
        201,
        r#"{"id":"k1","phrase":"churn","match_type":"exact_word","created_at":"2024-01-01T00:00:00Z"}"#,
    )])
    .await;

    let kw = client(&base)
        .create_keyword("churn", MatchType::ExactWord)
        .await
        .unwrap();

    assert_eq!(kw.match_type, MatchType::ExactWord);
    let recorded = seen.lock().unwrap()[0].clone();
    assert_eq!(recorded.request_line, "POST /api/v1/keywords HTTP/1.1");
    let body: serde_json::Value = serde_json::from_str(&recorded.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({"phrase": "churn", "match_type": "exact_word"})
    );
}

#[tokio::test]
async fn test_list_mentions_encodes_query_string() {
    let (base, seen) = spawn_stub(vec![(200, "[]"), (200, "[]")]).await;
    let api = client(&base);

    api.list_mentions(&MentionQuery {
        sentiment: Some(Sentiment::Positive),
        limit: Some(5),
        ..Default::default()
    })
    .await
    .unwrap();
    api.list_mentions(&MentionQuery::default()).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[0].request_line,
        "GET /api/v1/mentions?sentiment=positive&limit=5 HTTP/1.1"
    );
    assert_eq!(seen[1].request_line, "GET /api/v1/mentions HTTP/1.1");
}

#[tokio::test]
async fn test_list_mentions_tolerates_loose_enrichment_fields() {
    let (base, _) = spawn_stub(vec![(
        200,
        r#"[{"id":"m1","matched_text":"churn","sentiment":"neutral","topics":["saas"]},
            {"id":"m2","matched_text":"churn","sentiment":"Positive","topics":["pricing",3,null,{"k":"v"}]},
            {"id":"m3","matched_text":"churn","sentiment":null,"topics":null}]"#,
    )])
    .await;

    let mentions = client(&base)
        .list_mentions(&MentionQuery::default())
        .await
        .unwrap();

    assert_eq!(mentions.len(), 3);
    assert_eq!(mentions[0].sentiment, Some(Sentiment::Neutral));
    assert_eq!(mentions[1].sentiment, Some(Sentiment::Unknown));
    assert_eq!(mentions[1].topics, Some(vec!["pricing".to_string()]));
    assert_eq!(mentions[2].sentiment, None);
    assert_eq!(mentions[2].topics, None);
}

#[tokio::test]
async fn test_identifiers_are_percent_encoded() {
    let (base, seen) = spawn_stub(vec![(204, "")]).await;

    client(&base).delete_keyword("a/b c").await.unwrap();

    assert_eq!(
        seen.lock().unwrap()[0].request_line,
        "DELETE /api/v1/keywords/a%2Fb%20c HTTP/1.1"
    );
}

#[tokio::test]
async fn test_empty_identifier_never_reaches_the_network() {
    let api = client("http://127.0.0.1:9");

    let err = api.get_episode("   ").await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidId { kind: "episode", .. }));
}

#[tokio::test]
async fn test_update_settings_puts_payload() {
    let (base, seen) = spawn_stub(vec![(
        200,
        r#"{"provider":"local","external_url":"https://stt.example.com","model":"base","has_external_api_key":false}"#,
    )])
    .await;

    let settings = client(&base)
        .update_transcription_settings(&TranscriptionSettingsUpdate {
            provider: models::TranscriptionProvider::Local,
            external_url: "https://stt.example.com".to_string(),
            model: "base".to_string(),
            external_api_key: None,
            clear_external_api_key: true,
        })
        .await
        .unwrap();

    assert!(!settings.has_external_api_key);
    let recorded = seen.lock().unwrap()[0].clone();
    assert_eq!(
        recorded.request_line,
        "PUT /api/v1/settings/transcription HTTP/1.1"
    );
    assert!(recorded.body.contains(r#""clear_external_api_key":true"#));
}

#[test]
fn test_base_url_with_trailing_slash() {
    let api = client("http://localhost:8000/");
    let url = api.endpoint(&["feeds"], &[]);
    assert_eq!(url.as_str(), "http://localhost:8000/api/v1/feeds");
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let err = ApiClient::new(GatewayOptions {
        base_url: "not a url".to_string(),
        timeout: DEFAULT_TIMEOUT,
    })
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidUrl(_)));
}
