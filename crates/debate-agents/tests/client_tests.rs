//! OpenRouterBackend against a local mock provider.

use std::sync::Arc;
use std::time::Duration;

use coordination::debate::{
    DebateConfig, DebateOrchestrator, ModelBackend, ModelError, ModelRequest, Phase, Role, Winner,
};
use debate_agents::{OpenRouterBackend, ProviderConfig, TemplateRenderer};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn provider(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        api_key: "sk-test-key".into(),
        base_url: server.uri(),
        timeout_secs: 5,
        ..Default::default()
    }
}

fn request() -> ModelRequest {
    ModelRequest {
        role: Role::Proponent,
        phase: Phase::Opening,
        round: 0,
        prompt: "Argue for tabs.".into(),
        model: "test/model".into(),
        temperature: 0.5,
        max_tokens: 64,
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "gen-1",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}}
        ]
    })
}

async fn invoke(server: &MockServer) -> Result<String, ModelError> {
    let backend = OpenRouterBackend::new(&provider(server)).unwrap();
    backend.invoke(&request()).await
}

#[tokio::test]
async fn test_successful_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test-key"))
        .and(header("x-title", "Multi-Agent Debate System"))
        .and(body_partial_json(json!({"model": "test/model", "max_tokens": 64})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Tabs win.")))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(invoke(&server).await.unwrap(), "Tabs win.");

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "Argue for tabs.");
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = invoke(&server).await.unwrap_err();
    assert!(matches!(
        err,
        ModelError::RateLimited {
            retry_after: Some(d)
        } if d == Duration::from_secs(7)
    ));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .mount(&server)
        .await;

    match invoke(&server).await {
        Err(ModelError::Transient(msg)) => {
            assert!(msg.contains("503"));
            assert!(msg.contains("upstream overloaded"));
        }
        other => panic!("expected transient error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_auth_failure_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    assert!(matches!(
        invoke(&server).await,
        Err(ModelError::Rejected(msg)) if msg.contains("401")
    ));
}

#[tokio::test]
async fn test_blank_content_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  \n ")))
        .mount(&server)
        .await;

    assert!(matches!(invoke(&server).await, Err(ModelError::EmptyResponse)));
}

#[tokio::test]
async fn test_missing_choices_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "gen-2"})))
        .mount(&server)
        .await;

    assert!(matches!(invoke(&server).await, Err(ModelError::Rejected(_))));
}

#[tokio::test]
async fn test_provider_error_object_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"error": {"message": "provider returned error", "code": 502}})),
        )
        .mount(&server)
        .await;

    assert!(matches!(
        invoke(&server).await,
        Err(ModelError::Transient(msg)) if msg.contains("provider returned error")
    ));
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let backend = OpenRouterBackend::new(&ProviderConfig {
        timeout_secs: 1,
        ..provider(&server)
    })
    .unwrap();
    assert!(matches!(
        backend.invoke(&request()).await,
        Err(ModelError::Timeout(_))
    ));
}

/// Answers as whichever persona the prompt addresses.
struct Personas;

impl Respond for Personas {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
        let content = if prompt.contains("**JUDGE**") {
            "## Scores\n| Logic | 9/10 | 5/10 | tighter |\n| Evidence | 8/10 | 6/10 | |\n\n\
             ## Verdict\n**WINNER: Proponent**\n**CONFIDENCE: High**\n\n\
             ## Reasoning\nThe proponent answered every attack.\n"
        } else if prompt.contains("**IN FAVOR**") {
            "## Main Argument\nTabs let each reader choose a width."
        } else {
            "## Counter-Argument\nSpaces render identically everywhere."
        };
        ResponseTemplate::new(200).set_body_json(completion(content))
    }
}

#[tokio::test]
async fn test_full_debate_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(Personas)
        .expect(7)
        .mount(&server)
        .await;

    let backend = OpenRouterBackend::new(&provider(&server)).unwrap();
    let config = DebateConfig {
        max_rounds: 1,
        ..Default::default()
    };
    let orchestrator =
        DebateOrchestrator::new(config, Arc::new(TemplateRenderer), Arc::new(backend)).unwrap();

    let outcome = orchestrator.run("Tabs beat spaces").await.unwrap();
    assert!(outcome.is_completed(), "{}", outcome.summary_line());

    let state = outcome.state();
    assert_eq!(state.history().len(), 7);
    assert_eq!(state.current_phase(), Phase::Done);

    let verdict = outcome.verdict().unwrap();
    assert_eq!(verdict.winner, Winner::Proponent);
    assert_eq!(verdict.scores.proponent, 17);
    assert_eq!(verdict.scores.opposition, 11);
    assert!(!verdict.degraded);

    // the opposition's first prompt quotes the proponent's opening
    let received = server.received_requests().await.unwrap();
    let second: serde_json::Value = serde_json::from_slice(&received[1].body).unwrap();
    let prompt = second["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("## Proponent's Last Argument"));
    assert!(prompt.contains("Tabs let each reader choose a width."));
}
