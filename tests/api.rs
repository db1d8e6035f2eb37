//! The extraction proxy router, driven over real HTTP with a canned vision
//! model in place of the provider.

use edgequake_pdf2quiz::api::{router, ApiContext};
use edgequake_pdf2quiz::pipeline::encode::PageImage;
use edgequake_pdf2quiz::upstream::{UpstreamError, VisionModel};
use edgequake_pdf2quiz::{CatalogClient, HttpExtractionClient, PageError, QuestionExtractor};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Replies depend on the requested model id.
#[derive(Default)]
struct CannedModel {
    seen_models: Mutex<Vec<String>>,
}

impl VisionModel for CannedModel {
    fn complete<'a>(
        &'a self,
        model: &'a str,
        prompt: &'a str,
        _image_base64: &'a str,
    ) -> BoxFuture<'a, Result<String, UpstreamError>> {
        Box::pin(async move {
            self.seen_models.lock().unwrap().push(model.to_string());
            assert!(prompt.starts_with("Extract all questions"));
            match model {
                "test/broken" => Err(UpstreamError::Api("429 Too Many Requests".into())),
                "test/prose" => Ok("I'm sorry, I can't read this page.".into()),
                "test/none" => Ok("[]".into()),
                _ => Ok(concat!(
                    "```json\n",
                    r#"[{"type":"mcq","question":"2+2=?","choices":["A) 3","B) 4"],"correctAnswer":"B","explanation":null},"#,
                    r#"{"type":"other","question":"Explain addition.","explanation":"Counting on."}]"#,
                    "\n```"
                )
                .into()),
            }
        })
    }
}

async fn start(model: Arc<CannedModel>) -> String {
    let ctx = ApiContext::new(
        model,
        CatalogClient::new("http://127.0.0.1:1/api/v1/models"),
        edgequake_pdf2quiz::prompts::EXTRACTION_PROMPT,
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(ctx)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/extract-questions"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

fn page(n: usize) -> PageImage {
    PageImage {
        page_num: n,
        image_base64: "iVBORw0KGgo=".into(),
        width: 1,
        height: 1,
    }
}

#[tokio::test]
async fn fenced_reply_is_parsed_and_default_model_applied() {
    let model = Arc::new(CannedModel::default());
    let base = start(Arc::clone(&model)).await;

    let (status, body) = post(&base, json!({"pageImageBase64": "iVBORw0KGgo=", "pageNumber": 1})).await;

    assert_eq!(status, 200);
    let qs = body["questions"].as_array().unwrap();
    assert_eq!(qs.len(), 2);
    assert_eq!(qs[0]["type"], "mcq");
    assert_eq!(qs[0]["correctAnswer"], "B");
    assert_eq!(qs[1]["type"], "other");
    assert!(body.get("unparsed").is_none());
    assert_eq!(model.seen_models.lock().unwrap().as_slice(), ["openai/gpt-4o"]);
}

#[tokio::test]
async fn empty_image_is_rejected() {
    let base = start(Arc::new(CannedModel::default())).await;
    let (status, body) = post(&base, json!({"pageImageBase64": "", "model": "openai/gpt-4o"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["questions"], json!([]));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_body_is_rejected_with_error_shape() {
    let base = start(Arc::new(CannedModel::default())).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/extract-questions"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["questions"], json!([]));
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let base = start(Arc::new(CannedModel::default())).await;
    let (status, body) = post(&base, json!({"pageImageBase64": "abc", "model": "test/broken"})).await;
    assert_eq!(status, 502);
    assert_eq!(body["questions"], json!([]));
    assert!(body["error"].as_str().unwrap().contains("429"));
}

#[tokio::test]
async fn undecodable_reply_carries_excerpt() {
    let base = start(Arc::new(CannedModel::default())).await;
    let (status, body) = post(&base, json!({"pageImageBase64": "abc", "model": "test/prose"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["questions"], json!([]));
    assert_eq!(body["unparsed"], "I'm sorry, I can't read this page.");
}

#[tokio::test]
async fn client_maps_replies_to_page_results() {
    let base = start(Arc::new(CannedModel::default())).await;
    let client = HttpExtractionClient::new(&base, Some(10)).unwrap();

    let ok = client.extract(page(1), "openai/gpt-4o").await;
    assert!(ok.error.is_none());
    assert_eq!(ok.questions.len(), 2);
    assert_eq!(ok.mcq_count(), 1);

    let none = client.extract(page(2), "test/none").await;
    assert!(none.error.is_none());
    assert!(none.questions.is_empty());

    let prose = client.extract(page(3), "test/prose").await;
    assert!(matches!(prose.error, Some(PageError::ParseFailed { page: 3, .. })));
    assert!(prose.questions.is_empty());

    let broken = client.extract(page(4), "test/broken").await;
    assert!(matches!(broken.error, Some(PageError::RequestFailed { page: 4, .. })));
}

#[tokio::test]
async fn models_fall_back_when_catalog_is_unreachable() {
    let base = start(Arc::new(CannedModel::default())).await;
    let body: Value = reqwest::get(format!("{base}/api/models"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let models = body["models"].as_array().unwrap();
    assert_eq!(models.len(), 4);
    assert!(models.iter().all(|m| m["pricing"]["prompt"].is_number()));

    let via_client = CatalogClient::proxy(&base).list_models().await;
    assert_eq!(via_client.len(), 4);
}

#[tokio::test]
async fn health_reports_version() {
    let base = start(Arc::new(CannedModel::default())).await;
    let body: Value = reqwest::get(format!("{base}/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
