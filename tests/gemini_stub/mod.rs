use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value;

pub const MODEL: &str = "stub-model";
pub const API_KEY: &str = "stub-key";

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Reply {
    /// Returns the user prompt with every line prefixed by `EN:`.
    Translate,
    /// A candidate whose only part is a thought.
    ThoughtOnly,
    /// No candidates; the prompt was blocked.
    PromptBlocked(&'static str),
    /// Non-success status with a Gemini-style error body.
    Error(u16, &'static str),
}

pub struct GeminiStub {
    pub base_url: String,
    requests: Arc<AtomicUsize>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl GeminiStub {
    pub fn spawn(reply: Reply) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start gemini stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1beta");
        let expected_path = format!("/v1beta/models/{MODEL}:generateContent");

        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };
                counter.fetch_add(1, Ordering::SeqCst);

                if request.method() != &tiny_http::Method::Post || request.url() != expected_path {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let api_key = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("x-goog-api-key"))
                    .map(|h| h.value.as_str().to_owned());
                if api_key.as_deref() != Some(API_KEY) {
                    let _ = request.respond(json_response(
                        403,
                        serde_json::json!({ "error": { "code": 403, "message": "bad api key" } }),
                    ));
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }
                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };

                if let Err(problem) = check_request(&parsed) {
                    let _ = request.respond(
                        tiny_http::Response::from_string(problem).with_status_code(400),
                    );
                    continue;
                }

                let response = match &reply {
                    Reply::Translate => {
                        let prompt = parsed
                            .pointer("/contents/0/parts/0/text")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default();
                        let text = prompt
                            .lines()
                            .map(|line| format!("EN:{line}"))
                            .collect::<Vec<_>>()
                            .join("\n");
                        json_response(200, candidate(vec![serde_json::json!({ "text": text })]))
                    }
                    Reply::ThoughtOnly => json_response(
                        200,
                        candidate(vec![serde_json::json!({ "text": "hmm", "thought": true })]),
                    ),
                    Reply::PromptBlocked(reason) => json_response(
                        200,
                        serde_json::json!({ "promptFeedback": { "blockReason": reason } }),
                    ),
                    Reply::Error(status, message) => json_response(
                        *status,
                        serde_json::json!({ "error": { "code": status, "message": message } }),
                    ),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for GeminiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn check_request(parsed: &Value) -> Result<(), String> {
    let instructions = parsed
        .pointer("/systemInstruction/parts/0/text")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if instructions.trim().is_empty() {
        return Err("missing systemInstruction".to_owned());
    }

    let role = parsed
        .pointer("/contents/0/role")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if role != "user" {
        return Err(format!("unexpected contents role: {role:?}"));
    }

    let settings = parsed
        .get("safetySettings")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();
    if settings.is_empty()
        || settings
            .iter()
            .any(|s| s.get("threshold").and_then(|v| v.as_str()) != Some("BLOCK_NONE"))
    {
        return Err("safety settings must all be BLOCK_NONE".to_owned());
    }
    Ok(())
}

fn candidate(parts: Vec<Value>) -> Value {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP"
        }],
        "modelVersion": MODEL
    })
}

fn json_response(status: u16, body: Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    tiny_http::Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header)
}
