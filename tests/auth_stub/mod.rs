use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

pub const GOOD_CODE: &str = "good-code";
pub const USED_CODE: &str = "used-code";

/// Local stand-in for the code exchange endpoint.
///
/// `GOOD_CODE` yields an identity, `USED_CODE` a 200 with `errorMessage`, and
/// anything else a 400.
pub struct AuthStub {
    pub endpoint: String,
    received: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AuthStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start auth stub server");
        let addr = server.server_addr();
        let endpoint = format!("http://{addr}/auth");

        let received = Arc::new(Mutex::new(Vec::new()));
        let seen = received.clone();
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

                if request.method() != &tiny_http::Method::Post || request.url() != "/auth" {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
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

                let code = serde_json::from_str::<Value>(&body)
                    .ok()
                    .and_then(|v| v.get("code").and_then(Value::as_str).map(str::to_owned))
                    .unwrap_or_default();
                seen.lock().expect("lock received codes").push(code.clone());

                let (status, payload) = match code.as_str() {
                    GOOD_CODE => (
                        200,
                        json!({"projectId": "proj_stub", "email": "ada@example.com", "name": "Ada"}),
                    ),
                    USED_CODE => (200, json!({"errorMessage": "code already used"})),
                    _ => (400, json!({"errorMessage": "invalid code"})),
                };

                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"application/json"[..],
                )
                .expect("content-type header");
                let _ = request.respond(
                    tiny_http::Response::from_string(payload.to_string())
                        .with_status_code(status)
                        .with_header(header),
                );
            }
        });

        Self {
            endpoint,
            received,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn received_codes(&self) -> Vec<String> {
        self.received.lock().expect("lock received codes").clone()
    }
}

impl Drop for AuthStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
