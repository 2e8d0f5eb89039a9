//! Local HTTP stand-in for upstream APIs in unit tests.

use std::io::Read;
use std::sync::mpsc;
use std::thread;

use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub user_agent: Option<String>,
    pub body: String,
}

/// Serves the canned `(status, body)` responses in order, one per request,
/// then stops listening.
pub(crate) struct MockServer {
    pub base_url: String,
    requests: mpsc::Receiver<RecordedRequest>,
}

impl MockServer {
    pub fn start(responses: Vec<(u16, String)>) -> Self {
        let server = Server::http("127.0.0.1:0").expect("bind mock server");
        let port = server
            .server_addr()
            .to_ip()
            .expect("mock server listens on ip")
            .port();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for (status, body) in responses {
                let mut request = match server.recv() {
                    Ok(request) => request,
                    Err(_) => return,
                };

                let mut content = String::new();
                let _ = request.as_reader().read_to_string(&mut content);
                let user_agent = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("User-Agent"))
                    .map(|h| h.value.as_str().to_string());

                let _ = tx.send(RecordedRequest {
                    method: request.method().as_str().to_string(),
                    url: request.url().to_string(),
                    user_agent,
                    body: content,
                });

                let header =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
                let _ = request.respond(
                    Response::from_string(body)
                        .with_status_code(status)
                        .with_header(header),
                );
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            requests: rx,
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.try_iter().collect()
    }
}
