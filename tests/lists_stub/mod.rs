use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Canned response matched by path plus query substrings. Requests must
/// carry `api-key=test-key` or the stub answers 401.
#[derive(Debug, Clone)]
pub struct ListsRoute {
    pub path: String,
    pub query_contains: Vec<String>,
    pub body: String,
}

impl ListsRoute {
    pub fn new(path: &str, query_contains: &[&str], body: &str) -> Self {
        Self {
            path: path.to_owned(),
            query_contains: query_contains.iter().map(|s| (*s).to_owned()).collect(),
            body: body.to_owned(),
        }
    }
}

pub struct ListsStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListsStub {
    /// `rate_limited_first` requests are answered 429 before normal serving
    /// begins.
    pub fn spawn(routes: Vec<ListsRoute>, rate_limited_first: usize) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start lists stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let requests: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let rate_limited = AtomicUsize::new(rate_limited_first);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_owned();
                recorded.lock().expect("record request").push(url.clone());

                if rate_limited
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                        left.checked_sub(1)
                    })
                    .is_ok()
                {
                    let _ = request.respond(
                        tiny_http::Response::from_string(
                            r#"{"fault": {"faultstring": "Rate limit quota violation"}}"#,
                        )
                        .with_status_code(429),
                    );
                    continue;
                }

                let (path, query) = match url.split_once('?') {
                    Some((path, query)) => (path, query),
                    None => (url.as_str(), ""),
                };

                if !query.split('&').any(|param| param == "api-key=test-key") {
                    let _ = request.respond(
                        tiny_http::Response::from_string(
                            r#"{"fault": {"faultstring": "Invalid ApiKey"}}"#,
                        )
                        .with_status_code(401),
                    );
                    continue;
                }

                let route = routes.iter().find(|route| {
                    route.path == path
                        && route
                            .query_contains
                            .iter()
                            .all(|needle| query.contains(needle.as_str()))
                });
                let response = match route {
                    Some(route) => {
                        tiny_http::Response::from_string(route.body.clone()).with_status_code(200)
                    }
                    None => tiny_http::Response::from_string("not found").with_status_code(404),
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

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("read recorded requests").len()
    }
}

impl Drop for ListsStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
