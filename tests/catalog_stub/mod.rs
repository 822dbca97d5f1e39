use std::io::Read as _;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Canned response for one method + path (query string ignored on match).
#[derive(Debug, Clone)]
pub struct StubRoute {
    pub method: &'static str,
    pub path: String,
    pub status: u16,
    pub body: String,
}

impl StubRoute {
    pub fn get(path: &str, status: u16, body: &str) -> Self {
        Self {
            method: "GET",
            path: path.to_owned(),
            status,
            body: body.to_owned(),
        }
    }

    pub fn put(path: &str, status: u16, body: &str) -> Self {
        Self {
            method: "PUT",
            path: path.to_owned(),
            status,
            body: body.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string, as received.
    pub url: String,
    pub body: String,
}

pub struct CatalogStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CatalogStub {
    pub fn spawn(routes: Vec<StubRoute>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start catalog stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
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

                let method = match request.method() {
                    tiny_http::Method::Get => "GET",
                    tiny_http::Method::Put => "PUT",
                    tiny_http::Method::Post => "POST",
                    _ => "OTHER",
                }
                .to_owned();
                let url = request.url().to_owned();
                let path = url.split('?').next().unwrap_or(&url).to_owned();

                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                recorded.lock().expect("record request").push(RecordedRequest {
                    method: method.clone(),
                    url: url.clone(),
                    body,
                });

                let route = routes
                    .iter()
                    .find(|route| route.method == method && route.path == path);
                let response = match route {
                    Some(route) => tiny_http::Response::from_string(route.body.clone())
                        .with_status_code(route.status),
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

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("read recorded requests").clone()
    }

    /// Requests for a method whose path (query stripped) matches exactly.
    pub fn recorded_for(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.recorded()
            .into_iter()
            .filter(|request| {
                request.method == method
                    && request.url.split('?').next().unwrap_or(&request.url) == path
            })
            .collect()
    }
}

impl Drop for CatalogStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
