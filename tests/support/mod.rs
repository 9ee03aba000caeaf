//! A scripted HTTP/1.1 server for integration tests.
//!
//! Every connection serves exactly one request and is closed afterwards.

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub fn run_async<T>(f: impl std::future::Future<Output = T>) -> T {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

#[derive(Clone, Debug)]
pub struct Route {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Send the body without `Content-Length`, delimited by connection close.
    pub omit_length: bool,
    /// Declare this `Content-Length`, send `body`, then hold the connection open.
    pub stall_length: Option<usize>,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
            omit_length: false,
            stall_length: None,
        }
    }

    /// Sends `partial` of a `declared_length`-byte body and never finishes.
    pub fn stalled(partial: impl Into<Vec<u8>>, declared_length: usize) -> Self {
        Self {
            stall_length: Some(declared_length),
            ..Self::ok(partial)
        }
    }

    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            ..Self::ok(body)
        }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self {
            status,
            headers: vec![("Location".to_string(), location.to_string())],
            body: b"<html>moved</html>".to_vec(),
            omit_length: false,
            stall_length: None,
        }
    }

    pub fn without_length(mut self) -> Self {
        self.omit_length = true;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Request {
    pub path: String,
    pub headers: HashMap<String, String>,
}

pub struct TestServer {
    pub addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<Request>>>,
    drop_next: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::default();
        let requests: Arc<Mutex<Vec<Request>>> = Arc::default();
        let drop_next: Arc<AtomicUsize> = Arc::default();

        let task = {
            let routes = routes.clone();
            let requests = requests.clone();
            let drop_next = drop_next.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    let routes = routes.clone();
                    let requests = requests.clone();
                    let drop_next = drop_next.clone();
                    tokio::spawn(async move {
                        serve_one(stream, routes, requests, drop_next).await;
                    });
                }
            })
        };

        Self {
            addr,
            routes,
            requests,
            drop_next,
            task,
        }
    }

    /// Returns `http://127.0.0.1:PORT{path}`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn route(&self, path: &str, route: Route) {
        self.routes.lock().unwrap().insert(path.to_string(), route);
    }

    /// Serves a directory listing page containing `entries` (plus `../`).
    pub fn listing(&self, path: &str, entries: &[&str]) {
        self.route(path, Route::ok(listing_html(entries)));
    }

    /// Closes the next `count` connections right after reading the request,
    /// without sending a response.
    pub fn drop_next_connections(&self, count: usize) {
        self.drop_next.store(count, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }
}

pub fn listing_html(entries: &[&str]) -> String {
    let mut html = String::from(
        "<html><head><title>repo - Revision 7: /</title></head>\n<body>\n <h2>repo - Revision 7: /</h2>\n <ul>\n  <li><a href=\"../\">..</a></li>\n",
    );
    for entry in entries {
        html.push_str(&format!("  <li><a href=\"{entry}\">{entry}</a></li>\n"));
    }
    html.push_str(" </ul>\n <hr noshade><em>Powered by Apache Subversion</em>\n</body></html>\n");
    html
}

async fn serve_one(
    mut stream: TcpStream,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<Request>>>,
    drop_next: Arc<AtomicUsize>,
) {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte).await {
            Ok(0) | Err(_) => return,
            Ok(_) => head.push(byte[0]),
        }
    }

    let head = String::from_utf8_lossy(&head).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    requests.lock().unwrap().push(Request {
        path: path.clone(),
        headers,
    });

    let dropped = drop_next
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if dropped {
        return;
    }

    let route = routes
        .lock()
        .unwrap()
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Route::status(404, "not found"));

    let mut out = format!("HTTP/1.1 {} {}\r\n", route.status, reason(route.status));
    for (name, value) in &route.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    if let Some(declared) = route.stall_length {
        out.push_str(&format!("Content-Length: {declared}\r\n"));
    } else if !route.omit_length {
        out.push_str(&format!("Content-Length: {}\r\n", route.body.len()));
    }
    out.push_str("Connection: close\r\n\r\n");

    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(&route.body);
    let _ = stream.write_all(&bytes).await;
    let _ = stream.flush().await;
    if route.stall_length.is_some() {
        std::future::pending::<()>().await;
    }
    let _ = stream.shutdown().await;
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        307 => "Temporary Redirect",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
