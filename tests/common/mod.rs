#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use iptv_probe_lib::probe::{ClientOptions, ProbeRunner};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned answer for any request whose request line contains `matches`.
pub struct Route {
    pub matches: &'static str,
    pub response: Vec<u8>,
    pub delay: Option<Duration>,
}

impl Route {
    pub fn new(matches: &'static str, response: Vec<u8>) -> Self {
        Self { matches, response, delay: None }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub fn raw_response(status_line: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {}\r\n", status_line);
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", body.len()));
    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

pub fn json_response(body: &str) -> Vec<u8> {
    raw_response("200 OK", &[("Content-Type", "application/json")], body.as_bytes())
}

/// One-connection-at-a-time HTTP/1.1 stub on 127.0.0.1.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 2048];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            buf.extend_from_slice(&chunk[..n]);
                            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }

                let head = String::from_utf8_lossy(&buf).to_string();
                let request_line = head.lines().next().unwrap_or_default().to_string();
                log.lock().unwrap().push(head);

                let route = routes.iter().find(|r| request_line.contains(r.matches));
                if let Some(delay) = route.and_then(|r| r.delay) {
                    tokio::time::sleep(delay).await;
                }
                let response = match route {
                    Some(r) => r.response.clone(),
                    None => raw_response("404 Not Found", &[], b""),
                };
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Raw request heads seen so far, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn local_runner() -> ProbeRunner {
    ProbeRunner::new(ClientOptions {
        no_proxy: true,
        ..Default::default()
    })
    .unwrap()
}
