use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use http::StatusCode;
use refetch::prelude::{FetchClient, RetryPolicy, StoredRequest, SubRequestContext};

#[derive(Clone)]
struct ResponseSpec {
    status: u16,
    body: Vec<u8>,
}

impl ResponseSpec {
    fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|window| window == b"\r\n\r\n")
}

fn parse_content_length(raw_headers: &[u8]) -> usize {
    let text = String::from_utf8_lossy(raw_headers);
    for line in text.split("\r\n") {
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
            && let Ok(parsed) = value.trim().parse::<usize>()
        {
            return parsed;
        }
    }
    0
}

fn read_http_message(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;

    let mut raw = Vec::new();
    loop {
        let mut chunk = [0_u8; 1024];
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);

        if let Some(header_end) = find_header_end(&raw) {
            let content_length = parse_content_length(&raw[..header_end]);
            let expected_total = header_end + 4 + content_length;
            if raw.len() >= expected_total {
                break;
            }
        }
    }

    Ok(raw)
}

fn write_http_response(stream: &mut TcpStream, response: &ResponseSpec) -> std::io::Result<()> {
    let raw = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        status_text(response.status),
        response.body.len()
    );
    stream.write_all(raw.as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Serves one scripted response per connection, in order, then stops.
struct SequencedServer {
    authority: String,
    served: Arc<AtomicUsize>,
    join: Option<JoinHandle<()>>,
}

impl SequencedServer {
    fn start(responses: Vec<ResponseSpec>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind sequenced server");
        let authority = listener
            .local_addr()
            .expect("read local address")
            .to_string();
        listener
            .set_nonblocking(true)
            .expect("set listener nonblocking");

        let served = Arc::new(AtomicUsize::new(0));
        let served_clone = Arc::clone(&served);

        let join = thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(5);
            let mut remaining: VecDeque<ResponseSpec> = responses.into();

            while Instant::now() < deadline && !remaining.is_empty() {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let response = remaining.pop_front().expect("scripted response");
                        let _ = read_http_message(&mut stream);
                        let _ = write_http_response(&mut stream, &response);
                        served_clone.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(2));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            authority,
            served,
            join: Some(join),
        }
    }

    fn uri(&self, path: &str) -> String {
        format!("http://{}{}", self.authority, path)
    }

    fn finish(mut self) -> usize {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        self.served.load(Ordering::SeqCst)
    }
}

fn fast_retry_client(max_attempts: u32) -> FetchClient {
    FetchClient::builder()
        .client_name("integration")
        .retry_policy(
            RetryPolicy::standard()
                .max_attempts(max_attempts)
                .base_backoff(Duration::from_millis(10)),
        )
        .try_build()
        .expect("build client")
}

#[tokio::test]
async fn recovers_over_the_wire_after_a_transient_failure() {
    let server = SequencedServer::start(vec![
        ResponseSpec::new(503, "busy"),
        ResponseSpec::new(200, "recovered"),
    ]);
    let client = fast_retry_client(3);

    let request = StoredRequest::get(&server.uri("/v1/items")).expect("request uri");
    let mut call = SubRequestContext::new("acct-1", "req-1", request.clone());
    let response = client
        .execute(request, Some(&mut call))
        .await
        .expect("second attempt succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text_lossy(), "recovered");
    assert_eq!(
        call.response().expect("first attempt recorded").status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(call.retries().len(), 1);
    assert_eq!(server.finish(), 2);
}

#[tokio::test]
async fn single_success_reads_the_full_body() {
    let server = SequencedServer::start(vec![ResponseSpec::new(200, "hello world")]);
    let client = fast_retry_client(3);

    let request = StoredRequest::get(&server.uri("/greeting")).expect("request uri");
    let response = client
        .execute(request, None)
        .await
        .expect("single attempt succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text_lossy(), "hello world");
    assert_eq!(server.finish(), 1);
}

#[tokio::test]
async fn refused_connections_surface_as_a_transport_error_with_a_full_trail() {
    // Grab a free port, then close the listener so every connect is refused.
    let listener = TcpListener::bind("127.0.0.1:0").expect("reserve port");
    let authority = listener
        .local_addr()
        .expect("read local address")
        .to_string();
    drop(listener);

    let client = fast_retry_client(2);
    let request =
        StoredRequest::get(&format!("http://{authority}/v1/items")).expect("request uri");
    let mut call = SubRequestContext::new("acct-1", "req-1", request.clone());

    let error = client
        .execute(request, Some(&mut call))
        .await
        .expect_err("nothing is listening");

    assert_eq!(error.code(), refetch::FetchErrorCode::Transport);
    let first = call.response().expect("synthetic response recorded");
    assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(first.text_lossy().starts_with("transport error ("));
    assert_eq!(call.retries().len(), 1);
    assert!(call.error().is_some());
}
