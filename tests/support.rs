use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// Idle keep-alive connections are dropped after this long.
const READ_TIMEOUT: Duration = Duration::from_secs(2);
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// How a test server treats the start of each connection.
#[derive(Clone, Copy)]
pub enum Mode {
    /// Plain HTTP origin.
    Origin,
    /// HTTP forward proxy; request lines must use absolute-form URLs.
    HttpProxy,
    /// SOCKS5 dialer that answers HTTP itself after the handshake.
    Socks5,
}

#[derive(Default)]
pub struct Counters {
    pub connections: AtomicU64,
    pub requests: AtomicU64,
    pub absolute_form: AtomicU64,
    pub socks_handshakes: AtomicU64,
}

pub struct ServerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
    pub counters: Arc<Counters>,
}

impl ServerHandle {
    pub fn connections(&self) -> u64 {
        self.counters.connections.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> u64 {
        self.counters.requests.load(Ordering::Relaxed)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawns a keep-alive HTTP server answering every request with `status`.
/// Returns `host:port` and the handle.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_server(mode: Mode, status: u16) -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let stop = Arc::new(AtomicBool::new(false));
    let counters = Arc::new(Counters::default());
    let thread_stop = Arc::clone(&stop);
    let thread_counters = Arc::clone(&counters);

    let handle = thread::spawn(move || {
        while !thread_stop.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, _)) => {
                    thread_counters.connections.fetch_add(1, Ordering::Relaxed);
                    let counters = Arc::clone(&thread_counters);
                    thread::spawn(move || handle_connection(stream, mode, status, &counters));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        addr.to_string(),
        ServerHandle {
            stop,
            thread: Some(handle),
            counters,
        },
    ))
}

/// A port with nothing listening on it.
///
/// # Errors
///
/// Returns an error if no ephemeral port can be reserved.
pub fn closed_port() -> Result<u16, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind probe failed: {}", err))?;
    let port = listener
        .local_addr()
        .map_err(|err| format!("probe addr failed: {}", err))?
        .port();
    drop(listener);
    Ok(port)
}

fn handle_connection(mut stream: TcpStream, mode: Mode, status: u16, counters: &Counters) {
    if stream.set_nonblocking(false).is_err() || stream.set_read_timeout(Some(READ_TIMEOUT)).is_err()
    {
        return;
    }
    if matches!(mode, Mode::Socks5) {
        if socks5_handshake(&mut stream).is_err() {
            return;
        }
        counters.socks_handshakes.fetch_add(1, Ordering::Relaxed);
    }

    let mut pending: Vec<u8> = Vec::new();
    loop {
        let Some(request_line) = read_request(&mut stream, &mut pending) else {
            return;
        };
        counters.requests.fetch_add(1, Ordering::Relaxed);
        if request_line
            .split(' ')
            .nth(1)
            .is_some_and(|target| target.starts_with("http://"))
        {
            counters.absolute_form.fetch_add(1, Ordering::Relaxed);
        }
        let head_only = request_line.starts_with("HEAD ");
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: 2\r\nConnection: keep-alive\r\n\r\n{}",
            status,
            reason(status),
            if head_only { "" } else { "OK" }
        );
        if stream.write_all(response.as_bytes()).is_err() || stream.flush().is_err() {
            return;
        }
    }
}

/// Reads one request (head plus `Content-Length` body) and returns its
/// request line. Bytes past the request stay in `pending`.
fn read_request(stream: &mut TcpStream, pending: &mut Vec<u8>) -> Option<String> {
    let mut buffer = [0_u8; 4096];
    let head_end = loop {
        if let Some(pos) = find(pending, b"\r\n\r\n") {
            break pos.checked_add(4)?;
        }
        let read = stream.read(&mut buffer).ok()?;
        if read == 0 {
            return None;
        }
        pending.extend_from_slice(buffer.get(..read)?);
    };

    let head = String::from_utf8_lossy(pending.get(..head_end)?).into_owned();
    let body_len = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let total = head_end.checked_add(body_len)?;
    while pending.len() < total {
        let read = stream.read(&mut buffer).ok()?;
        if read == 0 {
            return None;
        }
        pending.extend_from_slice(buffer.get(..read)?);
    }
    pending.drain(..total);
    head.lines().next().map(str::to_owned)
}

fn socks5_handshake(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut greeting = [0_u8; 2];
    stream.read_exact(&mut greeting)?;
    let [_version, method_count] = greeting;
    let mut methods = vec![0_u8; usize::from(method_count)];
    stream.read_exact(&mut methods)?;
    stream.write_all(&[5, 0])?;

    let mut request = [0_u8; 4];
    stream.read_exact(&mut request)?;
    let [_version, _command, _reserved, address_type] = request;
    let addr_len = match address_type {
        1 => 4,
        4 => 16,
        3 => {
            let mut len = [0_u8; 1];
            stream.read_exact(&mut len)?;
            let [len] = len;
            usize::from(len)
        }
        _ => return Err(std::io::Error::other("unknown SOCKS5 address type")),
    };
    let mut rest = vec![0_u8; addr_len.saturating_add(2)];
    stream.read_exact(&mut rest)?;
    stream.write_all(&[5, 0, 0, 1, 127, 0, 0, 1, 0, 0])?;
    stream.flush()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

const fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
