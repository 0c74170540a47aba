//! Minimal streaming HTTP/1.1 GET client.
//!
//! Plain HTTP runs over `std::net::TcpStream`; HTTPS needs a
//! [`TlsProvider`]. Unlike a buffered client the body is never collected:
//! [`get`] returns the response head plus a [`Body`] reader that decodes
//! `Content-Length`, chunked, and read-until-close framing incrementally.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use hatch_types::config::DownloadConfig;
use hatch_types::error::{HatchError, Result};

use crate::tls::{TlsProvider, Transport};
use crate::url::Url;

/// Upper bound on the status line plus headers.
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Connection settings for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_redirects: u8,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self::from(&DownloadConfig::default())
    }
}

impl From<&DownloadConfig> for HttpOptions {
    fn from(cfg: &DownloadConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            read_timeout: Duration::from_secs(cfg.read_timeout_secs),
            max_redirects: cfg.max_redirects,
            user_agent: cfg.user_agent.clone(),
        }
    }
}

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// HTTP status code (e.g. 200, 404).
    pub status_code: u16,
    pub reason: String,
    /// Headers as (lower-cased name, value) pairs.
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Declared body length, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.parse().ok()
    }

    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding")
            .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Whether this is a redirect we follow.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status_code, 301 | 302 | 303 | 307 | 308)
    }
}

/// Body framing, decided from the response head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Exactly this many bytes remain.
    Length(u64),
    /// Chunked transfer coding; bytes left in the current chunk.
    Chunked { remaining: u64, done: bool },
    /// Everything until the peer closes.
    UntilClose,
}

/// Streaming response body.
pub struct Body<R> {
    inner: R,
    framing: Framing,
}

impl<R: BufRead> Body<R> {
    /// Wrap the stream positioned just after the response head.
    pub fn new(inner: R, head: &ResponseHead) -> Self {
        let framing = if head.is_chunked() {
            Framing::Chunked {
                remaining: 0,
                done: false,
            }
        } else if let Some(len) = head.content_length() {
            Framing::Length(len)
        } else {
            Framing::UntilClose
        };
        Self { inner, framing }
    }
}

impl<R: BufRead> Read for Body<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Self { inner, framing } = self;
        match framing {
            Framing::UntilClose => inner.read(buf),
            Framing::Length(remaining) => {
                if *remaining == 0 {
                    return Ok(0);
                }
                let n = read_bounded(inner, buf, *remaining)?;
                *remaining -= n as u64;
                Ok(n)
            },
            Framing::Chunked { remaining, done } => {
                if *done {
                    return Ok(0);
                }
                if *remaining == 0 {
                    let size = read_chunk_size(inner)?;
                    if size == 0 {
                        skip_trailers(inner)?;
                        *done = true;
                        return Ok(0);
                    }
                    *remaining = size;
                }
                let n = read_bounded(inner, buf, *remaining)?;
                *remaining -= n as u64;
                if *remaining == 0 {
                    expect_crlf(inner)?;
                }
                Ok(n)
            },
        }
    }
}

/// Read at most `limit` bytes; EOF before the limit is an error.
fn read_bounded(inner: &mut impl Read, buf: &mut [u8], limit: u64) -> io::Result<usize> {
    let max = buf.len().min(usize::try_from(limit).unwrap_or(usize::MAX));
    let n = inner.read(&mut buf[..max])?;
    if n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before end of body",
        ));
    }
    Ok(n)
}

fn read_chunk_size(inner: &mut impl BufRead) -> io::Result<u64> {
    let line = read_line(inner)?;
    // Strip optional chunk extensions (after `;`).
    let size = line.split(';').next().unwrap_or("").trim();
    u64::from_str_radix(size, 16)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, format!("bad chunk size: {size:?}")))
}

fn expect_crlf(inner: &mut impl BufRead) -> io::Result<()> {
    let line = read_line(inner)?;
    if !line.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "missing CRLF after chunk data",
        ));
    }
    Ok(())
}

fn skip_trailers(inner: &mut impl BufRead) -> io::Result<()> {
    loop {
        let line = read_line(inner)?;
        if line.is_empty() {
            return Ok(());
        }
    }
}

/// Read one CRLF- (or LF-) terminated line without its terminator.
fn read_line(inner: &mut impl BufRead) -> io::Result<String> {
    let mut raw = Vec::new();
    let n = inner.take(MAX_HEAD_SIZE as u64).read_until(b'\n', &mut raw)?;
    if n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed mid-line",
        ));
    }
    while matches!(raw.last(), Some(b'\n' | b'\r')) {
        raw.pop();
    }
    String::from_utf8(raw).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "non-UTF-8 line"))
}

/// Read and parse the status line and headers.
pub fn read_head(inner: &mut impl BufRead) -> Result<ResponseHead> {
    let status_line = read_line(inner).map_err(|e| HatchError::Network(format!("read status: {e}")))?;
    let (status_code, reason) = parse_status_line(&status_line)?;

    let mut headers = Vec::new();
    let mut total = status_line.len();
    loop {
        let line = read_line(inner).map_err(|e| HatchError::Network(format!("read headers: {e}")))?;
        if line.is_empty() {
            break;
        }
        total += line.len();
        if total > MAX_HEAD_SIZE {
            return Err(HatchError::Network("response head too large".to_string()));
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }

    Ok(ResponseHead {
        status_code,
        reason,
        headers,
    })
}

/// Parse `HTTP/1.x NNN reason`.
fn parse_status_line(line: &str) -> Result<(u16, String)> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        return Err(HatchError::Network(format!("bad status line: {line}")));
    }
    let code = parts
        .next()
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| HatchError::Network(format!("bad status code in: {line}")))?;
    Ok((code, parts.next().unwrap_or("").to_string()))
}

/// Perform a GET, following redirects, and return the final head and body.
///
/// A non-2xx final status is an error. HTTPS URLs need `tls`.
pub fn get(
    url: &Url,
    tls: Option<&dyn TlsProvider>,
    options: &HttpOptions,
) -> Result<(Url, ResponseHead, Body<BufReader<Box<dyn Transport>>>)> {
    let mut current = url.clone();
    for _ in 0..=options.max_redirects {
        let mut reader = BufReader::new(connect(&current, tls, options)?);
        send_request(reader.get_mut(), &current, options)?;
        let head = read_head(&mut reader)?;

        if head.is_redirect() {
            if let Some(location) = head.header("location") {
                let next = current.resolve(location)?;
                log::debug!("{} redirected to {next}", head.status_code);
                current = next;
                continue;
            }
        }
        if !head.is_success() {
            return Err(HatchError::Network(format!(
                "HTTP {} {}",
                head.status_code, head.reason
            )));
        }

        let body = Body::new(reader, &head);
        return Ok((current, head, body));
    }

    Err(HatchError::Network("too many redirects".to_string()))
}

/// Open a transport to the URL's host, upgrading to TLS for https.
fn connect(
    url: &Url,
    tls: Option<&dyn TlsProvider>,
    options: &HttpOptions,
) -> Result<Box<dyn Transport>> {
    let stream = tcp_connect(&url.host, url.effective_port(), options)?;
    if url.is_https() {
        let provider = tls.ok_or_else(|| {
            HatchError::Network(format!("HTTPS not available for {url}: built without TLS"))
        })?;
        return provider.connect_tls(stream, &url.host);
    }
    Ok(Box::new(stream))
}

/// Open a TCP connection with connect and read timeouts.
fn tcp_connect(host: &str, port: u16, options: &HttpOptions) -> Result<TcpStream> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| HatchError::Network(format!("DNS resolution failed: {e}")))?
        .next()
        .ok_or_else(|| HatchError::Network(format!("no addresses for {host}:{port}")))?;

    let stream = TcpStream::connect_timeout(&addr, options.connect_timeout)
        .map_err(|e| HatchError::Network(format!("TCP connect failed: {e}")))?;

    stream
        .set_read_timeout(Some(options.read_timeout))
        .map_err(|e| HatchError::Network(format!("set read timeout: {e}")))?;

    Ok(stream)
}

/// Send an HTTP/1.1 GET request.
fn send_request(stream: &mut impl Write, url: &Url, options: &HttpOptions) -> Result<()> {
    let request = format!(
        "GET {target} HTTP/1.1\r\n\
         Host: {host}\r\n\
         User-Agent: {agent}\r\n\
         Accept: */*\r\n\
         Accept-Encoding: identity\r\n\
         Connection: close\r\n\
         \r\n",
        target = url.request_target(),
        host = url.host_header(),
        agent = options.user_agent,
    );

    stream
        .write_all(request.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| HatchError::Network(format!("send request: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn head_and_body(raw: &[u8]) -> (ResponseHead, Body<Cursor<Vec<u8>>>) {
        let mut cursor = Cursor::new(raw.to_vec());
        let head = read_head(&mut cursor).unwrap();
        let body = Body::new(cursor, &head);
        (head, body)
    }

    fn read_all(body: &mut impl Read) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        body.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn parse_simple_response() {
        let (head, mut body) = head_and_body(
            b"HTTP/1.1 200 OK\r\n\
              Content-Type: text/plain\r\n\
              Content-Length: 5\r\n\
              \r\n\
              helloEXTRA",
        );
        assert_eq!(head.status_code, 200);
        assert_eq!(head.reason, "OK");
        assert_eq!(head.header("Content-Type"), Some("text/plain"));
        assert_eq!(head.content_length(), Some(5));
        assert!(head.is_success());
        // Body stops at Content-Length.
        assert_eq!(read_all(&mut body).unwrap(), b"hello");
    }

    #[test]
    fn body_until_close_without_length() {
        let (head, mut body) = head_and_body(b"HTTP/1.0 200 OK\r\n\r\nall of it");
        assert_eq!(head.content_length(), None);
        assert_eq!(read_all(&mut body).unwrap(), b"all of it");
    }

    #[test]
    fn truncated_length_body_is_error() {
        let (_, mut body) = head_and_body(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort");
        let err = read_all(&mut body).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn chunked_body_is_decoded() {
        let (head, mut body) = head_and_body(
            b"HTTP/1.1 200 OK\r\n\
              Transfer-Encoding: chunked\r\n\
              \r\n\
              5\r\nhello\r\n\
              7;ext=1\r\n, world\r\n\
              0\r\n\
              X-Trailer: yes\r\n\
              \r\n",
        );
        assert!(head.is_chunked());
        assert_eq!(read_all(&mut body).unwrap(), b"hello, world");
    }

    #[test]
    fn chunked_body_small_reads() {
        let (_, mut body) = head_and_body(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\na\r\n0123456789\r\n0\r\n\r\n",
        );
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = body.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"0123456789");
    }

    #[test]
    fn chunked_bad_size_is_error() {
        let (_, mut body) =
            head_and_body(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n");
        let err = read_all(&mut body).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn chunked_partial_is_error() {
        let (_, mut body) =
            head_and_body(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n10\r\nabc");
        assert!(read_all(&mut body).is_err());
    }

    #[test]
    fn chunked_takes_precedence_over_length() {
        let (_, mut body) = head_and_body(
            b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nok\r\n0\r\n\r\n",
        );
        assert_eq!(read_all(&mut body).unwrap(), b"ok");
    }

    #[test]
    fn bad_status_line() {
        let mut cursor = Cursor::new(b"garbage\r\n\r\n".to_vec());
        assert!(read_head(&mut cursor).is_err());
        let mut cursor = Cursor::new(b"HTTP/1.1 abc OK\r\n\r\n".to_vec());
        assert!(read_head(&mut cursor).is_err());
    }

    #[test]
    fn truncated_head_is_error() {
        let mut cursor = Cursor::new(b"HTTP/1.1 200 OK\r\nContent-Le".to_vec());
        assert!(read_head(&mut cursor).is_err());
    }

    #[test]
    fn redirect_statuses() {
        for code in [301, 302, 303, 307, 308] {
            let head = ResponseHead {
                status_code: code,
                reason: String::new(),
                headers: Vec::new(),
            };
            assert!(head.is_redirect(), "{code} should redirect");
            assert!(!head.is_success());
        }
    }

    #[test]
    fn request_format() {
        let url = Url::parse("http://example.com:8080/a?b=c").unwrap();
        let options = HttpOptions::default();
        let mut out = Vec::new();
        send_request(&mut out, &url, &options).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("GET /a?b=c HTTP/1.1\r\n"));
        assert!(text.contains("Host: example.com:8080\r\n"));
        assert!(text.contains(&format!("User-Agent: {}\r\n", options.user_agent)));
        assert!(text.ends_with("Connection: close\r\n\r\n"));
    }

    #[test]
    fn options_from_config() {
        let cfg = DownloadConfig {
            connect_timeout_secs: 3,
            read_timeout_secs: 4,
            max_redirects: 1,
            ..DownloadConfig::default()
        };
        let options = HttpOptions::from(&cfg);
        assert_eq!(options.connect_timeout, Duration::from_secs(3));
        assert_eq!(options.read_timeout, Duration::from_secs(4));
        assert_eq!(options.max_redirects, 1);
    }

    #[test]
    fn https_without_tls_is_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = Url::parse(&format!("https://127.0.0.1:{port}/")).unwrap();
        let err = get(&url, None, &HttpOptions::default()).err().unwrap();
        assert!(format!("{err}").contains("built without TLS"));
    }
}
