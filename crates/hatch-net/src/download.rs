//! File download with a running byte counter.
//!
//! A [`Download`] tracks how many bytes have arrived and how many were
//! announced. Progress and the terminal events are delivered to a
//! [`DownloadObserver`]; every transfer ends with exactly one of
//! `on_end`/`on_error`, followed by `on_close`.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use hatch_types::error::{HatchError, Result};

use crate::http::{self, HttpOptions};
use crate::tls::TlsProvider;
use crate::url::Url;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Read buffer size for body streaming.
const CHUNK_SIZE: usize = 16 * 1024;

/// Unit chosen by [`Download::downloaded_in_auto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteUnit {
    Bits,
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
}

impl fmt::Display for ByteUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bits => "bits",
            Self::Bytes => "B",
            Self::Kilobytes => "KB",
            Self::Megabytes => "MB",
            Self::Gigabytes => "GB",
        };
        f.write_str(s)
    }
}

/// Receives transfer events. All hooks are optional.
pub trait DownloadObserver {
    /// A chunk arrived; the counter already includes it.
    fn on_data(&mut self, _chunk: &[u8], _download: &Download) {}

    /// The body was received completely.
    fn on_end(&mut self, _download: &Download) {}

    /// The transfer is over, successfully or not.
    fn on_close(&mut self, _download: &Download) {}

    fn on_error(&mut self, error: &HatchError) {
        log::error!("{error}");
    }
}

/// Observer that only keeps the default hooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DownloadObserver for NoopObserver {}

/// A single file fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    url: String,
    dest: Option<PathBuf>,
    downloaded_bytes: u64,
    total_bytes: Option<u64>,
}

impl Download {
    pub fn new(url: impl Into<String>, dest: Option<PathBuf>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(HatchError::Download("URL is not defined".to_string()));
        }
        Ok(Self {
            url,
            dest,
            downloaded_bytes: 0,
            total_bytes: None,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn dest(&self) -> Option<&Path> {
        self.dest.as_deref()
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes
    }

    /// Size announced by the server (`Content-Length`), if any.
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    /// Last path segment of the URL, usable as a local file name.
    pub fn suggested_file_name(&self) -> Option<String> {
        let url = Url::parse(&self.url).ok()?;
        url.file_name().map(str::to_string)
    }

    /// Replace the destination path.
    pub fn set_dest(&mut self, dest: Option<PathBuf>) -> &mut Self {
        self.dest = dest;
        self
    }

    pub fn set_downloaded_bytes(&mut self, value: u64) -> &mut Self {
        self.downloaded_bytes = value;
        self
    }

    pub fn add_downloaded_bytes(&mut self, value: u64) -> &mut Self {
        self.downloaded_bytes = self.downloaded_bytes.saturating_add(value);
        self
    }

    pub fn downloaded_in_bits(&self) -> f64 {
        self.downloaded_bytes as f64 * 8.0
    }

    pub fn downloaded_in_kilobytes(&self) -> f64 {
        self.downloaded_bytes as f64 / KIB as f64
    }

    pub fn downloaded_in_megabytes(&self) -> f64 {
        self.downloaded_bytes as f64 / MIB as f64
    }

    pub fn downloaded_in_gigabytes(&self) -> f64 {
        self.downloaded_bytes as f64 / GIB as f64
    }

    /// Counter scaled to the largest unit it exceeds.
    ///
    /// Counts below 8 bytes are reported in bits.
    pub fn downloaded_in_auto(&self) -> (f64, ByteUnit) {
        let bytes = self.downloaded_bytes;
        if bytes > GIB {
            (self.downloaded_in_gigabytes(), ByteUnit::Gigabytes)
        } else if bytes > MIB {
            (self.downloaded_in_megabytes(), ByteUnit::Megabytes)
        } else if bytes > KIB {
            (self.downloaded_in_kilobytes(), ByteUnit::Kilobytes)
        } else if bytes < 8 {
            (self.downloaded_in_bits(), ByteUnit::Bits)
        } else {
            (bytes as f64, ByteUnit::Bytes)
        }
    }

    /// Percent of the announced size received so far.
    pub fn download_percent(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => Some(100.0 * self.downloaded_bytes as f64 / total as f64),
            _ => None,
        }
    }

    /// Fetch the URL, streaming the body to the destination if one is set.
    ///
    /// Errors are reported to `observer` and also returned.
    pub fn start(
        &mut self,
        observer: &mut dyn DownloadObserver,
        tls: Option<&dyn TlsProvider>,
        options: &HttpOptions,
    ) -> Result<()> {
        let response = Url::parse(&self.url).and_then(|url| http::get(&url, tls, options));
        let (_, head, body) = match response {
            Ok(response) => response,
            Err(e) => {
                observer.on_error(&e);
                observer.on_close(self);
                return Err(e);
            },
        };

        self.total_bytes = head.content_length();
        log::info!("Downloading...");

        let mut file = match self.dest {
            Some(ref path) => match File::create(path) {
                Ok(f) => Some(BufWriter::new(f)),
                Err(e) => {
                    log::warn!("Cannot write {}: {e}", path.display());
                    None
                },
            },
            None => {
                log::info!("No destination specified.");
                None
            },
        };

        self.receive(body, file.as_mut().map(|f| f as &mut dyn Write), observer)
    }

    /// Pump `body` through the counter, copying into `sink` when given.
    ///
    /// A failing sink is dropped with a warning; the transfer goes on.
    pub fn receive(
        &mut self,
        mut body: impl Read,
        mut sink: Option<&mut dyn Write>,
        observer: &mut dyn DownloadObserver,
    ) -> Result<()> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let err = HatchError::Download(format!("{}: {e}", self.url));
                    observer.on_error(&err);
                    observer.on_close(self);
                    return Err(err);
                },
            };
            let chunk = &buf[..n];
            self.add_downloaded_bytes(n as u64);
            observer.on_data(chunk, self);

            let failed = match sink {
                Some(ref mut writer) => writer.write_all(chunk).err(),
                None => None,
            };
            if let Some(e) = failed {
                log::warn!("Destination write failed, discarding output: {e}");
                sink = None;
            }
        }

        if let Some(writer) = sink {
            if let Err(e) = writer.flush() {
                log::warn!("Destination flush failed: {e}");
            }
        }

        observer.on_end(self);
        observer.on_close(self);
        Ok(())
    }
}
