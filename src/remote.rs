use std::net::{SocketAddr, ToSocketAddrs};
use std::time::{Duration, Instant};

use suppaftp::list::File as ListFile;
use suppaftp::{FtpError, FtpStream, Status};
use tracing::{debug, warn};

use crate::error::ResolverError;

pub const DEFAULT_HOST: &str = "ftp.ncbi.nlm.nih.gov";
pub const DEFAULT_PORT: u16 = 21;
pub const ANONYMOUS: &str = "anonymous";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// One name from a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
}

impl ListingEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

pub trait ListingSession {
    fn list(&mut self, path: &str) -> Result<Vec<ListingEntry>, ResolverError>;
}

/// Opens one authenticated session per call. Sessions are never reused.
pub trait SessionProvider {
    type Session: ListingSession;

    fn open(&self) -> Result<Self::Session, ResolverError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub connect_timeout: Duration,
}

impl Default for FtpSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: ANONYMOUS.to_string(),
            password: ANONYMOUS.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FtpSessionProvider {
    settings: FtpSettings,
}

impl FtpSessionProvider {
    pub fn new(settings: FtpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FtpSettings {
        &self.settings
    }

    fn connect(&self) -> Result<FtpStream, ResolverError> {
        let host = format!("{}:{}", self.settings.host, self.settings.port);
        let addrs: Vec<SocketAddr> = (self.settings.host.as_str(), self.settings.port)
            .to_socket_addrs()
            .map_err(|err| ResolverError::FtpConnect {
                host: host.clone(),
                message: err.to_string(),
            })?
            .collect();

        dial_within(&addrs, self.settings.connect_timeout, |addr, budget| {
            FtpStream::connect_timeout(addr, budget).map_err(|err| err.to_string())
        })
        .map_err(|message| ResolverError::FtpConnect { host, message })
    }
}

/// Tries each address in turn with one shared deadline, so a host with many
/// unreachable addresses still gives up after `timeout`.
fn dial_within<T, D>(addrs: &[SocketAddr], timeout: Duration, mut dial: D) -> Result<T, String>
where
    D: FnMut(SocketAddr, Duration) -> Result<T, String>,
{
    let deadline = Instant::now() + timeout;
    let mut last_error = "no addresses resolved".to_string();
    for (idx, addr) in addrs.iter().enumerate() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!(skipped = addrs.len() - idx, "ftp dial deadline reached");
            break;
        }
        match dial(*addr, remaining) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                debug!(%addr, error = %err, "ftp dial failed");
                last_error = err;
            }
        }
    }
    Err(last_error)
}

impl SessionProvider for FtpSessionProvider {
    type Session = FtpSession;

    fn open(&self) -> Result<FtpSession, ResolverError> {
        // Wrap before login so a rejected login still sends QUIT on drop.
        let mut session = FtpSession {
            stream: Some(self.connect()?),
        };
        session.login(&self.settings.user, &self.settings.password)?;
        debug!(host = %self.settings.host, "ftp session opened");
        Ok(session)
    }
}

/// Live FTP control connection. Logs out when dropped.
pub struct FtpSession {
    stream: Option<FtpStream>,
}

impl FtpSession {
    fn login(&mut self, user: &str, password: &str) -> Result<(), ResolverError> {
        let stream = self.stream.as_mut().ok_or_else(|| ResolverError::FtpAuth {
            user: user.to_string(),
            message: "session already closed".to_string(),
        })?;
        stream
            .login(user, password)
            .map_err(|err| ResolverError::FtpAuth {
                user: user.to_string(),
                message: err.to_string(),
            })
    }
}

impl ListingSession for FtpSession {
    fn list(&mut self, path: &str) -> Result<Vec<ListingEntry>, ResolverError> {
        let stream = self.stream.as_mut().ok_or_else(|| ResolverError::FtpList {
            path: path.to_string(),
            message: "session already closed".to_string(),
        })?;
        let lines = stream
            .list(Some(path))
            .map_err(|err| classify_list_error(path, err))?;
        Ok(lines.iter().map(|line| parse_list_line(line)).collect())
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.quit() {
                warn!(error = %err, "ftp logout failed");
            }
        }
    }
}

fn classify_list_error(path: &str, err: FtpError) -> ResolverError {
    match err {
        FtpError::UnexpectedResponse(response)
            if matches!(response.status, Status::FileUnavailable) =>
        {
            ResolverError::RemotePathMissing(path.to_string())
        }
        other => ResolverError::FtpList {
            path: path.to_string(),
            message: other.to_string(),
        },
    }
}

/// Turns one raw LIST line into an entry. Unix and DOS listings are parsed;
/// anything else falls back to the last whitespace-separated token.
pub fn parse_list_line(line: &str) -> ListingEntry {
    match line.parse::<ListFile>() {
        Ok(file) => ListingEntry::new(file.name()),
        Err(_) => ListingEntry::new(line.split_whitespace().last().unwrap_or_default()),
    }
}
