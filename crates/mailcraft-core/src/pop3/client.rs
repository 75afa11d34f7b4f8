//! POP3 client
//!
//! Only the commands the receive loop needs: `USER`, `PASS`, `STAT`, `RETR`,
//! `DELE` and `QUIT`. Replies are read as bytes, so 8-bit message content
//! passes through untouched.

use mailcraft_common::config::Pop3ServerConfig;
use mailcraft_common::{Error, Result};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::mailbox::{normalize_retr_lines, trim_line_end, Mailbox, MailboxStat};

/// Connection to a POP3 server, plain or implicit TLS
pub enum Connection {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Connection::Plain(stream) => stream.read(buf),
            Connection::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Connection::Plain(stream) => stream.write(buf),
            Connection::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Connection::Plain(stream) => stream.flush(),
            Connection::Tls(stream) => stream.flush(),
        }
    }
}

/// Authenticated POP3 session over a TCP connection
///
/// The client is blocking; async callers run it on
/// `tokio::task::spawn_blocking`.
pub type Pop3Mailbox = Pop3Client<Connection>;

/// POP3 session over any byte stream
pub struct Pop3Client<S> {
    stream: BufReader<S>,
    host: String,
}

impl Pop3Mailbox {
    /// Connect, read the greeting and log in with `USER`/`PASS`
    pub fn connect(config: &Pop3ServerConfig) -> Result<Self> {
        info!("Connecting to POP3 server {}:{}", config.host, config.port);

        let timeout = Duration::from_secs(config.timeout_secs);
        let tcp = open_tcp(&config.host, config.port, timeout)?;

        let connection = if config.tls {
            Connection::Tls(Box::new(tls_stream(&config.host, tcp)?))
        } else {
            Connection::Plain(tcp)
        };

        let mut client = Pop3Client::new(connection, &config.host)?;
        client.login(&config.user, &config.password)?;

        Ok(client)
    }
}

fn open_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::Pop3(format!("Failed to resolve {}: {}", host, e)))?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            }
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(Error::Pop3(match last_error {
        Some(e) => format!("Failed to connect to {}:{}: {}", host, port, e),
        None => format!("No address found for {}", host),
    }))
}

fn tls_stream(host: &str, tcp: TcpStream) -> Result<StreamOwned<ClientConnection, TcpStream>> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let tls_config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| Error::Pop3(format!("Invalid TLS server name {}: {}", host, e)))?;

    let connection = ClientConnection::new(Arc::new(tls_config), server_name)
        .map_err(|e| Error::Pop3(format!("Failed to set up TLS: {}", e)))?;

    Ok(StreamOwned::new(connection, tcp))
}

impl<S: Read + Write> Pop3Client<S> {
    /// Start a session on an open stream by reading the server greeting
    pub fn new(stream: S, host: &str) -> Result<Self> {
        let mut client = Self {
            stream: BufReader::new(stream),
            host: host.to_string(),
        };

        let greeting = client.read_status("greeting")?;
        debug!("POP3 greeting: {}", greeting);

        Ok(client)
    }

    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        self.command(&format!("USER {}", user), "USER")?;
        self.send_line(&format!("PASS {}", password))?;
        self.read_status("PASS")
            .map_err(|_| Error::Pop3(format!("Login failed for {}", user)))?;

        info!(user = %user, "POP3 login succeeded");
        Ok(())
    }

    /// Send one command and read its single-line status reply
    fn command(&mut self, line: &str, verb: &str) -> Result<String> {
        debug!("POP3 send: {}", line);
        self.send_line(line)?;
        self.read_status(verb)
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\r\n")?;
        stream.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let read = self.stream.read_until(b'\n', &mut line)?;
        if read == 0 {
            return Err(Error::Pop3(format!("Connection closed by {}", self.host)));
        }
        Ok(line)
    }

    /// Read a status line; `-ERR` becomes an error carrying the reply text
    fn read_status(&mut self, verb: &str) -> Result<String> {
        let line = self.read_line()?;
        let text = String::from_utf8_lossy(&line)
            .trim_end_matches(['\r', '\n'])
            .to_string();

        if text.starts_with("+OK") {
            Ok(text)
        } else {
            warn!("POP3 {} rejected: {}", verb, text);
            Err(Error::Pop3(format!("{} failed: {}", verb, text)))
        }
    }

    /// Read the lines of a multi-line reply up to and including `.`
    fn read_multiline(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let last = trim_line_end(&line) == b".";
            lines.push(line);
            if last {
                return Ok(lines);
            }
        }
    }
}

impl<S: Read + Write> Mailbox for Pop3Client<S> {
    fn stat(&mut self) -> Result<MailboxStat> {
        let reply = self.command("STAT", "STAT")?;

        let mut fields = reply.split_whitespace().skip(1);
        let count = fields.next().and_then(|n| n.parse().ok());
        let size = fields.next().and_then(|n| n.parse().ok());

        match (count, size) {
            (Some(count), Some(size)) => {
                let stat = MailboxStat { count, size };
                debug!(count = stat.count, size = stat.size, "STAT");
                Ok(stat)
            }
            _ => Err(Error::Pop3(format!("Malformed STAT reply: {}", reply))),
        }
    }

    fn retrieve(&mut self, number: u32) -> Result<Vec<u8>> {
        let status = self.command(&format!("RETR {}", number), "RETR")?;

        let mut lines = vec![status.into_bytes()];
        lines.extend(self.read_multiline()?);

        let bytes = normalize_retr_lines(&lines);
        debug!(number, size = bytes.len(), "RETR");
        Ok(bytes)
    }

    fn delete(&mut self, number: u32) -> Result<String> {
        let reply = self.command(&format!("DELE {}", number), "DELE")?;
        debug!(number, "DELE");
        Ok(reply)
    }

    fn quit(&mut self) -> Result<()> {
        self.command("QUIT", "QUIT")?;
        info!("POP3 session closed for {}", self.host);
        Ok(())
    }
}
