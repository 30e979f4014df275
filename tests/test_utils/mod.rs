//! Test utilities shared by the integration tests
//!
//! Builds shells rooted in temporary home directories, with scripted
//! input and captured output.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::path::Path;
use std::rc::Rc;

use morpheus_cli::config::remotes::RemoteEntry;
use morpheus_cli::shell::{LineReader, ScriptedReader};
use morpheus_cli::{CommandRegistry, RuntimeSettings, SessionContext, Shell, ShellIo};
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Output sink whose contents stay readable after it is boxed
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Empty home directory
pub fn empty_home() -> TempDir {
    TempDir::new().expect("create temp home")
}

/// Home directory with an active remote `local` at `https://appliance.test`
pub fn home_with_remote() -> TempDir {
    home_with_remote_at("https://appliance.test")
}

/// Home directory with an active remote `local` at `url`
pub fn home_with_remote_at(url: &str) -> TempDir {
    let home = empty_home();
    let mut session = SessionContext::load(home.path()).expect("load session");
    session
        .remotes
        .add(
            "local",
            RemoteEntry {
                url: url.into(),
                username: Some("admin".into()),
                insecure: false,
            },
            Some("token".into()),
        )
        .expect("add remote");
    session.remotes.set_active("local").expect("activate remote");
    session.remotes.save().expect("save remotes");
    home
}

/// A shell under test and its captured output
pub struct TestShell {
    pub shell: Shell,
    pub out: SharedBuffer,
    pub err: SharedBuffer,
}

impl TestShell {
    pub fn output(&self) -> String {
        self.out.contents()
    }

    pub fn errors(&self) -> String {
        self.err.contents()
    }
}

/// Shell over `home` reading `lines`, with `answers` for confirmations
pub fn shell_with(home: &Path, lines: &[&str], answers: &str) -> TestShell {
    let reader: Box<dyn LineReader> = Box::new(ScriptedReader::new(lines.iter().copied()));
    let session = SessionContext::load(home).expect("load session");
    let settings = RuntimeSettings {
        coloring: false,
        ..RuntimeSettings::from_config(&session.config)
    };

    let out = SharedBuffer::default();
    let err = SharedBuffer::default();
    let io = ShellIo::new(
        Box::new(Cursor::new(answers.as_bytes().to_vec())),
        Box::new(out.clone()),
        Box::new(err.clone()),
    );

    TestShell {
        shell: Shell::new(CommandRegistry::standard(), session, settings, None, reader, io),
        out,
        err,
    }
}

/// Shell over `home` with no scripted input
pub fn shell(home: &Path) -> TestShell {
    shell_with(home, &[], "")
}

/// Files and directories under `<home>/tmp`
pub fn sandbox_dirs(home: &Path) -> Vec<String> {
    match std::fs::read_dir(home.join("tmp")) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Serve `responses` in order, one per connection, on a local port.
///
/// Returns the base URL and a handle yielding each raw request received.
pub async fn mock_appliance(responses: Vec<(u16, Value)>) -> (String, JoinHandle<Vec<String>>) {
    // Requests to the local listener must not go through a proxy
    for var in [
        "HTTP_PROXY",
        "http_proxy",
        "HTTPS_PROXY",
        "https_proxy",
        "ALL_PROXY",
        "all_proxy",
    ] {
        std::env::remove_var(var);
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("http://{}", listener.local_addr().expect("local addr"));

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.expect("accept");
            requests.push(read_request(&mut socket).await);

            let body = body.to_string();
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                if status < 400 { "OK" } else { "Error" },
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            let _ = socket.shutdown().await;
        }
        requests
    });
    (url, handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.expect("read");
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&data[..end]).to_string();
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if data.len() >= end + 4 + length {
            break;
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}
