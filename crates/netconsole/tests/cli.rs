#![cfg(feature = "cli")]

use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use netconsole::frame::{FrameWriter, InfoRecord};

fn spawn_cli(port: u16, extra: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_netconsole"))
        .arg("127.0.0.1")
        .arg("--port")
        .arg(port.to_string())
        .arg("--log-level")
        .arg("error")
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("netconsole should start")
}

/// Read the first stdout line of `child`, giving up after a few seconds.
fn first_line(child: &mut Child) -> String {
    let stdout = child.stdout.take().expect("stdout should be piped");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = BufReader::new(stdout).read_line(&mut line);
        let _ = tx.send(line);
    });
    rx.recv_timeout(Duration::from_secs(10))
        .expect("record line should be printed")
}

/// Accept the CLI's connection and send one info record. The returned writer
/// keeps the connection open.
fn serve_one_record(listener: &TcpListener, message: &str) -> FrameWriter<TcpStream> {
    let (stream, _) = listener.accept().expect("cli should connect");
    let mut device = FrameWriter::new(stream);
    device
        .write_info(&InfoRecord {
            timestamp: 1.0,
            sequence: 0,
            message: message.to_string(),
        })
        .expect("record should send");
    device
}

#[test]
fn prints_text_records() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut child = spawn_cli(port, &[]);

    let _device = serve_one_record(&listener, "normal message");
    let line = first_line(&mut child);
    assert_eq!(line.trim_end(), "[1.00] normal message");

    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn prints_json_records() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut child = spawn_cli(port, &["--format", "json"]);

    let _device = serve_one_record(&listener, "json message");
    let line = first_line(&mut child);
    let value: serde_json::Value =
        serde_json::from_str(line.trim_end()).expect("stdout line should be json");
    assert_eq!(value["kind"], "info");
    assert_eq!(value["message"], "json message");
    assert_eq!(value["text"], "[1.00] json message");

    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn rejects_missing_address() {
    let output = Command::new(env!("CARGO_BIN_EXE_netconsole"))
        .output()
        .expect("netconsole should run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("<ADDRESS>"));
}
