//! End-to-end checks against real sockets and files.

use std::io::{BufRead, BufReader, Read};
use std::net::TcpListener;

use observability_shim::{Field, Logger};
use serde_json::Value;

fn parse_lines(raw: &str) -> Vec<Value> {
    raw.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
}

#[test]
fn tcp_logger_streams_one_json_line_per_admitted_call() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let (logger, guard) = Logger::connect(addr, "auth-service").unwrap();
    let (peer, _) = listener.accept().unwrap();

    logger.debug("suppressed", [Field::new("k", 1)]);
    logger.info(
        "authentication failed",
        [Field::new("user_id", 42), Field::new("reason", "invalid password")],
    );
    logger.infof(format_args!("count={}", 5));
    logger.trace("suppressed", []);
    guard.close().unwrap();

    let mut raw = String::new();
    BufReader::new(peer).read_to_string(&mut raw).unwrap();
    let records = parse_lines(&raw);
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first["severity"], "info");
    assert_eq!(first["message"], "authentication failed");
    assert_eq!(first["service"], "auth-service");
    assert_eq!(first["env"], "dev");
    assert_eq!(first["user_id"], 42);
    assert_eq!(first["reason"], "invalid password");
    assert!(first["timestamp"].is_string());

    assert_eq!(records[1]["message"], "count=5");
    assert!(records[1].get("user_id").is_none());
}

#[test]
fn tcp_logger_close_reaches_peer_as_eof() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let (logger, guard) = Logger::connect(listener.local_addr().unwrap(), "svc").unwrap();
    let (peer, _) = listener.accept().unwrap();

    for i in 0..5 {
        logger.warn("tick", [Field::new("i", i)]);
    }
    guard.close().unwrap();

    let mut reader = BufReader::new(peer);
    let mut lines = 0;
    let mut line = String::new();
    while reader.read_line(&mut line).unwrap() > 0 {
        lines += 1;
        line.clear();
    }
    assert_eq!(lines, 5);

    logger.error("after close", []);
    assert!(logger.is_closed());
    assert_eq!(logger.dropped_records(), 1);
}

#[test]
fn file_logger_appends_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.log");

    {
        let (logger, _guard) = Logger::open_file(&path, "billing").unwrap();
        logger.info("first run", []);
    }
    let (logger, guard) = Logger::open_file(&path, "billing").unwrap();
    logger.error("second run", [Field::new("code", 500)]);
    logger.debug("suppressed", []);
    guard.close().unwrap();

    let records = parse_lines(&std::fs::read_to_string(&path).unwrap());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["message"], "first run");
    assert_eq!(records[1]["severity"], "error");
    assert_eq!(records[1]["code"], 500);
}

#[test]
fn file_logger_after_close_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("closed.log");

    let (logger, guard) = Logger::open_file(&path, "svc").unwrap();
    logger.info("kept", []);
    guard.close().unwrap();
    logger.info("dropped", []);
    logger.errorf(format_args!("dropped {}", 2));

    let records = parse_lines(&std::fs::read_to_string(&path).unwrap());
    assert_eq!(records.len(), 1);
    assert_eq!(logger.dropped_records(), 2);
}

#[test]
fn dsn_selects_transport() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dsn.log");
    let dsn = format!("file://{}", path.display());

    let (logger, guard) = Logger::from_dsn(&dsn, "svc").unwrap();
    logger.warn("via dsn", []);
    guard.close().unwrap();
    assert_eq!(parse_lines(&std::fs::read_to_string(&path).unwrap()).len(), 1);

    assert!(Logger::from_dsn("smtp://mail", "svc").is_err());
}
