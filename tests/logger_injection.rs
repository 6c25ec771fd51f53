use std::sync::{Arc, Mutex};
use std::time::Duration;

use transit_tracker::adapters::outbound::{init_buffered_logger, init_noop_logger, FanoutLogger};
use transit_tracker::domains::logger::{DomainLogger, DynLogger};

struct BridgeCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl BridgeCapture {
    fn new() -> Self { Self { messages: Arc::new(Mutex::new(Vec::new())) } }
}

impl DomainLogger for BridgeCapture {
    fn info(&self, msg: &str) { self.messages.lock().unwrap().push(format!("INFO:{}", msg)); }
    fn warn(&self, msg: &str) { self.messages.lock().unwrap().push(format!("WARN:{}", msg)); }
    fn error(&self, msg: &str) { self.messages.lock().unwrap().push(format!("ERR:{}", msg)); }
}

#[tokio::test]
async fn test_buffered_and_noop_logger() {
    let capture = Arc::new(BridgeCapture::new());
    let bridge = capture.clone() as DynLogger;

    let buffered = init_buffered_logger(bridge.clone(), 8);
    buffered.info("Fetched route Juja-Nairobi (12 points)");
    buffered.warn("Position write queue full, dropping update for entity 3");
    buffered.error("Skipping tick: database unavailable");

    tokio::time::sleep(Duration::from_millis(50)).await;

    let msgs = capture.messages.lock().unwrap();
    assert!(msgs.iter().any(|m| m == "INFO:Fetched route Juja-Nairobi (12 points)"));
    assert!(msgs.iter().any(|m| m.starts_with("WARN:Position write queue full")));
    assert!(msgs.iter().any(|m| m.starts_with("ERR:Skipping tick")));
    assert_eq!(buffered.dropped(), 0);

    let noop = init_noop_logger();
    noop.info("ignored");
    noop.error("ignored-err");
}

#[tokio::test(flavor = "current_thread")]
async fn buffered_logger_counts_overflow() {
    let capture = Arc::new(BridgeCapture::new());
    let buffered = init_buffered_logger(capture.clone(), 2);

    // The forwarding task cannot run until this task yields.
    for i in 0..5 {
        buffered.info(&format!("line {}", i));
    }
    assert_eq!(buffered.dropped(), 3);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(capture.messages.lock().unwrap().len(), 2);
}

#[test]
fn fanout_reaches_both_loggers() {
    let first = Arc::new(BridgeCapture::new());
    let second = Arc::new(BridgeCapture::new());
    let fanout = FanoutLogger::new(first.clone(), second.clone());

    fanout.warn("Full snapshot served from memory only");

    assert_eq!(first.messages.lock().unwrap().as_slice(), ["WARN:Full snapshot served from memory only"]);
    assert_eq!(second.messages.lock().unwrap().as_slice(), ["WARN:Full snapshot served from memory only"]);
}
