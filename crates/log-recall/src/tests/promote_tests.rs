use crate::{LevelPromotingSink, LogLevel, Logger, MemorySink, MessageFormat, Sink, attr};
use std::sync::Arc;

fn promoted(sink: &MemorySink) -> Logger {
    Logger::new(Arc::new(LevelPromotingSink::new(
        Arc::new(sink.clone()),
        MessageFormat::default(),
    )))
}

#[test]
fn test_debug_promoted_to_info() {
    let sink = MemorySink::new(LogLevel::Info);
    let log = promoted(&sink);

    log.debug("detail", [attr("k", "v")]);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, LogLevel::Info);
    assert_eq!(records[0].message, "[RECALL] detail");
    assert_eq!(records[0].attr("k"), Some(&serde_json::json!("v")));
}

#[test]
fn test_debug_promoted_to_warn_when_info_suppressed() {
    let sink = MemorySink::new(LogLevel::Warn);
    let log = promoted(&sink);

    log.debug("detail", []);

    assert_eq!(sink.records()[0].level, LogLevel::Warn);
}

#[test]
fn test_other_levels_pass_through() {
    let sink = MemorySink::new(LogLevel::Info);
    let log = promoted(&sink);

    log.info("plain", []);
    log.error("bad", []);

    let records = sink.records();
    assert_eq!(sink.messages(), vec!["plain", "bad"]);
    assert_eq!(records[0].level, LogLevel::Info);
    assert_eq!(records[1].level, LogLevel::Error);
}

#[test]
fn test_trace_stays_suppressed() {
    let sink = MemorySink::new(LogLevel::Info);
    let log = promoted(&sink);

    log.trace("noise", []);

    assert!(sink.is_empty());
}

#[test]
fn test_enabled_from_debug_up() {
    let sink = LevelPromotingSink::new(
        Arc::new(MemorySink::new(LogLevel::Error)),
        MessageFormat::default(),
    );
    assert!(!sink.enabled(LogLevel::Trace));
    assert!(sink.enabled(LogLevel::Debug));
    assert!(sink.enabled(LogLevel::Info));
    assert!(!sink.enabled(LogLevel::Off));
}

#[test]
fn test_derived_promoting_sink_keeps_promoting() {
    let sink = MemorySink::new(LogLevel::Info);
    let log = promoted(&sink).with([attr("req", 9)]).with_group("db");

    log.debug("query", [attr("rows", 3)]);

    let record = &sink.records()[0];
    assert_eq!(record.level, LogLevel::Info);
    assert_eq!(record.message, "[RECALL] query");
    let keys: Vec<_> = record.attrs.iter().map(|a| a.key.as_str()).collect();
    assert_eq!(keys, vec!["db.rows", "req"]);
}
