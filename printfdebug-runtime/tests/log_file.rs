//! Trace records written to `<prefix>.<pid>.log`.

use std::fs;

use printfdebug_runtime::{log_path, Record, Tag, Tracer};

fn read_records(prefix: &std::path::Path) -> Vec<Record> {
    let path = log_path(prefix.as_os_str(), std::process::id());
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[inline(never)]
fn instrumented_work(tracer: &Tracer) -> u32 {
    tracer.func_start();
    let value = (1..=10).sum();
    tracer.func_end();
    value
}

#[test]
fn records_carry_caller_location() {
    let tmp = tempfile::tempdir().unwrap();
    let prefix = tmp.path().join("trace");
    let tracer = Tracer::with_log_prefix(&prefix);

    assert_eq!(instrumented_work(&tracer), 55);

    let records = read_records(&prefix);
    let tags: Vec<Tag> = records.iter().map(|r| r.tag).collect();
    assert_eq!(tags, [Tag::FuncStart, Tag::FuncEnd]);

    let top = &records[0].frames[0];
    assert_eq!(top.function, "log_file::instrumented_work", "got {top:?}");
    assert!(top.file.ends_with("log_file.rs"), "got {top:?}");
    assert!(top.line > 0);
    assert_ne!(top.pc, 0);

    let callers: Vec<&str> = records[0]
        .frames
        .iter()
        .map(|f| f.function.as_str())
        .collect();
    assert!(
        callers.contains(&"log_file::records_carry_caller_location"),
        "got {callers:?}"
    );
}

#[test]
fn tracers_sharing_a_prefix_append() {
    let tmp = tempfile::tempdir().unwrap();
    let prefix = tmp.path().join("shared");

    Tracer::with_log_prefix(&prefix).func_start();
    Tracer::with_log_prefix(&prefix).func_end();

    let tags: Vec<Tag> = read_records(&prefix).iter().map(|r| r.tag).collect();
    assert_eq!(tags, [Tag::FuncStart, Tag::FuncEnd]);
}
