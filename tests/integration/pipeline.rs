//! End-to-end behavior of steps, cleanup and the file engine working together.

use anchor_patcher::{
    apply_to_file, cleanup, patch_buffer, run, ApplyOptions, CleanupOutcome, Content, Guard,
    IndentSource, LineBuffer, Matcher, Mutation, PatchStep, StaleArtifact, StepOutcome, Window,
};
use std::fs;
use tempfile::TempDir;

fn insert_y() -> PatchStep {
    PatchStep::new(
        "insert-y",
        Matcher::contains("const x = 1;"),
        Mutation::insert_after(Content::lines(["const y = 2;"])),
    )
    .guarded_by(Guard::marker("const y"))
}

#[test]
fn scenario_insert_is_idempotent() {
    let mut buffer = LineBuffer::from_lines(["  const x = 1;", "  doWork(x);"]);

    let first = run(&mut buffer, &[insert_y()]);
    assert!(first.is_clean());
    assert_eq!(
        buffer.lines(),
        &["  const x = 1;", "  const y = 2;", "  doWork(x);"]
    );

    let snapshot = buffer.render();
    let second = run(&mut buffer, &[insert_y()]);
    assert_eq!(second.already_applied(), 1);
    assert_eq!(buffer.render(), snapshot);
}

#[test]
fn scenario_replace_with_generated_content() {
    let mut buffer = LineBuffer::from_lines(["fn() {", "let q = oldCall();", "}"]);
    let step = PatchStep::new(
        "new-call",
        Matcher::equals("let q = oldCall();"),
        Mutation::replace(
            1,
            Content::generated(|indent| {
                vec![format!("{indent}let q: any;"), format!("{indent}q = newCall();")]
            }),
        ),
    );

    let report = run(&mut buffer, &[step]);
    assert_eq!(
        report.steps[0].result,
        Ok(StepOutcome::Applied {
            at: 1,
            inserted: 2,
            removed: 1
        })
    );
    assert_eq!(buffer.len(), 4);
    assert_eq!(buffer.lines(), &["fn() {", "let q: any;", "q = newCall();", "}"]);
}

#[test]
fn scenario_cleanup_without_stale_lines_is_noop() {
    let mut buffer = LineBuffer::from_lines(["let tx: any;", "tx = build();", "send(tx);"]);
    let before = buffer.clone();
    let artifact = StaleArtifact::new(
        "stale-tx",
        Matcher::contains("let tx: any;"),
        Matcher::contains("const tx = legacyBuild()"),
        20,
    );

    let reports = cleanup(&mut buffer, &[artifact]);
    assert_eq!(reports[0].result, Ok(CleanupOutcome::NothingStale));
    assert_eq!(buffer, before);
}

#[test]
fn steps_apply_in_declaration_order() {
    let mut buffer = LineBuffer::from_lines(["head"]);
    let first = PatchStep::new(
        "first",
        Matcher::equals("head"),
        Mutation::insert_after(Content::lines(["one"])),
    );
    // Anchors on the line the first step produced.
    let second = PatchStep::new(
        "second",
        Matcher::equals("one"),
        Mutation::insert_after(Content::lines(["two"])),
    );

    let report = run(&mut buffer, &[first.clone(), second.clone()]);
    assert_eq!(report.applied(), 2);
    assert_eq!(buffer.lines(), &["head", "one", "two"]);

    let mut reversed = LineBuffer::from_lines(["head"]);
    let report = run(&mut reversed, &[second, first]);
    assert_eq!(report.applied(), 1);
    assert_eq!(report.unmatched(), 1);
    assert_eq!(reversed.lines(), &["head", "one"]);
}

#[test]
fn windows_follow_earlier_insertions() {
    let mut buffer = LineBuffer::from_lines([
        "case 'a':",
        "\tresult = {",
        "\t\tvalue,",
        "\t};",
        "\tbreak;",
        "case 'b':",
        "\tresult = {",
        "\t\tvalue,",
        "\t};",
        "\tbreak;",
    ]);
    let case_b = Window::between(Matcher::contains("case 'b':"), Matcher::equals("break;"));
    let pad = PatchStep::new(
        "pad-a",
        Matcher::contains("case 'a':"),
        Mutation::insert_after(Content::lines(["// a", "// b", "// c"])),
    );
    let field = PatchStep::new(
        "field-b",
        Matcher::equals("result = {"),
        Mutation::insert_after(Content::lines(["source: 'b',"])),
    )
    .within(case_b)
    .guarded_by(Guard::marker("source:"))
    .indent_from(IndentSource::NextLine);

    let report = run(&mut buffer, &[pad, field]);
    assert!(report.all_matched());
    assert_eq!(buffer.get(9), Some("\tresult = {"));
    assert_eq!(buffer.get(10), Some("\t\tsource: 'b',"));
    assert_eq!(buffer.get(5), Some("\t\tvalue,"));
}

#[test]
fn tag_guard_marks_inserted_lines() {
    let mut buffer = LineBuffer::from_lines(["# settings", "debug = false"]);
    let step = PatchStep::new(
        "enable-trace",
        Matcher::equals("# settings"),
        Mutation::insert_after(Content::lines(["trace = true"])),
    )
    .guarded_by(Guard::tag())
    .comment_prefix("#");

    run(&mut buffer, &[step.clone()]);
    assert_eq!(buffer.get(1), Some("trace = true # patch:enable-trace"));

    let again = run(&mut buffer, &[step]);
    assert_eq!(again.already_applied(), 1);
    assert_eq!(buffer.len(), 3);
}

#[test]
fn empty_pipeline_round_trips_file_bytes() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("mixed.ts");
    let content = "\tfirst\r\nsecond\r\n\r\n   \r\nlast";
    fs::write(&file, content).unwrap();

    let report = apply_to_file(&file, &[], &[], ApplyOptions::default()).unwrap();
    assert!(!report.written);
    assert_eq!(report.patched, content);
    assert_eq!(fs::read_to_string(&file).unwrap(), content);
}

#[test]
fn crlf_files_stay_crlf() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("windows.ts");
    fs::write(&file, "  const x = 1;\r\n  doWork(x);\r\n").unwrap();

    let report = apply_to_file(&file, &[insert_y()], &[], ApplyOptions::default()).unwrap();
    assert!(report.written);
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "  const x = 1;\r\n  const y = 2;\r\n  doWork(x);\r\n"
    );
}

#[test]
fn malformed_step_is_isolated() {
    let mut buffer = LineBuffer::from_lines(["a", "b"]);
    let too_long = PatchStep::new("too-long", Matcher::equals("b"), Mutation::delete(5));
    let fine = PatchStep::new(
        "fine",
        Matcher::equals("a"),
        Mutation::insert_after(Content::lines(["a2"])),
    );

    let report = patch_buffer(&mut buffer, &[too_long, fine], &[]);
    assert!(report.has_failures());
    assert_eq!(report.run.failures().count(), 1);
    assert_eq!(report.run.applied(), 1);
    assert_eq!(buffer.lines(), &["a", "a2", "b"]);
}
