//! Integration tests for the bundled Raydium DEX patch set.
//!
//! Uses a trimmed copy of the Solana swap node with the three swap
//! operations in their pre-Raydium form.

use anchor_patcher::config::{apply_patch_set, check_patch_set, load_from_path, PatchSet};
use anchor_patcher::{ApplyOptions, CleanupOutcome, StepOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TARGET: &str = "nodes/SolanaNode/SolanaNode.node.ts";

fn manifest_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

fn load_bundled() -> PatchSet {
    load_from_path(manifest_path("patches/raydium-dex.toml")).unwrap()
}

fn fixture(name: &str) -> String {
    fs::read_to_string(manifest_path(&format!("tests/fixtures/{name}"))).unwrap()
}

/// Lay the fixture out the way the node package does, so `meta.target` resolves.
fn setup_node_package(source: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join(TARGET);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, source).unwrap();
    dir
}

#[test]
fn bundled_set_loads_and_validates() {
    let set = load_bundled();
    assert_eq!(set.meta.name, "raydium-dex");
    assert_eq!(set.meta.target.as_deref(), Some(TARGET));
    assert_eq!(set.steps.len(), 11);
    assert_eq!(set.cleanup.len(), 2);
}

#[test]
fn bundled_set_patches_swap_node() {
    let set = load_bundled();
    let dir = setup_node_package(&fixture("swap_node.ts"));

    let report = apply_patch_set(&set, dir.path(), None, ApplyOptions::default()).unwrap();
    assert!(report.written);
    assert!(report.report.run.is_clean(), "{:#?}", report.report.run);
    assert_eq!(report.report.run.applied(), 11);
    assert_eq!(report.report.removed_stale_lines(), 0);

    let patched = fs::read_to_string(dir.path().join(TARGET)).unwrap();
    assert_eq!(patched, fixture("swap_node.patched.ts"));
    assert_eq!(patched.matches("dex: ").count(), 5);
    assert_eq!(patched.matches("=== 'raydium'").count(), 3);
    assert!(!patched.contains("const swapTransaction = await"));
    assert!(!patched.contains("const advSwapTransaction = await"));
}

#[test]
fn second_run_is_byte_identical() {
    let set = load_bundled();
    let dir = setup_node_package(&fixture("swap_node.ts"));

    let first = apply_patch_set(&set, dir.path(), None, ApplyOptions::default()).unwrap();
    let second = apply_patch_set(&set, dir.path(), None, ApplyOptions::default()).unwrap();

    assert!(!second.written);
    assert!(!second.changed());
    assert_eq!(second.fingerprint_before(), first.fingerprint_after());
    assert_eq!(second.report.run.applied(), 0);
    assert_eq!(second.report.run.already_applied(), 11);
    assert!(second.report.run.is_clean(), "{:#?}", second.report.run);
}

#[test]
fn replaced_branches_read_as_applied() {
    let set = load_bundled();
    let dir = setup_node_package(&fixture("swap_node.patched.ts"));

    let report = check_patch_set(&set, dir.path(), None).unwrap();
    assert!(!report.changed());
    for id in ["quote-dex-branch", "swap-dex-branch", "adv-dex-branch"] {
        let step = report
            .report
            .run
            .steps
            .iter()
            .find(|s| s.id == id)
            .unwrap();
        assert!(
            matches!(step.result, Ok(StepOutcome::SkippedAlreadyApplied { .. })),
            "{id}: {:?}",
            step.result
        );
    }
}

#[test]
fn cleanup_repairs_legacy_output() {
    let set = load_bundled();
    let dir = setup_node_package(&fixture("swap_node.legacy.ts"));

    let report = apply_patch_set(&set, dir.path(), None, ApplyOptions::default()).unwrap();
    assert!(report.written);
    assert_eq!(report.report.run.applied(), 0);
    assert_eq!(report.report.run.already_applied(), 11);
    assert_eq!(report.report.removed_stale_lines(), 3);

    let outcomes: Vec<_> = report
        .report
        .cleanup
        .iter()
        .map(|c| c.result.clone().unwrap())
        .collect();
    assert!(matches!(outcomes[0], CleanupOutcome::Removed { lines: 1, .. }));
    assert!(matches!(outcomes[1], CleanupOutcome::Removed { lines: 2, .. }));

    let repaired = fs::read_to_string(dir.path().join(TARGET)).unwrap();
    assert_eq!(repaired, fixture("swap_node.patched.ts"));
}

#[test]
fn status_check_does_not_write() {
    let set = load_bundled();
    let source = fixture("swap_node.ts");
    let dir = setup_node_package(&source);

    let report = check_patch_set(&set, dir.path(), None).unwrap();
    assert!(!report.written);
    assert!(report.changed());
    assert_eq!(report.patched, fixture("swap_node.patched.ts"));
    assert_eq!(fs::read_to_string(dir.path().join(TARGET)).unwrap(), source);
}

#[test]
fn target_override_wins() {
    let set = load_bundled();
    let dir = TempDir::new().unwrap();
    let elsewhere = dir.path().join("copy.ts");
    fs::write(&elsewhere, fixture("swap_node.ts")).unwrap();

    let report = apply_patch_set(
        &set,
        Path::new("/nonexistent-root"),
        Some(elsewhere.as_path()),
        ApplyOptions::default(),
    )
    .unwrap();
    assert_eq!(report.path, elsewhere);
    assert_eq!(report.report.run.applied(), 11);
}

#[test]
fn renamed_anchor_is_reported_with_hint() {
    let set = load_bundled();
    let source = fixture("swap_node.ts").replace(
        "const priorityFee = this.getNodeParameter('priorityFee', i) as number;",
        "const priorityFeeLamports = this.getNodeParameter('priorityFee', i) as number;",
    );
    let dir = setup_node_package(&source);

    let report = apply_patch_set(&set, dir.path(), None, ApplyOptions { dry_run: true }).unwrap();
    let run = &report.report.run;
    assert!(!run.all_matched());

    let skipped = run
        .steps
        .iter()
        .find(|s| s.id == "swap-dex-param")
        .unwrap();
    match &skipped.result {
        Ok(StepOutcome::SkippedNoMatch { hint: Some(hint) }) => {
            assert!(hint.text.contains("priorityFeeLamports"));
        }
        other => panic!("expected a no-match hint, got {other:?}"),
    }
}
