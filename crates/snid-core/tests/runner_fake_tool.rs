//! End-to-end runner coverage against a stand-in classifier executable
//! that reproduces the real tool's output files.

#![cfg(unix)]

use snid_core::{run_and_read, run_snid, RunConfig, RunId, RunnerOptions};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SUCCESS_SCRIPT: &str = r#"#!/bin/sh
for arg in "$@"; do last="$arg"; done
base="${last%.ascii}"
printf '4000.0 4100.0\n4010.0 4300.0\n' > "${base}_snidflux.dat"
printf '4000.0 4050.0\n4010.0 4200.0\n' > "${base}_comp1_snidflux.dat"
printf '4000.0 3900.0\n4010.0 4000.0\n' > "${base}_comp2_snidflux.dat"
cat > "${base}_snid.output" <<'EOF'
 ### rlap-ordered template listings ###

#no. sn type lap rlap z zerr age age_flag
1 SN2002er Ia 0.9 15.2 0.05 0.001 +3.0 0
2 SN1999em IIP 0.8 7.4 0.09 0.004 -1.5 0
3 SN2004aw Ic 0.7 6.0 0.03 0.002 0.0 cut
EOF
echo "Searching all correlation peaks..."
"#;

const ALL_ZERO_SCRIPT: &str = r#"#!/bin/sh
echo "Searching all correlation peaks... PEAKFIT: Correlation function is all zero!"
exit 0
"#;

const FAILING_EXIT_SCRIPT: &str = r#"#!/bin/sh
echo "unrelated diagnostics"
exit 3
"#;

const NO_REPORT_SCRIPT: &str = r#"#!/bin/sh
for arg in "$@"; do last="$arg"; done
base="${last%.ascii}"
printf '4000.0 4100.0\n' > "${base}_snidflux.dat"
echo "looks fine"
"#;

fn write_tool(dir: &Path, script: &str) -> PathBuf {
    let path = dir.join("fake-snid");
    fs::write(&path, script).expect("tool script should be writable");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("tool script should become executable");
    path
}

fn write_spectrum(dir: &Path) -> PathBuf {
    let path = dir.join("sn2020abc.ascii");
    fs::write(&path, "4000.0 1.0\n4010.0 1.1\n").expect("spectrum should be writable");
    path
}

fn options(temp: &TempDir, tool: PathBuf, id: &str) -> RunnerOptions {
    RunnerOptions {
        program: tool,
        workdir_root: Some(temp.path().to_path_buf()),
        run_id: Some(RunId::new(id)),
        ..RunnerOptions::default()
    }
}

#[test]
fn successful_run_persists_the_store_next_to_the_input() {
    let temp = TempDir::new().expect("tempdir should be created");
    let tool = write_tool(temp.path(), SUCCESS_SCRIPT);
    let spectrum = write_spectrum(temp.path());

    let stored = run_snid(
        &spectrum,
        &RunConfig::default(),
        &options(&temp, tool, "10000001"),
    )
    .expect("run should not raise")
    .expect("run should persist a store");

    assert_eq!(stored, temp.path().join("sn2020abc_snid.h5"));
    assert!(!temp.path().join("tmpsnid_10000001").exists());
}

#[test]
fn run_and_read_exposes_parsed_sections() {
    let temp = TempDir::new().expect("tempdir should be created");
    let tool = write_tool(temp.path(), SUCCESS_SCRIPT);
    let spectrum = write_spectrum(temp.path());

    let reader = run_and_read(
        &spectrum,
        &RunConfig::default(),
        &options(&temp, tool, "10000002"),
    )
    .expect("run should not raise")
    .expect("run should produce a reader");

    let results = reader.results().expect("results section should load");
    assert_eq!(results.len(), 2);
    assert_eq!(results.rows[0].rlap, 15.2);
    assert!(results.row_for_ordinal(3).is_none(), "cut row must be gone");
    assert_eq!(reader.nmodels(), 2);
    assert_eq!(
        reader.data().map(|table| table.len()),
        Some(2)
    );
}

#[test]
fn all_zero_marker_on_a_clean_exit_still_yields_none() {
    let temp = TempDir::new().expect("tempdir should be created");
    let tool = write_tool(temp.path(), ALL_ZERO_SCRIPT);
    let spectrum = write_spectrum(temp.path());

    let outcome = run_snid(
        &spectrum,
        &RunConfig::default(),
        &options(&temp, tool, "10000003"),
    )
    .expect("marker failure is non-fatal");

    assert!(outcome.is_none());
    assert!(!temp.path().join("sn2020abc_snid.h5").exists());
    assert!(!temp.path().join("tmpsnid_10000003").exists());
}

#[test]
fn non_zero_exit_yields_none_without_raising() {
    let temp = TempDir::new().expect("tempdir should be created");
    let tool = write_tool(temp.path(), FAILING_EXIT_SCRIPT);
    let spectrum = write_spectrum(temp.path());

    let outcome = run_snid(
        &spectrum,
        &RunConfig::default(),
        &options(&temp, tool, "10000004"),
    )
    .expect("exit failure is non-fatal");

    assert!(outcome.is_none());
}

#[test]
fn missing_report_after_a_clean_exit_is_fatal_and_cleans_up() {
    let temp = TempDir::new().expect("tempdir should be created");
    let tool = write_tool(temp.path(), NO_REPORT_SCRIPT);
    let spectrum = write_spectrum(temp.path());

    let error = run_snid(
        &spectrum,
        &RunConfig::default(),
        &options(&temp, tool, "10000005"),
    )
    .expect_err("missing report should raise");

    assert_eq!(error.placeholder(), "RUN.REPORT_MISSING");
    assert!(!temp.path().join("tmpsnid_10000005").exists());
}

#[test]
fn disabled_cleanup_keeps_the_run_directory_and_flat_files() {
    let temp = TempDir::new().expect("tempdir should be created");
    let tool = write_tool(temp.path(), SUCCESS_SCRIPT);
    let spectrum = write_spectrum(temp.path());

    let mut run_options = options(&temp, tool, "10000006");
    run_options.keep_workdir = true;

    run_snid(&spectrum, &RunConfig::default(), &run_options)
        .expect("run should not raise")
        .expect("run should persist a store");

    let run_dir = temp.path().join("tmpsnid_10000006");
    assert!(run_dir.join("snid_10000006_spectofit.ascii").exists());
    assert!(run_dir.join("snid_10000006_spectofit_snid.output").exists());
    assert!(run_dir
        .join("snid_10000006_spectofit_comp1_snidflux.dat")
        .exists());
}
