//! `graphsvg` binary tests with fake renderers.
#![cfg(unix)]

mod common;

use common::{DVISVGM, FAILING, GRAPHVIZ, TEX_ENGINE, TestSite};
use predicates::prelude::*;

#[test]
fn test_render_inline_from_file() {
    let site = TestSite::new(&[("dot", GRAPHVIZ)], "").unwrap();
    site.write_source("flow.dot", "Flow\na -> b\n").unwrap();

    site.graphsvg()
        .args(["render", "--renderer", "dot", "flow.dot"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<svg"))
        .stdout(predicate::str::contains("<title>Flow</title>"))
        .stdout(predicate::str::contains("<?xml").not());

    assert_eq!(site.cache_entries(), 1);
}

#[test]
fn test_render_from_stdin_as_iframe() {
    let site = TestSite::new(&[("circo", GRAPHVIZ)], "").unwrap();

    site.graphsvg()
        .args(["render", "-r", "circo", "--format", "iframe", "-"])
        .write_stdin("Ring\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(r#"<iframe src="/images/graphs/graphs-"#))
        .stdout(predicate::str::contains(r#"sandbox="allow-scripts""#))
        .stderr(predicate::str::contains("Wrote"));

    let assets = std::fs::read_dir(site.root().join("_site/images/graphs")).unwrap().count();
    assert_eq!(assets, 1);
}

#[test]
fn test_render_tex_file_from_site_directory() {
    let site = TestSite::new(&[("latex", TEX_ENGINE), ("dvisvgm", DVISVGM)], "").unwrap();
    site.write_source("tex/fig.tex", "E=mc^2\n").unwrap();

    site.graphsvg()
        .args(["render", "-r", "latex", "tex/fig.tex"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<svg"))
        .stdout(predicate::str::contains("E=mc^2"));

    assert_eq!(site.cache_entries(), 1);
}

#[test]
fn test_render_json_summary() {
    let site = TestSite::new(&[("dot", GRAPHVIZ)], "").unwrap();
    site.write_source("a.dot", "Alpha").unwrap();
    site.write_source("b.dot", "Beta").unwrap();

    let output = site
        .graphsvg()
        .args(["render", "-r", "dot", "--format", "url", "--json", "a.dot", "b.dot"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summaries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let summaries = summaries.as_array().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0]["title"], "Alpha");
    assert_eq!(summaries[1]["title"], "Beta");
    assert_eq!(summaries[0]["renderer"], "dot");
    assert_eq!(summaries[0]["output"], summaries[0]["url"]);
}

#[test]
fn test_render_destination_override() {
    let site = TestSite::new(&[("dot", GRAPHVIZ)], "").unwrap();
    site.write_source("a.dot", "Alpha").unwrap();

    site.graphsvg()
        .args(["render", "-r", "dot", "--format", "img", "--destination", "public", "a.dot"])
        .assert()
        .success();

    assert!(site.root().join("public/images/graphs").is_dir());
    assert!(!site.root().join("_site").exists());
}

#[test]
fn test_invalid_renderer_exits_with_error() {
    let site = TestSite::new(&[], "").unwrap();

    site.graphsvg()
        .args(["render", "--renderer", "gnuplot", "-"])
        .write_stdin("plot x")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid renderer: 'gnuplot'"))
        .stderr(predicate::str::contains("suggestion"));
}

#[test]
fn test_failed_render_reports_stderr() {
    let site = TestSite::new(&[("mscgen", FAILING)], "").unwrap();

    site.graphsvg()
        .args(["render", "-r", "mscgen", "-"])
        .write_stdin("msc { a; }")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("syntax error in line 1"));
    assert_eq!(site.cache_entries(), 0);
}

#[test]
fn test_digest_is_stable_and_does_not_render() {
    let site = TestSite::new(&[("dot", GRAPHVIZ)], "").unwrap();

    let digest = |source: &str| {
        let output = site.graphsvg().args(["digest", "-r", "dot", "-"]).write_stdin(source).output().unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    };

    let first = digest("G");
    assert_eq!(first.len(), 64);
    assert_eq!(first, digest("  G\n\n"));
    assert_ne!(first, digest("H"));
    assert!(site.recorded_args("dot").is_empty());
}

#[test]
fn test_check_reports_configured_tools() {
    let site = TestSite::new(&[("dot", GRAPHVIZ)], "").unwrap();

    site.graphsvg()
        .args(["check", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓"))
        .stdout(predicate::str::contains("fake-bin/dot"));

    let site = TestSite::new(&[], "[renderers]\nmscgen = [\"/nonexistent/mscgen\"]").unwrap();
    site.graphsvg()
        .args(["check", "mscgen"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("✗"));
}

#[test]
fn test_cache_info_and_clean() {
    let site = TestSite::new(&[("dot", GRAPHVIZ)], "").unwrap();
    site.write_source("a.dot", "Alpha").unwrap();
    site.write_source("b.dot", "Beta").unwrap();
    site.graphsvg().args(["render", "-r", "dot", "a.dot", "b.dot"]).assert().success();

    site.graphsvg()
        .args(["cache", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:  2"));

    let digest = site.graphsvg().args(["digest", "-r", "dot", "a.dot"]).output().unwrap();
    let digest = String::from_utf8(digest.stdout).unwrap().trim().to_string();

    site.graphsvg()
        .args(["cache", "clean", digest.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1"));
    assert_eq!(site.cache_entries(), 1);

    site.graphsvg().args(["cache", "clean", "not-a-digest"]).assert().code(1);

    site.graphsvg()
        .args(["cache", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1"));
    assert_eq!(site.cache_entries(), 0);
}

#[test]
fn test_invalid_config_is_reported() {
    let site = TestSite::new(&[], "timeout_secs = 0").unwrap();

    site.graphsvg()
        .args(["check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("timeout_secs"));
}
