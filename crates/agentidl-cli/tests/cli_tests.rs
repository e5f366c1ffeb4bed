//! Integration tests for the agentidl CLI
//!
//! These tests invoke the actual agentidl binary and verify:
//! - Exit codes (0 = success, 1 = findings or failures, 2 = error)
//! - stdout/stderr output
//! - JSON output format
//! - Generated artifacts on disk

use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn agentidl_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_agentidl"))
}

fn fixture(path: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(path)
        .to_string_lossy()
        .into_owned()
}

fn fixture_valid(name: &str) -> String {
    fixture(&format!("conformance/valid/{}", name))
}

fn fixture_invalid(name: &str) -> String {
    fixture(&format!("conformance/invalid/{}", name))
}

fn run_agentidl(args: &[&str]) -> std::process::Output {
    Command::new(agentidl_bin())
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env("NO_COLOR", "1")
        .env_remove("AGENTIDL_LOG")
        .output()
        .expect("failed to execute agentidl")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("agentidl_test_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run_agentidl(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let out = stdout(&output);
    assert!(out.contains("agentidl"), "should contain 'agentidl'");
    assert!(out.contains(env!("CARGO_PKG_VERSION")), "should contain version");
}

#[test]
fn test_version_flag() {
    let output = run_agentidl(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

// ── Validate ──────────────────────────────────────────────

#[test]
fn test_validate_valid_definition() {
    let output = run_agentidl(&["validate", &fixture_valid("marketplace.webidl")]);
    assert!(output.status.success(), "valid definition should exit 0");
    assert!(stdout(&output).contains("is valid"));
}

#[test]
fn test_validate_unknown_attributes() {
    let output = run_agentidl(&["validate", &fixture_invalid("unknown-attribute.webidl")]);
    assert_eq!(output.status.code(), Some(1), "findings should exit 1");
    let out = stdout(&output);
    assert!(out.contains("unknown-attribute"), "stdout: {}", out);
    assert!(out.contains("'Exposed'"));
    assert!(out.contains("'Cached'"));
}

#[test]
fn test_validate_missing_delegation_parameter() {
    let output = run_agentidl(&[
        "validate",
        &fixture_invalid("missing-delegation-parameter.webidl"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("missing-delegation-parameter"));
}

#[test]
fn test_validate_nonexistent_file() {
    let output = run_agentidl(&["validate", "nonexistent.webidl"]);
    assert_eq!(output.status.code(), Some(2), "missing file should exit 2");
    assert!(stderr(&output).contains("nonexistent.webidl"));
}

#[test]
fn test_validate_no_interface_is_error() {
    let output = run_agentidl(&["validate", &fixture_invalid("no-interface.webidl")]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("No interface definition found"));
}

#[test]
fn test_validate_syntax_error() {
    let output = run_agentidl(&["validate", &fixture_invalid("syntax-error.webidl")]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Parse error"));
}

#[test]
fn test_validate_json_output() {
    let output = run_agentidl(&["validate", "--json", &fixture_valid("marketplace.webidl")]);
    assert!(output.status.success(), "valid definition --json should exit 0");
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(json["valid"], true);
    assert_eq!(json["findings"].as_array().unwrap().len(), 0);
}

#[test]
fn test_validate_json_invalid() {
    let output = run_agentidl(&["validate", "--json", &fixture_invalid("missing-intent.webidl")]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(json["valid"], false);
    assert_eq!(json["findings"][0]["kind"], "MissingRequiredAttribute");
    assert_eq!(json["findings"][0]["location"], "Treasury.withdraw");
}

#[test]
fn test_validate_quiet_valid() {
    let output = run_agentidl(&["--quiet", "validate", &fixture_valid("marketplace.webidl")]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty(), "quiet mode should produce no stdout");
}

#[test]
fn test_validate_with_strict_rules() {
    let rules = fixture("rules/definition-strict.json");
    let output = run_agentidl(&["validate", "--rules", &rules, &fixture_valid("generics.webidl")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("required attribute 'Context'"));

    let output = run_agentidl(&["validate", "--rules", &rules, &fixture_valid("marketplace.webidl")]);
    assert!(output.status.success(), "{}", stdout(&output));
}

#[test]
fn test_validate_rules_from_config() {
    let config = fixture("config/agentidl.toml");
    let output = run_agentidl(&["--config", &config, "validate", &fixture_valid("generics.webidl")]);
    assert_eq!(output.status.code(), Some(1), "config points at strict rules");
}

#[test]
fn test_invalid_config_is_error() {
    let dir = temp_dir("bad_config");
    let config = dir.join("agentidl.toml");
    std::fs::write(&config, "[codegen]\nflavor = \"cobol\"\n").unwrap();
    let output = run_agentidl(&[
        "--config",
        config.to_str().unwrap(),
        "validate",
        &fixture_valid("minimal.webidl"),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Configuration error"));
    let _ = std::fs::remove_dir_all(&dir);
}

// ── Check ─────────────────────────────────────────────────

#[test]
fn test_check_valid_delegation() {
    let output = run_agentidl(&[
        "check",
        "--kind",
        "delegation",
        &fixture("documents/delegation-valid.json"),
    ]);
    assert!(output.status.success(), "{}", stdout(&output));
}

#[test]
fn test_check_revoked_delegation() {
    let output = run_agentidl(&[
        "check",
        "--kind",
        "delegation",
        &fixture("documents/delegation-revoked.json"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("revoked-delegation"));
}

#[test]
fn test_check_accumulates_findings_json() {
    let output = run_agentidl(&[
        "check",
        "--kind",
        "delegation",
        "--json",
        &fixture("documents/delegation-bad-timestamp.json"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    let kinds: Vec<&str> = json["findings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"InvalidTimestamp"));
    assert!(kinds.contains(&"InvalidProofType"));
    assert!(kinds.contains(&"MissingRequiredField"));
}

#[test]
fn test_check_toml_rules() {
    let output = run_agentidl(&[
        "check",
        "--kind",
        "delegation",
        "--rules",
        &fixture("rules/delegation.toml"),
        &fixture("documents/delegation-valid.json"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("JsonWebSignature2020"), "{}", out);
    assert!(out.contains("proof.jws"));
}

#[test]
fn test_check_execution_record() {
    let output = run_agentidl(&[
        "check",
        "--kind",
        "execution",
        "--rules",
        &fixture("rules/execution.json"),
        &fixture("documents/execution-record.json"),
    ]);
    assert!(output.status.success(), "{}", stdout(&output));
}

#[test]
fn test_check_malformed_document() {
    let output = run_agentidl(&[
        "check",
        "--kind",
        "delegation",
        &fixture("documents/not-an-object.json"),
    ]);
    assert_eq!(output.status.code(), Some(2), "malformed input is an error, not a finding");
    assert!(stderr(&output).contains("Malformed document"));
}

// ── Compile ───────────────────────────────────────────────

#[test]
fn test_compile_all_flavors() {
    let out = temp_dir("compile_all");
    let output = run_agentidl(&[
        "compile",
        &fixture_valid("marketplace.webidl"),
        "--out",
        out.to_str().unwrap(),
        "--flavor",
        "all",
    ]);
    assert!(output.status.success(), "stderr={}", stderr(&output));

    for name in [
        "marketplace.client.ts",
        "marketplace.handlers.ts",
        "marketplace.client.js",
        "marketplace.handlers.js",
        "marketplace.jsonld",
        "marketplace.ttl",
    ] {
        assert!(out.join(name).exists(), "{} should be written", name);
    }

    let client = std::fs::read_to_string(out.join("marketplace.client.ts")).unwrap();
    assert!(client.contains("export const MarketplaceIntents = {"));
    assert!(client.contains("export type DelegationContext = Record<string, unknown>;"));
    let handlers = std::fs::read_to_string(out.join("marketplace.handlers.ts")).unwrap();
    assert!(handlers.contains("export function registerMarketplaceHandlers("));

    let graph: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("marketplace.jsonld")).unwrap()).unwrap();
    assert_eq!(graph["@context"][0], "https://agentidl.dev/contexts/trade.jsonld");
    assert_eq!(graph["@graph"].as_array().unwrap().len(), 4);

    let _ = std::fs::remove_dir_all(&out);
}

#[test]
fn test_compile_uses_configured_flavor_and_prefixes() {
    let out = temp_dir("compile_config");
    let output = run_agentidl(&[
        "--config",
        &fixture("config/agentidl.toml"),
        "compile",
        &fixture_valid("minimal.webidl"),
        "--out",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr={}", stderr(&output));
    assert!(out.join("ping.client.js").exists());
    assert!(!out.join("ping.client.ts").exists());

    let turtle = std::fs::read_to_string(out.join("ping.ttl")).unwrap();
    assert!(turtle.contains("@prefix trade: <https://example.org/trade#> ."));
    let _ = std::fs::remove_dir_all(&out);
}

#[test]
fn test_compile_header_matches_hash() {
    let out = temp_dir("compile_hash");
    let file = fixture_valid("marketplace.webidl");
    let output = run_agentidl(&["compile", &file, "--out", out.to_str().unwrap()]);
    assert!(output.status.success());

    let hash_output = run_agentidl(&["hash", &file]);
    let hash = stdout(&hash_output).trim().to_string();
    let client = std::fs::read_to_string(out.join("marketplace.client.ts")).unwrap();
    assert!(client.contains(&format!("model sha256:{}", hash)));
    let _ = std::fs::remove_dir_all(&out);
}

#[test]
fn test_compile_no_interface() {
    let out = temp_dir("compile_none");
    let output = run_agentidl(&[
        "compile",
        &fixture_invalid("no-interface.webidl"),
        "--out",
        out.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&out);
}

// ── Model / Hash ──────────────────────────────────────────

#[test]
fn test_model_json() {
    let output = run_agentidl(&["model", &fixture_valid("marketplace.webidl")]);
    assert!(output.status.success());
    let model: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(model["name"], "Marketplace");
    assert_eq!(model["operations"].as_array().unwrap().len(), 3);
    assert_eq!(model["operations"][1]["parameters"][0]["type"], "number");
}

#[test]
fn test_hash_valid_definition() {
    let output = run_agentidl(&["hash", &fixture_valid("marketplace.webidl")]);
    assert!(output.status.success());
    let hash = stdout(&output).trim().to_string();
    assert_eq!(hash.len(), 64, "SHA-256 hex should be 64 chars");
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_hash_determinism() {
    let file = fixture_valid("generics.webidl");
    let first = stdout(&run_agentidl(&["hash", &file]));
    for i in 0..10 {
        assert_eq!(first, stdout(&run_agentidl(&["hash", &file])), "hash differs at run {}", i);
    }
}

// ── Test (scenarios) ──────────────────────────────────────

#[test]
fn test_scenarios_pass() {
    let output = run_agentidl(&["test", &fixture("scenarios")]);
    let out = stdout(&output);
    assert!(output.status.success(), "stdout={}\nstderr={}", out, stderr(&output));
    assert!(out.contains("PASS buyer proposes a contract to seller"));
    assert!(out.contains("PASS zero payment is rejected"));
    assert!(out.contains("PASS seller without a cancel handler"));
    assert!(out.contains("6 passed, 0 failed"));
}

#[test]
fn test_scenarios_failing_with_junit() {
    let dir = temp_dir("junit");
    let report = dir.join("report.xml");
    let output = run_agentidl(&[
        "test",
        &fixture("scenarios-failing"),
        "--junit",
        report.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("FAIL zero payment wrongly expected to pass (expected 'accepted', got 'rejected')"));
    assert!(out.contains("ERROR"));

    let xml = std::fs::read_to_string(&report).expect("junit report written");
    assert!(xml.contains("tests=\"2\" failures=\"1\" errors=\"1\""), "{}", xml);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_scenarios_missing_path() {
    let output = run_agentidl(&["test", "no-such-dir"]);
    assert_eq!(output.status.code(), Some(2));
}

// ── All conformance fixtures ──────────────────────────────

#[test]
fn test_all_valid_conformance_fixtures_validate() {
    let valid_dir = PathBuf::from(fixture("conformance/valid"));
    for entry in std::fs::read_dir(&valid_dir).expect("read dir") {
        let path = entry.expect("entry").path();
        if path.extension().is_some_and(|e| e == "webidl") {
            let output = run_agentidl(&["validate", path.to_str().unwrap()]);
            assert!(
                output.status.success(),
                "conformance fixture {:?} should validate: {}",
                path.file_name(),
                stdout(&output)
            );
        }
    }
}

#[test]
fn test_all_invalid_conformance_fixtures_fail() {
    let invalid_dir = PathBuf::from(fixture("conformance/invalid"));
    for entry in std::fs::read_dir(&invalid_dir).expect("read dir") {
        let path = entry.expect("entry").path();
        if path.extension().is_some_and(|e| e == "webidl") {
            let output = run_agentidl(&["validate", path.to_str().unwrap()]);
            assert!(
                !output.status.success(),
                "conformance fixture {:?} should fail validation",
                path.file_name()
            );
        }
    }
}

// ── Determinism: CLI output ───────────────────────────────

#[test]
fn test_cli_validate_determinism_100_iterations() {
    let path = fixture_invalid("unknown-attribute.webidl");
    let first = stdout(&run_agentidl(&["validate", "--json", &path]));

    for i in 0..100 {
        let out = stdout(&run_agentidl(&["validate", "--json", &path]));
        assert_eq!(first, out, "validate --json determinism failure at iteration {}", i);
    }
}
