//! Test harness for the Yamlet parser against fixture files.
//!
//! Every .yaml file in test/yaml/ must parse to the value described by the
//! JSON file of the same name in test/json/. Every .yaml file in test/nay/
//! must fail with exactly the message in the .error file next to it.

use std::fs;
use std::path::{Path, PathBuf};

use libyamlet::{parse, parse_with_options, Mapping, ParseOptions, Value};

/// Root test directory.
fn test_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("test")
}

/// All .yaml files in a subdirectory of test/, sorted.
fn yaml_files(subdir: &str) -> Vec<PathBuf> {
    let pattern = test_root().join(subdir).join("*.yaml");
    let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .expect("valid glob pattern")
        .flatten()
        .collect();
    files.sort();
    files
}

fn stem(path: &Path) -> String {
    path.file_stem().unwrap().to_string_lossy().to_string()
}

/// Convert expected JSON into a value. JSON integers become `Int`, other
/// numbers `Double`, and object keys string keys.
fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Double(n.as_f64().unwrap()),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Sequence(items.iter().map(from_json).collect()),
        serde_json::Value::Object(entries) => {
            let mut map = Mapping::new();
            for (k, v) in entries {
                map.try_insert(Value::from(k.as_str()), from_json(v)).unwrap();
            }
            Value::Mapping(map)
        }
    }
}

/// Read the expected value for a test/yaml fixture.
fn read_expected_json(yaml_path: &Path) -> Option<Value> {
    let json_path = test_root().join("json").join(format!("{}.json", stem(yaml_path)));
    let text = fs::read_to_string(json_path).ok()?;
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    Some(from_json(&json))
}

/// Read the expected error message for a test/nay fixture.
fn read_expected_error(nay_path: &Path) -> Option<String> {
    fs::read_to_string(nay_path.with_extension("error")).ok()
}

/// Run a single test/yaml fixture (expected to succeed).
fn run_yaml_test(path: &Path) -> Result<(), String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let name = stem(path);

    let value = parse(&content).map_err(|e| format!("{}: Unexpected parse error: {}", name, e))?;
    match read_expected_json(path) {
        Some(expected) if expected != value => Err(format!(
            "{}: Output mismatch\n    expected: {}\n    actual:   {}",
            name, expected, value
        )),
        Some(_) => {
            println!("  {} => {}", name, value);
            Ok(())
        }
        None => Err(format!("{}: missing expected json", name)),
    }
}

/// Run a single test/nay fixture (expected to fail with a specific error).
fn run_nay_test(path: &Path) -> Result<(), String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let filename = path.file_name().unwrap().to_string_lossy().to_string();

    let options = ParseOptions::new().source_name(&filename);
    match parse_with_options(&content, &options) {
        Ok(value) => Err(format!(
            "{}: Expected parse error, but got success: {:?}",
            filename, value
        )),
        Err(e) => {
            let actual = e.to_string();
            match read_expected_error(path) {
                Some(expected) if expected.trim_end_matches('\n') == actual => {
                    println!("  {} => error (as expected)", filename);
                    Ok(())
                }
                Some(expected) => Err(format!(
                    "{}: Error mismatch\n    expected: {}\n    actual:   {}",
                    filename,
                    expected.trim_end_matches('\n'),
                    actual
                )),
                None => Err(format!("{}: missing .error file, got: {}", filename, actual)),
            }
        }
    }
}

fn run_all(kind: &str, files: &[PathBuf], run: fn(&Path) -> Result<(), String>) {
    assert!(!files.is_empty(), "no {} fixtures found", kind);
    println!("\nRunning {} {} fixtures:", files.len(), kind);

    let errors: Vec<String> = files.iter().filter_map(|f| run(f).err()).collect();
    println!(
        "\nResults: {} passed, {} failed",
        files.len() - errors.len(),
        errors.len()
    );
    if !errors.is_empty() {
        println!("\nErrors:");
        for error in &errors {
            println!("  - {}", error);
        }
    }
    assert!(errors.is_empty(), "{} {} fixtures failed", errors.len(), kind);
}

#[test]
fn test_all_yaml_fixtures() {
    run_all("yaml", &yaml_files("yaml"), run_yaml_test);
}

#[test]
fn test_all_nay_fixtures() {
    run_all("nay", &yaml_files("nay"), run_nay_test);
}

#[test]
fn test_every_yaml_fixture_has_json() {
    for path in yaml_files("yaml") {
        assert!(
            read_expected_json(&path).is_some(),
            "{} has no json counterpart",
            stem(&path)
        );
    }
}
