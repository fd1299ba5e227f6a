use tlps::{CaptureOutput, Runtime, TlpsError};

fn annotations(content: &str, pattern: &str) -> Vec<String> {
    let re = regex::RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(false)
        .build()
        .expect("regex should compile correctly");

    re.captures_iter(content)
        .map(|m| m.get(1).expect("annotation should have a value").as_str().trim_end().to_string())
        .collect()
}

fn run_file(path: &str) -> Result<(), TlpsError> {
    let content = std::fs::read_to_string(path)?;

    let expected_output = annotations(&content, r"//\s*expect: ?(.*)");
    let expected_compile_errors = annotations(&content, r"//\s*(\[line \d+\] Error.*)");
    let expected_runtime_error = annotations(&content, r"//\s*expect runtime error: (.*)").into_iter().next();

    let output = CaptureOutput::new();
    let diagnostics = CaptureOutput::new();
    let mut runtime = Runtime::new().with_output(output.clone()).with_errors(diagnostics.clone());

    let errors = runtime.run_file(path)?;

    if !expected_compile_errors.is_empty() {
        assert!(runtime.had_error(), "{}: expected a compile error to be raised", path);
        let actual: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(actual, expected_compile_errors, "{}: compile errors should match", path);
        assert_eq!(output.contents(), "", "{}: nothing should run after a compile error", path);
        return Ok(());
    }

    assert!(!runtime.had_error(), "{}: did not expect a compile error, got {}", path, diagnostics);

    match expected_runtime_error {
        Some(message) => {
            assert!(runtime.had_runtime_error(), "{}: expected a runtime error to be raised", path);
            let first = errors.first().map(|e| e.message().to_string());
            assert_eq!(first.as_deref(), Some(message.as_str()), "{}: runtime error should match", path);
        }
        None => assert!(!runtime.had_runtime_error(), "{}: did not expect a runtime error, got {}", path, diagnostics),
    }

    let actual = output.contents();
    let actual: Vec<&str> = actual.lines().collect();
    assert_eq!(actual, expected_output, "{}: output should match", path);

    Ok(())
}

include!(concat!(env!("OUT_DIR"), "/tests/lang.rs"));
