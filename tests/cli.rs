//! End-to-end checks driving the CLI entry point against real files.

use mamegen::cli::{run, Args};
use std::fs;

fn write_program(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn generates_csv_with_header_and_requested_row_count() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_program(
        &dir,
        "program.mame",
        "CONFIG {\n    type CSV\n    count 3\n    reproducible true\n}\nHEADER { [\"id\"] }\nCOLUMN_RULES {\n    LABEL \"id\" {\n        seq 1..100\n        digits 3\n    }\n}\n",
    );
    let output = dir.path().join("out.csv");
    let args = Args { input, output: output.clone(), verbose: 0 };
    run(&args).unwrap();

    let contents = fs::read_to_string(&output).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("id"));
    assert_eq!(lines.next(), Some("001"));
    assert_eq!(lines.next(), Some("002"));
    assert_eq!(lines.next(), Some("003"));
    assert_eq!(lines.next(), None);
}

#[test]
fn generates_json_array_of_objects() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_program(
        &dir,
        "program.mame",
        "CONFIG {\n    type JSON\n    count 2\n    reproducible true\n}\nHEADER { [\"x\"] }\nCOLUMN_RULES {\n    LABEL \"x\" { fixed 7 }\n}\n",
    );
    let output = dir.path().join("out.json");
    let args = Args { input, output: output.clone(), verbose: 0 };
    run(&args).unwrap();

    let contents = fs::read_to_string(&output).unwrap();
    assert_eq!(contents, r#"[{"x":7},{"x":7}]"#);
}

#[test]
fn output_path_extension_overrides_config_type() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_program(
        &dir,
        "program.mame",
        "CONFIG {\n    type CSV\n    count 1\n    reproducible true\n}\nHEADER { [\"x\"] }\nCOLUMN_RULES {\n    LABEL \"x\" { fixed 7 }\n}\n",
    );
    let output = dir.path().join("out.json");
    let args = Args { input, output: output.clone(), verbose: 0 };
    run(&args).unwrap();

    let contents = fs::read_to_string(&output).unwrap();
    assert_eq!(contents, r#"[{"x":7}]"#);
}

#[test]
fn repeated_runs_with_reproducible_true_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let src = "CONFIG {\n    type CSV\n    count 10\n    reproducible true\n}\nHEADER { [\"x\"] }\nCOLUMN_RULES {\n    LABEL \"x\" {\n        charset alnum\n        length 12\n    }\n}\n";
    let input = write_program(&dir, "program.mame", src);

    let out1 = dir.path().join("out1.csv");
    run(&Args { input: input.clone(), output: out1.clone(), verbose: 0 }).unwrap();
    let out2 = dir.path().join("out2.csv");
    run(&Args { input, output: out2.clone(), verbose: 0 }).unwrap();

    assert_eq!(fs::read(out1).unwrap(), fs::read(out2).unwrap());
}

#[test]
fn reports_syntax_error_for_missing_section_braces() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_program(&dir, "program.mame", "CONFIG type CSV }\n");
    let output = dir.path().join("out.csv");
    let args = Args { input, output, verbose: 0 };
    let err = run(&args).unwrap_err();
    assert!(matches!(err, mamegen::Error::Syntax { .. }));
}

#[test]
fn reports_unknown_column_for_bad_selector_label() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_program(
        &dir,
        "program.mame",
        "HEADER { [\"id\"] }\nCOLUMN_RULES {\n    LABEL \"nope\" { fixed 1 }\n}\n",
    );
    let output = dir.path().join("out.csv");
    let args = Args { input, output, verbose: 0 };
    let err = run(&args).unwrap_err();
    assert!(matches!(err, mamegen::Error::UnknownColumn(_)));
}
