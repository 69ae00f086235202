use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn facemill(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_facemill"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run facemill")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

#[test]
fn test_generate_default_job_to_stdout() {
    let dir = TempDir::new().expect("temp dir");
    let config = dir.path().join("config.toml");
    let job = dir.path().join("job.json");

    assert!(facemill(&config, &["init-config", path_str(&config)]).status.success());
    assert!(facemill(&config, &["init-job", path_str(&job)]).status.success());

    let output = facemill(&config, &["generate", "--job", path_str(&job), "--stdout"]);
    assert!(output.status.success());
    let program = String::from_utf8_lossy(&output.stdout);
    assert!(program.starts_with("(Face milling program)\n"));
    assert!(program.contains("N1 (Roughing)"));
    assert!(program.contains("N2 (Finishing)"));
    assert!(program.contains("M06 T1\nG55\nG5.1 Q1 R5\nG0 G90 B0 C0\nM32 (Clamp C)\nM34 (Clamp B)\n"));
    assert!(program.ends_with("M30\n%\n"));
}

#[test]
fn test_rejected_job_lists_violations() {
    let dir = TempDir::new().expect("temp dir");
    let config = dir.path().join("config.toml");
    let job = dir.path().join("job.json");

    assert!(facemill(&config, &["init-config", path_str(&config)]).status.success());
    let broken = serde_json::json!({
        "position": { "reference": "table", "x": 0.0, "y": 0.0 },
        "stock": { "width": 300.0, "length": 200.0, "height": 50.0, "finished_height": 45.0 },
        "roughing": {
            "tool_number": -1,
            "tool_diameter": 50.0,
            "strategy": "spiral_in",
            "width_of_cut": 40.0,
            "depth_of_cut": 2.0,
            "leave_for_finishing": 0.0,
            "rpm": 3000.0,
            "feedrate": 1500.0
        }
    });
    std::fs::write(&job, broken.to_string()).expect("write job");

    let output = facemill(&config, &["validate", "--job", path_str(&job)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("roughing.tool_number: must be a positive integer, got -1"));
    assert!(stderr.contains("coolant: required section is missing"));
}
