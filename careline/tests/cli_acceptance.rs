use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn parsed_path(&self) -> PathBuf {
        self.xdg_data.join("careline/parsed_chat_log.json")
    }

    fn write_config(&self, toml: &str) {
        let dir = self.xdg_config.join("careline");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), toml).expect("failed to write config");
    }
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../careline-core/tests/fixtures")
        .join(name)
}

fn run_bin(env: &CliTestEnv, bin_name: &str, args: &[&str]) -> Output {
    let bin_path = match bin_name {
        "careline-parse" => PathBuf::from(assert_cmd::cargo::cargo_bin!("careline-parse")),
        "careline-annotate" => PathBuf::from(assert_cmd::cargo::cargo_bin!("careline-annotate")),
        "careline-view" => PathBuf::from(assert_cmd::cargo::cargo_bin!("careline-view")),
        _ => panic!("unsupported binary in test harness: {bin_name}"),
    };

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("GOOGLE_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute {bin_name}: {e}"))
}

fn assert_success(bin_name: &str, args: &[&str], output: &Output) {
    assert!(
        output.status.success(),
        "{bin_name} {:?} failed\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are utf-8")
}

#[test]
fn parse_writes_default_output() {
    let env = CliTestEnv::new();
    let input = fixture("chat_log.txt");
    let args = ["--input", path_arg(&input)];

    let output = run_bin(&env, "careline-parse", &args);
    assert_success("careline-parse", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Parsed 5 messages"), "stdout: {stdout}");

    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(env.parsed_path()).expect("parsed output"))
            .expect("parsed output is JSON");
    assert_eq!(parsed.as_array().map(Vec::len), Some(5));
    assert_eq!(parsed[0]["sender_role"], "Concierge");
    assert_eq!(parsed[1]["sender_role"], "Member");
}

#[test]
fn parse_rejects_headerless_input() {
    let env = CliTestEnv::new();
    let input = env.home.join("notes.txt");
    fs::write(&input, "Month 1\nno chat here\n").expect("write input");
    let args = ["--input", path_arg(&input)];

    let output = run_bin(&env, "careline-parse", &args);
    assert!(!output.status.success());
    assert!(!env.parsed_path().exists());
}

#[test]
fn view_json_over_tagged_fixture() {
    let env = CliTestEnv::new();
    let input = fixture("journey.json");
    let args = ["--input", path_arg(&input), "--format", "json"];

    let output = run_bin(&env, "careline-view", &args);
    assert_success("careline-view", &args, &output);

    let view: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("view output is JSON");
    assert_eq!(view["events"].as_array().map(Vec::len), Some(10));
    assert_eq!(view["kpis"]["apob"], "92 mg/dL");
    assert_eq!(view["groups"].as_array().map(Vec::len), Some(8));
    assert!(view["stories"]["trace_3"].is_object());
}

#[test]
fn view_text_summary_after_parse() {
    let env = CliTestEnv::new();
    let input = fixture("chat_log.txt");
    let parse_args = ["--input", path_arg(&input)];
    let output = run_bin(&env, "careline-parse", &parse_args);
    assert_success("careline-parse", &parse_args, &output);

    let parsed = env.parsed_path();
    let view_args = ["--input", path_arg(&parsed)];
    let output = run_bin(&env, "careline-view", &view_args);
    assert_success("careline-view", &view_args, &output);

    // Untagged messages all land in the Other lane
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Timeline events: 5"), "stdout: {stdout}");
    assert!(stdout.contains("Other"), "stdout: {stdout}");
    assert!(stdout.contains("ApoB:           115 mg/dL"), "stdout: {stdout}");
}

#[test]
fn view_missing_input_prints_empty_view() {
    let env = CliTestEnv::new();
    let missing = env.home.join("missing.json");
    let args = ["--input", path_arg(&missing), "--format", "json"];

    let output = run_bin(&env, "careline-view", &args);
    assert_success("careline-view", &args, &output);

    let view: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("view output is JSON");
    assert_eq!(view["events"].as_array().map(Vec::len), Some(0));
    assert_eq!(view["kpis"]["apob"], "N/A");
}

#[test]
fn annotate_without_api_key_fails() {
    let env = CliTestEnv::new();
    let input = fixture("journey.json");
    let out = env.home.join("enriched.json");
    let args = ["--input", path_arg(&input), "--output", path_arg(&out)];

    let output = run_bin(&env, "careline-annotate", &args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("GOOGLE_API_KEY"));
    assert!(!out.exists());
}

#[test]
fn invalid_config_is_reported() {
    let env = CliTestEnv::new();
    env.write_config("[derivation]\nper_message_cost = -1.0\n");

    let output = run_bin(&env, "careline-view", &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("configuration"));
}
