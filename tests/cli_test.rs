use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Helper to run the sudothink binary with `HOME` pointed at `home`.
///
/// Any inherited API key is removed so tests never reach the network.
fn run_sudothink(home: &Path, args: &[&str], mock: bool, stdin: &str) -> Result<Output> {
    let envs: &[(&str, &str)] = if mock { &[("SUDOTHINK_USE_MOCK", "1")] } else { &[] };
    run_sudothink_with_env(home, args, envs, stdin)
}

/// Like [`run_sudothink`], with extra environment variables set on the child.
fn run_sudothink_with_env(
    home: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
    stdin: &str,
) -> Result<Output> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sudothink"));
    cmd.args(args)
        .current_dir(home)
        .env("HOME", home)
        .env_remove("OPENAI_API_KEY")
        .env_remove("SUDOTHINK_USE_MOCK")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    cmd.envs(envs.iter().copied());

    let mut child = cmd.spawn()?;
    if let Some(mut input) = child.stdin.take() {
        input.write_all(stdin.as_bytes())?;
    }
    Ok(child.wait_with_output()?)
}

#[test]
fn test_help_exits_successfully() -> Result<()> {
    let home = TempDir::new()?;

    for flag in ["--help", "-h"] {
        let output = run_sudothink(home.path(), &[flag], false, "")?;
        assert!(output.status.success(), "{flag} should exit 0");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("setup"), "Help should mention setup. Stdout: {stdout}");
    }

    Ok(())
}

#[test]
fn test_missing_query_exits_with_usage() -> Result<()> {
    let home = TempDir::new()?;

    let output = run_sudothink(home.path(), &[], false, "")?;

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage: sudothink <query> [mode]"));
    Ok(())
}

#[test]
fn test_missing_api_key_fails_fast() -> Result<()> {
    let home = TempDir::new()?;

    let output = run_sudothink(home.path(), &["list", "files"], false, "")?;

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("API key not configured"), "Stdout: {stdout}");
    // Nothing was sent, so nothing was logged.
    assert!(!home.path().join(".ai-terminal-history.log").exists());
    Ok(())
}

#[test]
fn test_setup_rejects_invalid_key() -> Result<()> {
    let home = TempDir::new()?;

    let output = run_sudothink(home.path(), &["setup", "--api-key", "not-a-key"], false, "")?;

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration failed"));
    assert!(!home.path().join(".sudothink").join("config.json").exists());
    Ok(())
}

#[test]
fn test_setup_store_status_remove_cycle() -> Result<()> {
    let home = TempDir::new()?;
    let config_path = home.path().join(".sudothink").join("config.json");

    let output = run_sudothink(home.path(), &["setup", "--api-key", "sk-integration-test-key"], false, "")?;
    assert!(output.status.success());
    assert!(config_path.exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        assert_eq!(fs::metadata(&config_path)?.permissions().mode() & 0o777, 0o600);
        assert_eq!(
            fs::metadata(home.path().join(".sudothink"))?.permissions().mode() & 0o777,
            0o700
        );
    }

    let output = run_sudothink(home.path(), &["setup", "--status"], false, "")?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sk-inte...-key"), "Stdout: {stdout}");

    let output = run_sudothink(home.path(), &["setup", "--remove"], false, "")?;
    assert!(String::from_utf8_lossy(&output.stdout).contains("API key removed"));

    let output = run_sudothink(home.path(), &["setup", "--status"], false, "")?;
    assert!(String::from_utf8_lossy(&output.stdout).contains("not configured"));
    Ok(())
}

#[test]
fn test_environment_key_is_reported_without_config_file() -> Result<()> {
    let home = TempDir::new()?;

    let output = run_sudothink_with_env(
        home.path(),
        &["setup", "--status"],
        &[("OPENAI_API_KEY", "sk-envkey1234567890")],
        "",
    )?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("API key is configured"), "Stdout: {stdout}");
    assert!(stdout.contains("sk-envk...7890"), "Stdout: {stdout}");
    assert!(!home.path().join(".sudothink").join("config.json").exists());
    Ok(())
}

#[test]
fn test_query_starting_with_setup_is_not_the_subcommand() -> Result<()> {
    let home = TempDir::new()?;

    let output = run_sudothink(home.path(), &["setup", "a", "cron", "job"], true, "")?;

    assert!(output.status.success(), "Stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ls -la");
    Ok(())
}

#[test]
fn test_usage_error_exits_with_one() -> Result<()> {
    let home = TempDir::new()?;

    let output = run_sudothink(home.path(), &["setup", "--remove", "--status"], false, "")?;

    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
    Ok(())
}

#[test]
fn test_setup_reads_key_from_stdin() -> Result<()> {
    let home = TempDir::new()?;

    let output = run_sudothink(home.path(), &["setup"], false, "sk-typed-in-key\n")?;

    assert!(output.status.success());
    let content = fs::read_to_string(home.path().join(".sudothink").join("config.json"))?;
    assert!(content.contains("sk-typed-in-key"));
    Ok(())
}

#[test]
fn test_command_mode_prints_generated_command() -> Result<()> {
    let home = TempDir::new()?;

    let output = run_sudothink(home.path(), &["list", "files"], true, "")?;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ls -la");

    let log = fs::read_to_string(home.path().join(".ai-terminal-history.log"))?;
    assert!(log.contains("Query: list files"));
    assert!(log.contains("Success: true"));
    Ok(())
}

#[test]
fn test_plan_mode_executes_confirmed_steps() -> Result<()> {
    let home = TempDir::new()?;

    // execute the plan, skip step 1, run step 2
    let output = run_sudothink(home.path(), &["say", "hello", "plan"], true, "y\nn\ny\n")?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("📋 Plan:"));
    assert!(stdout.contains("Skipping step"));
    assert!(stdout.contains("📤 Output: mock-plan-step"), "Stdout: {stdout}");
    Ok(())
}

#[test]
fn test_plan_declined_runs_nothing() -> Result<()> {
    let home = TempDir::new()?;

    let output = run_sudothink(home.path(), &["say", "hello", "plan"], true, "n\n")?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("📋 Plan:"));
    assert!(!stdout.contains("Executing 2 steps"));
    Ok(())
}

#[test]
fn test_explain_mode() -> Result<()> {
    let home = TempDir::new()?;

    let output = run_sudothink(home.path(), &["what", "is", "chmod", "explain"], true, "")?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("💡 Analysis:"));
    assert!(stdout.contains("mock explanation"));
    Ok(())
}
