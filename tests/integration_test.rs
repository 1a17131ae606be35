use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Output;

async fn run_edubot(args: &[&str]) -> Output {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_edubot"))
        .args(args)
        .env("GOOGLE_API_KEY", "")
        .env("GEMINI_BASE_URL", "http://127.0.0.1:9")
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_canned_reply_without_key() {
    let output = run_edubot(&["-m", "hello there"]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        predicate::str::contains(
            "Hello! How can I help you with your overseas education journey today?"
        )
        .eval(&stdout),
        "unexpected stdout: {stdout}"
    );
}

#[tokio::test]
async fn test_missing_key_message() {
    let temp = assert_fs::TempDir::new().unwrap();
    let profile = temp.child("profile.txt");
    profile.write_str("Bachelor of Science, GPA 3.2").unwrap();

    let output = run_edubot(&[
        "--file",
        profile.path().to_str().unwrap(),
        "-m",
        "Which universities should I apply to?",
    ])
    .await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("Attached profile.txt (txt)"), "stdout: {stdout}");
    assert!(
        stdout.contains("I'm unable to process your request, as I do not have access to Google API."),
        "stdout: {stdout}"
    );
    assert!(stderr.contains("GOOGLE_API_KEY"), "stderr: {stderr}");
}

#[tokio::test]
async fn test_missing_upload_is_reported() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.child("nope.pdf");
    missing.assert(predicate::path::missing());

    let output = run_edubot(&["--file", missing.path().to_str().unwrap(), "-m", "goodbye"]).await;

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not attach"), "stderr: {stderr}");
}

#[tokio::test]
async fn test_repl_commands() {
    use tokio::io::AsyncWriteExt;

    let mut child = tokio::process::Command::new(env!("CARGO_BIN_EXE_edubot"))
        .env("GOOGLE_API_KEY", "")
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    stdin
        .write_all(b"/files\nwhich country is best?\n/history\n/quit\n")
        .await
        .unwrap();
    drop(stdin);

    let output = child.wait_with_output().await.unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Hi there! I'm EDUBOT"), "stdout: {stdout}");
    assert!(stdout.contains("No files attached."));
    assert!(stdout.contains("Sure, what country are you interested in studying in?"));
    assert!(stdout.contains("user: which country is best?"));
}
