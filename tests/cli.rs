use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Run the built binary inside `dir` with a clean environment
fn run_cli(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_discordpoll"))
        .args(args)
        .current_dir(dir)
        .env_remove("DISCORDPOLL_CONFIG")
        .env_remove("DISCORDPOLL_TOKEN")
        .env_remove("DISCORDPOLL_CHANNEL_ID")
        .env("RUST_LOG", "info")
        .output()
        .expect("Failed to execute discordpoll")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

const PREVIEW_CONFIG: &str = r#"
discord:
  token: "t"
  channelId: 42
poll:
  duration: "2d"
  question: "Where do we eat?"
  allowMultiselect: true
  options:
    - content: "Ramen"
      emojiName: "🍜"
      endMessage: "Ramen!"
    - content: "Curry"
      emojiId: "998877"
      endMessage: "Curry!"
"#;

#[test]
fn test_run_without_config_writes_template() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), &[]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let written = fs::read_to_string(dir.path().join("config.yml")).unwrap();
    assert!(written.contains("channelId"));
    assert!(stderr(&output).contains("wrote default config"));
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("poll.yml");
    let config_arg = config.to_str().unwrap();

    let first = run_cli(dir.path(), &["--config", config_arg, "init"]);
    assert!(first.status.success());
    assert!(stdout(&first).contains("Wrote"));

    fs::write(&config, "discord: {}\n").unwrap();
    let second = run_cli(dir.path(), &["--config", config_arg, "init"]);
    assert!(!second.status.success());
    assert!(stderr(&second).contains("already exists"));
    assert_eq!(fs::read_to_string(&config).unwrap(), "discord: {}\n");

    let forced = run_cli(dir.path(), &["--config", config_arg, "init", "--force"]);
    assert!(forced.status.success());
    assert_ne!(fs::read_to_string(&config).unwrap(), "discord: {}\n");
}

#[test]
fn test_preview_prints_payload() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yml"), PREVIEW_CONFIG).unwrap();

    let output = run_cli(dir.path(), &["preview"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    insta::assert_snapshot!(stdout(&output).trim_end(), @r###"
    {
      "content": "",
      "poll": {
        "question": {
          "text": "Where do we eat?"
        },
        "answers": [
          {
            "poll_media": {
              "text": "Ramen",
              "emoji": {
                "name": "🍜"
              }
            }
          },
          {
            "poll_media": {
              "text": "Curry",
              "emoji": {
                "id": "998877"
              }
            }
          }
        ],
        "duration": 48,
        "allow_multiselect": true,
        "layout_type": 1
      }
    }
    "###);
}

#[test]
fn test_preview_rejects_too_many_options() {
    let dir = tempfile::tempdir().unwrap();
    let mut yaml = String::from("poll:\n  options:\n");
    for i in 0..11 {
        yaml.push_str(&format!("    - content: \"opt {}\"\n", i));
    }
    fs::write(dir.path().join("config.yml"), yaml).unwrap();

    let output = run_cli(dir.path(), &["preview"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("poll.options has 11 entries"));
}

#[test]
fn test_run_with_missing_token_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("config.yml"),
        "discord:\n  channelId: \"42\"\npoll:\n  options:\n    - content: \"a\"\n",
    )
    .unwrap();

    let output = run_cli(dir.path(), &["run"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("discord.token is not set"));
}

#[test]
fn test_run_rejects_bad_wait_override() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yml"), PREVIEW_CONFIG).unwrap();

    let output = run_cli(dir.path(), &["run", "--wait", "soon"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid --wait value"));
}

/// Interrupt handling: the binary runs against a mock Discord and receives SIGINT
#[cfg(unix)]
mod interrupt {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader};
    use std::process::{Child, Stdio};
    use std::sync::mpsc::{self, Receiver};
    use std::thread::{self, JoinHandle};
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LINE_TIMEOUT: Duration = Duration::from_secs(20);

    fn poll_config(api_base: &str) -> String {
        format!(
            r#"
discord:
  token: "t"
  channelId: "123"
  apiBase: "{}"
poll:
  duration: "30s"
  question: "Where do we eat?"
  options:
    - content: "Ramen"
      endMessage: "Ramen!"
    - content: "Curry"
      endMessage: "Curry!"
"#,
            api_base
        )
    }

    fn poll_message(finalized: bool) -> serde_json::Value {
        json!({
            "id": "901",
            "channel_id": "123",
            "content": "",
            "poll": {
                "question": {"text": "Where do we eat?"},
                "answers": [
                    {"answer_id": 1, "poll_media": {"text": "Ramen"}},
                    {"answer_id": 2, "poll_media": {"text": "Curry"}}
                ],
                "allow_multiselect": false,
                "layout_type": 1,
                "results": {
                    "is_finalized": finalized,
                    "answer_counts": [{"id": 1, "count": 3, "me_voted": false}]
                }
            }
        })
    }

    async fn mount_poll_creation(server: &MockServer, announcements: u64) {
        Mock::given(method("GET"))
            .and(path("/channels/123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "123", "type": 0})),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/channels/123/messages"))
            .and(body_json(json!({"content": "Ramen!"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "902", "channel_id": "123", "content": "Ramen!"})),
            )
            .expect(announcements)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/channels/123/messages"))
            .and(body_partial_json(json!({"content": "", "poll": {"duration": 1}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(poll_message(false)))
            .expect(1)
            .mount(server)
            .await;
    }

    /// Start `run` in `dir` with stderr forwarded line by line
    fn spawn_run(dir: &Path) -> (Child, Receiver<String>, JoinHandle<String>) {
        let mut child = Command::new(env!("CARGO_BIN_EXE_discordpoll"))
            .arg("run")
            .current_dir(dir)
            .env_remove("DISCORDPOLL_CONFIG")
            .env_remove("DISCORDPOLL_TOKEN")
            .env_remove("DISCORDPOLL_CHANNEL_ID")
            .env("RUST_LOG", "info")
            .env("NO_COLOR", "1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn discordpoll");

        let stderr = child.stderr.take().unwrap();
        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            let mut all = String::new();
            for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                all.push_str(&line);
                all.push('\n');
                let _ = tx.send(line);
            }
            all
        });

        (child, rx, reader)
    }

    fn wait_for_line(lines: &Receiver<String>, needle: &str) {
        let deadline = Instant::now() + LINE_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match lines.recv_timeout(remaining) {
                Ok(line) if line.contains(needle) => return,
                Ok(_) => continue,
                Err(e) => panic!("no log line containing '{}': {}", needle, e),
            }
        }
    }

    /// Give the runtime a moment to install its SIGINT handler, then send one
    fn interrupt(child: &Child) {
        thread::sleep(Duration::from_millis(300));
        let status = Command::new("kill")
            .args(["-INT", &child.id().to_string()])
            .status()
            .expect("Failed to run kill");
        assert!(status.success());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sigint_ends_wait_and_still_announces() {
        let server = MockServer::start().await;
        mount_poll_creation(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/channels/123/polls/901/expire"))
            .respond_with(ResponseTemplate::new(200).set_body_json(poll_message(false)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels/123/messages/901"))
            .respond_with(ResponseTemplate::new(200).set_body_json(poll_message(true)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yml"), poll_config(&server.uri())).unwrap();
        let work_dir = dir.path().to_path_buf();

        let (output, stderr) = tokio::task::spawn_blocking(move || {
            let (child, lines, reader) = spawn_run(&work_dir);
            wait_for_line(&lines, "poll running");
            interrupt(&child);
            let output = child.wait_with_output().unwrap();
            (output, reader.join().unwrap())
        })
        .await
        .unwrap();

        assert!(output.status.success(), "stderr: {}", stderr);
        assert!(stderr.contains("interrupted, ending the poll early"));
        let stdout = stdout(&output);
        assert!(stdout.contains(r#""interrupted": true"#), "stdout: {}", stdout);
        assert!(stdout.contains(r#""waited_secs": 0"#), "stdout: {}", stdout);
        assert!(stdout.contains(r#""expired": true"#), "stdout: {}", stdout);
        assert!(stdout.contains(r#""announcement": "Ramen!""#), "stdout: {}", stdout);

        server.verify().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_sigint_aborts_while_finishing() {
        let server = MockServer::start().await;
        mount_poll_creation(&server, 0).await;
        Mock::given(method("POST"))
            .and(path("/channels/123/polls/901/expire"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(poll_message(false))
                    .set_delay(Duration::from_secs(25)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yml"), poll_config(&server.uri())).unwrap();
        let work_dir = dir.path().to_path_buf();

        let started = Instant::now();
        let (output, stderr) = tokio::task::spawn_blocking(move || {
            let (child, lines, reader) = spawn_run(&work_dir);
            wait_for_line(&lines, "poll running");
            interrupt(&child);
            wait_for_line(&lines, "interrupted, ending the poll early");
            interrupt(&child);
            let output = child.wait_with_output().unwrap();
            (output, reader.join().unwrap())
        })
        .await
        .unwrap();

        assert!(!output.status.success(), "stderr: {}", stderr);
        assert!(started.elapsed() < Duration::from_secs(15));
        assert!(stderr.contains("interrupted again, aborting"));
        assert!(stderr.contains("Interrupted before the poll result was announced"));
        assert!(!stdout(&output).contains("interrupted"));

        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| r.url.path() != "/channels/123/messages/901"));
        assert!(requests
            .iter()
            .all(|r| r.body_json::<serde_json::Value>().ok() != Some(json!({"content": "Ramen!"}))));
    }
}
