//! Integration tests for cacheprog

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn cacheprog(cache_dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("cacheprog");
        cmd.env("GOCACHEPROG_DIR", cache_dir.path().join("cache"))
            .env("CACHEPROG_CONFIG", cache_dir.path().join("config.toml"));
        cmd
    }

    fn stdout_lines(output: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(output)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        cacheprog(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build action cache"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        cacheprog(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cacheprog"));
    }

    #[test]
    fn empty_input_announces_and_exits() {
        let temp = TempDir::new().unwrap();
        cacheprog(&temp)
            .write_stdin("")
            .assert()
            .success()
            .stdout(predicate::str::diff(concat!(
                r#"{"KnownCommands":["put","get","close"]}"#,
                "\n"
            )));

        assert!(temp.path().join("cache").is_dir());
    }

    #[test]
    fn put_get_close_session() {
        let temp = TempDir::new().unwrap();
        // ActionID "act" = YWN0, OutputID "out" = b3V0, body "hello" = aGVsbG8=
        let input = concat!(
            r#"{"ID":1,"Command":"put","ActionID":"YWN0","OutputID":"b3V0","BodySize":5}"#,
            "\n\n\"aGVsbG8=\"\n",
            r#"{"ID":2,"Command":"get","ActionID":"YWN0"}"#,
            "\n\n",
            r#"{"ID":3,"Command":"get","ActionID":"bm9wZQ=="}"#,
            "\n\n",
            r#"{"ID":4,"Command":"close"}"#,
            "\n\n",
        );

        let output = cacheprog(&temp)
            .write_stdin(input)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let lines = stdout_lines(&output);
        assert_eq!(lines.len(), 5);

        assert!(lines[0]["KnownCommands"].is_array());
        assert!(lines[0].get("ID").is_none());

        assert_eq!(lines[1]["ID"], 1);
        let disk_path = lines[1]["DiskPath"].as_str().unwrap().to_string();
        assert_eq!(std::fs::read(&disk_path).unwrap(), b"hello");

        assert_eq!(lines[2]["ID"], 2);
        assert_eq!(lines[2]["OutputID"], "b3V0");
        assert_eq!(lines[2]["Size"], 5);
        assert_eq!(lines[2]["DiskPath"], disk_path.as_str());
        assert!(lines[2]["Time"].is_string());

        assert_eq!(lines[3], serde_json::json!({"ID": 3, "Miss": true}));
        assert_eq!(lines[4], serde_json::json!({"ID": 4}));

        let cache = temp.path().join("cache");
        assert!(cache.join("a-616374").is_file());
        assert!(cache.join("o-616374").is_file());
    }

    #[test]
    fn entries_survive_restart() {
        let temp = TempDir::new().unwrap();
        let put = concat!(
            r#"{"ID":1,"Command":"put","ActionID":"AQID","OutputID":"BA==","BodySize":0}"#,
            "\n\n",
        );
        cacheprog(&temp).write_stdin(put).assert().success();

        let get = concat!(r#"{"ID":1,"Command":"get","ActionID":"AQID"}"#, "\n");
        let output = cacheprog(&temp)
            .write_stdin(get)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let lines = stdout_lines(&output);

        assert_eq!(lines[1]["OutputID"], "BA==");
        assert!(lines[1].get("Miss").is_none());
        assert!(lines[1].get("Size").is_none());
    }

    #[test]
    fn garbage_input_fails() {
        let temp = TempDir::new().unwrap();
        cacheprog(&temp)
            .write_stdin("this is not json\n")
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to unmarshal request"));
    }

    #[test]
    fn verbose_logs_stats_to_stderr() {
        let temp = TempDir::new().unwrap();
        let input = concat!(r#"{"ID":1,"Command":"get","ActionID":"AQ=="}"#, "\n");
        cacheprog(&temp)
            .arg("--verbose")
            .write_stdin(input)
            .assert()
            .success()
            .stderr(predicate::str::contains("Gets: 1, GetMiss: 1, Indexed: 0"));
    }

    #[test]
    fn unusable_cache_dir_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        cacheprog(&temp)
            .env("GOCACHEPROG_DIR", blocker.join("cache"))
            .write_stdin("")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to create cache directory"));
    }
}
