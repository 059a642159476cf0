//! Integration tests for Bazelisk
//!
//! The binary is pointed at a local shell script through
//! `USE_BAZEL_VERSION`, so nothing touches the network.

#[cfg(unix)]
mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::process::Stdio;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// A scratch home with a fake Bazel that echoes its arguments
    struct Fixture {
        dir: TempDir,
        bazel: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let bazel = write_script(
                dir.path(),
                "fake-bazel",
                "echo \"bazel $@\"\nexit ${FAKE_EXIT:-0}",
            );
            Self { dir, bazel }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("bazelisk");
            cmd.current_dir(self.path())
                .env("HOME", self.path())
                .env("XDG_CONFIG_HOME", self.path().join("config"))
                .env("BAZELISK_HOME", self.path().join("cache"))
                .env("USE_BAZEL_VERSION", &self.bazel)
                .env_remove("BAZELISK_SKIP_WRAPPER")
                .env_remove("BAZELISK_BASE_URL")
                .env_remove("BAZELISK_LOG");
            cmd
        }
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn arguments_are_forwarded() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["build", "--config=ci", "//..."])
            .assert()
            .success()
            .stdout(predicate::str::contains("bazel build --config=ci //..."));
    }

    #[test]
    fn exit_code_is_passed_through() {
        let fixture = Fixture::new();
        fixture.cmd().arg("test").env("FAKE_EXIT", "3").assert().code(3);
    }

    #[test]
    fn help_goes_to_bazel() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("bazel --help"));
    }

    #[test]
    fn version_prints_banner_first() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("Bazelisk version: "))
            .stdout(predicate::str::contains("bazel version"));
    }

    #[test]
    fn version_gnu_format() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["version", "--gnu_format"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("Bazelisk 0."));
    }

    #[test]
    fn bazelversion_file_is_honoured() {
        let fixture = Fixture::new();
        fs::write(fixture.path().join("WORKSPACE"), "").unwrap();
        fs::write(
            fixture.path().join(".bazelversion"),
            format!("{}\n", fixture.bazel.display()),
        )
        .unwrap();

        fixture
            .cmd()
            .env_remove("USE_BAZEL_VERSION")
            .arg("info")
            .assert()
            .success()
            .stdout(predicate::str::contains("bazel info"));
    }

    #[test]
    fn workspace_wrapper_receives_real_binary() {
        let fixture = Fixture::new();
        fs::write(fixture.path().join("WORKSPACE"), "").unwrap();
        write_script(
            fixture.path(),
            "tools/bazel",
            "echo \"wrapper $BAZEL_REAL\"\nexec \"$BAZEL_REAL\" \"$@\"",
        );

        fixture
            .cmd()
            .arg("build")
            .assert()
            .success()
            .stdout(predicate::str::contains(format!(
                "wrapper {}",
                fixture.bazel.display()
            )))
            .stdout(predicate::str::contains("bazel build"));
    }

    #[test]
    fn skip_wrapper_guard() {
        let fixture = Fixture::new();
        fs::write(fixture.path().join("WORKSPACE"), "").unwrap();
        write_script(fixture.path(), "tools/bazel", "echo wrapper\nexit 9");

        fixture
            .cmd()
            .env("BAZELISK_SKIP_WRAPPER", "true")
            .arg("build")
            .assert()
            .success()
            .stdout(predicate::str::contains("wrapper").not());
    }

    #[test]
    fn invalid_specification_is_reported() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .env("USE_BAZEL_VERSION", "myorg/branch/abc")
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid version specification"));
    }

    #[test]
    fn strict_with_local_binary_fails() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["--strict", "build"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid version \"unknown\""));
    }

    #[test]
    fn migrate_with_local_binary_fails() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .args(["--migrate", "build"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid version"));
    }

    #[test]
    fn missing_local_binary_is_launch_error() {
        let fixture = Fixture::new();
        fixture
            .cmd()
            .env("USE_BAZEL_VERSION", fixture.path().join("missing"))
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Could not launch"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn malformed_config_file_is_rejected() {
        let fixture = Fixture::new();
        let config = fixture.path().join("config").join("bazelisk");
        fs::create_dir_all(&config).unwrap();
        fs::write(config.join("config.toml"), "shutdown = \"maybe\"").unwrap();

        fixture
            .cmd()
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn termination_is_forwarded_to_bazel() {
        let fixture = Fixture::new();
        let started = fixture.path().join("started");
        let marker = fixture.path().join("terminated");
        let bazel = write_script(
            fixture.path(),
            "trapping-bazel",
            &format!(
                "trap 'echo term > {}; exit 42' TERM\nsleep 0.2\ntouch {}\nwhile :; do sleep 0.1; done",
                marker.display(),
                started.display()
            ),
        );

        let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_bazelisk"))
            .arg("build")
            .current_dir(fixture.path())
            .env("HOME", fixture.path())
            .env("XDG_CONFIG_HOME", fixture.path().join("config"))
            .env("BAZELISK_HOME", fixture.path().join("cache"))
            .env("USE_BAZEL_VERSION", &bazel)
            .env_remove("BAZELISK_SKIP_WRAPPER")
            .env_remove("BAZELISK_BASE_URL")
            .stdout(Stdio::null())
            .spawn()
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while !started.exists() {
            assert!(Instant::now() < deadline, "bazel never started");
            std::thread::sleep(Duration::from_millis(20));
        }
        // SAFETY: plain kill(2) on a process this test spawned.
        unsafe {
            libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
        }

        let status = child.wait().unwrap();
        assert_eq!(status.code(), Some(42));
        assert_eq!(fs::read_to_string(&marker).unwrap().trim(), "term");
    }
}
