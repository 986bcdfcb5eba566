//! Integration tests for jarprep

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn jarprep() -> Command {
        cargo_bin_cmd!("jarprep")
    }

    #[test]
    fn help_displays() {
        jarprep()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--sourcepaths, -sps"))
            .stdout(predicate::str::contains("--signedjarhandlingstrategy"));
    }

    #[test]
    fn version_displays() {
        jarprep()
            .arg("-V")
            .assert()
            .success()
            .stdout(predicate::str::contains("jarprep"));
    }

    #[test]
    fn no_arguments_fails() {
        jarprep()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Argument parsing failed"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn unknown_flag_fails() {
        jarprep()
            .args(["--suff", "-x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown flag"));
    }

    #[test]
    fn invalid_workers_fails() {
        jarprep()
            .args(["--workers", "-1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--workers"));
    }

    #[test]
    fn nothing_to_preprocess_fails() {
        jarprep()
            .args(["--verbose"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--sourcepaths"));
    }

    #[test]
    fn agent_required() {
        jarprep()
            .args(["-sps", "/tmp/does-not-matter.jar"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--agentPath"));
    }
}

#[cfg(unix)]
mod pipeline_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use serial_test::serial;
    use std::fs::{self, File};
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Stands in for `java -jar <agent>`: copies `--input` to `--output`, and
    /// fails like a missing class for inputs named `broken*`
    const FAKE_JAVA: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --input) input="$2"; shift 2 ;;
    --output) output="$2"; shift 2 ;;
    *) shift ;;
  esac
done
case "$(basename "$input")" in
  broken*)
    echo "Exception in thread \"main\" java.lang.NoClassDefFoundError: org/acme/Missing" >&2
    exit 1
    ;;
esac
cp "$input" "$output"
"#;

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let bin = dir.path().join("java-home").join("bin");
            fs::create_dir_all(&bin).unwrap();
            let java = bin.join("java");
            fs::write(&java, FAKE_JAVA).unwrap();
            fs::set_permissions(&java, fs::Permissions::from_mode(0o755)).unwrap();
            fs::create_dir_all(dir.path().join("libs")).unwrap();
            Self { dir }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn out(&self) -> PathBuf {
            self.path().join("out")
        }

        fn jar(&self, name: &str, entries: &[&str]) -> PathBuf {
            let path = self.path().join("libs").join(name);
            let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            for entry in entries {
                zip.start_file(*entry, options).unwrap();
                zip.write_all(name.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
            path
        }

        fn command(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("jarprep");
            cmd.env("JAVA_HOME", self.path().join("java-home"))
                .args(["-ap", "/opt/agent.jar", "-suf", "-inst"])
                .arg("-out")
                .arg(self.out());
            cmd
        }
    }

    #[test]
    #[serial]
    fn instruments_directory_of_jars() {
        let ws = Workspace::new();
        ws.jar("a.jar", &["com/example/A.class"]);
        ws.jar("b.jar", &["com/example/B.class"]);
        let libs = ws.path().join("libs");

        ws.command()
            .arg("-sps")
            .arg(format!("{}@lib", libs.display()))
            .args(["--workers", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 transformed, 0 cached"));

        assert!(ws.out().join("lib").join("a-inst.jar").is_file());
        assert!(ws.out().join("lib").join("b-inst.jar").is_file());
    }

    #[test]
    #[serial]
    fn checksum_cache_reuses_outputs() {
        let ws = Workspace::new();
        let a = ws.jar("a.jar", &["com/example/A.class"]);
        let b = ws.jar("b.jar", &["com/example/B.class"]);
        let sources = format!("{}:{}", a.display(), b.display());

        ws.command()
            .args(["-sps", &sources, "-cache", "checksum"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 transformed, 0 cached"));

        assert!(ws.out().join(".jarprep").join("cache-manifest.json").is_file());

        ws.command()
            .args(["-sps", &sources, "-cache", "checksum"])
            .assert()
            .success()
            .stdout(predicate::str::contains("0 transformed, 2 cached"));
    }

    #[test]
    #[serial]
    fn signed_jar_fail_strategy_fails_run() {
        let ws = Workspace::new();
        let signed = ws.jar(
            "signed.jar",
            &["META-INF/MANIFEST.MF", "META-INF/KEY.SF", "META-INF/KEY.RSA"],
        );

        ws.command()
            .arg("-sps")
            .arg(&signed)
            .args(["--signedjarhandlingstrategy", "fail"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("[signed artifact]"));

        assert!(!ws.out().join("signed-inst.jar").exists());
    }

    #[test]
    #[serial]
    fn signed_jar_skip_strategy_passes_through() {
        let ws = Workspace::new();
        let signed = ws.jar(
            "signed.jar",
            &["META-INF/MANIFEST.MF", "META-INF/KEY.SF", "META-INF/KEY.DSA"],
        );

        ws.command()
            .arg("-sps")
            .arg(&signed)
            .args(["--signedjarhandlingstrategy", "skip"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 passed through"));
    }

    #[test]
    #[serial]
    fn unresolvable_dependency_only_fails_when_requested() {
        let ws = Workspace::new();
        let good = ws.jar("good.jar", &["com/example/Good.class"]);
        let broken = ws.jar("broken.jar", &["com/example/Broken.class"]);
        let sources = format!("{}:{}", good.display(), broken.display());

        ws.command()
            .args(["-sps", &sources])
            .assert()
            .success()
            .stdout(predicate::str::contains("org/acme/Missing"))
            .stdout(predicate::str::contains("1 transformed"))
            .stdout(predicate::str::contains("1 unresolved"));

        ws.command()
            .args(["-sps", &sources, "--failonunresolvabledependency"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Preprocessing failed"));
    }

    #[test]
    #[serial]
    fn reads_response_file() {
        let ws = Workspace::new();
        let a = ws.jar("a.jar", &["com/example/A.class"]);
        let response = ws.path().join("args.txt");
        fs::write(&response, format!("-sps\t{}@app\n--verbose\n", a.display())).unwrap();

        ws.command()
            .arg(format!("@{}", response.display()))
            .assert()
            .success()
            .stdout(predicate::str::contains("a-inst.jar"));

        assert!(ws.out().join("app").join("a-inst.jar").is_file());
    }
}
