#![cfg(unix)]

mod common;

use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use common::{Sandbox, sample_text};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

#[test]
fn sigint_during_compression_cleans_up() {
    let sandbox = Sandbox::new();
    let body = sample_text(1_500_000);
    let input = sandbox.tree("input/name", &[("a.txt", body.as_str()), ("b.txt", body.as_str())]);
    let out = sandbox.path("out");
    let artifact = out.join("name/name.tar.zst");

    let mut child = Command::new(env!("CARGO_BIN_EXE_coldstore"))
        .args(["-q", "pack", "--no-long", "--no-par2", "-l", "19", "-t", "1", "-o"])
        .arg(&out)
        .arg(&input)
        .env("TMPDIR", &sandbox.temp_root)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let started = Instant::now();
    while !artifact.exists() {
        if let Some(status) = child.try_wait().unwrap() {
            panic!("pack exited before compression started: {status}");
        }
        assert!(started.elapsed() < Duration::from_secs(60), "compression never started");
        thread::sleep(Duration::from_millis(20));
    }

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
    let status = child.wait().unwrap();

    assert!(
        status.signal() == Some(Signal::SIGINT as i32) || status.code() == Some(130),
        "unexpected exit: {status}"
    );
    assert!(sandbox.leftovers().is_empty(), "{:?}", sandbox.leftovers());
    assert!(!artifact.exists());
    assert!(!out.join("name").exists());
}
