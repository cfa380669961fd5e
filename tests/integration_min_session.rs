// Drives the compiled binary through a PTY so the real terminal setup,
// crossterm input thread and capture workers all run together.
//
// Requires a TTY (expectrl allocates one), so it is Unix-only and ignored
// by default. Run with: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn autostarted_session_quits_cleanly() -> Result<(), Box<dyn std::error::Error>> {
    let bin = assert_cmd::cargo::cargo_bin("repcount");
    let log = tempfile::NamedTempFile::new()?;
    let cmd = format!(
        "{} --autostart --seed 7 --no-sound --log-file {}",
        bin.display(),
        log.path().display()
    );

    let mut p = spawn(cmd)?;

    // Let a few frames and clock seconds through
    std::thread::sleep(Duration::from_millis(1500));

    p.send("p")?;
    std::thread::sleep(Duration::from_millis(100));
    p.send("q")?;

    p.expect(Eof)?;

    let logged = std::fs::read_to_string(log.path())?;
    assert!(logged.contains("session started"));
    assert!(logged.contains("session stopped"));
    Ok(())
}
