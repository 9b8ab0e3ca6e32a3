//! Copy and open actions for the selected endpoint

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

/// OSC 52 escape asking the terminal to put `text` on the clipboard
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

pub fn copy_to_clipboard(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(osc52_sequence(text).as_bytes())?;
    stdout.flush()
}

/// Hand a deep link to the platform's URL opener
pub fn open_link(link: &str) -> io::Result<()> {
    spawn_detached(opener_command(link)).map(|_| ())
}

/// Spawn `cmd` with null stdio and reap it on a background thread
fn spawn_detached(mut cmd: Command) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(thread::spawn(move || child.wait()))
}

#[cfg(target_os = "macos")]
fn opener_command(link: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(link);
    cmd
}

#[cfg(target_os = "windows")]
fn opener_command(link: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "", link]);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(link: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(link);
    cmd
}
