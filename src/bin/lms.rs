use std::env;
use std::process::{Command, exit};

/// Short-name launcher. Finds the `lumascan` binary sitting next to this
/// one and re-runs it with the same arguments, falling back to whatever
/// `PATH` resolves when the sibling is missing.
fn main() {
    let sibling = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("lumascan")))
        .filter(|candidate| candidate.is_file());

    let mut command = match sibling {
        Some(path) => Command::new(path),
        None => Command::new("lumascan"),
    };

    match command.args(env::args_os().skip(1)).status() {
        Ok(status) => exit(status.code().unwrap_or(1)),
        Err(err) => {
            eprintln!("Failed to invoke lumascan: {err}");
            exit(1);
        }
    }
}
