//! Shell scripts standing in for ffmpeg and yt-dlp.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Behavior of an installed fake tool.
#[derive(Debug, Clone, Copy)]
pub enum FakeTool {
    /// Copies the `-i` input (a file, or stdin for `pipe:0`) to stdout.
    CatTranscoder,
    /// Prints `stdout` and exits cleanly.
    Printing { stdout: &'static str },
    /// Prints `stderr` to stderr and exits with `code`.
    Failing { stderr: &'static str, code: i32 },
    /// Prints `stdout`, then `stderr`, and exits with status 1.
    Truncated {
        stdout: &'static str,
        stderr: &'static str,
    },
    /// Sleeps far longer than any test waits.
    Hanging,
}

const CAT_TRANSCODER: &str = r#"input=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-i" ]; then
    shift
    input="$1"
  fi
  shift
done
if [ "$input" = "pipe:0" ]; then
  exec cat
fi
exec cat "$input"
"#;

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

impl FakeTool {
    fn script(&self) -> String {
        let body = match self {
            FakeTool::CatTranscoder => CAT_TRANSCODER.to_string(),
            FakeTool::Printing { stdout } => format!("printf '%s' {}\n", quote(stdout)),
            FakeTool::Failing { stderr, code } if stderr.is_empty() => format!("exit {}\n", code),
            FakeTool::Failing { stderr, code } => {
                format!("printf '%s\\n' {} >&2\nexit {}\n", quote(stderr), code)
            }
            FakeTool::Truncated { stdout, stderr } => format!(
                "printf '%s' {}\nprintf '%s\\n' {} >&2\nexit 1\n",
                quote(stdout),
                quote(stderr)
            ),
            FakeTool::Hanging => "exec sleep 30\n".to_string(),
        };
        format!("#!/bin/sh\n{}", body)
    }
}

/// Writes `tool` as an executable script named `name` inside `dir`.
///
/// # Panics
///
/// Panics if the script cannot be written; only meant for tests.
pub fn install(dir: &Path, name: &str, tool: FakeTool) -> PathBuf {
    write_script(dir, name, &tool.script())
}

/// Like [`FakeTool::Hanging`], but the process first writes its pid to
/// `pid_file` so a test can check that it was killed.
pub fn install_hanging_with_pid_file(dir: &Path, name: &str, pid_file: &Path) -> PathBuf {
    let script = format!(
        "#!/bin/sh\necho $$ > {}\nexec sleep 30\n",
        quote(&pid_file.to_string_lossy())
    );
    write_script(dir, name, &script)
}

/// Pid recorded by a tool from [`install_hanging_with_pid_file`].
pub fn read_pid(pid_file: &Path) -> Option<u32> {
    std::fs::read_to_string(pid_file).ok()?.trim().parse().ok()
}

/// Whether a process with `pid` still exists (`kill -0`).
pub fn process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn write_script(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, script).expect("write fake tool");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("make fake tool executable");
    path
}
