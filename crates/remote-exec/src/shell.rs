//! POSIX path and shell helpers for remote hosts.

/// Joins a remote directory and a child name with exactly one `/`.
pub fn join_remote(dir: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        return name.to_string();
    }
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Parent directory of a remote path, `None` for the root or a bare name.
pub fn remote_parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    if idx == 0 {
        return Some("/");
    }
    Some(&trimmed[..idx])
}

pub fn shell_escape(value: &str) -> String {
    shell_words::quote(value).into_owned()
}

/// Builds a single command line from a program and its arguments.
pub fn command_line<'a>(program: &str, args: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = shell_escape(program);
    for arg in args {
        line.push(' ');
        line.push_str(&shell_escape(arg));
    }
    line
}
