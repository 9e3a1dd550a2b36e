#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("docker CLI not found; install: https://docs.docker.com/get-docker/")]
    NotFound { source: std::io::Error },

    /// `code` is `None` when the process was killed by a signal; `stderr`
    /// is empty when output was streamed to the terminal.
    #[error("`docker {}` {}{}", .args.join(" "), exit_label(.code), stderr_suffix(.stderr))]
    CommandFailed {
        args: Vec<String>,
        code: Option<i32>,
        stderr: String,
    },

    #[error("docker output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },
}

impl DockerError {
    /// Exit code of a failed docker command, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => *code,
            Self::NotFound { .. } | Self::InvalidUtf8 { .. } => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_owned(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(code: Option<i32>, stderr: &str) -> DockerError {
        DockerError::CommandFailed {
            args: vec!["image".to_owned(), "rm".to_owned(), "app:latest".to_owned()],
            code,
            stderr: stderr.to_owned(),
        }
    }

    #[test]
    fn captured_failure_shows_command_code_and_stderr() {
        let err = failed(Some(1), "Error: No such image: app:latest\n");
        assert_eq!(
            err.to_string(),
            "`docker image rm app:latest` exited with code 1:\nError: No such image: app:latest"
        );
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn streamed_failure_has_no_stderr_section() {
        let err = failed(Some(125), "");
        assert_eq!(
            err.to_string(),
            "`docker image rm app:latest` exited with code 125"
        );
    }

    #[test]
    fn signal_termination() {
        let err = failed(None, "");
        assert!(err.to_string().ends_with("was terminated by a signal"));
        assert_eq!(err.exit_code(), None);
    }
}
