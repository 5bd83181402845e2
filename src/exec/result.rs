// src/exec/result.rs

use std::time::Duration;

use crate::types::OutputStream;

/// One captured output line, in arrival order across both pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: Vec<u8>,
}

/// Outcome of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Stdout and stderr interleaved as they arrived, for build logs.
    pub interleaved: Vec<OutputLine>,
    pub duration: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// The last `lines` lines of stderr.
    pub fn stderr_tail(&self, lines: usize) -> String {
        let text = String::from_utf8_lossy(&self.stderr);
        let all: Vec<&str> = text.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }

    /// Both streams merged in arrival order.
    pub fn interleaved_lossy(&self) -> String {
        self.interleaved
            .iter()
            .map(|l| String::from_utf8_lossy(&l.line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let result = ProcessResult {
            exit_code: 1,
            stderr: b"one\ntwo\nthree\n".to_vec(),
            ..Default::default()
        };
        assert_eq!(result.stderr_tail(2), "two\nthree");
        assert_eq!(result.stderr_tail(10), "one\ntwo\nthree");
        assert!(!result.success());
    }

    #[test]
    fn interleaved_view_preserves_arrival_order() {
        let result = ProcessResult {
            interleaved: vec![
                OutputLine {
                    stream: OutputStream::Stdout,
                    line: b"a\n".to_vec(),
                },
                OutputLine {
                    stream: OutputStream::Stderr,
                    line: b"b\n".to_vec(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(result.interleaved_lossy(), "a\nb\n");
    }
}
