use anyhow::{anyhow, Result};
use std::path::Path;

/// Longest stderr excerpt carried into a process error.
pub const MAX_STDERR_BYTES: usize = 2000;

pub fn path_to_string(path: &Path, label: &str) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{label} path is not valid UTF-8"))
}

/// Keep the last `max_lines` non-empty lines of captured stderr, bounded in bytes.
pub fn stderr_tail(bytes: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(max_lines);
    truncate_string(&lines[start..].join("\n"), MAX_STDERR_BYTES)
}

pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut truncated = String::new();
    for ch in text.chars() {
        if truncated.len() + ch.len_utf8() > max_bytes {
            break;
        }
        truncated.push(ch);
    }
    truncated
}

pub fn format_command_line(program: &str, args: &[String]) -> String {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(program);
    words.extend(args.iter().map(String::as_str));
    shell_words::join(words)
}
