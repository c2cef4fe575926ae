//! Timestamped diagnostics on stderr.

use chrono::Local;

pub fn current_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_line(msg: &str) -> String {
    format!("[{}] {}", current_timestamp(), msg)
}

/// Never call between `enable()` and `disable()`: the write to stderr would
/// land in the trace window.
pub fn log_simple<S: AsRef<str>>(msg: S) {
    eprintln!("{}", format_line(msg.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_a_bracketed_timestamp() {
        let line = format_line("hello");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] hello"));
        // "[YYYY-mm-dd HH:MM:SS] "
        assert_eq!(line.len(), "[2024-01-01 00:00:00] hello".len());
    }
}
