//! Output formatting for CLI commands

use serde::Serialize;

/// Pretty JSON with `--json`, otherwise the caller's text rendering
pub fn format_output<T: Serialize>(data: &T, json: bool, render: impl FnOnce(&T) -> String) -> String {
    if json {
        serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
    } else {
        render(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
    }

    #[test]
    fn test_format_output() {
        let row = Row { name: "github" };
        assert!(format_output(&row, true, |_| String::new()).contains("\"name\": \"github\""));
        assert_eq!(format_output(&row, false, |r| r.name.to_string()), "github");
    }
}
