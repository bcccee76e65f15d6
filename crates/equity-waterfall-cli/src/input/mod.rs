pub mod file;

use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Load a command's input document from `--input <file>` or piped stdin.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        tracing::debug!(path, "reading input document");
        return file::read_document(path);
    }

    match read_piped()? {
        Some(data) => {
            tracing::debug!(bytes = data.len(), "reading input document from stdin");
            parse_piped(&data)
        }
        None => Err(format!(
            "--input <file.json|file.yaml> or stdin required for {}",
            what
        )
        .into()),
    }
}

/// Piped stdin contents; None for an interactive terminal or empty input.
fn read_piped() -> io::Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    if buffer.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(buffer))
}

/// Stdin carries no extension to go by; JSON is tried first, then YAML.
fn parse_piped<T: DeserializeOwned>(data: &str) -> Result<T, Box<dyn std::error::Error>> {
    match serde_json::from_str(data) {
        Ok(doc) => Ok(doc),
        Err(json_err) => serde_yaml::from_str(data)
            .map_err(|_| format!("Failed to parse stdin as JSON: {}", json_err).into()),
    }
}
