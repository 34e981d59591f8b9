use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read a file, or stdin when the path is `-`.
pub fn read_input_bytes(path: &Path, label: &str) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read {} from stdin", label))?;
        Ok(buffer)
    } else {
        std::fs::read(path)
            .with_context(|| format!("Failed to read {} from {}", label, path.display()))
    }
}

/// Read and parse a JSON document.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path, label: &str) -> Result<T> {
    let bytes = read_input_bytes(path, label)?;
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {} as JSON", label))
}
