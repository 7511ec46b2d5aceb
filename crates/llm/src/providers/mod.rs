//! Generation provider implementations.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// Remove every complete line from `buffer` and return them trimmed.
///
/// Bytes are only decoded once their line is complete, so a multi-byte
/// character split across two network reads stays intact.
pub(crate) fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=line_end).collect();
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut buffer = b"first\n\nsecond\nthi".to_vec();
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(buffer, b"thi");

        buffer.extend_from_slice(b"rd\n");
        assert_eq!(drain_lines(&mut buffer), vec!["third".to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_lines_waits_for_split_character() {
        let line = "café\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut buffer = line[..split].to_vec();
        assert!(drain_lines(&mut buffer).is_empty());

        buffer.extend_from_slice(&line[split..]);
        assert_eq!(drain_lines(&mut buffer), vec!["café".to_string()]);
    }
}
