//! NDJSON codec for overlay commands
//!
//! One JSON object per line. Scripts may also contain blank lines and
//! `#` comment lines, which are skipped.

use crate::error::OverlayError;
use crate::protocol::OverlayCommand;

/// Decode a line of JSON into a command
pub fn decode_command(line: &str) -> Result<OverlayCommand, OverlayError> {
    let command: OverlayCommand = serde_json::from_str(line.trim())?;
    Ok(command)
}

/// True for lines carrying no command
pub fn is_blank_or_comment(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

/// Decode a whole script, reporting the 1-based line of the first bad command
pub fn decode_script(script: &str) -> Result<Vec<OverlayCommand>, OverlayError> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| !is_blank_or_comment(line))
        .map(|(index, line)| {
            serde_json::from_str(line.trim()).map_err(|source| OverlayError::Decode {
                line: index + 1,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::OverlayMode;

    #[test]
    fn test_decode_command_trims_newline() {
        let decoded = decode_command("{\"type\":\"wait\",\"ms\":250}\n").unwrap();
        assert_eq!(decoded, OverlayCommand::Wait { ms: 250 });
    }

    #[test]
    fn test_decode_script_skips_comments_and_blanks() {
        let script = r#"
# open the overlay in edit mode
{"type":"show","mode":"edit"}

{"type":"append_text","text":"hello"}
"#;
        let commands = decode_script(script).unwrap();
        assert_eq!(
            commands,
            vec![
                OverlayCommand::Show {
                    mode: OverlayMode::Edit
                },
                OverlayCommand::AppendText {
                    text: "hello".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_decode_script_reports_line_number() {
        let script = "{\"type\":\"show\"}\n\n{\"type\":\"explode\"}\n";
        match decode_script(script) {
            Err(OverlayError::Decode { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected decode error, got {:?}", other),
        }
    }
}
