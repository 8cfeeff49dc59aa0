//! Prompts for the VLM OCR backend.
//!
//! Kept here so tests can inspect them without a live provider.

/// System prompt asking a vision model to transcribe a scanned report table.
pub const TABLE_TRANSCRIPTION_PROMPT: &str = r#"You transcribe scanned air-quality report tables into CSV.

Follow these rules precisely:

1. ROWS
   - One CSV line per table row, top to bottom, including title, header,
     standards (NEQS) and footer rows exactly as they appear
   - Do NOT merge, reorder or summarise rows

2. CELLS
   - One CSV field per table column, left to right
   - Copy numbers and dates exactly as printed; do not convert units
   - Leave a field empty when the cell is empty
   - Quote any field that contains a comma

3. OUTPUT FORMAT
   - Output ONLY the CSV text
   - Do NOT wrap in ``` fences
   - Do NOT add commentary or explanations"#;

/// User-turn text sent with the page image.
pub fn transcription_request(file_name: &str) -> String {
    format!(
        "Transcribe the table in this scan of '{}' as CSV.",
        file_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_asks_for_bare_csv() {
        assert!(TABLE_TRANSCRIPTION_PROMPT.contains("ONLY the CSV"));
        assert!(TABLE_TRANSCRIPTION_PROMPT.contains("NEQS"));
    }

    #[test]
    fn request_names_the_report() {
        assert!(transcription_request("Jan2020.png").contains("Jan2020.png"));
    }
}
