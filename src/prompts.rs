//! Prompts for vision-model question extraction.
//!
//! Kept in one place so unit tests can inspect the prompt directly and so a
//! prompt change never touches the request or retry code in
//! [`crate::upstream`]. The proxy server uses [`EXTRACTION_PROMPT`] unless
//! [`crate::config::ServerConfig::prompt`] overrides it.

/// Instruction sent alongside every page image.
///
/// The reply shape it asks for is exactly what [`crate::question::Question`]
/// deserialises: a bare JSON array of `mcq` / `other` objects.
pub const EXTRACTION_PROMPT: &str = r#"Extract all questions from this PDF page image. For each question, return a JSON object with the following structure:
- For MCQ questions: { "type": "mcq", "question": "question text", "choices": ["A) option1", "B) option2", ...], "correctAnswer": "A" or the letter, "explanation": "explanation if available" or null }
- For other questions: { "type": "other", "question": "question text", "explanation": "explanation if available" or null }

Return a JSON array of question objects. If no questions found, return empty array []. Only return valid JSON, no other text. Make sure to extract all choices for MCQ questions and identify the correct answer."#;

/// MIME type of the page images the prompt is paired with.
pub const PAGE_IMAGE_MIME: &str = "image/png";
