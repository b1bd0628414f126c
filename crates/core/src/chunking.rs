pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Groups blank-line separated paragraphs into chunks of at most `max_words` words.
///
/// Paragraphs are never split, so a paragraph larger than the budget becomes a
/// chunk of its own. Blank paragraphs ride along with their neighbours and never
/// open or close a chunk, so every chunk has words in it. Joining the output with
/// [`PARAGRAPH_SEPARATOR`] gives back the input.
pub fn chunk_by_words(text: &str, max_words: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_words = 0usize;

    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        let paragraph_words = word_count(paragraph);

        if current_words > 0 && paragraph_words > 0 && current_words + paragraph_words > max_words {
            chunks.push(current.join(PARAGRAPH_SEPARATOR));
            current.clear();
            current_words = 0;
        }

        current.push(paragraph);
        current_words += paragraph_words;
    }

    if !current.is_empty() {
        chunks.push(current.join(PARAGRAPH_SEPARATOR));
    }

    chunks
}
