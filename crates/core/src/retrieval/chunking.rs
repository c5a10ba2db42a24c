//! Section splitting and chunking for guideline documents.

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Upper bound on chunk length, in characters.
    pub chunk_size: usize,
    /// Approximate number of trailing characters repeated at the start of
    /// the next chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

/// Splits a markdown body into `(section_title, section_text)` pairs at
/// `#` headers. Text before the first header lands in an "Overview"
/// section. Sections with no content are dropped.
pub fn split_into_sections(body: &str) -> Vec<(String, String)> {
    let mut sections = Vec::new();
    let mut current_title = "Overview".to_string();
    let mut current_lines: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.starts_with('#') {
            push_section(&mut sections, &current_title, &current_lines);
            current_title = line.trim_start_matches('#').trim().to_string();
            current_lines.clear();
        } else {
            current_lines.push(line);
        }
    }
    push_section(&mut sections, &current_title, &current_lines);

    sections
}

fn push_section(sections: &mut Vec<(String, String)>, title: &str, lines: &[&str]) {
    let text = lines.join("\n");
    if !text.trim().is_empty() {
        sections.push((title.to_string(), text));
    }
}

/// Splits text into word-boundary chunks of at most `chunk_size`
/// characters, each chunk starting with up to `chunk_overlap` characters
/// of the previous chunk's tail.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.chars().count() <= config.chunk_size {
        return vec![trimmed.to_string()];
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for word in words {
        let word_len = word.chars().count();
        let projected = if current.is_empty() { word_len } else { current_len + 1 + word_len };

        if projected > config.chunk_size && !current.is_empty() {
            chunks.push(current.join(" "));

            let mut overlap: Vec<&str> = Vec::new();
            let mut overlap_len = 0usize;
            for tail_word in current.iter().rev() {
                let tail_len = tail_word.chars().count();
                if overlap_len + tail_len + 1 > config.chunk_overlap {
                    break;
                }
                overlap_len += tail_len + 1;
                overlap.push(tail_word);
            }
            overlap.reverse();

            current = overlap;
            current_len = current_len_of(&current);
        }

        if current.is_empty() {
            current_len = word_len;
        } else {
            current_len += 1 + word_len;
        }
        current.push(word);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

fn current_len_of(words: &[&str]) -> usize {
    if words.is_empty() {
        return 0;
    }
    words.iter().map(|word| word.chars().count()).sum::<usize>() + words.len() - 1
}

#[cfg(test)]
mod tests {
    use super::{chunk_text, split_into_sections, ChunkingConfig};

    #[test]
    fn sections_split_at_headers_with_overview_for_leading_text() {
        let body = "Intro paragraph.\n\n# Eligibility\nSingle family homes are eligible.\n\n## Roof Standards\nTile roofs meet the standard.";
        let sections = split_into_sections(body);

        let titles: Vec<&str> = sections.iter().map(|(title, _)| title.as_str()).collect();
        assert_eq!(titles, vec!["Overview", "Eligibility", "Roof Standards"]);
        assert!(sections[1].1.contains("eligible"));
    }

    #[test]
    fn empty_sections_are_dropped() {
        let body = "# First\n\n# Second\nContent here.";
        let sections = split_into_sections(body);

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].0, "Second");
    }

    #[test]
    fn short_text_yields_a_single_chunk() {
        let chunks = chunk_text("wildfire risk requirement", ChunkingConfig::default());
        assert_eq!(chunks, vec!["wildfire risk requirement".to_string()]);
    }

    #[test]
    fn long_text_is_split_with_overlap() {
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima";
        let config = ChunkingConfig { chunk_size: 30, chunk_overlap: 12 };
        let chunks = chunk_text(text, config);

        assert!(chunks.len() > 1, "expected multiple chunks, got {chunks:?}");
        for chunk in &chunks {
            assert!(chunk.chars().count() <= config.chunk_size, "oversized chunk: {chunk}");
        }
        // Overlap means the second chunk begins with words from the first's tail.
        let first_tail = chunks[0].split_whitespace().last().expect("tail word");
        assert!(chunks[1].split_whitespace().any(|word| word == first_tail));
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "one two three four five six seven eight nine ten eleven twelve thirteen";
        let config = ChunkingConfig { chunk_size: 25, chunk_overlap: 8 };
        assert_eq!(chunk_text(text, config), chunk_text(text, config));
    }
}
