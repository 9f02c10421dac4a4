use tracing::warn;

/// Length of text as counted against the chunk budget
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// A bounded unit of diff text sent as one summarization request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    text: String,
    len: usize,
    fragments: usize,
}

impl Chunk {
    fn start(fragment: &str, len: usize) -> Self {
        Self {
            text: fragment.to_string(),
            len,
            fragments: 1,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters, separators included
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of fragments packed into this chunk
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }
}

/// Greedily pack consecutive fragments into chunks of at most `max_len` characters
///
/// Single left-to-right pass: a fragment joins the current chunk (after
/// `separator`) when the result still fits, otherwise it starts a new chunk.
/// Fragments are never split. A fragment that is longer than `max_len` on its
/// own becomes a chunk by itself and exceeds the budget; callers that bound
/// fragment length first never hit this.
pub fn pack_chunks<'a, I>(fragments: I, max_len: usize, separator: &str) -> Vec<Chunk>
where
    I: IntoIterator<Item = &'a str>,
{
    let separator_len = char_len(separator);
    let mut chunks: Vec<Chunk> = Vec::new();

    for fragment in fragments {
        let fragment_len = char_len(fragment);

        if let Some(current) = chunks.last_mut() {
            if current.len + separator_len + fragment_len <= max_len {
                current.text.push_str(separator);
                current.text.push_str(fragment);
                current.len += separator_len + fragment_len;
                current.fragments += 1;
                continue;
            }
        }

        if fragment_len > max_len {
            warn!(fragment_len, max_len, "Fragment exceeds chunk budget, packing it alone");
        }
        chunks.push(Chunk::start(fragment, fragment_len));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_chunks_greedy() {
        let chunks = pack_chunks(["aaaa", "bbbb", "cccc", "dd"], 9, "\n");
        let texts: Vec<&str> = chunks.iter().map(Chunk::as_str).collect();
        assert_eq!(texts, vec!["aaaa\nbbbb", "cccc\ndd"]);
        assert_eq!(chunks[0].len(), 9);
        assert_eq!(chunks[0].fragment_count(), 2);
    }

    #[test]
    fn test_pack_chunks_separator_counts_toward_budget() {
        // 4 + 1 + 4 = 9 does not fit in 8
        let chunks = pack_chunks(["aaaa", "bbbb"], 8, "\n");
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_pack_chunks_preserves_order() {
        let fragments: Vec<String> = (0..50).map(|i| format!("frag-{:02}", i)).collect();
        let chunks = pack_chunks(fragments.iter().map(String::as_str), 40, "|");

        let rejoined: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.as_str().split('|'))
            .collect();
        assert_eq!(rejoined, fragments.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(chunks.iter().all(|c| c.len() <= 40));
    }

    #[test]
    fn test_pack_chunks_empty() {
        let chunks = pack_chunks(std::iter::empty(), 100, "\n");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_pack_chunks_oversized_fragment_stands_alone() {
        let long = "x".repeat(30);
        let chunks = pack_chunks(["ab", long.as_str(), "cd"], 10, "\n");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].len(), 30);
        assert_eq!(chunks[1].fragment_count(), 1);
    }

    #[test]
    fn test_pack_chunks_multi_char_separator() {
        let chunks = pack_chunks(["abc", "def"], 10, "\n\n\n\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 10);
    }
}
