/// Start of a new per-file record in unified diff output. The leading newline
/// is the separator between sections and belongs to neither of them.
pub const SECTION_MARKER: &str = "\ndiff";

/// Split a diff into per-file sections
///
/// Joining the sections with `"\n"` gives back the input exactly. An empty
/// diff yields no sections; a diff without markers yields one.
pub fn split_sections(diff: &str) -> Sections<'_> {
    Sections {
        rest: if diff.is_empty() { None } else { Some(diff) },
    }
}

/// Lazy iterator over the sections of a diff
#[derive(Debug, Clone)]
pub struct Sections<'a> {
    rest: Option<&'a str>,
}

impl<'a> Iterator for Sections<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        match rest.find(SECTION_MARKER) {
            Some(idx) => {
                // Skip the newline, keep "diff" at the head of the next section
                self.rest = Some(&rest[idx + 1..]);
                Some(&rest[..idx])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

/// Split text into fragments of at most `max_len` characters
///
/// Pure character-count split with no awareness of diff syntax. The last
/// fragment may be shorter. A `max_len` of zero is treated as one so the
/// iterator always makes progress.
pub fn split_by_length(input: &str, max_len: usize) -> Fragments<'_> {
    Fragments {
        rest: Some(input),
        max_len: max_len.max(1),
    }
}

/// Lazy iterator over length-bounded fragments
#[derive(Debug, Clone)]
pub struct Fragments<'a> {
    rest: Option<&'a str>,
    max_len: usize,
}

impl<'a> Iterator for Fragments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        match rest.char_indices().nth(self.max_len) {
            Some((idx, _)) => {
                self.rest = Some(&rest[idx..]);
                Some(&rest[..idx])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}
