/// Splits a byte stream into newline-delimited frames.
///
/// A partial line at the end of a chunk is carried over and prepended to the
/// next chunk, so a frame boundary falling mid-read never produces two
/// half frames. Carriage returns before the line feed are stripped. The
/// carry buffer holds raw bytes, which keeps multi-byte characters split
/// across reads intact.
#[derive(Debug, Default)]
pub struct LineAssembler {
    carry: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk of transport bytes and returns every line the chunk
    /// completed, in order. Lines are produced without their delimiters.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);
        if !self.carry.contains(&b'\n') {
            return Vec::new();
        }

        let data = std::mem::take(&mut self.carry);
        let mut frames = Vec::new();
        let mut start = 0;
        for (index, byte) in data.iter().enumerate() {
            if *byte == b'\n' {
                let mut end = index;
                if end > start && data[end - 1] == b'\r' {
                    end -= 1;
                }
                frames.push(String::from_utf8_lossy(&data[start..end]).into_owned());
                start = index + 1;
            }
        }
        self.carry = data[start..].to_vec();
        frames
    }

    /// Takes whatever is left in the carry buffer as a final frame. Used
    /// when a TCP peer disconnects with unterminated data pending; the
    /// stream-reader convention treats text before EOF as a last line.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let mut data = std::mem::take(&mut self.carry);
        if data.last() == Some(&b'\r') {
            data.pop();
        }
        if data.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&data).into_owned())
    }

    /// Drops any pending partial line. Used when the underlying file is
    /// rotated and the carried bytes belong to the old file.
    pub fn clear(&mut self) {
        self.carry.clear();
    }

    pub fn has_partial(&self) -> bool {
        !self.carry.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_mid_read_reassembles_line() {
        let mut assembler = LineAssembler::new();

        assert!(assembler.push(b"AB").is_empty());
        let frames = assembler.push(b"C\nDEF\n");

        assert_eq!(frames, vec!["ABC".to_string(), "DEF".to_string()]);
        assert!(!assembler.has_partial());
    }

    #[test]
    fn test_crlf_stripped() {
        let mut assembler = LineAssembler::new();
        let frames = assembler.push(b"one\r\ntwo\r\n");
        assert_eq!(frames, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut assembler = LineAssembler::new();
        let frames = assembler.push(b"a\nb\nc\ntail");
        assert_eq!(frames, vec!["a", "b", "c"]);
        assert!(assembler.has_partial());
    }

    #[test]
    fn test_empty_lines_are_produced() {
        let mut assembler = LineAssembler::new();
        let frames = assembler.push(b"a\n\nb\n");
        assert_eq!(frames, vec!["a", "", "b"]);
    }

    #[test]
    fn test_carry_survives_many_pushes() {
        let mut assembler = LineAssembler::new();
        assert!(assembler.push(b"sp").is_empty());
        assert!(assembler.push(b"li").is_empty());
        assert!(assembler.push(b"t").is_empty());
        let frames = assembler.push(b"\n");
        assert_eq!(frames, vec!["split"]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut assembler = LineAssembler::new();
        let bytes = "héllo\n".as_bytes();
        // Split inside the two-byte 'é'
        assert!(assembler.push(&bytes[..2]).is_empty());
        let frames = assembler.push(&bytes[2..]);
        assert_eq!(frames, vec!["héllo"]);
    }

    #[test]
    fn test_take_remainder() {
        let mut assembler = LineAssembler::new();
        assembler.push(b"complete\npartial");
        assert_eq!(assembler.take_remainder(), Some("partial".to_string()));
        assert_eq!(assembler.take_remainder(), None);

        assembler.push(b"cr-tail\r");
        assert_eq!(assembler.take_remainder(), Some("cr-tail".to_string()));
    }

    #[test]
    fn test_clear_drops_partial() {
        let mut assembler = LineAssembler::new();
        assembler.push(b"half a li");
        assembler.clear();
        let frames = assembler.push(b"fresh\n");
        assert_eq!(frames, vec!["fresh"]);
    }
}
