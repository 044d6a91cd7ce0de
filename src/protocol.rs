// MIT License - Copyright (c) 2026 Peter Wright
// TPI frame codec

/// Compute the 2-character checksum for a frame payload.
///
/// The checksum is the low byte of the sum of the ASCII codes of
/// `code + payload`, formatted as exactly two uppercase hex digits.
pub fn compute_checksum(payload: &str) -> String {
    let sum: u32 = payload.bytes().map(u32::from).sum();
    format!("{:02X}", (sum & 0xFF) as u8)
}

/// Encode a payload into a complete wire frame: `payload + checksum + CRLF`.
pub fn encode_frame(payload: &str) -> String {
    format!("{}{}\r\n", payload, compute_checksum(payload))
}

/// Split a raw read chunk into frame tokens.
///
/// Embedded CR and LF bytes both delimit frames; panels freely mix them and
/// concatenate several frames into one write. Empty tokens are discarded.
/// Each chunk is split independently — there is no cross-read reassembly.
pub fn split_frames(chunk: &str) -> Vec<&str> {
    chunk
        .split(['\r', '\n'])
        .filter(|token| !token.is_empty())
        .collect()
}

/// A borrowed view over one delimited protocol token.
///
/// Layout: `<3-char code><payload><2-char checksum>`. The raw token is kept
/// because several dispatch paths slice ids out of fixed raw offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    pub raw: &'a str,
    pub code: &'a str,
    pub payload: &'a str,
    pub checksum: &'a str,
}

impl<'a> CommandFrame<'a> {
    /// Parse a token into its code/payload/checksum parts.
    ///
    /// Tokens shorter than a code are rejected; tokens with a code but no
    /// room for payload + checksum parse with empty payload and checksum
    /// (the catalogue decides whether such a frame is meaningful).
    pub fn parse(token: &'a str) -> Option<Self> {
        if token.len() < 3 || !token.is_ascii() {
            return None;
        }
        let (payload, checksum) = if token.len() >= 5 {
            (&token[3..token.len() - 2], &token[token.len() - 2..])
        } else {
            ("", "")
        };
        Some(Self {
            raw: token,
            code: &token[..3],
            payload,
            checksum,
        })
    }

    /// Whether the transmitted checksum matches the recomputed one.
    ///
    /// Not consulted on the normal inbound path; the optional
    /// `verify_checksums` config toggle turns it into a drop filter.
    pub fn checksum_ok(&self) -> bool {
        let body = &self.raw[..self.raw.len() - self.checksum.len()];
        compute_checksum(body) == self.checksum
    }

    /// The frame minus its trailing checksum: `code + payload`.
    ///
    /// This is the form forwarded upstream and re-broadcast to proxy clients,
    /// which re-checksum on encode.
    pub fn without_checksum(&self) -> &'a str {
        &self.raw[..self.raw.len() - self.checksum.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_known_values() {
        assert_eq!(compute_checksum("5053"), "CD");
        assert_eq!(compute_checksum("5051"), "CB");
        assert_eq!(compute_checksum("5050"), "CA");
        assert_eq!(compute_checksum("001"), "91");
        assert_eq!(compute_checksum("609001"), "30");
    }

    #[test]
    fn test_checksum_low_byte_overflow() {
        // Sum of "65212" is 256; only the low byte survives.
        assert_eq!(compute_checksum("65212"), "00");
    }

    #[test]
    fn test_checksum_always_two_uppercase_hex() {
        for payload in ["", "0", "005user", "849FF", "A"] {
            let ck = compute_checksum(payload);
            assert_eq!(ck.len(), 2, "payload {payload:?}");
            assert!(ck
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)));
        }
    }

    #[test]
    fn test_encode_frame() {
        assert_eq!(encode_frame("5051"), "5051CB\r\n");
        assert_eq!(encode_frame("001"), "00191\r\n");
    }

    #[test]
    fn test_split_frames_mixed_separators() {
        let tokens = split_frames("5051CB\r\n60900130\n\r65012XX\r");
        assert_eq!(tokens, vec!["5051CB", "60900130", "65012XX"]);
    }

    #[test]
    fn test_split_frames_counts_concatenated_frames() {
        let chunk = format!(
            "{}{}{}",
            encode_frame("6501"),
            encode_frame("609001"),
            encode_frame("5053")
        );
        assert_eq!(split_frames(&chunk).len(), 3);
    }

    #[test]
    fn test_split_frames_discards_empty_tokens() {
        assert_eq!(split_frames("\r\n\r\n"), Vec::<&str>::new());
        assert_eq!(split_frames("\r\n00191\r\n\r\n"), vec!["00191"]);
    }

    #[test]
    fn test_parse_frame() {
        let frame = CommandFrame::parse("60900130").unwrap();
        assert_eq!(frame.code, "609");
        assert_eq!(frame.payload, "001");
        assert_eq!(frame.checksum, "30");
        assert_eq!(frame.without_checksum(), "609001");
    }

    #[test]
    fn test_parse_short_tokens() {
        assert!(CommandFrame::parse("60").is_none());
        let frame = CommandFrame::parse("609").unwrap();
        assert_eq!(frame.code, "609");
        assert_eq!(frame.payload, "");
        assert_eq!(frame.without_checksum(), "609");
    }

    #[test]
    fn test_checksum_verification() {
        assert!(CommandFrame::parse("60900130").unwrap().checksum_ok());
        assert!(!CommandFrame::parse("609001FF").unwrap().checksum_ok());
    }
}
