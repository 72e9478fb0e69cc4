//! Line Decoding

use crate::error::ProtocolError;
use crate::keyword;
use crate::reading::{Kind, Reading};

/// A decoded protocol line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Readings of a single kind, in wire order
    Data(Vec<Reading>),
    /// Heartbeat without payload
    Alive,
    /// Datagram handshake request
    Handshake,
    /// Anything else; carries no data and is not an error
    Ignored,
}

/// Decode one line (terminator already stripped)
pub fn decode_line(line: &str) -> Result<Frame, ProtocolError> {
    let line = line.trim();
    if line == keyword::HANDSHAKE {
        return Ok(Frame::Handshake);
    }

    let mut tokens = line.split_whitespace();
    let Some(head) = tokens.next() else {
        return Ok(Frame::Ignored);
    };

    if head == keyword::ALIVE {
        return Ok(Frame::Alive);
    }

    let Some(kind) = Kind::from_keyword(head) else {
        return Ok(Frame::Ignored);
    };

    let readings = tokens
        .map(|token| decode_pair(kind, token))
        .collect::<Result<Vec<_>, _>>()?;

    if readings.is_empty() {
        return Err(ProtocolError::MissingReadings(kind.keyword()));
    }

    Ok(Frame::Data(readings))
}

fn decode_pair(kind: Kind, token: &str) -> Result<Reading, ProtocolError> {
    let invalid = || ProtocolError::InvalidPair(token.to_string());

    let (time, value) = token.split_once(':').ok_or_else(invalid)?;
    let time = time.parse::<i64>().map_err(|_| invalid())?;
    let value = value.parse::<i64>().map_err(|_| invalid())?;

    Ok(Reading::new(kind, time, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_temperature_line() {
        let frame = decode_line("TEMP 1700000000:21").unwrap();
        assert_eq!(
            frame,
            Frame::Data(vec![Reading::new(Kind::Temperature, 1700000000, 21)])
        );
    }

    #[test]
    fn test_decode_multiple_pairs() {
        let frame = decode_line("HUMID 100:50 50:30 200:10\r\n").unwrap();
        let Frame::Data(readings) = frame else {
            panic!("expected data frame");
        };
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[1], Reading::new(Kind::Humidity, 50, 30));
    }

    #[test]
    fn test_decode_alive_and_handshake() {
        assert_eq!(decode_line("ALIVE").unwrap(), Frame::Alive);
        assert_eq!(decode_line("ALIVE\r\n").unwrap(), Frame::Alive);
        assert_eq!(decode_line("REQUEST TRANSMISSION").unwrap(), Frame::Handshake);
    }

    #[test]
    fn test_unknown_lines_are_ignored() {
        assert_eq!(decode_line("").unwrap(), Frame::Ignored);
        assert_eq!(decode_line("PRESSURE 1:2").unwrap(), Frame::Ignored);
        assert_eq!(decode_line("TEMPX 1:2").unwrap(), Frame::Ignored);
        assert_eq!(decode_line("81").unwrap(), Frame::Ignored);
    }

    #[test]
    fn test_malformed_pair_rejects_line() {
        assert_eq!(
            decode_line("TEMP abc:xyz"),
            Err(ProtocolError::InvalidPair("abc:xyz".to_string()))
        );
        assert!(decode_line("TEMP 1:2 3-4").is_err());
        assert!(decode_line("HUMID 1:").is_err());
        assert!(decode_line("HUMID :5").is_err());
    }

    #[test]
    fn test_keyword_without_pairs() {
        assert_eq!(
            decode_line("TEMP"),
            Err(ProtocolError::MissingReadings("TEMP"))
        );
    }

    #[test]
    fn test_negative_values() {
        let frame = decode_line("TEMP 10:-5").unwrap();
        assert_eq!(frame, Frame::Data(vec![Reading::new(Kind::Temperature, 10, -5)]));
    }

    proptest! {
        #[test]
        fn valid_lines_decode_exactly(
            humid in any::<bool>(),
            pairs in prop::collection::vec((0i64..4_000_000_000, -100i64..200), 1..8),
        ) {
            let kind = if humid { Kind::Humidity } else { Kind::Temperature };
            let body: Vec<String> = pairs.iter().map(|(t, v)| format!("{t}:{v}")).collect();
            let line = format!("{} {}\r\n", kind.keyword(), body.join(" "));

            let expected: Vec<Reading> = pairs
                .iter()
                .map(|&(t, v)| Reading::new(kind, t, v))
                .collect();
            prop_assert_eq!(decode_line(&line).unwrap(), Frame::Data(expected));
        }

        #[test]
        fn decoding_never_panics(line in "\\PC{0,64}") {
            let _ = decode_line(&line);
        }
    }
}
