//! Primitive field encoding for the fundraising wire protocol.
//!
//! Messages carry no type tags: both peers know the field sequence for every
//! command, so this module only knows how to put and take single fields.
//! Everything is big-endian. Text is modified UTF-8 behind a `u16` byte
//! length, the framing used by `DataOutput`-style streams.
//!
//! Encoding appends to a [`BytesMut`] so a whole request can be written with a
//! single `write_all`. Decoding reads straight from any [`AsyncRead`].

use std::io;

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest encoded text field, bounded by the `u16` length prefix.
pub const MAX_TEXT_BYTES: usize = u16::MAX as usize;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("stream ended in the middle of a message")]
    Truncated,
    #[error("text field is not valid modified UTF-8")]
    MalformedText,
    #[error("text field encodes to {0} bytes, the limit is 65535")]
    TextTooLong(usize),
    #[error("timestamp {0} ms is outside the supported date range")]
    TimestampOutOfRange(i64),
    #[error("negative event count {0}")]
    NegativeCount(i32),
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
}

pub fn put_text(buf: &mut BytesMut, text: &str) -> Result<(), CodecError> {
    let encoded = encode_modified_utf8(text);
    let len = u16::try_from(encoded.len()).map_err(|_| CodecError::TextTooLong(encoded.len()))?;
    buf.put_u16(len);
    buf.put_slice(&encoded);
    Ok(())
}

pub fn put_f64(buf: &mut BytesMut, value: f64) {
    buf.put_f64(value);
}

pub fn put_i32(buf: &mut BytesMut, value: i32) {
    buf.put_i32(value);
}

pub fn put_bool(buf: &mut BytesMut, value: bool) {
    buf.put_u8(u8::from(value));
}

/// Dates travel as the epoch milliseconds of their UTC midnight.
pub fn put_date(buf: &mut BytesMut, date: NaiveDate) {
    buf.put_i64(date_to_millis(date));
}

pub async fn read_text<R>(reader: &mut R) -> Result<String, CodecError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u16().await.map_err(read_error)?;
    let mut bytes = vec![0; usize::from(len)];
    reader.read_exact(&mut bytes).await.map_err(read_error)?;
    decode_modified_utf8(&bytes)
}

pub async fn read_f64<R>(reader: &mut R) -> Result<f64, CodecError>
where
    R: AsyncRead + Unpin,
{
    reader.read_f64().await.map_err(read_error)
}

pub async fn read_i32<R>(reader: &mut R) -> Result<i32, CodecError>
where
    R: AsyncRead + Unpin,
{
    reader.read_i32().await.map_err(read_error)
}

pub async fn read_bool<R>(reader: &mut R) -> Result<bool, CodecError>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_u8().await.map_err(read_error)? != 0)
}

pub async fn read_date<R>(reader: &mut R) -> Result<NaiveDate, CodecError>
where
    R: AsyncRead + Unpin,
{
    let millis = reader.read_i64().await.map_err(read_error)?;
    millis_to_date(millis)
}

pub fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Reads the calendar day in UTC; the time of day is discarded.
pub fn millis_to_date(millis: i64) -> Result<NaiveDate, CodecError> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|instant| instant.date_naive())
        .ok_or(CodecError::TimestampOutOfRange(millis))
}

/// Number of bytes `text` occupies on the wire, excluding the length prefix.
pub fn encoded_text_len(text: &str) -> usize {
    text.encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007F => 1,
            0x0000 | 0x0080..=0x07FF => 2,
            _ => 3,
        })
        .sum()
}

fn read_error(err: io::Error) -> CodecError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        CodecError::Truncated
    } else {
        CodecError::Io(err)
    }
}

// Modified UTF-8 works on UTF-16 code units: NUL takes two bytes and
// supplementary characters become a pair of three-byte surrogates.
fn encode_modified_utf8(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

fn decode_modified_utf8(bytes: &[u8]) -> Result<String, CodecError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(first) = iter.next() {
        let unit = match first >> 4 {
            0x0..=0x7 => u16::from(first),
            0xC | 0xD => {
                let second = continuation(iter.next())?;
                (u16::from(first & 0x1F) << 6) | second
            }
            0xE => {
                let second = continuation(iter.next())?;
                let third = continuation(iter.next())?;
                (u16::from(first & 0x0F) << 12) | (second << 6) | third
            }
            _ => return Err(CodecError::MalformedText),
        };
        units.push(unit);
    }
    String::from_utf16(&units).map_err(|_| CodecError::MalformedText)
}

fn continuation(byte: Option<u8>) -> Result<u16, CodecError> {
    match byte {
        Some(byte) if byte & 0xC0 == 0x80 => Ok(u16::from(byte & 0x3F)),
        _ => Err(CodecError::MalformedText),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32, year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[tokio::test]
    async fn text_is_length_prefixed_modified_utf8() {
        let mut buf = BytesMut::new();
        put_text(&mut buf, "LIST_EVENTS").expect("encode");
        assert_eq!(&buf[..2], &[0x00, 0x0B]);
        assert_eq!(&buf[2..], b"LIST_EVENTS");

        let mut reader = &buf[..];
        assert_eq!(read_text(&mut reader).await.expect("decode"), "LIST_EVENTS");
    }

    #[tokio::test]
    async fn nul_and_supplementary_characters_use_modified_utf8() {
        let mut buf = BytesMut::new();
        put_text(&mut buf, "a\0b").expect("encode");
        assert_eq!(&buf[..], &[0x00, 0x04, b'a', 0xC0, 0x80, b'b']);

        let mut buf = BytesMut::new();
        put_text(&mut buf, "run 🏃").expect("encode");
        // Four ASCII bytes plus two three-byte surrogates.
        assert_eq!(&buf[..2], &[0x00, 0x0A]);
        assert_eq!(encoded_text_len("run 🏃"), 10);

        let mut reader = &buf[..];
        assert_eq!(read_text(&mut reader).await.expect("decode"), "run 🏃");
    }

    #[test]
    fn oversized_text_is_rejected() {
        let text = "é".repeat(MAX_TEXT_BYTES / 2 + 1);
        let mut buf = BytesMut::new();
        let err = put_text(&mut buf, &text).expect_err("too long");
        assert!(matches!(err, CodecError::TextTooLong(len) if len == MAX_TEXT_BYTES + 1));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn malformed_text_is_a_decode_error() {
        let bytes = [0x00, 0x02, 0xFF, 0xFE];
        let mut reader = &bytes[..];
        let err = read_text(&mut reader).await.expect_err("malformed");
        assert!(matches!(err, CodecError::MalformedText));

        // Lone high surrogate.
        let bytes = [0x00, 0x03, 0xED, 0xA0, 0xBD];
        let mut reader = &bytes[..];
        let err = read_text(&mut reader).await.expect_err("unpaired surrogate");
        assert!(matches!(err, CodecError::MalformedText));
    }

    #[tokio::test]
    async fn short_reads_are_reported_as_truncation() {
        let bytes = [0x00, 0x05, b'a', b'b'];
        let mut reader = &bytes[..];
        assert!(matches!(
            read_text(&mut reader).await,
            Err(CodecError::Truncated)
        ));

        let bytes = [0x40, 0x09];
        let mut reader = &bytes[..];
        assert!(matches!(
            read_f64(&mut reader).await,
            Err(CodecError::Truncated)
        ));
    }

    #[tokio::test]
    async fn numbers_and_flags_are_big_endian() {
        let mut buf = BytesMut::new();
        put_i32(&mut buf, 2);
        put_f64(&mut buf, 500.0);
        put_bool(&mut buf, true);
        put_bool(&mut buf, false);
        assert_eq!(&buf[..4], &[0, 0, 0, 2]);
        assert_eq!(&buf[4..12], &500.0_f64.to_be_bytes());
        assert_eq!(&buf[12..], &[1, 0]);

        let mut reader = &buf[..];
        assert_eq!(read_i32(&mut reader).await.expect("i32"), 2);
        assert_eq!(read_f64(&mut reader).await.expect("f64"), 500.0);
        assert!(read_bool(&mut reader).await.expect("bool"));
        assert!(!read_bool(&mut reader).await.expect("bool"));
    }

    #[tokio::test]
    async fn any_nonzero_byte_reads_as_true() {
        let bytes = [0x7F];
        let mut reader = &bytes[..];
        assert!(read_bool(&mut reader).await.expect("bool"));
    }

    #[tokio::test]
    async fn dates_survive_the_wire_without_drift() {
        for day in [
            date(2, 29, 2024),
            date(12, 31, 2023),
            date(1, 1, 2024),
            date(12, 25, 2025),
            date(1, 1, 1970),
            date(6, 15, 1969),
        ] {
            let mut buf = BytesMut::new();
            put_date(&mut buf, day);
            let mut reader = &buf[..];
            assert_eq!(read_date(&mut reader).await.expect("date"), day);
        }
    }

    #[test]
    fn year_boundary_is_exactly_one_day_apart() {
        let eve = date_to_millis(date(12, 31, 2023));
        let new_year = date_to_millis(date(1, 1, 2024));
        assert_eq!(new_year - eve, 86_400_000);
        assert_eq!(new_year, 1_704_067_200_000);
    }

    #[test]
    fn time_of_day_is_ignored_when_reading_dates() {
        let late_evening = date_to_millis(date(2, 29, 2024)) + 23 * 3_600_000;
        assert_eq!(millis_to_date(late_evening).expect("date"), date(2, 29, 2024));
    }

    #[test]
    fn unrepresentable_timestamps_are_rejected() {
        assert!(matches!(
            millis_to_date(i64::MAX),
            Err(CodecError::TimestampOutOfRange(i64::MAX))
        ));
    }
}
