//! Human-readable rendering of responses.

use chrono::NaiveDate;
use tokio::io::{self, AsyncWrite, AsyncWriteExt};

use crate::protocol::{EventDetails, EventSummary};

pub const SEPARATOR: &str = "---------------------------------";
pub const CURRENT_HEADER: &str = "Current Fundraising Events:";
pub const PAST_HEADER: &str = "Past Fundraising Events:";

pub const DATE_FORMAT: &str = "%m-%d-%Y";

type Positioned<'a> = Vec<(usize, &'a EventSummary)>;

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Splits a listing into current and past events, keeping arrival order and
/// the 1-based arrival position of each event.
pub fn partition(events: &[EventSummary]) -> (Positioned<'_>, Positioned<'_>) {
    events
        .iter()
        .enumerate()
        .map(|(offset, event)| (offset + 1, event))
        .partition(|(_, event)| event.is_current)
}

/// Two decimal places, rounding ties away from zero on the shortest decimal
/// form of `value`, so `2.675` shows as `2.68` rather than `2.67`.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return format!("{value:.2}");
    }

    let shortest = value.abs().to_string();
    let (whole, fraction) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));
    let mut digits: Vec<u8> = whole
        .bytes()
        .chain(fraction.bytes().chain(std::iter::repeat(b'0')).take(2))
        .map(|digit| digit - b'0')
        .collect();

    if fraction.as_bytes().get(2).is_some_and(|&next| next >= b'5') {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if !carry {
                break;
            }
            *digit += 1;
            carry = *digit == 10;
            if carry {
                *digit = 0;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let split = digits.len() - 2;
    let render = |digits: &[u8]| digits.iter().map(|d| char::from(b'0' + d)).collect::<String>();
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{}.{}", render(&digits[..split]), render(&digits[split..]))
}

pub fn format_event_line(position: usize, event: &EventSummary) -> String {
    format!(
        "{position}. {} (Target: ${}, Raised: ${}, Deadline: {})",
        event.name,
        format_amount(event.target),
        format_amount(event.raised),
        format_date(event.deadline)
    )
}

/// Current events first, then a blank line and the past events. Positions are
/// not renumbered per section.
pub fn format_listing(events: &[EventSummary]) -> Vec<String> {
    let (current, past) = partition(events);

    let mut lines = Vec::with_capacity(events.len() + 3);
    lines.push(CURRENT_HEADER.to_string());
    lines.extend(
        current
            .into_iter()
            .map(|(position, event)| format_event_line(position, event)),
    );
    lines.push(String::new());
    lines.push(PAST_HEADER.to_string());
    lines.extend(
        past.into_iter()
            .map(|(position, event)| format_event_line(position, event)),
    );
    lines
}

pub fn format_details(details: &EventDetails) -> Vec<String> {
    vec![
        "Event Details:".to_string(),
        format!("Name: {}", details.name),
        format!("Target Amount: ${}", format_amount(details.target)),
        format!("Amount Raised: ${}", format_amount(details.raised)),
        format!("Deadline: {}", format_date(details.deadline)),
    ]
}

pub async fn write_line<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

pub async fn write_lines<W, I>(writer: &mut W, lines: I) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    for line in lines {
        writer.write_all(line.as_ref().as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await
}
