//! Console input validation.
//!
//! Validators are plain functions from a raw line to a value, so they can be
//! tested without a terminal. [`Prompter`] adds the blocking part: print the
//! prompt, read a line, and keep asking until the validator accepts it.

use chrono::NaiveDate;
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    codec::{MAX_TEXT_BYTES, encoded_text_len},
    display::{DATE_FORMAT, write_line},
};

/// Why a line was rejected. The `Display` text is shown to the user before
/// the prompt is repeated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Input cannot be empty. Please try again.")]
    Empty,
    #[error("Input is too long. Please enter at most 65535 bytes.")]
    TooLong,
    #[error("Invalid input. Please enter a positive number.")]
    NotAboveFloor,
    #[error("Invalid input. Please enter a number between {min} and {max}.")]
    OutOfRange { min: i32, max: i32 },
    #[error("Invalid date format. Please enter the date in MM-dd-yyyy format.")]
    BadDate,
}

pub fn parse_text(input: &str) -> Result<String, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }
    if encoded_text_len(trimmed) > MAX_TEXT_BYTES {
        return Err(InputError::TooLong);
    }
    Ok(trimmed.to_string())
}

/// Accepts a finite number strictly greater than `floor`.
pub fn parse_amount(input: &str, floor: f64) -> Result<f64, InputError> {
    match input.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > floor => Ok(value),
        _ => Err(InputError::NotAboveFloor),
    }
}

/// Accepts an integer in the inclusive range `[min, max]`.
pub fn parse_choice(input: &str, min: i32, max: i32) -> Result<i32, InputError> {
    match input.trim().parse::<i32>() {
        Ok(value) if (min..=max).contains(&value) => Ok(value),
        _ => Err(InputError::OutOfRange { min, max }),
    }
}

pub fn parse_date(input: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| InputError::BadDate)
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
    line: Vec<u8>,
}

impl<R, W> Prompter<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            line: Vec::new(),
        }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Repeats `prompt` until `validate` accepts a line. Returns `None` once
    /// the input is exhausted. Bytes that are not UTF-8 are replaced, so a
    /// garbled line is rejected by the validator instead of failing the read.
    pub async fn ask<T, F>(&mut self, prompt: &str, validate: F) -> io::Result<Option<T>>
    where
        F: Fn(&str) -> Result<T, InputError>,
    {
        loop {
            self.output.write_all(prompt.as_bytes()).await?;
            self.output.flush().await?;

            self.line.clear();
            if self.input.read_until(b'\n', &mut self.line).await? == 0 {
                return Ok(None);
            }

            match validate(&String::from_utf8_lossy(&self.line)) {
                Ok(value) => return Ok(Some(value)),
                Err(reason) => write_line(&mut self.output, &reason.to_string()).await?,
            }
        }
    }

    pub async fn text(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.ask(prompt, parse_text).await
    }

    pub async fn amount(&mut self, prompt: &str, floor: f64) -> io::Result<Option<f64>> {
        self.ask(prompt, |line| parse_amount(line, floor)).await
    }

    pub async fn choice(&mut self, prompt: &str, min: i32, max: i32) -> io::Result<Option<i32>> {
        self.ask(prompt, |line| parse_choice(line, min, max)).await
    }

    pub async fn date(&mut self, prompt: &str) -> io::Result<Option<NaiveDate>> {
        self.ask(prompt, parse_date).await
    }
}
