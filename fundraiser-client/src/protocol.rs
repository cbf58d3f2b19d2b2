//! Request and response shapes for each command.
//!
//! Every request starts with its command name as a text field, followed by a
//! fixed sequence of typed fields. Responses carry no name; the reader picks
//! the shape from the request it just sent. EXIT never reaches the wire and
//! lives with the interaction loop instead.

use bytes::BytesMut;
use chrono::NaiveDate;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::{
    codec::{
        CodecError, put_bool, put_date, put_f64, put_i32, put_text, read_bool, read_date,
        read_f64, read_i32, read_text,
    },
    session::EventIndex,
};

pub const CREATE_EVENT: &str = "CREATE_EVENT";
pub const LIST_EVENTS: &str = "LIST_EVENTS";
pub const DONATE: &str = "DONATE";
pub const CHECK_DETAILS: &str = "CHECK_DETAILS";

// Caps the up-front allocation for a listing; the count itself comes from the peer.
const LISTING_PREALLOC_LIMIT: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    CreateEvent {
        name: String,
        target: f64,
        deadline: NaiveDate,
    },
    ListEvents,
    Donate {
        index: i32,
        amount: f64,
    },
    CheckDetails {
        index: i32,
    },
}

/// One row of a LIST_EVENTS response.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    pub is_current: bool,
    pub name: String,
    pub target: f64,
    pub raised: f64,
    pub deadline: NaiveDate,
}

/// CHECK_DETAILS response body.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    pub name: String,
    pub target: f64,
    pub raised: f64,
    pub deadline: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Confirmation or rejection text for CREATE_EVENT and DONATE.
    Message(String),
    Listing(Vec<EventSummary>),
    Details(EventDetails),
}

impl Request {
    pub fn donate(index: EventIndex, amount: f64) -> Self {
        Request::Donate {
            index: index.zero_based(),
            amount,
        }
    }

    pub fn check_details(index: EventIndex) -> Self {
        Request::CheckDetails {
            index: index.zero_based(),
        }
    }

    pub fn command_name(&self) -> &'static str {
        match self {
            Request::CreateEvent { .. } => CREATE_EVENT,
            Request::ListEvents => LIST_EVENTS,
            Request::Donate { .. } => DONATE,
            Request::CheckDetails { .. } => CHECK_DETAILS,
        }
    }

    pub fn encode(&self) -> Result<BytesMut, CodecError> {
        let mut buf = BytesMut::new();
        put_text(&mut buf, self.command_name())?;
        match self {
            Request::CreateEvent {
                name,
                target,
                deadline,
            } => {
                put_text(&mut buf, name)?;
                put_f64(&mut buf, *target);
                put_date(&mut buf, *deadline);
            }
            Request::ListEvents => {}
            Request::Donate { index, amount } => {
                put_i32(&mut buf, *index);
                put_f64(&mut buf, *amount);
            }
            Request::CheckDetails { index } => put_i32(&mut buf, *index),
        }
        Ok(buf)
    }

    /// Server half: decodes the next request from a client.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self, CodecError>
    where
        R: AsyncRead + Unpin,
    {
        let name = read_text(reader).await?;
        let request = match name.as_str() {
            CREATE_EVENT => Request::CreateEvent {
                name: read_text(reader).await?,
                target: read_f64(reader).await?,
                deadline: read_date(reader).await?,
            },
            LIST_EVENTS => Request::ListEvents,
            DONATE => Request::Donate {
                index: read_i32(reader).await?,
                amount: read_f64(reader).await?,
            },
            CHECK_DETAILS => Request::CheckDetails {
                index: read_i32(reader).await?,
            },
            _ => return Err(CodecError::UnknownCommand(name)),
        };
        Ok(request)
    }

    /// Client half: decodes the response this request expects.
    pub async fn read_response<R>(&self, reader: &mut R) -> Result<Response, CodecError>
    where
        R: AsyncRead + Unpin,
    {
        match self {
            Request::CreateEvent { .. } | Request::Donate { .. } => {
                Ok(Response::Message(read_text(reader).await?))
            }
            Request::ListEvents => read_listing(reader).await.map(Response::Listing),
            Request::CheckDetails { .. } => Ok(Response::Details(EventDetails {
                name: read_text(reader).await?,
                target: read_f64(reader).await?,
                raised: read_f64(reader).await?,
                deadline: read_date(reader).await?,
            })),
        }
    }
}

impl Response {
    pub fn encode(&self) -> Result<BytesMut, CodecError> {
        let mut buf = BytesMut::new();
        match self {
            Response::Message(text) => put_text(&mut buf, text)?,
            Response::Listing(events) => {
                put_i32(&mut buf, events.len() as i32);
                for event in events {
                    put_bool(&mut buf, event.is_current);
                    put_text(&mut buf, &event.name)?;
                    put_f64(&mut buf, event.target);
                    put_f64(&mut buf, event.raised);
                    put_date(&mut buf, event.deadline);
                }
            }
            Response::Details(details) => {
                put_text(&mut buf, &details.name)?;
                put_f64(&mut buf, details.target);
                put_f64(&mut buf, details.raised);
                put_date(&mut buf, details.deadline);
            }
        }
        Ok(buf)
    }

    /// Server half: writes and flushes the whole response.
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), CodecError>
    where
        W: AsyncWrite + Unpin,
    {
        let encoded = self.encode()?;
        writer.write_all(&encoded).await?;
        writer.flush().await?;
        Ok(())
    }
}

async fn read_listing<R>(reader: &mut R) -> Result<Vec<EventSummary>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let count = read_i32(reader).await?;
    let count = usize::try_from(count).map_err(|_| CodecError::NegativeCount(count))?;

    let mut events = Vec::with_capacity(count.min(LISTING_PREALLOC_LIMIT));
    for _ in 0..count {
        events.push(EventSummary {
            is_current: read_bool(reader).await?,
            name: read_text(reader).await?,
            target: read_f64(reader).await?,
            raised: read_f64(reader).await?,
            deadline: read_date(reader).await?,
        });
    }
    Ok(events)
}
