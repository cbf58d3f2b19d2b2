//! Interactive menu loop.
//!
//! Each menu selection runs exactly one request/response exchange, then the
//! menu is shown again. Everything runs on one task: a prompt or a round trip
//! blocks the loop until it finishes, and a lost connection blocks it until a
//! new one is up.

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::{
    connection::{ConnectionManager, DecodeFaultPolicy, ExchangeError},
    console::Prompter,
    display::{SEPARATOR, format_details, format_listing, write_line, write_lines},
    protocol::{Request, Response},
    session::Session,
};

pub const NO_LISTING_NOTICE: &str = "No events listed yet. List fundraising events first.";

const MENU: [&str; 7] = [
    SEPARATOR,
    "Choose an option:",
    "1. Create a new fundraising event",
    "2. List fundraising events",
    "3. Donate to an event",
    "4. Check event details",
    "5. Exit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    CreateEvent,
    ListEvents,
    Donate,
    CheckDetails,
    Exit,
}

impl MenuChoice {
    pub const FIRST: i32 = 1;
    pub const LAST: i32 = 5;

    pub fn from_number(number: i32) -> Option<Self> {
        match number {
            1 => Some(MenuChoice::CreateEvent),
            2 => Some(MenuChoice::ListEvents),
            3 => Some(MenuChoice::Donate),
            4 => Some(MenuChoice::CheckDetails),
            5 => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct Client<R, W> {
    connection: ConnectionManager,
    session: Session,
    prompter: Prompter<R, W>,
    decode_policy: DecodeFaultPolicy,
}

impl<R, W> Client<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        connection: ConnectionManager,
        prompter: Prompter<R, W>,
        decode_policy: DecodeFaultPolicy,
    ) -> Self {
        Self {
            connection,
            session: Session::new(),
            prompter,
            decode_policy,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn into_output(self) -> W {
        self.prompter.into_output()
    }

    /// Runs until the user picks Exit or input ends. Returns an error only for
    /// console I/O failures and fatal protocol faults.
    pub async fn run(&mut self) -> Result<()> {
        self.connection
            .connect(self.prompter.output())
            .await
            .context("failed to write to console")?;

        loop {
            let flow = match self.select().await? {
                Some(MenuChoice::CreateEvent) => self.create_event().await?,
                Some(MenuChoice::ListEvents) => self.list_events().await?,
                Some(MenuChoice::Donate) => self.donate().await?,
                Some(MenuChoice::CheckDetails) => self.check_details().await?,
                Some(MenuChoice::Exit) => {
                    self.say("Exiting...").await?;
                    Flow::Exit
                }
                None => Flow::Exit,
            };

            if flow == Flow::Exit {
                break;
            }
        }

        info!(
            reconnects = self.connection.reconnects(),
            events = self.session.last_known_event_count(),
            "session finished"
        );
        Ok(())
    }

    async fn select(&mut self) -> Result<Option<MenuChoice>> {
        write_lines(self.prompter.output(), MENU).await?;
        let choice = self
            .prompter
            .choice("Enter your choice: ", MenuChoice::FIRST, MenuChoice::LAST)
            .await?;
        Ok(choice.and_then(MenuChoice::from_number))
    }

    async fn create_event(&mut self) -> Result<Flow> {
        self.say(SEPARATOR).await?;
        let Some(name) = self.prompter.text("Enter event name: ").await? else {
            return Ok(Flow::Exit);
        };
        let Some(target) = self.prompter.amount("Enter target amount: ", 0.0).await? else {
            return Ok(Flow::Exit);
        };
        let Some(deadline) = self
            .prompter
            .date("Enter deadline (in format MM-dd-yyyy): ")
            .await?
        else {
            return Ok(Flow::Exit);
        };

        let request = Request::CreateEvent {
            name,
            target,
            deadline,
        };
        match self.send(&request).await? {
            Some(Response::Message(text)) => self.say(&text).await?,
            Some(other) => bail!("unexpected response to CREATE_EVENT: {other:?}"),
            None => {}
        }
        Ok(Flow::Continue)
    }

    async fn list_events(&mut self) -> Result<Flow> {
        self.say(SEPARATOR).await?;
        match self.send(&Request::ListEvents).await? {
            Some(Response::Listing(events)) => {
                let count = u32::try_from(events.len()).unwrap_or(u32::MAX);
                self.session.record_listing(count);
                info!(count, "listing received");
                write_lines(self.prompter.output(), format_listing(&events)).await?;
            }
            Some(other) => bail!("unexpected response to LIST_EVENTS: {other:?}"),
            None => {}
        }
        Ok(Flow::Continue)
    }

    async fn donate(&mut self) -> Result<Flow> {
        self.say(SEPARATOR).await?;
        let Some((min, max)) = self.session.display_range() else {
            self.say(NO_LISTING_NOTICE).await?;
            return Ok(Flow::Continue);
        };
        let Some(position) = self.prompter.choice("Enter event index: ", min, max).await? else {
            return Ok(Flow::Exit);
        };
        let index = self.session.check_display_index(position)?;
        let Some(amount) = self.prompter.amount("Enter donation amount: ", 0.0).await? else {
            return Ok(Flow::Exit);
        };
        debug!(event = index.display(), amount, "donating");

        match self.send(&Request::donate(index, amount)).await? {
            Some(Response::Message(text)) => self.say(&text).await?,
            Some(other) => bail!("unexpected response to DONATE: {other:?}"),
            None => {}
        }
        Ok(Flow::Continue)
    }

    async fn check_details(&mut self) -> Result<Flow> {
        self.say(SEPARATOR).await?;
        let Some((min, max)) = self.session.display_range() else {
            self.say(NO_LISTING_NOTICE).await?;
            return Ok(Flow::Continue);
        };
        let Some(position) = self.prompter.choice("Enter event index: ", min, max).await? else {
            return Ok(Flow::Exit);
        };
        let index = self.session.check_display_index(position)?;
        debug!(event = index.display(), "checking details");

        match self.send(&Request::check_details(index)).await? {
            Some(Response::Details(details)) => {
                write_lines(self.prompter.output(), format_details(&details)).await?;
            }
            Some(other) => bail!("unexpected response to CHECK_DETAILS: {other:?}"),
            None => {}
        }
        Ok(Flow::Continue)
    }

    /// Runs one exchange. `None` means the request was lost and the fault has
    /// already been handled; the caller just returns to the menu.
    async fn send(&mut self, request: &Request) -> Result<Option<Response>> {
        match self.connection.exchange(request).await {
            Ok(response) => Ok(Some(response)),
            Err(err) => {
                self.recover(request, err).await?;
                Ok(None)
            }
        }
    }

    async fn recover(&mut self, request: &Request, err: ExchangeError) -> Result<()> {
        let command = request.command_name();
        match err {
            ExchangeError::Encode(cause) => {
                warn!(command, error = %cause, "request not sent");
                self.say(&format!("Request could not be sent: {cause}"))
                    .await?;
            }
            ExchangeError::Decode(cause) if self.decode_policy == DecodeFaultPolicy::Fatal => {
                error!(command, error = %cause, "malformed response");
                self.say(&format!("Protocol error: {cause}")).await?;
                return Err(
                    anyhow::Error::new(cause).context(format!("malformed response to {command}"))
                );
            }
            err => {
                warn!(
                    command,
                    endpoint = self.connection.endpoint(),
                    error = %err,
                    "reconnecting"
                );
                self.connection
                    .reconnect(self.prompter.output())
                    .await
                    .context("failed to write to console")?;
            }
        }
        Ok(())
    }

    async fn say(&mut self, line: &str) -> Result<()> {
        write_line(self.prompter.output(), line)
            .await
            .context("failed to write to console")
    }
}
