#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Result;
use chrono::NaiveDate;
use fundraiser_client::{
    client::Client,
    connection::{ConnectionManager, DecodeFaultPolicy, ReconnectPolicy},
    console::Prompter,
    protocol::{EventDetails, EventSummary, Request, Response},
};
use tokio::{
    io::BufReader,
    net::{TcpListener, TcpStream},
    sync::Mutex,
    task::JoinHandle,
};

pub fn date(month: u32, day: u32, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub name: String,
    pub target: f64,
    pub raised: f64,
    pub deadline: NaiveDate,
}

/// In-memory stand-in for the fundraising service. Events whose deadline is
/// on or after `today` count as current.
pub struct FakeService {
    today: NaiveDate,
    events: Mutex<Vec<StoredEvent>>,
    received: Mutex<Vec<Request>>,
    connections: AtomicUsize,
    /// Hang up on the first connection after answering this many requests.
    hang_up_after: Option<usize>,
}

impl FakeService {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            events: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            hang_up_after: None,
        }
    }

    pub fn hang_up_after(mut self, requests: usize) -> Self {
        self.hang_up_after = Some(requests);
        self
    }

    pub fn with_event(mut self, name: &str, target: f64, raised: f64, deadline: NaiveDate) -> Self {
        self.events.get_mut().push(StoredEvent {
            name: name.to_string(),
            target,
            raised,
            deadline,
        });
        self
    }

    pub async fn received(&self) -> Vec<Request> {
        self.received.lock().await.clone()
    }

    pub async fn events(&self) -> Vec<StoredEvent> {
        self.events.lock().await.clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    async fn handle(&self, request: Request) -> Response {
        let mut events = self.events.lock().await;
        match request {
            Request::CreateEvent {
                name,
                target,
                deadline,
            } => {
                events.push(StoredEvent {
                    name,
                    target,
                    raised: 0.0,
                    deadline,
                });
                Response::Message("Event created successfully.".to_string())
            }
            Request::ListEvents => Response::Listing(
                events
                    .iter()
                    .map(|event| EventSummary {
                        is_current: event.deadline >= self.today,
                        name: event.name.clone(),
                        target: event.target,
                        raised: event.raised,
                        deadline: event.deadline,
                    })
                    .collect(),
            ),
            Request::Donate { index, amount } => {
                match usize::try_from(index).ok().filter(|&i| i < events.len()) {
                    Some(i) => {
                        events[i].raised += amount;
                        Response::Message("Donation successful.".to_string())
                    }
                    None => Response::Message("Invalid event index.".to_string()),
                }
            }
            Request::CheckDetails { index } => {
                let event = usize::try_from(index)
                    .ok()
                    .and_then(|i| events.get(i))
                    .cloned()
                    .unwrap_or(StoredEvent {
                        name: String::new(),
                        target: 0.0,
                        raised: 0.0,
                        deadline: self.today,
                    });
                Response::Details(EventDetails {
                    name: event.name,
                    target: event.target,
                    raised: event.raised,
                    deadline: event.deadline,
                })
            }
        }
    }
}

pub async fn spawn_service(service: Arc<FakeService>) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let _ = serve_connection(stream, service).await;
            });
        }
    });
    Ok((addr, handle))
}

async fn serve_connection(stream: TcpStream, service: Arc<FakeService>) -> Result<()> {
    let connection_number = service.connections.fetch_add(1, Ordering::SeqCst) + 1;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let mut answered = 0;
    loop {
        let request = Request::read_from(&mut reader).await?;
        service.received.lock().await.push(request.clone());
        let response = service.handle(request).await;
        response.write_to(&mut writer).await?;
        answered += 1;

        if connection_number == 1 && service.hang_up_after == Some(answered) {
            return Ok(());
        }
    }
}

pub struct ClientRun {
    pub result: Result<()>,
    pub output: String,
    pub event_count: u32,
    pub reconnects: u64,
}

/// Runs a client against `addr` with the given console input, without any
/// reconnect pause.
pub async fn run_client(
    addr: SocketAddr,
    input: &str,
    decode_policy: DecodeFaultPolicy,
) -> ClientRun {
    run_client_with(addr, input, decode_policy, ReconnectPolicy::immediate()).await
}

pub async fn run_client_with(
    addr: SocketAddr,
    input: &str,
    decode_policy: DecodeFaultPolicy,
    reconnect_policy: ReconnectPolicy,
) -> ClientRun {
    let manager = ConnectionManager::new(addr.to_string(), reconnect_policy);
    let prompter = Prompter::new(input.as_bytes(), Vec::new());
    let mut client = Client::new(manager, prompter, decode_policy);

    let result = client.run().await;
    let event_count = client.session().last_known_event_count();
    let reconnects = client.connection().reconnects();
    let output = String::from_utf8(client.into_output()).expect("console output is utf8");
    ClientRun {
        result,
        output,
        event_count,
        reconnects,
    }
}
