use std::time::Duration;

use clap::Parser;

use crate::connection::{DecodeFaultPolicy, ReconnectPolicy};

pub const DEFAULT_SERVER: &str = "localhost:12345";

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive client for the fundraising event service", long_about = None)]
pub struct Cli {
    /// Address of the fundraising service, as host:port.
    #[arg(long, env = "FUNDRAISER_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Pause between reconnect attempts, in milliseconds.
    #[arg(long, env = "FUNDRAISER_RECONNECT_DELAY_MS", default_value_t = 2000)]
    pub reconnect_delay_ms: u64,

    /// What to do when the server sends a response that cannot be decoded.
    #[arg(long, value_enum, default_value_t = DecodeFaultPolicy::Fatal)]
    pub on_decode_error: DecodeFaultPolicy,
}

impl Cli {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::fixed(Duration::from_millis(self.reconnect_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service_constants() {
        let cli = Cli::try_parse_from(["fundraiser-client"]).expect("parse");
        assert_eq!(cli.server, DEFAULT_SERVER);
        assert_eq!(cli.reconnect_policy(), ReconnectPolicy::default());
        assert_eq!(cli.on_decode_error, DecodeFaultPolicy::Fatal);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "fundraiser-client",
            "--server",
            "10.0.0.5:4000",
            "--reconnect-delay-ms",
            "0",
            "--on-decode-error",
            "reconnect",
        ])
        .expect("parse");
        assert_eq!(cli.server, "10.0.0.5:4000");
        assert_eq!(cli.reconnect_policy(), ReconnectPolicy::immediate());
        assert_eq!(cli.on_decode_error, DecodeFaultPolicy::Reconnect);
    }
}
