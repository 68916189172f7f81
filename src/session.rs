//! Connection negotiation: version exchange, credentials, session properties.
use chrono::{DateTime, FixedOffset, Local, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    Result,
    common::{span, verbose},
    connection::config::{Config, ParseError},
    protocol::{MIN_PROTOCOL_VERSION, PROTOCOL_VERSION, ProtocolError, backend, frontend},
    transport::Transport,
};

/// Session timezone used to re-express decoded instants.
#[derive(Debug, Clone)]
pub(crate) enum SessionZone {
    /// An IANA zone configured for the session.
    Named(Tz),
    /// The invoking process's local zone; also what an empty
    /// timezone identifier maps to.
    Local,
}

impl SessionZone {
    pub(crate) fn named(name: &str) -> Result<Self, ParseError> {
        match name.parse::<Tz>() {
            Ok(tz) => Ok(Self::Named(tz)),
            Err(_) => Err(ParseError::new(format!("unknown timezone {name:?}"))),
        }
    }

    /// Re-express an absolute instant as session-local wall clock.
    pub(crate) fn resolve(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Named(tz) => utc.with_timezone(tz).fixed_offset(),
            Self::Local => utc.with_timezone(&Local).fixed_offset(),
        }
    }

    /// Session-local midnight of the day the instant falls on.
    pub(crate) fn local_midnight(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        let local = self.resolve(utc);
        let midnight = local.date_naive().and_time(NaiveTime::MIN);
        let mapped = match self {
            Self::Named(tz) => tz
                .from_local_datetime(&midnight)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            Self::Local => Local
                .from_local_datetime(&midnight)
                .earliest()
                .map(|dt| dt.fixed_offset()),
        };
        // a zone transition can skip midnight itself, keep the day's offset
        mapped.unwrap_or_else(|| {
            let offset = *local.offset();
            let shift = chrono::Duration::seconds(offset.local_minus_utc() as i64);
            DateTime::from_naive_utc_and_offset(midnight - shift, offset)
        })
    }
}

/// Connection-scoped state agreed during the handshake.
///
/// Immutable afterwards, except `schema` and `timezone` when a later
/// server acknowledgment echoes a change.
#[derive(Debug)]
pub(crate) struct SessionInfo {
    pub version: u32,
    pub schema: Option<String>,
    pub timezone: SessionZone,
    pub client_info: Option<String>,
    pub encrypted: bool,
}

/// Perform the startup exchange over a fresh transport.
///
/// The session is live only once every configuration message has been
/// individually acknowledged.
pub(crate) async fn handshake(io: &mut Transport, config: &Config) -> Result<SessionInfo> {
    span!("handshake");

    let zone = match config.timezone.as_deref() {
        // empty identifier maps explicitly to the process-local zone
        None | Some("") => SessionZone::Local,
        Some(name) => SessionZone::named(name)?,
    };

    // Version negotiation. The server answers with the highest version it
    // is willing to speak, which must fall inside our supported window.

    io.send(frontend::Hello {
        version: PROTOCOL_VERSION,
        client_name: concat!("nuodb-rust/", env!("CARGO_PKG_VERSION")),
    });
    io.flush().await?;

    let hello: backend::HelloAck = io.recv().await?;
    if !(MIN_PROTOCOL_VERSION..=PROTOCOL_VERSION).contains(&hello.version) {
        return Err(ProtocolError::version(hello.version).into());
    }
    verbose!(version = hello.version, "negotiated");

    // Credential exchange: a keyed digest over the server's salt and nonce.
    // The server replies with a session key when both sides should switch
    // to the negotiated stream cipher.

    let mut mac = Hmac::<Sha256>::new_from_slice(config.pass.as_bytes())
        .expect("hmac accepts any key length");
    mac.update(&hello.salt);
    mac.update(&hello.nonce);
    let digest = mac.finalize().into_bytes();

    io.send(frontend::Authenticate {
        user: &config.user,
        digest: digest.as_slice(),
        cipher: config.cipher as u8,
    });
    io.flush().await?;

    let auth: backend::AuthOk = io.recv().await?;
    let encrypted = config.cipher && !auth.session_key.is_empty();
    if encrypted {
        io.enable_cipher(&auth.session_key);
    }
    verbose!(encrypted, "authenticated");

    // Session configuration, one independently acknowledged round trip per
    // property. Effective values are whatever the server echoes back.

    let mut schema = None;
    if let Some(requested) = config.schema.as_deref().filter(|s| !s.is_empty()) {
        let ack = set_property(io, "schema", requested).await?;
        schema = Some(ack);
    }

    if let Some(name) = config.timezone.as_deref().filter(|s| !s.is_empty()) {
        set_property(io, "TimeZone", name).await?;
    }

    let mut client_info = None;
    if let Some(info) = config.client_info.as_deref().filter(|s| !s.is_empty()) {
        let ack = set_property(io, "ClientInfo", info).await?;
        client_info = Some(ack);
    }

    Ok(SessionInfo {
        version: hello.version,
        schema,
        timezone: zone,
        client_info,
        encrypted,
    })
}

async fn set_property(io: &mut Transport, name: &str, value: &str) -> Result<String> {
    verbose!(name, value, "set session property");
    io.send(frontend::SetProperty { name, value });
    io.flush().await?;
    let ack: backend::PropertyAck = io.recv().await?;
    Ok(ack.value.as_str().to_owned())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn named_zone_resolves() {
        let tokyo = SessionZone::named("Asia/Tokyo").unwrap();
        let utc = Utc.with_ymd_and_hms(2025, 1, 1, 20, 0, 0).unwrap();
        let local = tokyo.resolve(utc);
        assert_eq!(local.timestamp(), utc.timestamp());
        assert_eq!(local.date_naive().to_string(), "2025-01-02");
    }

    #[test]
    fn unknown_zone_is_rejected() {
        assert!(SessionZone::named("Not/AZone").is_err());
    }
}
