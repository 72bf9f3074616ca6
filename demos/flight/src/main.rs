//! Builds, encodes and decodes a couple of messages from `protocol.json`.
//!
//! Run with `RUST_LOG=frogproto=trace` to see the library's own logging.

use std::path::PathBuf;

use frogproto::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), FrogprotoError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("protocol.json"));
    let protocol = Protocol::load(path)?;
    tracing::info!(
        name = protocol.name(),
        version = protocol.version(),
        messages = protocol.kinds().len(),
        "protocol ready"
    );

    flight(&protocol)?;
    text(&protocol)?;
    Ok(())
}

fn flight(protocol: &Protocol) -> Result<(), FrogprotoError> {
    let Some(kind) = protocol
        .messages()
        .namespace("Status")
        .and_then(|ns| ns.namespace("System"))
        .and_then(|ns| ns.kind("FLIGHT"))
    else {
        tracing::warn!("schema has no Status.System.FLIGHT");
        return Ok(());
    };

    let (lat, lon) = (15.833_455_f64, 20.898_841_f64);
    let mode = protocol
        .enum_member("FlightMode", "LOITER")
        .unwrap_or(Value::Enum(0));
    let message = kind.construct([
        ("airspeed", Value::from(100i64)),
        ("FlightMode", mode),
        ("groundspeed", Value::from(100i64)),
        ("heading", Value::from(0u16)),
        ("msl_alt", Value::from(100i64)),
        ("lat", Value::from((lat * 1e7) as i32)),
        ("lon", Value::from((lon * 1e7) as i32)),
    ])?;
    tracing::info!(object = %message.to_json(), "built FLIGHT");

    round_trip(protocol, &message)
}

fn text(protocol: &Protocol) -> Result<(), FrogprotoError> {
    let Some(kind) = protocol.kind("Testing.System.TEXTMSG") else {
        tracing::warn!("schema has no Testing.System.TEXTMSG");
        return Ok(());
    };

    match kind.construct([("textdata", b"testing".to_vec())]) {
        Ok(_) => tracing::warn!("bytes were accepted for a string field"),
        Err(e) => tracing::info!(error = %e, "expected failure on wrong type"),
    }

    let message = kind.construct([("textdata", "testing")])?;
    round_trip(protocol, &message)
}

fn round_trip(protocol: &Protocol, message: &MessageInstance) -> Result<(), FrogprotoError> {
    let bytes = protocol.encode_message(message)?;
    let id = protocol.messageid(message)?;
    let object = message.to_json();
    tracing::info!(
        message = protocol.message_str_from_id(id).unwrap_or("?"),
        payload = %object["payload"],
        len = bytes.len(),
        "encoded"
    );

    let (kind, decoded) = protocol.decode_message(&bytes)?;
    let object = decoded.to_json();
    tracing::info!(
        kind = %kind,
        payload = %object["payload"],
        id = protocol.messageid(&kind)?,
        "decoded"
    );
    Ok(())
}
