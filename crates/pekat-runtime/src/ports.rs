//! Free port discovery for locally spawned servers.
//!
//! The server binds the port it is given and the one right after it, so the
//! client has to find two consecutive free ports.

use pekat_core::{AnalyzerError, AnalyzerResult};
use std::net::TcpListener;
use tracing::debug;

/// Answers whether a loopback port can currently be bound.
pub trait PortProbe {
    fn is_free(&self, port: u16) -> bool;
}

/// Probes by binding a listener on 127.0.0.1 and dropping it immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackProbe;

impl PortProbe for LoopbackProbe {
    fn is_free(&self, port: u16) -> bool {
        match TcpListener::bind(("127.0.0.1", port)) {
            // Dropping the listener releases the port
            Ok(listener) => listener.local_addr().is_ok(),
            Err(_) => false,
        }
    }
}

/// Find the first port `p` in `start..end` such that `p` and `p + 1` are free.
///
/// Only `p` is returned; the server derives the second port itself.
pub fn find_free_port_pair(start: u16, end: u16) -> AnalyzerResult<u16> {
    find_free_port_pair_with(&LoopbackProbe, start, end)
}

/// [`find_free_port_pair`] against an arbitrary [`PortProbe`].
pub fn find_free_port_pair_with<P: PortProbe + ?Sized>(
    probe: &P,
    start: u16,
    end: u16,
) -> AnalyzerResult<u16> {
    // First free port of a pair that is not confirmed yet
    let mut pending: Option<u16> = None;

    for port in start..end {
        if probe.is_free(port) {
            if let Some(first) = pending {
                debug!(port = %first, "Found free port pair");
                return Ok(first);
            }
            pending = Some(port);
        } else {
            debug!(port = %port, "Port unavailable, skipping");
            pending = None;
        }
    }

    Err(AnalyzerError::PortExhausted { start, end })
}
