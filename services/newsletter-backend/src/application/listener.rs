use std::net::ToSocketAddrs;
use std::{fmt, net::TcpListener};

#[derive(Debug)]
pub enum Error {
    AddressResolution {
        context: String,
    },
    AddressDefinition {
        context: String,
        source: std::io::Error,
    },
    TcpListener {
        context: String,
        source: std::io::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AddressResolution { context } => {
                write!(fmt, "Could not resolve server address: {context}")
            }
            Error::AddressDefinition { context, source } => {
                write!(fmt, "Could not define server address: {context} | {source}")
            }
            Error::TcpListener { context, source } => {
                write!(fmt, "Could not build TCP listener: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Binds a listener on the first address `host` resolves to. Port 0 picks a free port.
pub fn listen_with_host_port(host: &str, port: u16) -> Result<TcpListener, Error> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|err| Error::AddressDefinition {
            context: format!("Could not resolve address {host}:{port}"),
            source: err,
        })?
        .next()
        .ok_or_else(|| Error::AddressResolution {
            context: format!("No address for {host}:{port}"),
        })?;

    TcpListener::bind(addr).map_err(|err| Error::TcpListener {
        context: format!("Could not listen on address {host}:{port}"),
        source: err,
    })
}
