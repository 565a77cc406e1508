// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! UDP listener and datagram decoding.
//!
//! The listener owns the socket for the lifetime of the process. Each call to
//! [`Listener::recv`] waits for one datagram and hands back its payload together with the sender
//! address; [`decode`] turns the payload into text.

use std::collections::VecDeque;
use std::net::SocketAddr;

use tracing::debug;

use crate::errors::{DecodeError, RelayError};

/// Largest datagram accepted; anything longer is truncated by the socket.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 12345;

/// One received datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Vec<u8>,
    pub source: SocketAddr,
}

// BufferReader abstracts where datagrams come from.
enum BufferReader {
    /// UDP socket reader
    UdpSocket(tokio::net::UdpSocket),

    /// Mirror reader for testing - replays scripted reads, then waits forever
    #[allow(dead_code)]
    MirrorTest(VecDeque<std::io::Result<Vec<u8>>>, SocketAddr),
}

pub struct Listener {
    reader: BufferReader,
    buf: Box<[u8]>,
}

impl Listener {
    /// Binds a UDP socket to `host:port`.
    pub async fn bind(host: &str, port: u16) -> Result<Listener, RelayError> {
        let addr = format!("{}:{}", host, port);
        let socket = tokio::net::UdpSocket::bind(&addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;
        Ok(Self::with_reader(BufferReader::UdpSocket(socket)))
    }

    #[cfg(test)]
    pub(crate) fn mirror(payload: Vec<u8>, source: SocketAddr) -> Listener {
        Self::scripted(vec![Ok(payload)], source)
    }

    /// Replays `reads` in order, each `Ok` arriving from `source`.
    #[cfg(test)]
    pub(crate) fn scripted(reads: Vec<std::io::Result<Vec<u8>>>, source: SocketAddr) -> Listener {
        Self::with_reader(BufferReader::MirrorTest(reads.into(), source))
    }

    fn with_reader(reader: BufferReader) -> Listener {
        Listener {
            reader,
            buf: vec![0; MAX_DATAGRAM_SIZE].into_boxed_slice(),
        }
    }

    /// Address the socket is bound to. Useful when binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        match &self.reader {
            BufferReader::UdpSocket(socket) => socket.local_addr(),
            BufferReader::MirrorTest(_, source) => Ok(*source),
        }
    }

    /// Waits until a datagram arrives.
    pub async fn recv(&mut self) -> std::io::Result<Datagram> {
        match &mut self.reader {
            BufferReader::UdpSocket(socket) => {
                let (amt, source) = socket.recv_from(&mut self.buf).await?;
                debug!("Received {} bytes from {}", amt, source);
                Ok(Datagram {
                    payload: self.buf[..amt].to_vec(),
                    source,
                })
            }
            BufferReader::MirrorTest(reads, source) => match reads.pop_front() {
                Some(read) => read.map(|payload| Datagram {
                    payload,
                    source: *source,
                }),
                None => std::future::pending().await,
            },
        }
    }
}

/// Decodes the payload as UTF-8.
pub fn decode(datagram: Datagram) -> Result<String, DecodeError> {
    String::from_utf8(datagram.payload).map_err(|e| DecodeError {
        source_addr: datagram.source,
        cause: e.utf8_error(),
        payload: e.into_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn source() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(111, 112, 113, 114)), 5000)
    }

    #[test]
    fn test_decode_utf8_unmodified() {
        for text in ["hello", "  padded\n", "", "{\"lap\":3,\"speed\":212.4}", "日本語"] {
            let decoded = decode(Datagram {
                payload: text.as_bytes().to_vec(),
                source: source(),
            })
            .expect("valid utf-8");
            assert_eq!(decoded, text);
        }
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode(Datagram {
            payload: vec![0xff],
            source: source(),
        })
        .unwrap_err();
        assert_eq!(err.source_addr, source());
        assert_eq!(err.payload, vec![0xff]);
        assert_eq!(err.cause.valid_up_to(), 0);
    }

    proptest! {
        #[test]
        fn test_decode_any_string_unmodified(text in any::<String>(), port in any::<u16>()) {
            let source = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
            let decoded = decode(Datagram {
                payload: text.as_bytes().to_vec(),
                source,
            });
            prop_assert_eq!(decoded.ok(), Some(text));
        }

        #[test]
        fn test_decode_agrees_with_from_utf8(payload in vec(any::<u8>(), 0..256)) {
            let expected = std::str::from_utf8(&payload).map(str::to_string);
            let decoded = decode(Datagram {
                payload: payload.clone(),
                source: source(),
            });
            match (decoded, expected) {
                (Ok(text), Ok(expected)) => prop_assert_eq!(text, expected),
                (Err(err), Err(cause)) => {
                    prop_assert_eq!(err.source_addr, source());
                    prop_assert_eq!(err.payload, payload);
                    prop_assert_eq!(err.cause, cause);
                }
                (decoded, expected) => prop_assert!(
                    false,
                    "decode returned {:?}, from_utf8 returned {:?}",
                    decoded.is_ok(),
                    expected.is_ok()
                ),
            }
        }
    }

    #[tokio::test]
    async fn test_mirror_recv() {
        let mut listener = Listener::mirror(b"hello".to_vec(), source());
        let datagram = listener.recv().await.expect("recv failed");
        assert_eq!(datagram.payload, b"hello");
        assert_eq!(datagram.source, source());
    }

    #[tokio::test]
    async fn test_scripted_recv_replays_errors_in_order() {
        let mut listener = Listener::scripted(
            vec![
                Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset)),
                Ok(b"after".to_vec()),
            ],
            source(),
        );
        let err = listener.recv().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
        let datagram = listener.recv().await.expect("recv failed");
        assert_eq!(datagram.payload, b"after");
    }

    #[tokio::test]
    async fn test_udp_recv() {
        let mut listener = Listener::bind("127.0.0.1", 0).await.expect("bind failed");
        let addr = listener.local_addr().expect("no local addr");

        let sender = tokio::net::UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("unable to bind UDP socket");
        sender
            .send_to(&[0xff, 0x00], addr)
            .await
            .expect("unable to send");

        let datagram = listener.recv().await.expect("recv failed");
        assert_eq!(datagram.payload, vec![0xff, 0x00]);
        assert_eq!(
            datagram.source,
            sender.local_addr().expect("no sender addr")
        );
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let first = Listener::bind("127.0.0.1", 0).await.expect("bind failed");
        let port = first.local_addr().expect("no local addr").port();
        let second = Listener::bind("127.0.0.1", port).await;
        assert!(matches!(second, Err(RelayError::Bind { .. })));
    }
}
