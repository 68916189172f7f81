//! The framed connection transport.
use std::io;

use bytes::{Buf, Bytes, BytesMut};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

use crate::{
    Result,
    cipher::Rc4,
    common::verbose,
    protocol::{FRAME_PREFIX, backend, backend::BackendProtocol, frontend::FrontendProtocol},
};

/// Exclusive owner of one socket, exchanging framed messages.
///
/// Sends are buffered until [`flush`][Transport::flush]; [`recv`][Transport::recv]
/// flushes pending output first, then reads exactly one message. A `Status`
/// frame in place of the expected answer is converted into a database error
/// before the caller sees it.
pub(crate) struct Transport {
    stream: TcpStream,
    read_buf: BytesMut,
    write_buf: BytesMut,
    cipher: Option<Channel>,
}

/// One keystream per direction.
struct Channel {
    send: Rc4,
    recv: Rc4,
}

impl Transport {
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            read_buf: BytesMut::with_capacity(8 * 1024),
            write_buf: BytesMut::with_capacity(1024),
            cipher: None,
        })
    }

    /// Switch both directions through the session cipher.
    ///
    /// Takes effect for traffic after the buffers currently in flight.
    pub fn enable_cipher(&mut self, key: &[u8]) {
        verbose!("session cipher enabled");
        self.cipher = Some(Channel {
            send: Rc4::new(key),
            recv: Rc4::new(key),
        });
    }

    /// Buffer a frontend message.
    pub fn send<F: FrontendProtocol>(&mut self, message: F) {
        crate::protocol::frontend::write(message, &mut self.write_buf);
    }

    /// Write buffered messages to the socket.
    pub async fn flush(&mut self) -> io::Result<()> {
        if self.write_buf.is_empty() {
            return Ok(());
        }
        if let Some(cipher) = &mut self.cipher {
            cipher.send.apply(&mut self.write_buf[..]);
        }
        self.stream.write_all(&self.write_buf).await?;
        self.write_buf.clear();
        self.stream.flush().await
    }

    /// Receive a single backend message.
    pub async fn recv<B: backend::BackendProtocol>(&mut self) -> Result<B> {
        self.flush().await?;
        let (opcode, body) = self.read_frame().await?;
        if opcode == backend::Status::OPCODE {
            let status = backend::Status::decode(opcode, body)?;
            return Err(status.into_db_error().into());
        }
        Ok(B::decode(opcode, body)?)
    }

    async fn read_frame(&mut self) -> Result<(u8, Bytes)> {
        loop {
            if self.read_buf.len() >= FRAME_PREFIX {
                let len =
                    u32::from_be_bytes(self.read_buf[1..5].try_into().expect("prefix")) as usize;
                if self.read_buf.len() >= FRAME_PREFIX + len {
                    let mut frame = self.read_buf.split_to(FRAME_PREFIX + len).freeze();
                    let opcode = frame.get_u8();
                    frame.advance(4);
                    return Ok((opcode, frame));
                }
            }

            let mut chunk = [0u8; 8 * 1024];
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )
                .into());
            }
            let chunk = &mut chunk[..n];
            if let Some(cipher) = &mut self.cipher {
                cipher.recv.apply(chunk);
            }
            self.read_buf.extend_from_slice(chunk);
        }
    }
}
