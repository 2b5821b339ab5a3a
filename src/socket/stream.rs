use bytes::BytesMut;

use crate::socket::tcp::{Received, TcpSocket};

/// Why a [`SocketStream`] stopped pulling from its socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfInput {
    /// A read timed out. The peer may still have more to send.
    TimedOut,
    /// The peer closed the connection or the read failed.
    Closed,
}

/// Incremental word/line reader over a borrowed socket.
///
/// Received bytes are appended to an internal buffer and consumed through a
/// cursor that only moves forward. The socket is read only when the cursor
/// has reached the end of the buffer. The first read that yields no data
/// latches end-of-input, after which only buffered bytes are served; both a
/// timeout and a close latch the same way, [`end_of_input`](Self::end_of_input)
/// tells them apart.
pub struct SocketStream<'a> {
    socket: &'a mut TcpSocket,
    buffer: BytesMut,
    pos: usize,
    end: Option<EndOfInput>,
}

impl<'a> SocketStream<'a> {
    pub fn new(socket: &'a mut TcpSocket) -> Self {
        Self {
            socket,
            buffer: BytesMut::new(),
            pos: 0,
            end: None,
        }
    }

    /// True if a non-whitespace byte is available, reading more if needed.
    /// Does not consume anything.
    pub async fn has_next(&mut self) -> bool {
        let mut at = self.pos;
        self.pull_if_needed(at).await;
        while at < self.buffer.len() && is_space(self.buffer[at]) {
            at += 1;
            self.pull_if_needed(at).await;
        }
        at < self.buffer.len()
    }

    /// Skips whitespace, then consumes and returns the following run of
    /// non-whitespace bytes. Empty when the input is exhausted.
    pub async fn next_word(&mut self) -> String {
        self.skip_while(is_space).await;

        let start = self.pos;
        while self.pos < self.buffer.len() && !is_space(self.buffer[self.pos]) {
            self.pos += 1;
            self.pull_if_needed(self.pos).await;
        }
        lossy(&self.buffer[start..self.pos])
    }

    /// Consumes through the next `\n` and returns the line without its
    /// `\n` and a trailing `\r`.
    ///
    /// `skip_leading_whitespace` drops spaces and tabs before the line but
    /// never crosses a line break. If the input ends before a `\n`, the
    /// partial line is returned.
    pub async fn next_line(&mut self, skip_leading_whitespace: bool) -> String {
        if skip_leading_whitespace {
            self.skip_while(|b| b == b' ' || b == b'\t').await;
        } else {
            self.pull_if_needed(self.pos).await;
        }

        let start = self.pos;
        while self.pos < self.buffer.len() && self.buffer[self.pos] != b'\n' {
            self.pos += 1;
            self.pull_if_needed(self.pos).await;
        }

        let mut end = self.pos;
        if self.pos < self.buffer.len() {
            self.pos += 1;
        }
        if end > start && self.buffer[end - 1] == b'\r' {
            end -= 1;
        }
        lossy(&self.buffer[start..end])
    }

    /// Consumes and returns everything up to the end of input.
    pub async fn remaining(&mut self) -> Vec<u8> {
        self.pull_if_needed(self.pos).await;

        let start = self.pos;
        while self.pos < self.buffer.len() {
            self.pos = self.buffer.len();
            self.pull_if_needed(self.pos).await;
        }
        self.buffer[start..].to_vec()
    }

    /// Bytes consumed so far.
    pub fn passed_buffer(&self) -> &[u8] {
        &self.buffer[..self.pos]
    }

    pub fn end_of_input(&self) -> Option<EndOfInput> {
        self.end
    }

    async fn skip_while(&mut self, skip: impl Fn(u8) -> bool) {
        self.pull_if_needed(self.pos).await;
        while self.pos < self.buffer.len() && skip(self.buffer[self.pos]) {
            self.pos += 1;
            self.pull_if_needed(self.pos).await;
        }
    }

    async fn pull_if_needed(&mut self, at: usize) {
        if at == self.buffer.len() && self.end.is_none() {
            self.pull().await;
        }
    }

    async fn pull(&mut self) {
        match self.socket.recv_chunk().await {
            Received::Data(bytes) => self.buffer.extend_from_slice(&bytes),
            Received::TimedOut => self.end = Some(EndOfInput::TimedOut),
            Received::Closed => self.end = Some(EndOfInput::Closed),
        }
    }
}

/// ASCII whitespace plus vertical tab.
fn is_space(b: u8) -> bool {
    b.is_ascii_whitespace() || b == 0x0b
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
