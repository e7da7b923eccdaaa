use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::monitor::{Connection, Delivery};
use crate::ws::Direction;

/// Wraps one side of a proxied connection and shows every chunk read from
/// it to the [`Connection`]. Writes pass through untouched.
///
/// When the connection has aged out the chunk is withheld, the read fails
/// with `TimedOut` and the close frame to send is kept for the caller.
///
/// Log lines are rendered and written inside `poll_read`, on the runtime
/// worker. A sink that blocks, such as [`FileSink`](crate::sink::FileSink),
/// stalls every task on that worker for the length of the write.
pub struct Tap<S> {
    inner: S,
    direction: Direction,
    connection: Arc<Connection>,
    close_frame: Option<Vec<u8>>,
}

impl<S> Tap<S> {
    pub fn new(inner: S, direction: Direction, connection: Arc<Connection>) -> Self {
        Tap {
            inner,
            direction,
            connection,
            close_frame: None,
        }
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn take_close_frame(&mut self) -> Option<Vec<u8>> {
        self.close_frame.take()
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Tap<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        let chunk = &buf.filled()[before..];
        if chunk.is_empty() {
            return Poll::Ready(Ok(()));
        }
        if let Delivery::Expired { close_frame } =
            this.connection.on_bytes(this.direction, chunk, Instant::now())
        {
            buf.set_filled(before);
            this.close_frame = Some(close_frame);
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "websocket connection aged out",
            )));
        }
        Poll::Ready(Ok(()))
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Tap<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
