//! Future types for gateway interactions.

use crate::{
    error::{LavalinkError, LavalinkResult},
    gateway::Registration,
    ConnectionInfo,
};
use core::{
    convert,
    future::Future,
    marker::Unpin,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use flume::r#async::RecvFut;
use futures::FutureExt;
use pin_project::pin_project;
use tokio::time::{self, Timeout};

/// Future for a call to [`Lavalink::wait_for_full_connection_info_insert`].
///
/// This future `await`s both halves of Discord's voice handshake for one
/// guild, subject to any timeouts. Only updates which arrive after the
/// future was created count towards completion.
///
/// Dropping this future (or letting it time out) removes its registration.
///
/// [`Lavalink::wait_for_full_connection_info_insert`]: crate::Lavalink::wait_for_full_connection_info_insert
#[pin_project]
pub struct ConnectionInfoInsert {
    #[pin]
    inner: JoinClass<ConnectionInfo>,
    _registration: Registration,
}

impl ConnectionInfoInsert {
    pub(crate) fn new(
        registration: Registration,
        recv: RecvFut<'static, ConnectionInfo>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: JoinClass::new(recv, timeout),
            _registration: registration,
        }
    }
}

impl Future for ConnectionInfoInsert {
    type Output = LavalinkResult<ConnectionInfo>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.project().inner.poll(cx)
    }
}

/// Future for a call to [`Lavalink::wait_for_connection_info_remove`].
///
/// Resolves once the bot's voice state for the guild reports no channel,
/// or once its connection info is removed by hand.
///
/// [`Lavalink::wait_for_connection_info_remove`]: crate::Lavalink::wait_for_connection_info_remove
#[pin_project]
pub struct ConnectionInfoRemove {
    #[pin]
    inner: JoinClass<()>,
    _registration: Registration,
}

impl ConnectionInfoRemove {
    pub(crate) fn new(
        registration: Registration,
        recv: RecvFut<'static, ()>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: JoinClass::new(recv, timeout),
            _registration: registration,
        }
    }
}

impl Future for ConnectionInfoRemove {
    type Output = LavalinkResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.project().inner.poll(cx)
    }
}

#[allow(clippy::large_enum_variant)]
#[pin_project(project = JoinClassProj)]
enum JoinClass<T: 'static> {
    WithTimeout(#[pin] Timeout<RecvFut<'static, T>>),
    Vanilla(RecvFut<'static, T>),
}

impl<T: 'static> JoinClass<T> {
    fn new(recv: RecvFut<'static, T>, timeout: Option<Duration>) -> Self {
        match timeout {
            Some(t) => JoinClass::WithTimeout(time::timeout(t, recv)),
            None => JoinClass::Vanilla(recv),
        }
    }
}

impl<T> Future for JoinClass<T>
where
    T: Unpin,
{
    type Output = LavalinkResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            JoinClassProj::WithTimeout(t) => t
                .poll(cx)
                .map_err(|_| LavalinkError::TimedOut)
                .map_ok(|res| res.map_err(|_| LavalinkError::Dropped))
                .map(|m| m.and_then(convert::identity)),
            JoinClassProj::Vanilla(t) => t.poll_unpin(cx).map_err(|_| LavalinkError::Dropped),
        }
    }
}
