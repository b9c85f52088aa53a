//! The request lifecycle engine.
//!
//! Each call to [`request`](crate::request) spawns one task that owns the
//! whole lifecycle: building the wire request, following redirects, reading
//! and decoding the body, and reacting to abort, retry and timeout. The task
//! reports progress as [`Event`]s on a channel read through the returned
//! [`RequestHandle`]; the same handle serves every redirect hop and retry, so
//! listeners never need to re-attach.
//!
//! Commands from the handle (or a cloned [`Controller`]) are raced against
//! the transport with abort taking priority: a response that arrives after an
//! abort was issued is discarded.

use core::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use std::{future::Future, sync::Arc};

use futures_channel::mpsc;
use futures_util::{Stream, StreamExt};
use tracing::Instrument;
use url::Url;

use crate::{
    backend::Transport,
    codec::Body,
    decode,
    error::Error,
    event::{Completion, Event, Outcome},
    options::RequestOptions,
    redirect,
    response::Response,
    retry,
    timeout::Deadline,
};

mod prepare;

#[derive(Debug)]
enum Command {
    Abort(Option<String>),
    Retry(Duration),
}

/// Cloneable remote control for an in-flight request.
#[derive(Debug, Clone)]
pub struct Controller {
    commands: mpsc::UnboundedSender<Command>,
}

impl Controller {
    /// Soft abort: the attempt ends with `abort` and a `complete` carrying no
    /// body, error or response. No-op once the attempt is over.
    pub fn abort(&self) {
        self.send(Command::Abort(None));
    }

    /// Hard abort: emits `abort`, `error` and `complete` with an
    /// [`Error::Aborted`] carrying `reason`. An empty reason is a soft abort.
    pub fn abort_with(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.send(Command::Abort((!reason.is_empty()).then_some(reason)));
    }

    /// Run the request again against its current URL after `delay`.
    ///
    /// A zero delay retries on the next scheduler tick. An attempt still in
    /// flight is torn down without emitting its terminal events.
    pub fn retry(&self, delay: Duration) {
        self.send(Command::Retry(delay));
    }

    fn send(&self, command: Command) {
        if self.commands.unbounded_send(command).is_err() {
            tracing::trace!("request task has exited, command dropped");
        }
    }
}

/// Subscription to the events of one logical request.
///
/// The handle is a [`Stream`] of [`Event`]s. Dropping it does not cancel the
/// request; call [`abort`](Self::abort) for that.
#[derive(Debug)]
pub struct RequestHandle {
    events: mpsc::UnboundedReceiver<Event>,
    controller: Controller,
}

impl RequestHandle {
    /// See [`Controller::abort`].
    pub fn abort(&self) {
        self.controller.abort();
    }

    /// See [`Controller::abort_with`].
    pub fn abort_with(&self, reason: impl Into<String>) {
        self.controller.abort_with(reason);
    }

    /// See [`Controller::retry`].
    pub fn retry(&self, delay: Duration) {
        self.controller.retry(delay);
    }

    /// A controller that can abort or retry from elsewhere.
    #[must_use]
    pub fn controller(&self) -> Controller {
        self.controller.clone()
    }

    /// Collect events up to and including the next `complete`.
    ///
    /// The handle stays usable, so a [`retry`](Self::retry) can follow.
    pub async fn until_complete(&mut self) -> Vec<Event> {
        let mut seen = Vec::new();
        while let Some(event) = self.events.next().await {
            let done = event.is_complete();
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    }

    /// Wait for the next `complete` and return its payload.
    pub async fn complete(mut self) -> Completion {
        while let Some(event) = self.events.next().await {
            if let Event::Complete(completion) = event {
                return completion;
            }
        }
        Completion {
            outcome: Outcome::Error(Arc::new(Error::Aborted(
                "request task stopped before completing".into(),
            ))),
            response: None,
        }
    }
}

impl Stream for RequestHandle {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}

/// Start a request on the current Tokio runtime.
pub(crate) fn spawn<T: Transport>(
    transport: Arc<T>,
    url: &str,
    options: RequestOptions,
) -> RequestHandle {
    let (events, event_rx) = mpsc::unbounded();
    let (commands, command_rx) = mpsc::unbounded();
    let span = tracing::debug_span!("request", url = %url);

    let engine = Engine {
        transport,
        input: url.to_owned(),
        current: None,
        options,
        events,
        commands: Commands {
            receiver: command_rx,
            open: true,
        },
    };
    tokio::spawn(engine.run().instrument(span));

    RequestHandle {
        events: event_rx,
        controller: Controller { commands },
    }
}

enum Interrupt {
    Abort(Option<String>),
    Retry(Duration),
    Timeout,
}

struct Commands {
    receiver: mpsc::UnboundedReceiver<Command>,
    open: bool,
}

impl Commands {
    /// Drive `work` until it finishes, a command arrives, or `deadline` passes.
    async fn race<F: Future>(&mut self, work: F, deadline: &Deadline) -> Result<F::Output, Interrupt> {
        tokio::pin!(work);
        loop {
            tokio::select! {
                biased;
                command = self.receiver.next(), if self.open => match command {
                    Some(Command::Abort(reason)) => return Err(Interrupt::Abort(reason)),
                    Some(Command::Retry(delay)) => return Err(Interrupt::Retry(delay)),
                    None => self.open = false,
                },
                () = deadline.expired() => return Err(Interrupt::Timeout),
                output = &mut work => return Ok(output),
            }
        }
    }

    /// Park a finished request until it is retried or every handle is gone.
    async fn wait_for_retry(&mut self) -> Option<Duration> {
        while self.open {
            match self.receiver.next().await {
                Some(Command::Retry(delay)) => return Some(delay),
                Some(Command::Abort(_)) => tracing::trace!("abort after completion ignored"),
                None => self.open = false,
            }
        }
        None
    }
}

enum Next {
    Idle,
    Retry(Duration),
}

struct Engine<T> {
    transport: Arc<T>,
    input: String,
    /// Last URL built, after query and redirects; retries start from here.
    current: Option<Url>,
    options: RequestOptions,
    events: mpsc::UnboundedSender<Event>,
    commands: Commands,
}

impl<T: Transport> Engine<T> {
    async fn run(mut self) {
        let mut next = self.attempt(None).await;
        loop {
            let delay = match next {
                Next::Retry(delay) => delay,
                Next::Idle => match self.commands.wait_for_retry().await {
                    Some(delay) => delay,
                    None => break,
                },
            };
            tracing::debug!(?delay, "retrying request");
            next = self.attempt(Some(delay)).await;
        }
        tracing::trace!("request task finished");
    }

    async fn attempt(&mut self, delay: Option<Duration>) -> Next {
        let unbounded = Deadline::arm(None);
        if let Some(delay) = delay
            && let Err(interrupt) = self.commands.race(retry::pause(delay), &unbounded).await
        {
            return self.interrupted(interrupt, &unbounded, None);
        }

        let mut url = match self.current.clone() {
            Some(url) => url,
            None => match prepare::parse_url(&self.input) {
                Ok(url) => url,
                Err(error) => return self.failed(error, None),
            },
        };
        let follow = self.options.follows_redirects();
        let limit = self.options.redirect_limit();
        let mut hops = 0;
        let mut see_other = false;
        let origin = url.origin();

        loop {
            let deadline = Deadline::arm(self.options.timeout);
            let stripped;
            let options = if !self.options.forwards_credentials() && url.origin() != origin {
                tracing::debug!(url = %url, "cross-origin hop, credentials withheld");
                stripped = self.options.without_credentials();
                &stripped
            } else {
                &self.options
            };
            let prepared = match prepare::build(&url, options, see_other) {
                Ok(prepared) => prepared,
                Err(error) => return self.failed(error, None),
            };
            self.current = Some(prepared.target.clone());
            tracing::debug!(
                method = %prepared.request.method(),
                url = %prepared.visible,
                "sending request"
            );

            let sent = self
                .commands
                .race(self.transport.send(prepared.request), &deadline)
                .await;
            let response = match sent {
                Ok(Ok(response)) => response,
                Ok(Err(error)) => {
                    let error = prepared.body_failure.take().map_or(error, Error::Io);
                    return self.failed(error, None);
                }
                Err(interrupt) => return self.interrupted(interrupt, &deadline, None),
            };
            let (parts, body) = response.into_parts();
            tracing::debug!(status = %parts.status, "response received");

            if follow && redirect::is_followed(parts.status) {
                drop(body);
                if hops >= limit {
                    return self.failed(Error::TooManyRedirects { max: limit }, None);
                }
                match redirect::next_hop(&prepared.target, parts.status, &parts.headers) {
                    Ok(hop) => {
                        tracing::debug!(status = %parts.status, location = %hop.url, "following redirect");
                        see_other |= hop.see_other;
                        hops += 1;
                        url = hop.url;
                        continue;
                    }
                    Err(error) => return self.failed(error, None),
                }
            }

            let raw = match self.commands.race(body.collect(), &unbounded).await {
                Ok(Ok(raw)) => raw,
                Ok(Err(error)) => return self.failed(error, None),
                Err(interrupt) => return self.interrupted(interrupt, &unbounded, None),
            };
            let response = Arc::new(Response::new(
                parts.status,
                parts.headers,
                prepared.visible,
                raw,
            ));
            self.emit(Event::Response(Arc::clone(&response)));

            let decoded = self
                .commands
                .race(decode::decode(&response, &self.options), &unbounded)
                .await;
            return match decoded {
                Ok(Ok(body)) => self.succeeded(body, response),
                Ok(Err(error)) => self.failed(error, Some(response)),
                Err(interrupt) => self.interrupted(interrupt, &unbounded, Some(response)),
            };
        }
    }

    fn emit(&self, event: Event) {
        tracing::trace!(event = %event.name(), "emit");
        // A dropped handle only means nobody is listening.
        let _ = self.events.unbounded_send(event);
    }

    fn succeeded(&self, body: Body, response: Arc<Response>) -> Next {
        let status = response.status();
        let body = Arc::new(body);
        tracing::debug!(%status, "request completed");

        let verdict = if status.as_u16() < 400 {
            Event::Success {
                body: Arc::clone(&body),
                response: Arc::clone(&response),
            }
        } else {
            Event::Fail {
                body: Arc::clone(&body),
                response: Arc::clone(&response),
            }
        };
        self.emit(verdict);
        self.emit(Event::StatusClass {
            class: status.as_u16() / 100,
            body: Arc::clone(&body),
            response: Arc::clone(&response),
        });
        self.emit(Event::Status {
            code: status,
            body: Arc::clone(&body),
            response: Arc::clone(&response),
        });
        self.emit(Event::Complete(Completion {
            outcome: Outcome::Body(body),
            response: Some(response),
        }));
        Next::Idle
    }

    fn failed(&self, error: Error, response: Option<Arc<Response>>) -> Next {
        tracing::debug!(%error, "request failed");
        self.terminate(Arc::new(error), response)
    }

    fn terminate(&self, error: Arc<Error>, response: Option<Arc<Response>>) -> Next {
        self.emit(Event::Error {
            error: Arc::clone(&error),
            response: response.clone(),
        });
        self.emit(Event::Complete(Completion {
            outcome: Outcome::Error(error),
            response,
        }));
        Next::Idle
    }

    fn interrupted(
        &self,
        interrupt: Interrupt,
        deadline: &Deadline,
        response: Option<Arc<Response>>,
    ) -> Next {
        match interrupt {
            Interrupt::Retry(delay) => {
                tracing::debug!("retry requested, dropping the current attempt");
                Next::Retry(delay)
            }
            Interrupt::Abort(None) => {
                tracing::debug!("request aborted");
                self.emit(Event::Abort { error: None });
                self.emit(Event::Complete(Completion {
                    outcome: Outcome::Aborted,
                    response: None,
                }));
                Next::Idle
            }
            Interrupt::Abort(Some(reason)) => {
                tracing::debug!(%reason, "request aborted");
                self.hard_abort(Error::Aborted(reason), response)
            }
            Interrupt::Timeout => {
                let elapsed = deadline.elapsed();
                tracing::warn!(?elapsed, "request timed out");
                self.emit(Event::Timeout { elapsed });
                self.hard_abort(Error::Timeout(elapsed), response)
            }
        }
    }

    fn hard_abort(&self, error: Error, response: Option<Arc<Response>>) -> Next {
        let error = Arc::new(error);
        self.emit(Event::Abort {
            error: Some(Arc::clone(&error)),
        });
        self.terminate(error, response)
    }
}
