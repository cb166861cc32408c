//! Relay subscription session.
//!
//! A session is one subscription kept alive across reconnects. It runs as two
//! tasks that share nothing but two queues:
//!
//! - the connection task owns the transport. It sends `REQ`, forwards
//!   outbound requests, pushes inbound frames onto the delivery queue and
//!   reconnects when the relay goes quiet or away.
//! - the delivery task owns the dedup window and is the only caller of the
//!   [`MessageHandler`].
//!
//! ```text
//! Subscription ──outbound (unbounded)──▶ connection task ◀──▶ relay
//!                                              │
//!                               delivery (bounded) queue
//!                                              ▼
//!                                        delivery task ──▶ handler
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use nostrkit_core::filter::DEFAULT_LIMIT;
use nostrkit_core::{Event, EventId, Filter, Keypair};

use crate::dedup::DedupWindow;
use crate::error::{Result, SessionError};
use crate::messages::{new_subscription_id, ClientMessage, RelayMessage};
use crate::transport::{Connector, Transport};

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on connecting, and on waiting for the next frame. An idle
    /// connection is treated as lost and reopened.
    pub timeout: Duration,
    /// Pause before reconnecting.
    pub reconnect_delay: Duration,
    /// Frames buffered between the connection and delivery tasks.
    pub delivery_capacity: usize,
    /// Whether to check ids and signatures before delivery.
    pub verify_events: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_millis(500),
            delivery_capacity: 1024,
            verify_events: true,
        }
    }
}

/// Receives everything a session delivers. Called from the delivery task only.
pub trait MessageHandler: Send + 'static {
    /// A new, verified event for this subscription.
    fn on_event(&mut self, event: Event);

    /// Any other frame (`EOSE`, `NOTICE`, `OK`, unknown types), as received.
    fn on_message(&mut self, frame: Value) {
        debug!(%frame, "unhandled relay frame");
    }

    /// A frame that could not be delivered. The session keeps going.
    fn on_error(&mut self, error: SessionError) {
        warn!(error = %error, "dropped relay frame");
    }
}

/// What a channel-backed handler forwards.
#[derive(Debug)]
pub enum Delivery {
    Event(Event),
    Message(Value),
    Error(SessionError),
}

impl MessageHandler for mpsc::UnboundedSender<Delivery> {
    fn on_event(&mut self, event: Event) {
        let _ = self.send(Delivery::Event(event));
    }

    fn on_message(&mut self, frame: Value) {
        let _ = self.send(Delivery::Message(frame));
    }

    fn on_error(&mut self, error: SessionError) {
        let _ = self.send(Delivery::Error(error));
    }
}

/// Client for one relay, holding at most one live session.
pub struct RelayClient<C: Connector> {
    connector: Arc<C>,
    config: SessionConfig,
    /// Set by `subscribe`, cleared by the connection task as it exits.
    live: Arc<AtomicBool>,
}

impl<C: Connector> RelayClient<C> {
    /// Create a client with the default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, SessionConfig::default())
    }

    /// Create a client with a custom configuration.
    pub fn with_config(connector: C, config: SessionConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            config,
            live: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Whether a session is still running.
    pub fn is_subscribed(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Open a session for `filter`, delivering to `handler`.
    ///
    /// Fails with [`SessionError::AlreadySubscribed`] while a previous
    /// session's connection task is still running.
    pub fn subscribe<H: MessageHandler>(
        &self,
        filter: &Filter,
        handler: H,
    ) -> Result<Subscription> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        let wire = filter.to_wire()?;

        if self
            .live
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::AlreadySubscribed);
        }

        let subscription_id = new_subscription_id();
        let request = ClientMessage::Req {
            subscription_id: subscription_id.clone(),
            filter: wire,
        };
        let request = match request.to_json() {
            Ok(request) => request,
            Err(e) => {
                self.live.store(false, Ordering::Release);
                return Err(e);
            }
        };

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(self.config.delivery_capacity.max(1));
        let (done_tx, done_rx) = watch::channel(false);

        let window_size = match filter.limit {
            0 => DEFAULT_LIMIT,
            limit => limit,
        };

        info!(
            relay = self.connector.url(),
            subscription = %subscription_id,
            "subscribing"
        );

        let connection = ConnectionTask {
            connector: Arc::clone(&self.connector),
            config: self.config.clone(),
            subscription_id: subscription_id.clone(),
            request,
            outbound: outbound_rx,
            inbound: inbound_tx,
            pending: VecDeque::new(),
            live: Arc::clone(&self.live),
        };
        let delivery = DeliveryTask {
            subscription_id: subscription_id.clone(),
            inbound: inbound_rx,
            handler,
            window: DedupWindow::new(window_size),
            verify_events: self.config.verify_events,
            done: done_tx,
        };
        runtime.spawn(connection.run());
        runtime.spawn(delivery.run());

        Ok(Subscription {
            id: subscription_id,
            outbound: outbound_tx,
            done: done_rx,
        })
    }
}

/// Handle to a running session.
///
/// Dropping it also stops the session, without sending `CLOSE`.
#[derive(Debug)]
pub struct Subscription {
    id: String,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    done: watch::Receiver<bool>,
}

impl Subscription {
    /// The subscription id sent to the relay.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ask the session to stop. Does not wait; see [`Subscription::closed`].
    pub fn unsubscribe(&self) -> Result<()> {
        self.outbound
            .send(ClientMessage::Close(self.id.clone()))
            .map_err(|_| SessionError::SessionClosed)?;
        debug!(subscription = %self.id, "close requested");
        Ok(())
    }

    /// Publish `event` through this session, signing it first if needed.
    ///
    /// Shares the ordered outbound queue with the subscription itself, so the
    /// event is sent after any earlier request.
    pub fn send_event(&self, mut event: Event, keys: Option<&Keypair>) -> Result<EventId> {
        if !event.is_signed() {
            let keys = keys.ok_or(SessionError::MissingKey)?;
            event.sign(keys)?;
        }
        let id = match event.id() {
            Some(id) => id,
            None => event.compute_id()?,
        };

        self.outbound
            .send(ClientMessage::Event(event))
            .map_err(|_| SessionError::SessionClosed)?;
        debug!(subscription = %self.id, event = %id, "event queued");
        Ok(id)
    }

    /// Whether the delivery task has finished.
    pub fn is_closed(&self) -> bool {
        *self.done.borrow()
    }

    /// Wait for the delivery task to finish.
    pub async fn closed(&self) {
        let mut done = self.done.clone();
        // An error means the task is gone, which is also closed.
        let _ = done.wait_for(|done| *done).await;
    }
}

/// Connect once, publish `event`, and return the relay's first reply.
pub async fn publish_once<C: Connector>(
    connector: &C,
    event: &Event,
    timeout: Duration,
) -> Result<RelayMessage> {
    let frame = ClientMessage::Event(event.clone()).to_json()?;
    let mut transport = tokio::time::timeout(timeout, connector.connect())
        .await
        .map_err(|_| SessionError::Timeout)??;

    transport.send(frame).await?;
    let reply = transport.recv_timeout(timeout).await;
    if let Err(e) = transport.close().await {
        debug!(error = %e, "close after publish failed");
    }

    let reply = reply?.ok_or(SessionError::Timeout)?;
    let message = RelayMessage::parse(&reply)?;
    info!(relay = connector.url(), "published event");
    Ok(message)
}

/// Item on the delivery queue.
enum Inbound {
    Frame(String),
    /// The connection task has stopped; nothing follows.
    Stop,
}

/// Why a connection ended.
enum Disconnect {
    Stop,
    Reconnect,
}

struct ConnectionTask<C: Connector> {
    connector: Arc<C>,
    config: SessionConfig,
    subscription_id: String,
    /// The `REQ` frame, re-sent on every connect.
    request: String,
    outbound: mpsc::UnboundedReceiver<ClientMessage>,
    inbound: mpsc::Sender<Inbound>,
    /// Requests not yet sent, oldest first.
    pending: VecDeque<ClientMessage>,
    live: Arc<AtomicBool>,
}

impl<C: Connector> ConnectionTask<C> {
    async fn run(mut self) {
        loop {
            match self.connect_and_serve().await {
                Disconnect::Stop => break,
                Disconnect::Reconnect => {
                    if let Disconnect::Stop = self.wait_to_reconnect().await {
                        break;
                    }
                    debug!(subscription = %self.subscription_id, "reconnecting");
                }
            }
        }

        self.outbound.close();
        self.live.store(false, Ordering::Release);
        let _ = self.inbound.send(Inbound::Stop).await;
        info!(subscription = %self.subscription_id, "session stopped");
    }

    async fn connect_and_serve(&mut self) -> Disconnect {
        let connected = tokio::time::timeout(self.config.timeout, self.connector.connect()).await;
        let mut transport = match connected {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                warn!(relay = self.connector.url(), error = %e, "connect failed");
                return Disconnect::Reconnect;
            }
            Err(_) => {
                warn!(relay = self.connector.url(), "connect timed out");
                return Disconnect::Reconnect;
            }
        };
        info!(
            relay = self.connector.url(),
            subscription = %self.subscription_id,
            "connected"
        );

        let outcome = self.serve(&mut transport).await;
        if let Err(e) = transport.close().await {
            debug!(error = %e, "close failed");
        }
        outcome
    }

    async fn serve(&mut self, transport: &mut C::Transport) -> Disconnect {
        if let Err(e) = transport.send(self.request.clone()).await {
            warn!(error = %e, "subscribe request failed");
            return Disconnect::Reconnect;
        }

        loop {
            while let Some(request) = self.pending.pop_front() {
                let frame = match request.to_json() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, "dropping request that does not serialize");
                        continue;
                    }
                };
                if let Err(e) = transport.send(frame).await {
                    warn!(error = %e, "send failed");
                    if request.is_close() {
                        return Disconnect::Stop;
                    }
                    self.pending.push_front(request);
                    return Disconnect::Reconnect;
                }
                if request.is_close() {
                    return Disconnect::Stop;
                }
            }

            tokio::select! {
                biased;

                request = self.outbound.recv() => match request {
                    Some(request) => self.pending.push_back(request),
                    None => {
                        debug!(subscription = %self.subscription_id, "subscription handle dropped");
                        return Disconnect::Stop;
                    }
                },

                frame = transport.recv_timeout(self.config.timeout) => match frame {
                    Ok(Some(frame)) => {
                        if self.inbound.send(Inbound::Frame(frame)).await.is_err() {
                            return Disconnect::Stop;
                        }
                    }
                    Ok(None) => {
                        debug!(subscription = %self.subscription_id, "idle timeout");
                        return Disconnect::Reconnect;
                    }
                    Err(e) => {
                        warn!(error = %e, "connection lost");
                        return Disconnect::Reconnect;
                    }
                },
            }
        }
    }

    /// Sleep out the reconnect delay, buffering requests. A close request
    /// stops the session instead, since there is no connection to close.
    async fn wait_to_reconnect(&mut self) -> Disconnect {
        let delay = tokio::time::sleep(self.config.reconnect_delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                _ = &mut delay => return Disconnect::Reconnect,
                request = self.outbound.recv() => match request {
                    Some(request) if request.is_close() => return Disconnect::Stop,
                    Some(request) => self.pending.push_back(request),
                    None => return Disconnect::Stop,
                },
            }
        }
    }
}

struct DeliveryTask<H> {
    subscription_id: String,
    inbound: mpsc::Receiver<Inbound>,
    handler: H,
    window: DedupWindow,
    verify_events: bool,
    done: watch::Sender<bool>,
}

impl<H: MessageHandler> DeliveryTask<H> {
    async fn run(mut self) {
        while let Some(Inbound::Frame(frame)) = self.inbound.recv().await {
            self.dispatch(&frame);
        }
        debug!(subscription = %self.subscription_id, "delivery finished");
        self.done.send_replace(true);
    }

    fn dispatch(&mut self, frame: &str) {
        let value: Value = match serde_json::from_str(frame) {
            Ok(value) => value,
            Err(e) => {
                self.handler
                    .on_error(SessionError::InvalidFrame(format!("not json: {e}")));
                return;
            }
        };

        match RelayMessage::from_value(value.clone()) {
            Ok(RelayMessage::Event {
                subscription_id,
                event,
            }) if subscription_id == self.subscription_id => self.deliver(event),
            Ok(_) => self.handler.on_message(value),
            Err(e) => self.handler.on_error(e),
        }
    }

    fn deliver(&mut self, event: Event) {
        if self.verify_events {
            match event.verify() {
                Ok(true) => {}
                Ok(false) => {
                    warn!(subscription = %self.subscription_id, "event failed verification");
                    self.handler.on_error(SessionError::Rejected(
                        "missing or invalid signature".into(),
                    ));
                    return;
                }
                Err(e) => {
                    warn!(subscription = %self.subscription_id, error = %e, "event failed verification");
                    self.handler.on_error(e.into());
                    return;
                }
            }
        }

        let id = match event.id() {
            Some(id) => id,
            None => match event.compute_id() {
                Ok(id) => id,
                Err(e) => {
                    self.handler.on_error(e.into());
                    return;
                }
            },
        };
        if !self.window.insert(id) {
            debug!(subscription = %self.subscription_id, event = %id, "duplicate suppressed");
            return;
        }
        self.handler.on_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryRelay;
    use nostrkit_core::{CoreError, EventBuilder, Kind};
    use serde_json::json;

    const WAIT: Duration = Duration::from_secs(5);

    fn config() -> SessionConfig {
        SessionConfig {
            timeout: Duration::from_secs(2),
            reconnect_delay: Duration::from_millis(20),
            ..SessionConfig::default()
        }
    }

    fn note(keys: &Keypair, content: &str) -> Event {
        EventBuilder::text_note(content).sign(keys).unwrap()
    }

    async fn next_delivery(rx: &mut mpsc::UnboundedReceiver<Delivery>) -> Delivery {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for delivery")
            .expect("handler channel closed")
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Delivery>) -> Event {
        loop {
            if let Delivery::Event(event) = next_delivery(rx).await {
                return event;
            }
        }
    }

    /// Skip deliveries up to and including the next `EOSE`.
    async fn until_eose(rx: &mut mpsc::UnboundedReceiver<Delivery>) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match next_delivery(rx).await {
                Delivery::Event(event) => events.push(event),
                Delivery::Message(frame) if frame[0] == "EOSE" => return events,
                _ => {}
            }
        }
    }

    async fn quiet_for(rx: &mut mpsc::UnboundedReceiver<Delivery>, period: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        let deadline = tokio::time::Instant::now() + period;
        while let Ok(Some(delivery)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            if let Delivery::Event(event) = delivery {
                events.push(event);
            }
        }
        events
    }

    #[tokio::test]
    async fn test_duplicate_suppressed_within_limit() {
        let relay = MemoryRelay::new();
        let keys = Keypair::generate();
        let events: Vec<Event> = (0..6).map(|n| note(&keys, &format!("note {n}"))).collect();
        for (n, event) in events.iter().enumerate() {
            relay.store(event.clone()).await;
            if n == 2 {
                relay.store(event.clone()).await;
            }
        }

        let client = RelayClient::with_config(relay.clone(), config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let filter = Filter::new().kind(Kind::TEXT_NOTE).limit(5);
        let subscription = client.subscribe(&filter, tx).unwrap();

        let delivered = until_eose(&mut rx).await;
        assert_eq!(delivered, events);
        assert!(quiet_for(&mut rx, Duration::from_millis(300)).await.is_empty());

        subscription.unsubscribe().unwrap();
        subscription.closed().await;
    }

    #[tokio::test]
    async fn test_unsubscribe_then_resubscribe() {
        let relay = MemoryRelay::new();
        let client = RelayClient::with_config(relay.clone(), config());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(&Filter::new(), tx).unwrap();
        until_eose(&mut rx).await;

        let (tx2, _rx2) = mpsc::unbounded_channel();
        assert!(matches!(
            client.subscribe(&Filter::new(), tx2),
            Err(SessionError::AlreadySubscribed)
        ));

        subscription.unsubscribe().unwrap();
        tokio::time::timeout(client.config().timeout, subscription.closed())
            .await
            .expect("delivery did not finish within one timeout");
        assert!(subscription.is_closed());
        assert!(!client.is_subscribed());

        let close = ClientMessage::Close(subscription.id().to_string());
        assert!(relay.received_messages().await.contains(&close));

        let (tx3, _rx3) = mpsc::unbounded_channel();
        let again = client.subscribe(&Filter::new(), tx3).unwrap();
        assert_ne!(again.id(), subscription.id());
        assert!(matches!(
            subscription.unsubscribe(),
            Err(SessionError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn test_reconnect_resubscribes_and_skips_replay() {
        let relay = MemoryRelay::new();
        let keys = Keypair::generate();
        relay.store(note(&keys, "one")).await;
        relay.store(note(&keys, "two")).await;

        let client = RelayClient::with_config(relay.clone(), config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(&Filter::new(), tx).unwrap();
        assert_eq!(until_eose(&mut rx).await.len(), 2);

        relay.disconnect_all().await;
        assert!(until_eose(&mut rx).await.is_empty());
        assert_eq!(relay.connections().await, 2);

        let requests: Vec<ClientMessage> = relay
            .received_messages()
            .await
            .into_iter()
            .filter(|msg| matches!(msg, ClientMessage::Req { .. }))
            .collect();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);

        subscription.unsubscribe().unwrap();
        subscription.closed().await;
    }

    #[tokio::test]
    async fn test_send_event_signs_and_publishes() {
        let relay = MemoryRelay::new();
        let client = RelayClient::with_config(relay.clone(), config());
        let keys = Keypair::generate();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(&Filter::new(), tx).unwrap();
        until_eose(&mut rx).await;

        let unsigned = EventBuilder::text_note("through the session").build();
        assert!(matches!(
            subscription.send_event(unsigned.clone(), None),
            Err(SessionError::MissingKey)
        ));

        let id = subscription.send_event(unsigned, Some(&keys)).unwrap();
        let echoed = next_event(&mut rx).await;
        assert_eq!(echoed.id(), Some(id));
        assert_eq!(echoed.pubkey, Some(keys.public_key()));
        assert_eq!(relay.stored().await.len(), 1);

        subscription.unsubscribe().unwrap();
        subscription.closed().await;
    }

    #[tokio::test]
    async fn test_bad_frames_reported_and_delivery_continues() {
        let relay = MemoryRelay::new();
        let client = RelayClient::with_config(relay.clone(), config());
        let keys = Keypair::generate();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(&Filter::new(), tx).unwrap();
        until_eose(&mut rx).await;
        let sub = subscription.id().to_string();

        let genuine = note(&keys, "genuine");
        let mut forged = serde_json::to_value(note(&keys, "forged")).unwrap();
        forged["sig"] = serde_json::to_value(genuine.sig()).unwrap();

        relay.push("not json").await;
        relay.push(json!(["EVENT", sub]).to_string()).await;
        relay.push(json!(["EVENT", sub, forged]).to_string()).await;
        relay.push(json!(["EVENT", sub, genuine]).to_string()).await;

        assert!(matches!(
            next_delivery(&mut rx).await,
            Delivery::Error(SessionError::InvalidFrame(_))
        ));
        assert!(matches!(
            next_delivery(&mut rx).await,
            Delivery::Error(SessionError::InvalidFrame(_))
        ));
        assert!(matches!(
            next_delivery(&mut rx).await,
            Delivery::Error(SessionError::Rejected(_))
        ));
        assert!(matches!(next_delivery(&mut rx).await, Delivery::Event(e) if e == genuine));

        subscription.unsubscribe().unwrap();
        subscription.closed().await;
    }

    #[tokio::test]
    async fn test_other_subscription_frames_forwarded_verbatim() {
        let relay = MemoryRelay::new();
        let client = RelayClient::with_config(relay.clone(), config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(&Filter::new(), tx).unwrap();
        until_eose(&mut rx).await;

        let event = note(&Keypair::generate(), "elsewhere");
        let frame = json!(["EVENT", "someone-else", event]);
        relay.push(frame.to_string()).await;
        relay.push(r#"["NOTICE","hello"]"#).await;

        assert!(matches!(next_delivery(&mut rx).await, Delivery::Message(f) if f == frame));
        assert!(
            matches!(next_delivery(&mut rx).await, Delivery::Message(f) if f == json!(["NOTICE", "hello"]))
        );

        subscription.unsubscribe().unwrap();
        subscription.closed().await;
    }

    #[tokio::test]
    async fn test_close_while_disconnected_stops() {
        let relay = MemoryRelay::new();
        relay.set_refusing(true).await;
        let client = RelayClient::with_config(relay.clone(), config());

        let (tx, _rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(&Filter::new(), tx).unwrap();
        subscription.unsubscribe().unwrap();

        tokio::time::timeout(WAIT, subscription.closed())
            .await
            .expect("session did not stop");
        assert!(!client.is_subscribed());
        assert!(relay.received().await.is_empty());
    }

    #[tokio::test]
    async fn test_dropping_subscription_stops_session() {
        let relay = MemoryRelay::new();
        let client = RelayClient::with_config(relay.clone(), config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(&Filter::new(), tx).unwrap();
        until_eose(&mut rx).await;

        drop(subscription);
        tokio::time::timeout(WAIT, async {
            while client.is_subscribed() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("session did not stop");
    }

    #[tokio::test]
    async fn test_idle_timeout_reconnects_with_same_request() {
        let relay = MemoryRelay::new();
        let config = SessionConfig {
            timeout: Duration::from_millis(100),
            ..config()
        };
        let client = RelayClient::with_config(relay.clone(), config);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(&Filter::new().limit(3), tx).unwrap();
        until_eose(&mut rx).await;

        tokio::time::timeout(WAIT, async {
            while relay.connections().await < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("session did not reconnect after going idle");

        let requests: Vec<ClientMessage> = relay
            .received_messages()
            .await
            .into_iter()
            .filter(|msg| matches!(msg, ClientMessage::Req { .. }))
            .collect();
        assert!(requests.len() >= 2);
        assert!(requests.iter().all(|req| *req == requests[0]));

        subscription.unsubscribe().unwrap();
        subscription.closed().await;
    }

    #[tokio::test]
    async fn test_requests_buffered_while_disconnected() {
        let relay = MemoryRelay::new();
        let client = RelayClient::with_config(relay.clone(), config());
        let keys = Keypair::generate();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(&Filter::new(), tx).unwrap();
        until_eose(&mut rx).await;

        relay.set_refusing(true).await;
        relay.disconnect_all().await;
        let event = note(&keys, "sent while offline");
        subscription.send_event(event.clone(), None).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(relay.stored().await.is_empty());
        relay.set_refusing(false).await;

        tokio::time::timeout(WAIT, async {
            while relay.stored().await.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("buffered event was never flushed");
        assert_eq!(relay.stored().await, vec![event]);

        subscription.unsubscribe().unwrap();
        subscription.closed().await;
    }

    #[tokio::test]
    async fn test_event_without_id_rejected() {
        let relay = MemoryRelay::new();
        let client = RelayClient::with_config(relay.clone(), config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = client.subscribe(&Filter::new(), tx).unwrap();
        until_eose(&mut rx).await;

        let mut stripped = serde_json::to_value(note(&Keypair::generate(), "no id")).unwrap();
        stripped.as_object_mut().unwrap().remove("id");
        relay
            .push(json!(["EVENT", subscription.id(), stripped]).to_string())
            .await;

        assert!(matches!(
            next_delivery(&mut rx).await,
            Delivery::Error(SessionError::Core(CoreError::IntegrityError { .. }))
        ));

        subscription.unsubscribe().unwrap();
        subscription.closed().await;
    }

    #[tokio::test]
    async fn test_publish_once() {
        let relay = MemoryRelay::new();
        let event = note(&Keypair::generate(), "one shot");

        let reply = publish_once(&relay, &event, WAIT).await.unwrap();
        assert_eq!(
            reply,
            RelayMessage::Ok {
                event_id: event.id().unwrap().to_hex(),
                accepted: true,
                message: String::new(),
            }
        );
        assert_eq!(relay.stored().await, vec![event]);
    }

    #[test]
    fn test_subscribe_needs_runtime() {
        let client = RelayClient::new(MemoryRelay::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(
            client.subscribe(&Filter::new(), tx),
            Err(SessionError::NoRuntime)
        ));
        assert!(!client.is_subscribed());
    }
}
