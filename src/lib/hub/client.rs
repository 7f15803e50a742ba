use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info};

use super::handoff::HandoffSender;
use super::types::{
    Connector, EventSink, HubConnection, HubError, Inbound, ReconnectPolicy, Registration,
    StreamClient, StreamState,
};
use crate::lib::orchestrator::types::Orchestrator;
use crate::lib::proto::Event;

enum Disconnect {
    EndOfStream,
    Fault(tonic::Status),
    DispatcherGone,
}

impl Registration {
    pub fn new(dc_name: &str, orchestrator: Arc<Orchestrator>) -> Self {
        Registration {
            dc_name: dc_name.to_string(),
            orchestrator,
        }
    }

    /// Heartbeat reporting the managed tasks, one per line. A failed
    /// listing is reported as its error text instead.
    pub async fn frame(&self) -> Event {
        let report = match self.orchestrator.list().await {
            Ok(tasks) => tasks.join("\n"),
            Err(err) => {
                debug!("list tasks for registration fail: {}", err);
                err.to_string()
            }
        };
        Event::heartbeat(&self.dc_name, report)
    }

    pub async fn send(&self, sink: &EventSink) -> Result<(), HubError> {
        sink.send(self.frame().await).await
    }
}

impl<C: Connector> StreamClient<C> {
    pub fn new(connector: C, registration: Registration, policy: ReconnectPolicy) -> Self {
        let (state, _) = watch::channel(StreamState::Disconnected);
        StreamClient {
            connector,
            registration,
            policy,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: StreamState) {
        self.state.send_replace(state);
    }

    async fn connect(&self) -> Result<HubConnection, HubError> {
        self.set_state(StreamState::Connecting);
        match timeout(self.policy.dial_timeout, self.connector.dial()).await {
            Ok(connection) => connection,
            Err(_) => Err(HubError::Timeout(self.policy.dial_timeout)),
        }
    }

    /// One dial attempt under the dial timeout; the connection is dropped again.
    pub async fn ensure_reachable(&self) -> Result<(), HubError> {
        let connection = self.connect().await;
        self.set_state(StreamState::Disconnected);
        connection.map(drop)
    }

    /// Keeps a stream to the hub open for as long as the dispatcher is
    /// alive. Returns only when the hand-off receiver is gone.
    pub async fn run(self, handoff: HandoffSender<Inbound>) -> Result<(), HubError> {
        info!("task receiver started");

        loop {
            let connection = match self.connect().await {
                Ok(connection) => connection,
                Err(err) => {
                    self.set_state(StreamState::Disconnected);
                    error!("connect to hub fail: {}", err);
                    sleep(self.policy.retry_delay).await;
                    continue;
                }
            };

            if let Err(err) = self.registration.send(&connection.sink).await {
                self.set_state(StreamState::Disconnected);
                error!("register with hub fail: {}", err);
                sleep(self.policy.retry_delay).await;
                continue;
            }

            self.set_state(StreamState::Streaming);
            let outcome = receive(connection, &handoff).await;
            self.set_state(StreamState::Disconnected);

            match outcome {
                Disconnect::EndOfStream => debug!("hub closed the stream, reconnecting"),
                Disconnect::Fault(status) => {
                    error!("client fail to receive task: {}", status);
                    sleep(self.policy.retry_delay).await;
                }
                Disconnect::DispatcherGone => {
                    info!("task receiver stopped");
                    return Err(HubError::DispatcherGone);
                }
            }
        }
    }
}

async fn receive(mut connection: HubConnection, handoff: &HandoffSender<Inbound>) -> Disconnect {
    while let Some(received) = connection.inbound.next().await {
        let event = match received {
            Ok(event) => event,
            Err(status) => return Disconnect::Fault(status),
        };
        debug!("receive event {:?}", event.operation());

        let inbound = Inbound {
            event,
            sink: connection.sink.clone(),
        };
        if handoff.send(inbound).await.is_err() {
            return Disconnect::DispatcherGone;
        }
    }
    Disconnect::EndOfStream
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::stream;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    use super::*;
    use crate::lib::hub::handoff;
    use crate::lib::platform::memory::MemoryPlatform;
    use crate::lib::proto::{OpMessage, Operation, Task};
    use crate::lib::tasks::types::TaskDefaults;

    enum Script {
        Refuse,
        Hang,
        /// Yields the items, then ends the stream.
        Finite(Vec<Result<Event, tonic::Status>>),
        /// Yields the items, then stays open.
        Open(Vec<Result<Event, tonic::Status>>),
    }

    struct Dialed {
        at: Instant,
        outbound: mpsc::Receiver<Event>,
    }

    struct ScriptedConnector {
        scripts: Mutex<VecDeque<Script>>,
        dialed: mpsc::UnboundedSender<Dialed>,
        /// Inbound frames taken off the wire so far.
        pulled: Arc<AtomicUsize>,
    }

    impl ScriptedConnector {
        fn new(scripts: Vec<Script>) -> (Self, mpsc::UnboundedReceiver<Dialed>) {
            let (dialed, rx) = mpsc::unbounded_channel();
            let connector = ScriptedConnector {
                scripts: Mutex::new(scripts.into()),
                dialed,
                pulled: Arc::default(),
            };
            (connector, rx)
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn dial(&self) -> Result<HubConnection, HubError> {
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Script::Hang);
            let (tx, outbound) = mpsc::channel(16);
            let _ = self.dialed.send(Dialed {
                at: Instant::now(),
                outbound,
            });

            let pulled = self.pulled.clone();
            let count = move |_: &Result<Event, tonic::Status>| {
                pulled.fetch_add(1, Ordering::SeqCst);
            };
            let inbound = match script {
                Script::Refuse => return Err(HubError::Dial("connection refused".to_string())),
                Script::Hang => std::future::pending().await,
                Script::Finite(items) => stream::iter(items).inspect(count).boxed(),
                Script::Open(items) => stream::iter(items)
                    .inspect(count)
                    .chain(stream::pending())
                    .boxed(),
            };
            Ok(HubConnection {
                sink: EventSink::new(tx),
                inbound,
            })
        }
    }

    fn registration(platform: Arc<MemoryPlatform>) -> Registration {
        let orchestrator = Orchestrator::new(platform, "default", None, TaskDefaults::default());
        Registration::new("dc-1", Arc::new(orchestrator))
    }

    fn create_event(id: &str) -> Event {
        Event::task(
            Operation::TaskCreate,
            Task {
                id: id.to_string(),
                name: "web".to_string(),
                image: "nginx".to_string(),
                ..Default::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_stream_reconnects_at_once_and_errors_wait() {
        let (connector, mut dialed) = ScriptedConnector::new(vec![
            Script::Finite(vec![]),
            Script::Finite(vec![Err(tonic::Status::unavailable("hub restarting"))]),
            Script::Open(vec![]),
        ]);
        let client = StreamClient::new(
            connector,
            registration(Arc::new(MemoryPlatform::new())),
            ReconnectPolicy::default(),
        );
        let (tx, _rx) = handoff::channel();
        let started = Instant::now();
        let run = tokio::spawn(client.run(tx));

        let mut connections = Vec::new();
        for _ in 0..3 {
            connections.push(dialed.recv().await.unwrap());
        }
        let offsets: Vec<Duration> = connections.iter().map(|dial| dial.at - started).collect();
        assert_eq!(
            offsets,
            vec![Duration::ZERO, Duration::ZERO, Duration::from_secs(5)]
        );
        run.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn refused_and_hanging_dials_are_retried() {
        let (connector, mut dialed) =
            ScriptedConnector::new(vec![Script::Refuse, Script::Hang, Script::Open(vec![])]);
        let client = StreamClient::new(
            connector,
            registration(Arc::new(MemoryPlatform::new())),
            ReconnectPolicy::default(),
        );
        let (tx, _rx) = handoff::channel();
        let started = Instant::now();
        let run = tokio::spawn(client.run(tx));

        let mut connections = Vec::new();
        for _ in 0..3 {
            connections.push(dialed.recv().await.unwrap());
        }
        let offsets: Vec<Duration> = connections.iter().map(|dial| dial.at - started).collect();
        // refused: retry after 5s; hanging: 5s dial timeout plus 5s delay
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_secs(5),
                Duration::from_secs(15)
            ]
        );
        run.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn every_connection_starts_with_a_heartbeat() {
        let (connector, mut dialed) = ScriptedConnector::new(vec![
            Script::Finite(vec![]),
            Script::Open(vec![Ok(create_event("t-1"))]),
        ]);
        let client = StreamClient::new(
            connector,
            registration(Arc::new(MemoryPlatform::new())),
            ReconnectPolicy::default(),
        );
        let mut state = client.state();
        let (tx, mut rx) = handoff::channel();
        let run = tokio::spawn(client.run(tx));

        for _ in 0..2 {
            let mut connection = dialed.recv().await.unwrap();
            let first = connection.outbound.recv().await.unwrap();
            assert_eq!(first.operation(), Some(Operation::Heartbeat));
            match first.op_message {
                Some(OpMessage::DataCenter(dc)) => {
                    assert_eq!(dc.name, "dc-1");
                    assert_eq!(dc.report, "");
                }
                other => panic!("unexpected payload: {other:?}"),
            }
        }

        let inbound = rx.recv().await.unwrap();
        assert_eq!(inbound.event.task_payload().unwrap().id, "t-1");
        state
            .wait_for(|state| *state == StreamState::Streaming)
            .await
            .unwrap();
        run.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn next_frame_is_read_only_after_dispatcher_takes_the_last() {
        let (connector, _dialed) = ScriptedConnector::new(vec![Script::Open(vec![
            Ok(create_event("t-1")),
            Ok(create_event("t-2")),
        ])]);
        let pulled = connector.pulled.clone();
        let client = StreamClient::new(
            connector,
            registration(Arc::new(MemoryPlatform::new())),
            ReconnectPolicy::default(),
        );
        let (tx, mut rx) = handoff::channel();
        let run = tokio::spawn(client.run(tx));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(pulled.load(Ordering::SeqCst), 1);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event.task_payload().unwrap().id, "t-1");
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(pulled.load(Ordering::SeqCst), 2);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.event.task_payload().unwrap().id, "t-2");
        run.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn receive_loop_stops_when_dispatcher_is_gone() {
        let (connector, _dialed) =
            ScriptedConnector::new(vec![Script::Open(vec![Ok(create_event("t-1"))])]);
        let client = StreamClient::new(
            connector,
            registration(Arc::new(MemoryPlatform::new())),
            ReconnectPolicy::default(),
        );
        let (tx, rx) = handoff::channel();
        drop(rx);

        assert!(matches!(
            client.run(tx).await,
            Err(HubError::DispatcherGone)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_hub_times_out() {
        let (connector, _dialed) = ScriptedConnector::new(vec![Script::Hang]);
        let client = StreamClient::new(
            connector,
            registration(Arc::new(MemoryPlatform::new())),
            ReconnectPolicy::default(),
        );
        assert!(matches!(client.ensure_reachable().await, Err(HubError::Timeout(_))));
        assert_eq!(*client.state().borrow(), StreamState::Disconnected);
    }

    #[tokio::test]
    async fn registration_lists_managed_tasks() {
        let platform = Arc::new(MemoryPlatform::new());
        let registration = registration(platform);
        registration
            .orchestrator
            .apply("web", &["nginx".to_string()])
            .await
            .unwrap();

        match registration.frame().await.op_message {
            Some(OpMessage::DataCenter(dc)) => {
                assert_eq!(dc.report, "Task:web,Image:nginx,Replicas:1")
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
