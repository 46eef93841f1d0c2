use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::{sync::oneshot, task};

use super::emitter::EventEmitter;
use super::hub::{EventHub, EventStream};
use super::sink::{EventSink, StdOutSink};

/// Central broadcaster for the node-lifecycle event stream (§6.4).
///
/// `EventBus` fans every event out to zero or more sinks (stdout, a channel
/// for `stream()`'s consumer, an in-memory buffer for tests). It is owned by
/// the session façade, not the executor itself, so each session can run its
/// own sink configuration.
///
/// ```text
/// executor
///     │ emitter.emit(event)
///     ▼
///   EventBus
///     │ broadcast
///     ├─────┬─────┐
///     ▼     ▼     ▼
/// StdOut Channel Memory
///  Sink   Sink    Sink
/// ```
///
/// ```rust,no_run
/// use flowgraph::event_bus::{EventBus, ChannelSink, StdOutSink};
///
/// let (tx, rx) = flume::unbounded();
/// let bus = EventBus::with_sinks(vec![
///     Box::new(StdOutSink::default()),
///     Box::new(ChannelSink::new(tx)),
/// ]);
/// bus.listen_for_events();
/// drop(rx);
/// ```
const DEFAULT_BUFFER_CAPACITY: usize = 1024;

pub struct EventBus {
    sinks: Arc<Mutex<Vec<SinkEntry>>>,
    hub: Arc<EventHub>,
    started: AtomicBool,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self::with_capacity(sinks, DEFAULT_BUFFER_CAPACITY)
    }

    pub(crate) fn with_capacity(sinks: Vec<Box<dyn EventSink>>, buffer_capacity: usize) -> Self {
        let hub = EventHub::new(buffer_capacity);
        let entries = sinks.into_iter().map(SinkEntry::new).collect();
        Self {
            sinks: Arc::new(Mutex::new(entries)),
            hub,
            started: AtomicBool::new(false),
        }
    }

    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.add_boxed_sink(Box::new(sink));
    }

    pub fn add_boxed_sink(&self, sink: Box<dyn EventSink>) {
        let mut sinks = self.sinks.lock().unwrap();
        let mut entry = SinkEntry::new(sink);
        if self.started.load(Ordering::SeqCst) {
            entry.spawn_worker(self.hub.clone());
        }
        sinks.push(entry);
    }

    pub fn get_emitter(&self) -> Arc<dyn EventEmitter> {
        Arc::new(self.hub.emitter())
    }

    pub fn subscribe(&self) -> EventStream {
        self.hub.subscribe()
    }

    pub fn listen_for_events(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut sinks = self.sinks.lock().unwrap();
        for entry in sinks.iter_mut() {
            entry.spawn_worker(self.hub.clone());
        }
    }

    pub async fn stop_listener(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut sinks = self.sinks.lock().unwrap();
        for entry in sinks.iter_mut() {
            entry.stop_worker().await;
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if self.started.load(Ordering::SeqCst) {
            if let Ok(mut sinks) = self.sinks.lock() {
                for entry in sinks.iter_mut() {
                    entry.abort_worker();
                }
            }
        }
    }
}

struct SinkEntry {
    sink: Arc<Mutex<Box<dyn EventSink>>>,
    worker: Option<SinkWorker>,
}

impl SinkEntry {
    fn new(sink: Box<dyn EventSink>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            worker: None,
        }
    }

    fn spawn_worker(&mut self, hub: Arc<EventHub>) {
        if self.worker.is_some() {
            return;
        }
        let sink = Arc::clone(&self.sink);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let mut stream = hub.subscribe();
        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    event = stream.recv() => match event {
                        Ok(event) => {
                            if let Ok(mut guard) = sink.lock() {
                                if let Err(err) = guard.handle(&event) {
                                    eprintln!("EventBus sink error: {err}");
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        });
        self.worker = Some(SinkWorker {
            shutdown: shutdown_tx,
            handle,
        });
    }

    async fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown.send(());
            let _ = worker.handle.await;
        }
    }

    fn abort_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown.send(());
            worker.handle.abort();
        }
    }
}

struct SinkWorker {
    shutdown: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}
