//! Concurrent driver: one tokio task per switch
//!
//! Each switch owns its state inside a task and receives commands over
//! an unbounded channel. Switches reach each other only through the
//! [`Router`], which looks up the destination's mailbox and counts the
//! message as in flight until the receiving task has finished with it.
//! The network is quiescent when that count drops to zero.
//!
//! Delivery order between different senders is up to the scheduler, so
//! intermediate states can differ from the deterministic [`Simulation`],
//! but messages from one switch to another stay in order.
//!
//! [`Simulation`]: crate::simulation::Simulation

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arbor_core::{ConfigMessage, Outbox, ScenarioError, SwitchId, TopologyError};
use arbor_switch::{ProcessOutcome, Switch, SwitchSnapshot};
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, trace, warn};
use uuid::Uuid;

use crate::scenarios::Scenario;
use crate::topology::Topology;
use crate::types::SimStats;

/// Errors raised by the concurrent driver
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Switch {0} is no longer running")]
    SwitchGone(SwitchId),

    #[error("Network did not settle within {0:?}")]
    Timeout(Duration),

    #[error("Switch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Commands accepted by a switch task
#[derive(Debug)]
enum Command {
    /// Announce the current view to every neighbour
    Announce { ttl: u32 },
    /// Process a configuration message
    Deliver(ConfigMessage),
    /// A neighbour left the network
    NeighborLost(SwitchId),
    /// Forget everything learned and claim root again
    Restart,
    /// Report the current state
    Snapshot(oneshot::Sender<SwitchSnapshot>),
    /// Stop and hand back the switch
    Shutdown,
}

impl Command {
    /// Whether the command is counted as in-flight work
    fn is_work(&self) -> bool {
        matches!(
            self,
            Command::Announce { .. }
                | Command::Deliver(_)
                | Command::NeighborLost(_)
                | Command::Restart
        )
    }
}

/// Outstanding work across all switches
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn is_idle(&self) -> bool {
        self.count.load(Ordering::SeqCst) == 0
    }
}

/// Routes commands to switch mailboxes and tracks in-flight work
#[derive(Debug, Clone)]
struct Router {
    mailboxes: Arc<DashMap<SwitchId, mpsc::UnboundedSender<Command>>>,
    in_flight: Arc<InFlight>,
    stats: Arc<Mutex<SimStats>>,
}

impl Router {
    fn new() -> Self {
        Self {
            mailboxes: Arc::new(DashMap::new()),
            in_flight: Arc::new(InFlight::default()),
            stats: Arc::new(Mutex::new(SimStats::default())),
        }
    }

    /// Post a command; returns false if the switch is gone
    fn post(&self, to: SwitchId, command: Command) -> bool {
        let Some(mailbox) = self.mailboxes.get(&to).map(|m| m.value().clone()) else {
            return false;
        };
        let counted = command.is_work();
        if counted {
            self.in_flight.begin();
        }
        if mailbox.send(command).is_err() {
            if counted {
                self.in_flight.finish();
            }
            return false;
        }
        true
    }

    fn update_stats(&self, f: impl FnOnce(&mut SimStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut stats);
    }
}

impl Outbox for Router {
    fn send_message(&mut self, message: ConfigMessage) {
        self.update_stats(|s| s.messages_sent += 1);
        if !self.post(message.destination, Command::Deliver(message)) {
            trace!(message = %message, "Discarding message for dropped switch");
            self.update_stats(|s| s.messages_discarded += 1);
        }
    }
}

/// The task owning one switch
struct SwitchTask {
    switch: Switch,
    inbox: mpsc::UnboundedReceiver<Command>,
    router: Router,
    run_id: Uuid,
}

impl SwitchTask {
    fn spawn(
        switch: Switch,
        inbox: mpsc::UnboundedReceiver<Command>,
        router: Router,
        run_id: Uuid,
    ) -> JoinHandle<Switch> {
        let span = tracing::debug_span!("switch_task", switch = %switch.id());
        let task = Self {
            switch,
            inbox,
            router,
            run_id,
        };
        tokio::spawn(task.run().instrument(span))
    }

    async fn run(mut self) -> Switch {
        debug!("Switch task started");
        while let Some(command) = self.inbox.recv().await {
            match command {
                Command::Announce { ttl } => {
                    let sent = self.switch.announce(ttl, &mut self.router);
                    trace!(sent, "Announced");
                    self.router.in_flight.finish();
                }
                Command::Deliver(msg) => {
                    self.deliver(msg);
                    self.router.in_flight.finish();
                }
                Command::NeighborLost(lost) => {
                    let id = self.switch.id();
                    if self.switch.neighbors().contains(&lost) {
                        let outcome = arbor_logging::with_switch_context!(id, self.run_id, {
                            self.switch.neighbor_lost(lost)
                        });
                        self.record(&outcome);
                    }
                    self.router.in_flight.finish();
                }
                Command::Restart => {
                    self.switch.restart();
                    self.router.in_flight.finish();
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.switch.snapshot());
                }
                Command::Shutdown => break,
            }
        }

        // Anything still queued is work that will never be done
        self.inbox.close();
        while let Ok(command) = self.inbox.try_recv() {
            if let Command::Deliver(_) = command {
                self.router.update_stats(|s| s.messages_discarded += 1);
            }
            if command.is_work() {
                self.router.in_flight.finish();
            }
        }
        debug!("Switch task stopped");
        self.switch
    }

    fn deliver(&mut self, msg: ConfigMessage) {
        if !self.switch.neighbors().contains(&msg.origin) {
            trace!(message = %msg, "Discarding message from former neighbor");
            self.router.update_stats(|s| s.messages_discarded += 1);
            return;
        }
        let id = self.switch.id();
        let outcome = arbor_logging::with_switch_context!(id, self.run_id, {
            self.switch.process_message(msg, &mut self.router)
        });
        self.router.update_stats(|s| s.messages_delivered += 1);
        self.record(&outcome);
    }

    /// Fold an outcome into the shared statistics
    ///
    /// Messages are counted by the router as they are sent, so only the
    /// view and link counters are taken from the outcome.
    fn record(&self, outcome: &ProcessOutcome) {
        let counted = ProcessOutcome { sent: 0, ..*outcome };
        self.router.update_stats(|s| s.record(&counted));
    }
}

/// A running network of switch tasks
pub struct ActorNetwork {
    topology: Topology,
    router: Router,
    handles: BTreeMap<SwitchId, JoinHandle<Switch>>,
    ttl: u32,
    run_id: Uuid,
}

impl ActorNetwork {
    /// Spawn one task per switch in the topology
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(topology: Topology, ttl: u32) -> Self {
        let router = Router::new();
        let run_id = Uuid::new_v4();
        let mut handles = BTreeMap::new();

        for (id, neighbors) in topology.iter() {
            let (tx, rx) = mpsc::unbounded_channel();
            router.mailboxes.insert(id, tx);
            let switch = Switch::new(id, neighbors.iter().copied());
            handles.insert(id, SwitchTask::spawn(switch, rx, router.clone(), run_id));
        }

        info!(run = %run_id, switches = handles.len(), ttl, "Spawned switch tasks");
        Self {
            topology,
            router,
            handles,
            ttl,
            run_id,
        }
    }

    /// Tell every switch to announce itself, lowest ID first
    pub fn seed(&self) {
        for id in self.handles.keys() {
            self.router.post(*id, Command::Announce { ttl: self.ttl });
        }
    }

    /// Wait until no message or command is outstanding
    pub async fn wait_quiescent(&self) {
        loop {
            let idle = self.router.in_flight.idle.notified();
            if self.router.in_flight.is_idle() {
                return;
            }
            idle.await;
        }
    }

    /// [`wait_quiescent`](Self::wait_quiescent) with a deadline
    pub async fn wait_quiescent_timeout(&self, limit: Duration) -> Result<(), ActorError> {
        tokio::time::timeout(limit, self.wait_quiescent())
            .await
            .map_err(|_| ActorError::Timeout(limit))
    }

    /// Stop a switch and start a new phase
    ///
    /// Waits for the current phase to settle, stops the switch, notifies
    /// its former neighbours in ascending order, then restarts and
    /// reseeds every surviving switch. Returns the notified neighbours.
    pub async fn drop_switch(&mut self, id: SwitchId) -> Result<Vec<SwitchId>, ActorError> {
        let notified = self.topology.remove_switch(id)?;
        self.wait_quiescent().await;
        info!(run = %self.run_id, switch = %id, "Dropping switch");

        if let Some((_, mailbox)) = self.router.mailboxes.remove(&id) {
            let _ = mailbox.send(Command::Shutdown);
        }
        if let Some(handle) = self.handles.remove(&id) {
            handle.await?;
        }
        self.router.update_stats(|s| s.switches_dropped += 1);

        for neighbor in &notified {
            if !self.router.post(*neighbor, Command::NeighborLost(id)) {
                warn!(switch = %neighbor, "Neighbor of dropped switch is not running");
            }
        }
        // Every restart is queued before any announcement goes out
        for survivor in self.handles.keys() {
            self.router.post(*survivor, Command::Restart);
        }
        self.seed();
        Ok(notified)
    }

    /// Seed, settle, then drop each scenario switch in turn and settle
    pub async fn run_scenario(scenario: &Scenario) -> Result<Self, ActorError> {
        scenario.validate()?;
        let mut network = Self::spawn(scenario.topology.clone(), scenario.ttl);
        network.seed();
        network.wait_quiescent().await;
        for drop in &scenario.drops {
            network.drop_switch(*drop).await?;
            network.wait_quiescent().await;
        }
        Ok(network)
    }

    /// Snapshot of one running switch
    pub async fn snapshot(&self, id: SwitchId) -> Result<SwitchSnapshot, ActorError> {
        let (tx, rx) = oneshot::channel();
        if !self.router.post(id, Command::Snapshot(tx)) {
            return Err(ActorError::SwitchGone(id));
        }
        rx.await.map_err(|_| ActorError::SwitchGone(id))
    }

    /// Snapshots of every running switch, ascending by ID
    pub async fn snapshots(&self) -> Result<Vec<SwitchSnapshot>, ActorError> {
        let mut snapshots = Vec::with_capacity(self.handles.len());
        for id in self.handles.keys() {
            snapshots.push(self.snapshot(*id).await?);
        }
        Ok(snapshots)
    }

    /// One log line per running switch, ascending by ID
    pub async fn log_lines(&self) -> Result<Vec<String>, ActorError> {
        Ok(self
            .snapshots()
            .await?
            .into_iter()
            .map(|s| s.log_line)
            .collect())
    }

    /// Statistics gathered so far
    pub fn stats(&self) -> SimStats {
        self.router
            .stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The current topology, without dropped switches
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Identifier of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Stop every task and return the final switches
    pub async fn shutdown(mut self) -> Result<Vec<Switch>, ActorError> {
        for entry in self.router.mailboxes.iter() {
            let _ = entry.value().send(Command::Shutdown);
        }
        self.router.mailboxes.clear();

        let mut switches = Vec::with_capacity(self.handles.len());
        for (_, handle) in std::mem::take(&mut self.handles) {
            switches.push(handle.await?);
        }
        info!(run = %self.run_id, "Switch tasks stopped");
        Ok(switches)
    }
}

impl Drop for ActorNetwork {
    fn drop(&mut self) {
        // Closing every mailbox ends the tasks
        self.router.mailboxes.clear();
    }
}
