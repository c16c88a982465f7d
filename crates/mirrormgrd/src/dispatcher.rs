//! Port-state event dispatch.
//!
//! Consumes the control channel's port-state notifications and decides which
//! bridge, if any, needs its mirror session rebuilt. Only "port added"
//! events qualify; everything else is discarded without touching the
//! management channel. Events for distinct bridges are handled concurrently,
//! with at most one in-flight reconciliation per bridge.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::mirror_mgr::MirrorMgr;
use crate::types::{PortReason, PortStateEvent};

/// Dispatches port-state events to the mirror manager.
pub struct EventDispatcher {
    mgr: Arc<MirrorMgr>,
    /// Per-bridge reconciliation guards, created on first use.
    bridge_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl EventDispatcher {
    /// Creates a dispatcher driving the given manager.
    pub fn new(mgr: Arc<MirrorMgr>) -> Self {
        Self {
            mgr,
            bridge_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Processes events until the sender side closes, then drains the
    /// in-flight reconciliations.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<PortStateEvent>) {
        let mut tasks = JoinSet::new();

        while let Some(event) = rx.recv().await {
            if event.reason != PortReason::Added {
                trace!(?event, "Discarding event, reason is not Added");
                continue;
            }

            let dispatcher = self.clone();
            tasks.spawn(async move {
                dispatcher.handle_added(event).await;
            });
        }

        while tasks.join_next().await.is_some() {}
    }

    /// Handles one event inline. Used by `run` via task spawn; exposed so a
    /// caller driving its own loop can feed events directly.
    pub async fn handle_event(&self, event: PortStateEvent) {
        if event.reason != PortReason::Added {
            trace!(?event, "Discarding event, reason is not Added");
            return;
        }
        self.handle_added(event).await;
    }

    async fn handle_added(&self, event: PortStateEvent) {
        let topology = self.mgr.topology();

        let bridge = match topology.resolve_bridge(event.datapath_id).await {
            Ok(bridge) => bridge,
            Err(e) if e.is_not_found() => {
                debug!(datapath_id = event.datapath_id, "Unknown datapath, event dropped");
                return;
            }
            Err(e) => {
                warn!(datapath_id = event.datapath_id, error = %e, "Bridge resolution failed");
                return;
            }
        };

        let iface = match topology.resolve_interface(&bridge, event.port_no).await {
            Ok(iface) => iface,
            Err(e) if e.is_not_found() => {
                debug!(bridge = %bridge, port_no = event.port_no, "Unknown port, event dropped");
                return;
            }
            Err(e) => {
                warn!(bridge = %bridge, port_no = event.port_no, error = %e, "Interface resolution failed");
                return;
            }
        };

        let config = self.mgr.config();
        if config.is_exception(&iface) || !config.is_managed(&bridge) {
            debug!(bridge = %bridge, iface = %iface, "Event outside mirror scope, dropped");
            return;
        }

        debug!(bridge = %bridge, iface = %iface, "Port added, rebuilding mirror session");

        let lock = self.bridge_lock(&bridge);
        let _guard = lock.lock().await;
        if let Err(e) = self.mgr.reconcile(&bridge).await {
            // Operator-facing: the bridge keeps its stale session until the
            // next qualifying event.
            warn!(bridge = %bridge, error = %e, "Event-triggered reconciliation failed");
        }
    }

    fn bridge_lock(&self, bridge: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.bridge_locks.lock().unwrap();
        locks
            .entry(bridge.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use crate::testutil::MockChannel;
    use mirror_common::ManagementChannel;

    fn test_config() -> Arc<MirrorConfig> {
        Arc::new(
            MirrorConfig::from_toml_str(
                r#"
                    exceptions = ["mgmt0"]

                    [bridges]
                    vmbr1 = "han-ovs"

                    [output_ports]
                    han-ovs = "tap113i1"
                "#,
            )
            .unwrap(),
        )
    }

    fn dispatcher_with(mock: &Arc<MockChannel>) -> Arc<EventDispatcher> {
        let mgr = Arc::new(MirrorMgr::new(
            test_config(),
            mock.clone() as Arc<dyn ManagementChannel>,
        ));
        Arc::new(EventDispatcher::new(mgr))
    }

    fn added_event() -> PortStateEvent {
        PortStateEvent::new(0x71, 3, PortReason::Added)
    }

    #[tokio::test]
    async fn test_non_added_reasons_make_no_channel_calls() {
        let mock = MockChannel::new();
        let dispatcher = dispatcher_with(&mock);

        dispatcher
            .handle_event(PortStateEvent::new(0x71, 3, PortReason::Removed))
            .await;
        dispatcher
            .handle_event(PortStateEvent::new(0x71, 3, PortReason::Modified))
            .await;

        assert!(mock.commands().is_empty());
    }

    #[tokio::test]
    async fn test_added_event_triggers_reconcile() {
        let mock = MockChannel::new();
        mock.respond("find Bridge", "name\n----\n\"vmbr1\"");
        mock.respond("dump-ports-desc", "3(eth3): addr:aa:bb:cc:dd:ee:03");
        mock.respond("list-ifaces", "eth3\ntap113i1");

        let dispatcher = dispatcher_with(&mock);
        dispatcher.handle_event(added_event()).await;

        assert_eq!(mock.count_matching("clear Bridge \"vmbr1\""), 1);
        assert_eq!(mock.count_matching("create Mirror name=\"han-ovs\""), 1);
    }

    #[tokio::test]
    async fn test_exception_interface_skips_reconcile() {
        let mock = MockChannel::new();
        mock.respond("find Bridge", "name\n----\n\"vmbr1\"");
        mock.respond("dump-ports-desc", "3(mgmt0): addr:aa:bb:cc:dd:ee:03");

        let dispatcher = dispatcher_with(&mock);
        dispatcher.handle_event(added_event()).await;

        // Resolution ran, reconciliation did not.
        assert_eq!(mock.count_matching("clear Bridge"), 0);
        assert_eq!(mock.count_matching("create Mirror"), 0);
    }

    #[tokio::test]
    async fn test_unmanaged_bridge_skips_reconcile() {
        let mock = MockChannel::new();
        mock.respond("find Bridge", "name\n----\n\"vmbr9\"");
        mock.respond("dump-ports-desc", "3(eth3): addr:aa:bb:cc:dd:ee:03");

        let dispatcher = dispatcher_with(&mock);
        dispatcher.handle_event(added_event()).await;

        assert_eq!(mock.count_matching("create Mirror"), 0);
    }

    #[tokio::test]
    async fn test_unknown_datapath_drops_event() {
        let mock = MockChannel::new();
        mock.respond("find Bridge", "name\n----");

        let dispatcher = dispatcher_with(&mock);
        dispatcher.handle_event(added_event()).await;

        assert_eq!(mock.commands().len(), 1);
        assert!(mock.commands()[0].contains("find Bridge"));
    }

    #[tokio::test]
    async fn test_unknown_port_drops_event() {
        let mock = MockChannel::new();
        mock.respond("find Bridge", "name\n----\n\"vmbr1\"");
        mock.respond("dump-ports-desc", "1(eth1): addr:aa:bb:cc:dd:ee:01");

        let dispatcher = dispatcher_with(&mock);
        dispatcher.handle_event(added_event()).await;

        assert_eq!(mock.count_matching("create Mirror"), 0);
    }

    #[tokio::test]
    async fn test_run_drains_queue_then_exits() {
        let mock = MockChannel::new();
        mock.respond("find Bridge", "name\n----\n\"vmbr1\"");
        mock.respond("dump-ports-desc", "3(eth3): addr:aa:bb:cc:dd:ee:03");
        mock.respond("list-ifaces", "eth3");

        let dispatcher = dispatcher_with(&mock);
        let (tx, rx) = mpsc::channel(8);

        tx.send(added_event()).await.unwrap();
        tx.send(PortStateEvent::new(0x71, 3, PortReason::Removed))
            .await
            .unwrap();
        tx.send(added_event()).await.unwrap();
        drop(tx);

        dispatcher.run(rx).await;

        // Two qualifying events, two rebuilds; the Removed event touched
        // nothing.
        assert_eq!(mock.count_matching("create Mirror name=\"han-ovs\""), 2);
    }
}
