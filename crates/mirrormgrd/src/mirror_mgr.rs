//! Mirror Manager - rebuilds one bridge's mirror session from live topology.
//!
//! A reconciliation pass pulls the bridge's current interfaces, classifies
//! them, and replaces the bridge's mirror binding with one atomic mutation.
//! The previous binding is cleared first in a separate request so two
//! mirrors with the same session name never coexist; a failed clear is
//! tolerated (a missing prior binding is not an error), a failed rebuild
//! aborts the pass and leaves the last applied session in place.

use std::sync::Arc;

use tracing::{debug, info, warn};

use mirror_common::{ManagementChannel, MirrorError, MirrorResult};

use crate::classifier::classify;
use crate::commands::{build_clear_mirrors_cmd, MirrorMutation};
use crate::config::MirrorConfig;
use crate::topology::TopologyClient;

/// Reconciles mirror sessions against the live interface set.
pub struct MirrorMgr {
    config: Arc<MirrorConfig>,
    channel: Arc<dyn ManagementChannel>,
    topology: TopologyClient,
}

impl MirrorMgr {
    /// Creates a manager over the given configuration and channel.
    pub fn new(config: Arc<MirrorConfig>, channel: Arc<dyn ManagementChannel>) -> Self {
        let topology = TopologyClient::new(channel.clone());
        info!(bridges = config.bridges.len(), "MirrorMgr initialized");

        Self {
            config,
            channel,
            topology,
        }
    }

    /// The topology client sharing this manager's channel.
    pub fn topology(&self) -> &TopologyClient {
        &self.topology
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Rebuilds the mirror session of one managed bridge.
    ///
    /// No retry on failure: the bridge keeps its last successfully applied
    /// session and the next qualifying event gets a fresh attempt.
    pub async fn reconcile(&self, bridge: &str) -> MirrorResult<()> {
        let session = self
            .config
            .session_for(bridge)
            .ok_or_else(|| MirrorError::not_found("bridge", bridge))?;
        let output = self
            .config
            .output_for(session)
            .ok_or_else(|| MirrorError::config("output_ports", format!("session '{}'", session)))?;

        debug!(bridge, session, "Reconciling mirror session");

        // Drop the prior binding. The bridge may not have one yet.
        if let Err(e) = self.channel.run(&build_clear_mirrors_cmd(bridge)).await {
            warn!(bridge, error = %e, "Clearing previous mirror binding failed, proceeding");
        }

        let ifaces = self.topology.list_interfaces(bridge).await?;
        let classification = classify(&self.config, bridge, session, &ifaces);

        // A mirror with zero selection criteria is still created: the
        // session object stays bound to the bridge with only its output
        // port until a later pass selects interfaces.
        let mut mutation = MirrorMutation::new(bridge, session, output);
        mutation.add_classification(&classification);
        let cmd = mutation.into_command();

        self.channel.run(&cmd).await?;

        info!(
            bridge,
            session,
            sources = classification.sources.len(),
            destinations = classification.destinations.len(),
            "Mirror session rebuilt"
        );
        Ok(())
    }

    /// Full rebuild: reconciles every configured bridge once, in
    /// deterministic order.
    ///
    /// A failing bridge does not stop the sweep; the first error is
    /// reported after every bridge has been attempted.
    pub async fn start(&self) -> MirrorResult<()> {
        info!("Starting full mirror rebuild");

        let mut first_error = None;
        for bridge in self.config.bridges.keys() {
            if let Err(e) = self.reconcile(bridge).await {
                warn!(bridge = %bridge, error = %e, "Initial reconciliation failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}
