//! Tracks how long validators have been connected. Durations live in the chain state next to the
//! validator they belong to, so that they survive restarts: time spent while the local node was
//! offline is credited as up, and nothing is recomputed against the wall clock on startup.

use crate::{
    errors::StateError,
    state::base::{State, ValidatorWeightChange},
};
use itertools::Itertools;
use omega_core::{debug, time::Clock};
use omega_platformvm_core::ids::{NodeId, SubnetId};
use parking_lot::{Mutex, RwLock};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UptimeError {
    #[error(transparent)]
    State(#[from] StateError),
}

pub type UptimeResult<T> = std::result::Result<T, UptimeError>;

/// Persisted uptime records of current validators
pub trait UptimeState: Send + Sync {
    /// Returns `(up_duration, last_updated)`
    fn uptime(&self, node_id: NodeId, subnet_id: SubnetId) -> Result<(u64, u64), StateError>;
    fn set_uptime(&self, node_id: NodeId, subnet_id: SubnetId, up_duration: u64, last_updated: u64) -> Result<(), StateError>;
    fn start_time(&self, node_id: NodeId, subnet_id: SubnetId) -> Result<u64, StateError>;
}

impl UptimeState for RwLock<State> {
    fn uptime(&self, node_id: NodeId, subnet_id: SubnetId) -> Result<(u64, u64), StateError> {
        self.read().uptime(node_id, subnet_id)
    }

    fn set_uptime(&self, node_id: NodeId, subnet_id: SubnetId, up_duration: u64, last_updated: u64) -> Result<(), StateError> {
        self.write().set_uptime(node_id, subnet_id, up_duration, last_updated)
    }

    fn start_time(&self, node_id: NodeId, subnet_id: SubnetId) -> Result<u64, StateError> {
        self.read().uptime_start_time(node_id, subnet_id)
    }
}

#[derive(Default)]
struct Connections {
    /// Connection time of every connected node, per subnet
    connected: HashMap<NodeId, HashMap<SubnetId, u64>>,
    tracked_subnets: HashSet<SubnetId>,
}

pub struct UptimeManager {
    clock: Arc<dyn Clock>,
    state: Arc<dyn UptimeState>,
    connections: Mutex<Connections>,
}

impl UptimeManager {
    pub fn new(clock: Arc<dyn Clock>, state: Arc<dyn UptimeState>) -> Self {
        Self { clock, state, connections: Default::default() }
    }

    /// Starts measuring `node_ids` on `subnet_id`. The time elapsed since the last update, while
    /// the local node was not tracking, is credited as up.
    pub fn start_tracking(&self, node_ids: &[NodeId], subnet_id: SubnetId) -> UptimeResult<()> {
        let mut connections = self.connections.lock();
        let now = self.clock.unix_time();
        for &node_id in node_ids {
            let (up_duration, last_updated) = self.state.uptime(node_id, subnet_id)?;
            if now < last_updated {
                // Time went backwards, leave the record alone
                continue;
            }
            self.state.set_uptime(node_id, subnet_id, up_duration + (now - last_updated), now)?;
        }
        connections.tracked_subnets.insert(subnet_id);
        debug!("Tracking the uptime of {} validators of subnet {}", node_ids.len(), subnet_id);
        Ok(())
    }

    /// Stops measuring `node_ids` on `subnet_id`, writing their up to date uptime to the state.
    /// The state still needs to be committed by the caller.
    pub fn stop_tracking(&self, node_ids: &[NodeId], subnet_id: SubnetId) -> UptimeResult<()> {
        let mut connections = self.connections.lock();
        for &node_id in node_ids {
            let (up_duration, last_updated) = self.calculate(&connections, node_id, subnet_id)?;
            self.state.set_uptime(node_id, subnet_id, up_duration, last_updated)?;
            if let Some(subnets) = connections.connected.get_mut(&node_id) {
                subnets.remove(&subnet_id);
                if subnets.is_empty() {
                    connections.connected.remove(&node_id);
                }
            }
        }
        connections.tracked_subnets.remove(&subnet_id);
        Ok(())
    }

    /// Starts measuring every subnet of `validators` which is not measured yet, with the nodes
    /// gaining weight there
    pub fn track_new_subnets(&self, validators: &[ValidatorWeightChange]) -> UptimeResult<()> {
        let untracked = validators
            .iter()
            .filter(|change| change.increase > change.decrease && !self.started_tracking(change.subnet_id))
            .map(|change| (change.subnet_id, change.node_id))
            .into_group_map();
        for (subnet_id, node_ids) in untracked {
            self.start_tracking(&node_ids, subnet_id)?;
        }
        Ok(())
    }

    /// Stops measuring every tracked subnet of `validators`
    pub fn stop_tracking_all(&self, validators: &[ValidatorWeightChange]) -> UptimeResult<()> {
        let tracked = validators
            .iter()
            .filter(|change| self.started_tracking(change.subnet_id))
            .map(|change| (change.subnet_id, change.node_id))
            .into_group_map();
        for (subnet_id, node_ids) in tracked {
            self.stop_tracking(&node_ids, subnet_id)?;
        }
        Ok(())
    }

    pub fn started_tracking(&self, subnet_id: SubnetId) -> bool {
        self.connections.lock().tracked_subnets.contains(&subnet_id)
    }

    pub fn connect(&self, node_id: NodeId, subnet_id: SubnetId) {
        let now = self.clock.unix_time();
        self.connections.lock().connected.entry(node_id).or_default().insert(subnet_id, now);
    }

    pub fn is_connected(&self, node_id: NodeId, subnet_id: SubnetId) -> bool {
        self.connections.lock().connected.get(&node_id).is_some_and(|subnets| subnets.contains_key(&subnet_id))
    }

    /// Closes every connection of `node_id`, crediting the connected time on tracked subnets
    pub fn disconnect(&self, node_id: NodeId) -> UptimeResult<()> {
        let mut connections = self.connections.lock();
        let Some(subnets) = connections.connected.get(&node_id).cloned() else {
            return Ok(());
        };
        for &subnet_id in subnets.keys() {
            if !connections.tracked_subnets.contains(&subnet_id) {
                continue;
            }
            let (up_duration, last_updated) = self.calculate(&connections, node_id, subnet_id)?;
            self.state.set_uptime(node_id, subnet_id, up_duration, last_updated)?;
        }
        connections.connected.remove(&node_id);
        Ok(())
    }

    /// Returns `(up_duration, last_updated)` as of now, without writing anything
    pub fn calculate_uptime(&self, node_id: NodeId, subnet_id: SubnetId) -> UptimeResult<(u64, u64)> {
        let connections = self.connections.lock();
        self.calculate(&connections, node_id, subnet_id)
    }

    /// Uptime since the validator started, as a fraction
    pub fn calculate_uptime_percent(&self, node_id: NodeId, subnet_id: SubnetId) -> UptimeResult<f64> {
        let start_time = self.state.start_time(node_id, subnet_id)?;
        self.calculate_uptime_percent_from(node_id, subnet_id, start_time)
    }

    pub fn calculate_uptime_percent_from(&self, node_id: NodeId, subnet_id: SubnetId, start_time: u64) -> UptimeResult<f64> {
        let (up_duration, now) = self.calculate_uptime(node_id, subnet_id)?;
        let best_possible = now.saturating_sub(start_time);
        if best_possible == 0 {
            return Ok(1.0);
        }
        Ok(up_duration as f64 / best_possible as f64)
    }

    fn calculate(&self, connections: &Connections, node_id: NodeId, subnet_id: SubnetId) -> UptimeResult<(u64, u64)> {
        let (up_duration, last_updated) = self.state.uptime(node_id, subnet_id)?;
        let now = self.clock.unix_time();
        if now < last_updated {
            return Ok((up_duration, last_updated));
        }
        if !connections.tracked_subnets.contains(&subnet_id) {
            // Not measured yet, assume the node was up all along
            return Ok((up_duration + (now - last_updated), now));
        }
        let Some(&connected_at) = connections.connected.get(&node_id).and_then(|subnets| subnets.get(&subnet_id)) else {
            return Ok((up_duration, now));
        };
        // Time before the last update was already accounted for
        let counted_from = connected_at.max(last_updated);
        Ok((up_duration + (now - counted_from), now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{TestState, node};
    use omega_core::time::MockClock;
    use omega_platformvm_core::ids::PRIMARY_NETWORK_ID;

    fn manager(ts: &TestState, clock: Arc<MockClock>) -> UptimeManager {
        UptimeManager::new(clock, ts.state.clone())
    }

    #[test]
    fn test_connected_time_is_counted() {
        let ts = TestState::new();
        let t0 = ts.genesis_timestamp();
        let clock = Arc::new(MockClock::new(t0));
        let uptime = manager(&ts, clock.clone());

        uptime.start_tracking(&[node(1)], PRIMARY_NETWORK_ID).unwrap();
        uptime.connect(node(1), PRIMARY_NETWORK_ID);
        clock.advance(2);
        uptime.disconnect(node(1)).unwrap();
        assert!(!uptime.is_connected(node(1), PRIMARY_NETWORK_ID));
        assert_eq!(uptime.calculate_uptime(node(1), PRIMARY_NETWORK_ID).unwrap(), (2, t0 + 2));

        // Disconnected time does not count while tracking
        clock.advance(6);
        assert_eq!(uptime.calculate_uptime(node(1), PRIMARY_NETWORK_ID).unwrap(), (2, t0 + 8));
        assert_eq!(uptime.calculate_uptime_percent(node(1), PRIMARY_NETWORK_ID).unwrap(), 0.25);
    }

    #[test]
    fn test_restart_keeps_the_duration() {
        let ts = TestState::new();
        let t0 = ts.genesis_timestamp();
        let clock = Arc::new(MockClock::new(t0));
        {
            let uptime = manager(&ts, clock.clone());
            uptime.start_tracking(&[node(1)], PRIMARY_NETWORK_ID).unwrap();
            uptime.connect(node(1), PRIMARY_NETWORK_ID);
            clock.advance(2);
            uptime.disconnect(node(1)).unwrap();
            uptime.stop_tracking(&[node(1)], PRIMARY_NETWORK_ID).unwrap();
            ts.state.write().commit().unwrap();
        }

        let ts = ts.reopen();
        let uptime = manager(&ts, clock.clone());
        uptime.start_tracking(&[node(1)], PRIMARY_NETWORK_ID).unwrap();
        assert_eq!(uptime.calculate_uptime(node(1), PRIMARY_NETWORK_ID).unwrap(), (2, t0 + 2));
    }

    #[test]
    fn test_offline_time_is_credited() {
        let ts = TestState::new();
        let t0 = ts.genesis_timestamp();
        let clock = Arc::new(MockClock::new(t0 + 10));
        let uptime = manager(&ts, clock.clone());

        // Before tracking starts every second counts
        assert_eq!(uptime.calculate_uptime(node(2), PRIMARY_NETWORK_ID).unwrap(), (10, t0 + 10));
        assert!(!uptime.started_tracking(PRIMARY_NETWORK_ID));

        uptime.start_tracking(&[node(2)], PRIMARY_NETWORK_ID).unwrap();
        assert_eq!(uptime.calculate_uptime(node(2), PRIMARY_NETWORK_ID).unwrap(), (10, t0 + 10));
        clock.advance(10);
        assert_eq!(uptime.calculate_uptime_percent_from(node(2), PRIMARY_NETWORK_ID, t0).unwrap(), 0.5);
    }

    #[test]
    fn test_connection_before_last_update_is_not_double_counted() {
        let ts = TestState::new();
        let t0 = ts.genesis_timestamp();
        let clock = Arc::new(MockClock::new(t0));
        let uptime = manager(&ts, clock.clone());

        uptime.connect(node(1), PRIMARY_NETWORK_ID);
        clock.advance(5);
        uptime.start_tracking(&[node(1)], PRIMARY_NETWORK_ID).unwrap();
        clock.advance(5);
        assert_eq!(uptime.calculate_uptime(node(1), PRIMARY_NETWORK_ID).unwrap(), (10, t0 + 10));
    }

    #[test]
    fn test_unknown_validator() {
        let ts = TestState::new();
        let uptime = manager(&ts, Arc::new(MockClock::new(ts.genesis_timestamp())));
        assert!(matches!(uptime.calculate_uptime(node(77), PRIMARY_NETWORK_ID), Err(UptimeError::State(_))));
        assert_eq!(uptime.calculate_uptime_percent(node(1), PRIMARY_NETWORK_ID).unwrap(), 1.0);
    }

    #[test]
    fn test_tracking_follows_validator_weights() {
        let ts = TestState::new();
        let t0 = ts.genesis_timestamp();
        let clock = Arc::new(MockClock::new(t0 + 10));
        let uptime = manager(&ts, clock.clone());
        let weights = ts.state.read().current_validator_weights();

        uptime.track_new_subnets(&weights).unwrap();
        assert!(uptime.started_tracking(PRIMARY_NETWORK_ID));
        assert_eq!(ts.state.read().uptime(node(1), PRIMARY_NETWORK_ID).unwrap(), (10, t0 + 10));

        // An already tracked subnet is left alone
        clock.advance(10);
        uptime.track_new_subnets(&weights).unwrap();
        assert_eq!(ts.state.read().uptime(node(1), PRIMARY_NETWORK_ID).unwrap(), (10, t0 + 10));

        uptime.connect(node(2), PRIMARY_NETWORK_ID);
        clock.advance(5);
        uptime.stop_tracking_all(&weights).unwrap();
        assert!(!uptime.started_tracking(PRIMARY_NETWORK_ID));
        assert!(!uptime.is_connected(node(2), PRIMARY_NETWORK_ID));
        assert_eq!(ts.state.read().uptime(node(1), PRIMARY_NETWORK_ID).unwrap(), (10, t0 + 25));
        assert_eq!(ts.state.read().uptime(node(2), PRIMARY_NETWORK_ID).unwrap(), (15, t0 + 25));
    }
}
