//! Causal delivery ordering.
//!
//! A record from origin `O` with clock `R` is deliverable against local clock
//! `L` when `R[O] == L[O] + 1` and `R[n] <= L[n]` for every other node: all
//! of its causal predecessors are already applied. Records covered by `L`
//! are duplicates. Everything else waits in the buffer; applying one record
//! can unblock others, so planning repeats until no progress is made.
//!
//! A predecessor the hub rejected never arrives. When the caller has a
//! complete view of the hub (the last pull page plus the tenant clock read in
//! the same snapshot), a waiting record covered by that clock is known to be
//! stuck behind such a gap and is delivered anyway.

use synapse_crdt::{ClockOrdering, VectorClock};
use synapse_protocol::SyncMessage;
use tracing::debug;

/// The outcome of planning one batch against a local clock.
#[derive(Debug, Clone, Default)]
pub struct DeliveryPlan {
    /// Records in application order, each with `compare(local, remote)` as
    /// seen just before it is applied.
    pub ready: Vec<(SyncMessage, ClockOrdering)>,
    pub duplicates: usize,
    /// Records delivered across a gap the hub will never fill.
    pub gaps_settled: usize,
    /// Records still missing predecessors.
    pub deferred: Vec<SyncMessage>,
    /// Local clock after applying every ready record.
    pub clock: VectorClock,
}

impl DeliveryPlan {
    fn deliver(&mut self, message: SyncMessage) {
        let ordering = self.clock.compare(&message.vector_clock);
        self.clock.merge(&message.vector_clock);
        self.ready.push((message, ordering));
    }
}

/// Order `messages` for application on top of `local`. `settled` is the
/// hub clock from a complete pull, if there was one.
pub fn plan_delivery(
    messages: Vec<SyncMessage>,
    local: &VectorClock,
    settled: Option<&VectorClock>,
) -> DeliveryPlan {
    let mut plan = DeliveryPlan {
        clock: local.clone(),
        ..Default::default()
    };
    let mut pending = messages;

    loop {
        let mut progressed = false;
        let mut waiting = Vec::with_capacity(pending.len());
        for message in pending {
            if message.vector_clock.is_covered_by(&plan.clock) {
                plan.duplicates += 1;
            } else if message.vector_clock.is_next_from(&message.node_id, &plan.clock) {
                plan.deliver(message);
                progressed = true;
            } else {
                waiting.push(message);
            }
        }
        pending = waiting;
        if pending.is_empty() {
            break;
        }
        if progressed {
            continue;
        }

        // Stalled. Release the earliest stuck record the hub has fully seen.
        let Some(hub_clock) = settled else { break };
        let stuck = pending
            .iter()
            .enumerate()
            .filter(|(_, m)| m.vector_clock.is_covered_by(hub_clock))
            .min_by_key(|(_, m)| (m.vector_clock.get(&m.node_id), m.node_id.clone()))
            .map(|(i, _)| i);
        let Some(index) = stuck else { break };
        let message = pending.remove(index);
        debug!(origin = %message.node_id, seq = message.sequence_number, "delivering across a rejected predecessor");
        plan.gaps_settled += 1;
        plan.deliver(message);
    }

    if !pending.is_empty() {
        debug!(deferred = pending.len(), "buffering records awaiting predecessors");
    }
    plan.deferred = pending;
    plan
}
