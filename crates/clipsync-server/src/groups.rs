//! Group router: live fan-out of relay events to a user's connections.
//!
//! Membership is an in-memory map from user id to the set of attached
//! connections, sharded so one busy user cannot serialize everyone
//! else's joins. Nothing here is persisted; groups are rebuilt from
//! scratch as connections re-register after a restart.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use clipsync_shared::protocol::ServerMessage;
use clipsync_shared::types::UserId;

/// Ephemeral id of one live transport session.
pub type ConnectionId = Uuid;

const SHARD_COUNT: usize = 16;

/// A member is pruned after this many consecutive full-queue sends.
const MAX_STRIKES: u32 = 3;

struct Member {
    sender: mpsc::Sender<ServerMessage>,
    strikes: u32,
}

type Shard = RwLock<HashMap<UserId, HashMap<ConnectionId, Member>>>;

pub struct GroupRouter {
    shards: Vec<Shard>,
}

impl GroupRouter {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, user: UserId) -> &Shard {
        let mut hasher = DefaultHasher::new();
        user.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    /// Attach a connection to its user's group. Idempotent; re-joining
    /// replaces the outbound queue.
    pub async fn join(&self, user: UserId, conn: ConnectionId, sender: mpsc::Sender<ServerMessage>) {
        let mut shard = self.shard(user).write().await;
        shard
            .entry(user)
            .or_default()
            .insert(conn, Member { sender, strikes: 0 });
        debug!(user = %user, conn = %conn, "Connection joined group");
    }

    /// Detach a connection. Idempotent; the group disappears with its
    /// last member.
    pub async fn leave(&self, user: UserId, conn: ConnectionId) {
        let mut shard = self.shard(user).write().await;
        if let Some(group) = shard.get_mut(&user) {
            group.remove(&conn);
            if group.is_empty() {
                shard.remove(&user);
            }
        }
        debug!(user = %user, conn = %conn, "Connection left group");
    }

    /// Deliver `msg` to every member of the user's group except
    /// `exclude`. Per-member delivery is best-effort: a member whose
    /// transport went away is marked and pruned, never an error for the
    /// caller. Returns the number of members the message was queued to.
    ///
    /// The member list is snapshotted under the shard lock and the
    /// sends happen outside it, so a stalled connection cannot hold up
    /// registration or other groups.
    pub async fn broadcast(
        &self,
        user: UserId,
        msg: ServerMessage,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let members: Vec<(ConnectionId, mpsc::Sender<ServerMessage>)> = {
            let shard = self.shard(user).read().await;
            match shard.get(&user) {
                Some(group) => group
                    .iter()
                    .filter(|(conn, _)| Some(**conn) != exclude)
                    .map(|(conn, member)| (*conn, member.sender.clone()))
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        let mut lagging = Vec::new();

        for (conn, sender) in members {
            match sender.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(conn);
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(user = %user, conn = %conn, "Dropping event for lagging connection");
                    lagging.push(conn);
                }
            }
        }

        if !dead.is_empty() || !lagging.is_empty() {
            let mut shard = self.shard(user).write().await;
            if let Some(group) = shard.get_mut(&user) {
                for conn in dead {
                    group.remove(&conn);
                    debug!(user = %user, conn = %conn, "Pruned dead group member");
                }
                for conn in lagging {
                    if let Some(member) = group.get_mut(&conn) {
                        member.strikes += 1;
                        if member.strikes >= MAX_STRIKES {
                            group.remove(&conn);
                            warn!(user = %user, conn = %conn, "Pruned degraded group member");
                        }
                    }
                }
                if group.is_empty() {
                    shard.remove(&user);
                }
            }
        } else if delivered > 0 {
            // A clean fan-out clears accumulated strikes.
            let mut shard = self.shard(user).write().await;
            if let Some(group) = shard.get_mut(&user) {
                for member in group.values_mut() {
                    member.strikes = 0;
                }
            }
        }

        delivered
    }

    /// Current number of attached connections for a user.
    pub async fn member_count(&self, user: UserId) -> usize {
        let shard = self.shard(user).read().await;
        shard.get(&user).map_or(0, |g| g.len())
    }
}

impl Default for GroupRouter {
    fn default() -> Self {
        Self::new()
    }
}
