//! The session facade.
//!
//! A [`Session`] is the single entry point for one local user's state:
//! it owns the database handle, the nullifier registry, the injected
//! clock and room-secret provider, and exposes every core operation as a
//! method. There is deliberately no module-level "current identity";
//! multiple independent sessions (e.g. on in-memory databases) can
//! coexist in one process.

use crate::clock::Clock;
use crate::crypto::proof::{HashCommitmentBackend, ProofBackend, ProofContext};
use crate::crypto::{random_bytes, KEY_SIZE};
use crate::error::{Error, Result};
use crate::identity::{attestation, Attestation, Category, Identity};
use crate::membership::{self, rln, Membership, NullifierRegistry, RlnConfig};
use crate::rooms::{self, Room, StoredMessage, DEFAULT_MESSAGE_CAP};
use crate::storage::{Database, DatabaseConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Provider of per-room shared secrets.
///
/// How the secret reaches each member is a key-management concern
/// outside this core; the session only ever asks for it.
pub trait RoomSecretProvider: Send + Sync {
    /// The shared secret for a room.
    fn room_secret(&self, room_id: &str) -> Result<[u8; KEY_SIZE]>;
}

/// A provider deriving every room's secret from one master secret.
///
/// Suitable for single-device use and tests.
pub struct StaticRoomSecrets([u8; KEY_SIZE]);

impl StaticRoomSecrets {
    /// Create from a master secret.
    pub fn new(master: [u8; KEY_SIZE]) -> Self {
        Self(master)
    }
}

impl RoomSecretProvider for StaticRoomSecrets {
    fn room_secret(&self, room_id: &str) -> Result<[u8; KEY_SIZE]> {
        let okm = crate::crypto::hkdf_derive(
            Some(room_id.as_bytes()),
            &self.0,
            b"haven-room-secret-v1",
            KEY_SIZE,
        )?;
        let mut secret = [0u8; KEY_SIZE];
        secret.copy_from_slice(&okm);
        Ok(secret)
    }
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Database location.
    pub database: DatabaseConfig,
    /// Rate-limit policy.
    pub rln: RlnConfig,
    /// Maximum retained messages per room.
    pub message_cap: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            rln: RlnConfig::default(),
            message_cap: DEFAULT_MESSAGE_CAP,
        }
    }
}

/// Receipt returned for an accepted abuse report.
#[derive(Debug, Clone)]
pub struct ReportReceipt {
    /// Opaque report id the reporter can quote later.
    pub report_id: String,
    /// Filing time, Unix seconds.
    pub created_at: i64,
}

type DeletedHook = Box<dyn Fn() + Send + Sync>;

/// One local user's session over the Haven core.
pub struct Session {
    db: Database,
    backend: Arc<dyn ProofBackend>,
    clock: Arc<dyn Clock>,
    secrets: Arc<dyn RoomSecretProvider>,
    registry: NullifierRegistry,
    message_cap: usize,
    identity: Option<Identity>,
    on_identity_deleted: Option<DeletedHook>,
}

impl Session {
    /// Open a session with the default hash-commitment proof backend.
    pub fn open(
        config: SessionConfig,
        clock: Arc<dyn Clock>,
        secrets: Arc<dyn RoomSecretProvider>,
    ) -> Result<Self> {
        Self::open_with_backend(config, clock, secrets, Arc::new(HashCommitmentBackend))
    }

    /// Open a session with an explicit proof backend.
    ///
    /// Seeds the default room catalog if the store is empty, loads any
    /// existing identity, and repopulates the nullifier registry from the
    /// recent message log so a restart inside an epoch does not reopen
    /// the flood window.
    pub fn open_with_backend(
        config: SessionConfig,
        clock: Arc<dyn Clock>,
        secrets: Arc<dyn RoomSecretProvider>,
        backend: Arc<dyn ProofBackend>,
    ) -> Result<Self> {
        let db = Database::open(&config.database)?;
        let now = clock.now();

        db.seed_rooms_if_empty(&rooms::default_rooms(now))?;
        let identity = db.load_identity(backend.as_ref())?;

        let registry = NullifierRegistry::new(config.rln);
        let horizon = now - config.rln.epoch_width_secs * config.rln.retain_epochs;
        for (room_id, value, sent_at) in db.nullifiers_since(horizon)? {
            registry.preload(&room_id, value, config.rln.epoch_for(sent_at));
        }

        info!(
            has_identity = identity.is_some(),
            "session opened"
        );

        Ok(Self {
            db,
            backend,
            clock,
            secrets,
            registry,
            message_cap: config.message_cap,
            identity,
            on_identity_deleted: None,
        })
    }

    /// Register a hook fired after the identity is deleted, so a client
    /// can redirect away from authenticated surfaces.
    pub fn on_identity_deleted(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.on_identity_deleted = Some(Box::new(hook));
    }

    // ---- identity ----

    /// Create the session identity.
    ///
    /// Fails with [`Error::AlreadyExists`] if one is present: silent
    /// replacement would destroy an unrecoverable seed, so destruction
    /// has to go through [`Session::delete_identity`] explicitly.
    pub fn create_identity(&mut self) -> Result<Identity> {
        if self.identity.is_some() {
            return Err(Error::AlreadyExists);
        }

        let identity = Identity::generate(self.backend.as_ref(), self.clock.now())?;
        self.db.store_identity(&identity)?;

        info!(alias = %identity.alias, "created identity");
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// The current identity, if one exists. Non-blocking local lookup.
    pub fn current_identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Delete the identity and everything derived from it.
    ///
    /// Idempotent: deleting twice is a no-op. Cascades attestations,
    /// memberships (with member-count decrements) and the cached message
    /// log, then fires the deletion hook.
    pub fn delete_identity(&mut self) -> Result<()> {
        let Some(identity) = self.identity.as_ref() else {
            return Ok(());
        };
        let identity_id = identity.id.clone();

        self.db.delete_identity_cascade(&identity_id)?;
        self.identity = None;

        info!("identity deleted");
        if let Some(hook) = self.on_identity_deleted.as_ref() {
            hook();
        }
        Ok(())
    }

    // ---- attestation ----

    /// Attest a support category, superseding any prior attestation.
    pub fn attest(&mut self, category: Category) -> Result<Attestation> {
        let identity = self.identity.as_ref().ok_or(Error::NoIdentity)?;

        let att =
            attestation::attest(self.backend.as_ref(), identity, category, self.clock.now())?;
        self.db.insert_attestation(&att)?;

        debug!(category = %category, "attestation recorded");
        Ok(att)
    }

    /// The active attestation, if any.
    pub fn active_attestation(&self) -> Result<Option<Attestation>> {
        let Some(identity) = self.identity.as_ref() else {
            return Ok(None);
        };
        self.db.active_attestation(&identity.id)
    }

    /// Recompute and check an attestation against an expected category.
    pub fn verify_attestation(
        &self,
        att: &Attestation,
        expected_category: Category,
    ) -> Result<bool> {
        let identity = self.identity.as_ref().ok_or(Error::NoIdentity)?;
        attestation::verify(self.backend.as_ref(), identity, att, expected_category)
    }

    // ---- membership ----

    /// Join a room, posting an optional bond.
    ///
    /// Requires an attested identity and no active membership for the
    /// pair. Increments the room's member count.
    pub fn join_room(&mut self, room_id: &str, bond_amount: u64) -> Result<Membership> {
        let identity = self.identity.as_ref().ok_or(Error::NoIdentity)?;

        if self.db.room(room_id)?.is_none() {
            return Err(Error::NotFound(format!("room {}", room_id)));
        }
        if self.db.active_attestation(&identity.id)?.is_none() {
            return Err(Error::NotAttested);
        }
        if self.db.active_membership(&identity.id, room_id)?.is_some() {
            return Err(Error::AlreadyMember);
        }

        let membership = membership::issue_membership(
            self.backend.as_ref(),
            identity,
            room_id,
            bond_amount,
            self.clock.now(),
        )?;
        self.db.insert_membership(&membership)?;

        info!(room_id = %room_id, "joined room");
        Ok(membership)
    }

    /// Leave a room.
    ///
    /// The membership row is kept, marked inactive, for audit; the
    /// room's member count is decremented (floored at zero).
    pub fn leave_room(&mut self, room_id: &str) -> Result<()> {
        let identity = self.identity.as_ref().ok_or(Error::NoIdentity)?;

        if self.db.active_membership(&identity.id, room_id)?.is_none() {
            return Err(Error::NotMember);
        }
        self.db.deactivate_membership(&identity.id, room_id)?;

        info!(room_id = %room_id, "left room");
        Ok(())
    }

    /// The active membership for a room, if any.
    pub fn active_membership(&self, room_id: &str) -> Result<Option<Membership>> {
        let Some(identity) = self.identity.as_ref() else {
            return Ok(None);
        };
        self.db.active_membership(&identity.id, room_id)
    }

    // ---- rooms & messages ----

    /// All rooms, in stable insertion order.
    pub fn list_rooms(&self) -> Result<Vec<Room>> {
        self.db.list_rooms()
    }

    /// A single room by id.
    pub fn room(&self, room_id: &str) -> Result<Option<Room>> {
        self.db.room(room_id)
    }

    /// Send a message to a room.
    ///
    /// Requires an active membership. Derives the rate-limit nullifier
    /// for the current epoch and atomically checks-and-records it; a
    /// duplicate fails with [`Error::RateLimited`] and nothing is stored.
    /// Append and oldest-first eviction to the retention cap happen in a
    /// single durable step.
    pub fn send_message(&mut self, room_id: &str, plaintext: &str) -> Result<StoredMessage> {
        let identity = self.identity.as_ref().ok_or(Error::NoIdentity)?;

        if self.db.active_membership(&identity.id, room_id)?.is_none() {
            return Err(Error::NotMember);
        }

        let nullifier = rln::issue_nullifier(
            self.backend.as_ref(),
            identity,
            room_id,
            self.clock.now(),
            self.registry.config(),
        )?;
        if !self.registry.check_and_record(&nullifier) {
            warn!(room_id = %room_id, "send rejected: rate limited");
            return Err(Error::RateLimited);
        }

        let room_secret = self.secrets.room_secret(room_id)?;
        let message = StoredMessage {
            id: hex::encode(random_bytes::<16>()),
            room_id: room_id.to_string(),
            sender_commitment: identity.commitment_hex(),
            ciphertext: rooms::encrypt_message(room_id, &room_secret, plaintext.as_bytes())?,
            nullifier: nullifier.value.clone(),
            sent_at: self.clock.now(),
        };

        if let Err(e) = self.db.append_message(&message, self.message_cap) {
            // Durable append failed: the registry must not claim the
            // epoch slot was used.
            self.registry.forget(&nullifier);
            return Err(e);
        }

        debug!(room_id = %room_id, message_id = %message.id, "message accepted");
        Ok(message)
    }

    /// All messages for a room, chronological and repeatable.
    pub fn get_messages(&self, room_id: &str) -> Result<Vec<StoredMessage>> {
        self.db.messages(room_id)
    }

    /// Decrypt a stored message using the session's room-secret provider.
    pub fn decrypt_message(&self, message: &StoredMessage) -> Result<String> {
        let room_secret = self.secrets.room_secret(&message.room_id)?;
        let plaintext = rooms::decrypt_message(message, &room_secret)?;
        String::from_utf8(plaintext.to_vec()).map_err(|_| Error::DecryptionFailed)
    }

    /// Number of messages currently retained for a room.
    pub fn room_message_count(&self, room_id: &str) -> Result<u64> {
        self.db.message_count(room_id)
    }

    /// Drop all retained messages for a room.
    pub fn clear_room_messages(&self, room_id: &str) -> Result<()> {
        self.db.clear_room_messages(room_id)
    }

    /// Direct access to the underlying database, for audit queries.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // ---- reports ----

    /// File an abuse report for a room.
    ///
    /// The stored proof binds the report to the reporter's seed without
    /// recording the reporter's commitment alongside it, so readers of
    /// the report table cannot identify the reporter.
    pub fn report_abuse(&mut self, room_id: &str, reason: &str) -> Result<ReportReceipt> {
        let identity = self.identity.as_ref().ok_or(Error::NoIdentity)?;

        let report_id = hex::encode(random_bytes::<16>());
        let now = self.clock.now();
        let proof = self.backend.generate(
            ProofContext::Report,
            &[
                identity.seed().as_bytes(),
                report_id.as_bytes(),
                &now.to_be_bytes(),
            ],
        )?;
        self.db
            .insert_report(&report_id, room_id, reason, &proof, now)?;

        info!(room_id = %room_id, report_id = %report_id, "abuse report filed");
        Ok(ReportReceipt {
            report_id,
            created_at: now,
        })
    }
}
