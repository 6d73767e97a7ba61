//! Scripted driver for the chat TUI
//!
//! Each operation types a slash command into the remote session and, where
//! the client prints a status line, polls snapshots until that line shows up
//! or the bound for that step runs out.

mod session;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::transport::{Key, SessionId, Transport};

pub use session::{PublicKey, Session};

/// Slash commands understood by the chat TUI
pub mod commands {
    pub const CONNECT: &str = "/connect";
    pub const KEYPACKAGE: &str = "/keypackage";
    pub const PUBLIC_KEY: &str = "/pk";
    pub const INVITES: &str = "/invites";
    pub const FETCH: &str = "/fetch";
    pub const ADD_CONTACT: &str = "/add";
    pub const CREATE_GROUP: &str = "/create";
}

/// Status lines the driver waits for
pub mod markers {
    pub const CONNECTED: &str = "Connected";
    pub const PUBLISHED: &str = "Published";
    /// Matched case-insensitively
    pub const PENDING_INVITE: &str = "pending invite";
    pub const JOINED: &str = "Successfully joined";
    pub const CONTACT_ADDED: &str = "Contact added";

    pub fn group_created(name: &str) -> String {
        format!("Group '{}' created successfully", name)
    }
}

/// Bounds and settle delays for individual driver operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverTiming {
    /// Bound for `Connected` after `/connect`
    pub connect_timeout_secs: u64,
    /// Bound for `Published` after `/keypackage`
    pub publish_timeout_secs: u64,
    /// Bound for `Successfully joined` after accepting
    pub accept_timeout_secs: u64,
    /// Bound for `Contact added` after `/add`
    pub contact_timeout_secs: u64,
    /// Bound for the group confirmation after `/create`
    pub create_group_timeout_secs: u64,
    /// Interval between snapshots while waiting for a status line
    pub wait_poll_ms: u64,
    /// Settle time after `/pk` and `/invites` before the snapshot
    pub query_settle_ms: u64,
    /// Settle time after opening a list before selecting from it
    pub navigate_settle_ms: u64,
    /// Settle time after submitting a chat message
    pub message_settle_ms: u64,
    /// Settle time after `/fetch`
    pub refresh_settle_ms: u64,
}

impl Default for DriverTiming {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            publish_timeout_secs: 10,
            accept_timeout_secs: 10,
            contact_timeout_secs: 10,
            create_group_timeout_secs: 15,
            wait_poll_ms: 500,
            query_settle_ms: 1000,
            navigate_settle_ms: 1000,
            message_settle_ms: 1000,
            refresh_settle_ms: 2000,
        }
    }
}

/// Drives one session of the chat TUI through a [`Transport`]
pub struct Driver {
    transport: Arc<dyn Transport>,
    session: Session,
    timing: DriverTiming,
}

impl Driver {
    pub fn new(transport: Arc<dyn Transport>, session: SessionId, timing: DriverTiming) -> Self {
        Self {
            transport,
            session: Session::new(session),
            timing,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn timing(&self) -> &DriverTiming {
        &self.timing
    }

    /// Type a line and submit it
    async fn submit(&self, line: &str) -> Result<()> {
        self.send_keys(&[Key::text(line), Key::Enter]).await
    }

    /// Deliver raw keys to the session
    pub async fn send_keys(&self, keys: &[Key]) -> Result<()> {
        tracing::debug!(session = %self.session.id(), ?keys, "Sending keys");
        self.transport.send_keys(self.session.id(), keys).await
    }

    /// Take a snapshot of the session's screen
    pub async fn snapshot(&self) -> Result<String> {
        self.transport.snapshot(self.session.id()).await
    }

    async fn settle(&self, ms: u64) {
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Poll snapshots until `text` appears (case-sensitive)
    ///
    /// At least one snapshot is taken. Fails with [`Error::WaitTimeout`] when
    /// the bound expires first; transport faults abort the wait immediately.
    pub async fn wait_for_text(&self, text: &str, timeout: Duration) -> Result<()> {
        let interval = Duration::from_millis(self.timing.wait_poll_ms);
        tracing::debug!(text, timeout_ms = timeout.as_millis() as u64, "Waiting for text");

        let poll = async {
            loop {
                if self.snapshot().await?.contains(text) {
                    return Ok::<(), Error>(());
                }
                tokio::time::sleep(interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => {
                if result.is_ok() {
                    tracing::debug!(text, "Found expected text");
                }
                result
            }
            Err(_) => {
                tracing::warn!(text, "Timed out waiting for text");
                Err(Error::wait_timeout(text, timeout.as_secs()))
            }
        }
    }

    /// Connect the client to its relay
    pub async fn connect(&self, relay: Option<&str>) -> Result<()> {
        let line = match relay {
            Some(relay) => format!("{} {}", commands::CONNECT, relay),
            None => commands::CONNECT.to_string(),
        };
        tracing::info!(relay = relay.unwrap_or("default"), "Connecting to relay");

        self.submit(&line).await?;
        self.wait_for_text(
            markers::CONNECTED,
            Duration::from_secs(self.timing.connect_timeout_secs),
        )
        .await
    }

    /// Publish the client's key package
    pub async fn publish_key_material(&self) -> Result<()> {
        tracing::info!("Publishing key package");
        self.submit(commands::KEYPACKAGE).await?;
        self.wait_for_text(
            markers::PUBLISHED,
            Duration::from_secs(self.timing.publish_timeout_secs),
        )
        .await
    }

    /// Ask the client for its public key and remember it on the session
    pub async fn get_public_key(&mut self) -> Result<PublicKey> {
        self.submit(commands::PUBLIC_KEY).await?;
        self.settle(self.timing.query_settle_ms).await;

        let snapshot = self.snapshot().await?;
        let key = PublicKey::extract(&snapshot).ok_or(Error::ExtractionFailed)?;

        tracing::info!(public_key = %key, "Discovered public key");
        self.session.set_public_key(key.clone());
        Ok(key)
    }

    /// Single-shot check whether the client lists a pending invite
    pub async fn has_pending_invite(&self) -> Result<bool> {
        self.submit(commands::INVITES).await?;
        self.settle(self.timing.query_settle_ms).await;

        let snapshot = self.snapshot().await?;
        let pending = snapshot
            .to_lowercase()
            .contains(markers::PENDING_INVITE);
        tracing::debug!(pending, "Checked invites");
        Ok(pending)
    }

    /// Accept the first pending invite and wait until the group is joined
    pub async fn accept_invite(&self) -> Result<()> {
        tracing::info!("Accepting invite");
        self.submit(commands::INVITES).await?;
        self.settle(self.timing.navigate_settle_ms).await;

        self.send_keys(&[Key::Enter]).await?;
        self.wait_for_text(
            markers::JOINED,
            Duration::from_secs(self.timing.accept_timeout_secs),
        )
        .await
    }

    /// Send a chat message to the current group
    ///
    /// Fire-and-forget: delivery is not confirmed.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        tracing::info!(message = text, "Sending message");
        self.submit(text).await?;
        self.settle(self.timing.message_settle_ms).await;
        Ok(())
    }

    /// Ask the client to fetch new messages
    pub async fn refresh_messages(&self) -> Result<()> {
        tracing::debug!("Fetching messages");
        self.submit(commands::FETCH).await?;
        self.settle(self.timing.refresh_settle_ms).await;
        Ok(())
    }

    /// Single-shot check whether `expected` is on screen (case-sensitive)
    pub async fn message_was_received(&self, expected: &str) -> Result<bool> {
        Ok(self.snapshot().await?.contains(expected))
    }

    /// Add a contact by public key
    pub async fn add_contact(&self, public_key: &PublicKey) -> Result<()> {
        tracing::info!(contact = %public_key, "Adding contact");
        self.submit(&format!("{} {}", commands::ADD_CONTACT, public_key))
            .await?;
        self.wait_for_text(
            markers::CONTACT_ADDED,
            Duration::from_secs(self.timing.contact_timeout_secs),
        )
        .await
    }

    /// Create a group, selecting the highlighted contact as its member
    pub async fn create_group(&self, name: &str) -> Result<()> {
        tracing::info!(group = name, "Creating group");
        self.submit(&format!("{} {}", commands::CREATE_GROUP, name))
            .await?;
        self.settle(self.timing.navigate_settle_ms).await;

        self.send_keys(&[Key::Space, Key::Enter]).await?;
        self.wait_for_text(
            &markers::group_created(name),
            Duration::from_secs(self.timing.create_group_timeout_secs),
        )
        .await
    }

    /// Release the session through the transport
    pub async fn close(&self) -> Result<()> {
        tracing::debug!(session = %self.session.id(), "Closing session");
        self.transport.close(self.session.id()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockScript, MockTransport};
    use tokio::time::Instant;

    const KEY: &str = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";

    fn driver_with(script: MockScript) -> (Driver, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new(script));
        let driver = Driver::new(
            mock.clone(),
            SessionId::new("test"),
            DriverTiming::default(),
        );
        (driver, mock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_and_publish() {
        let (driver, mock) = driver_with(MockScript::default());
        driver.connect(None).await.unwrap();
        driver.publish_key_material().await.unwrap();
        assert_eq!(mock.submitted(), vec!["/connect", "/keypackage"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_relay_address() {
        let (driver, mock) = driver_with(MockScript::default());
        driver.connect(Some("ws://localhost:8080")).await.unwrap();
        assert_eq!(mock.submitted(), vec!["/connect ws://localhost:8080"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_text_times_out() {
        let (driver, mock) = driver_with(MockScript::default());
        let start = Instant::now();

        let err = driver
            .wait_for_text("never shown", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::WaitTimeout { ref text, secs: 5 } if text == "never shown"));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        // One snapshot at t=0 then one per 500ms poll up to the deadline
        assert!((10..=11).contains(&mock.snapshot_count()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_public_key_stores_key() {
        let (mut driver, _mock) = driver_with(MockScript::default().with_public_key(KEY));
        let key = driver.get_public_key().await.unwrap();
        assert_eq!(key.as_str(), KEY);
        assert_eq!(driver.session().public_key(), Some(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_public_key_extraction_failure() {
        let (mut driver, _mock) =
            driver_with(MockScript::default().with_public_key("NOT-A-KEY"));
        let err = driver.get_public_key().await.unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed));
        assert!(driver.session().public_key().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_pending_invite_is_single_shot() {
        let (driver, mock) = driver_with(MockScript::default().with_invite_on_check(2));
        assert!(!driver.has_pending_invite().await.unwrap());
        assert!(driver.has_pending_invite().await.unwrap());
        assert_eq!(mock.invite_checks(), 2);
        assert_eq!(mock.snapshot_count(), 2);
    }

    /// Shows the same screen on every snapshot
    struct FixedScreen(&'static str);

    #[async_trait::async_trait]
    impl Transport for FixedScreen {
        async fn send_keys(&self, _session: &SessionId, _keys: &[Key]) -> Result<()> {
            Ok(())
        }

        async fn snapshot(&self, _session: &SessionId) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_invite_matches_any_casing() {
        for (screen, expected) in [
            ("1 PENDING INVITE", true),
            ("Pending Invite (press Enter)", true),
            ("1 pending invite", true),
            ("No invitations", false),
        ] {
            let driver = Driver::new(
                Arc::new(FixedScreen(screen)),
                SessionId::new("test"),
                DriverTiming::default(),
            );
            assert_eq!(driver.has_pending_invite().await.unwrap(), expected, "{screen}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_invite_joins_group() {
        let (driver, mock) = driver_with(MockScript::default());
        driver.accept_invite().await.unwrap();
        assert_eq!(mock.submitted(), vec!["/invites", ""]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_invite_without_invite_times_out() {
        let (driver, _mock) = driver_with(MockScript::default().never_invite());
        let err = driver.accept_invite().await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_and_receive_messages() {
        let (driver, mock) = driver_with(MockScript::default().with_reply_on_fetch(2));
        driver.send_message("Hello there").await.unwrap();
        assert!(!driver.message_was_received("Hello from dialog_cli").await.unwrap());

        driver.refresh_messages().await.unwrap();
        assert!(!driver.message_was_received("Hello from dialog_cli").await.unwrap());

        driver.refresh_messages().await.unwrap();
        assert!(driver.message_was_received("Hello from dialog_cli").await.unwrap());
        assert_eq!(mock.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_match_is_case_sensitive() {
        let (driver, _mock) = driver_with(MockScript::default());
        driver.refresh_messages().await.unwrap();
        assert!(!driver.message_was_received("hello from dialog_cli").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_contact_and_create_group() {
        let (driver, mock) = driver_with(MockScript::default());
        let member = PublicKey::parse(KEY).unwrap();

        driver.add_contact(&member).await.unwrap();
        driver.create_group("Lounge").await.unwrap();

        assert_eq!(
            mock.submitted(),
            vec![format!("/add {KEY}"), "/create Lounge".to_string(), String::new()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_fault_aborts_wait() {
        let (driver, _mock) = driver_with(MockScript::default().failing_on("/connect"));
        let err = driver.connect(None).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }
}
