//! Test harness: in-memory collaborators and a gateway bound to an
//! ephemeral port, driven over real HTTP.

use async_trait::async_trait;
use bytes::Bytes;
use chainfront_gateway::{
    AdmissionOracle, ClientTxProcessor, GatewayConfig, GatewayService, KeyId, OracleError,
    PauseState, SystemTimeSource, TxHash, TxRecord,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use secp256k1::{Message, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Processor double: hashes payloads like the real one and keeps the
/// transaction-record table the status path reads.
#[derive(Default)]
pub struct MockProcessor {
    pub records: DashMap<TxHash, TxRecord>,
    pub forwarded: Mutex<Vec<(Bytes, KeyId)>>,
    pub fail_with: Mutex<Option<String>>,
    /// When set, every forwarded payload immediately gets an included record
    pub auto_include: AtomicBool,
}

impl MockProcessor {
    pub fn new() -> Arc<Self> {
        let processor = Self::default();
        processor.auto_include.store(true, Ordering::Relaxed);
        Arc::new(processor)
    }

    /// Script an outcome for a hash
    pub fn set_record(&self, hash: TxHash, record: TxRecord) {
        self.records.insert(hash, record);
    }
}

#[async_trait]
impl ClientTxProcessor for MockProcessor {
    async fn process_client_transaction(
        &self,
        payload: Bytes,
        key_id: KeyId,
    ) -> Result<TxHash, String> {
        if let Some(msg) = self.fail_with.lock().clone() {
            return Err(msg);
        }
        let hash = TxHash::compute(&payload);
        self.forwarded.lock().push((payload, key_id));
        if self.auto_include.load(Ordering::Relaxed) {
            self.records.insert(
                hash,
                TxRecord {
                    block_id: Some("1".into()),
                    result: Some("ok".into()),
                    errmsg: None,
                    penalty: false,
                },
            );
        }
        Ok(hash)
    }

    async fn process_client_tx_batch(
        &self,
        payloads: Vec<Bytes>,
        key_id: KeyId,
    ) -> Result<Vec<TxHash>, String> {
        let mut hashes = Vec::with_capacity(payloads.len());
        for payload in payloads {
            hashes.push(self.process_client_transaction(payload, key_id).await?);
        }
        Ok(hashes)
    }

    async fn transaction_record(&self, hash: TxHash) -> Result<Option<TxRecord>, String> {
        Ok(self.records.get(&hash).map(|r| r.clone()))
    }
}

/// Ban/pause oracle double with settable state
#[derive(Default)]
pub struct MockOracle {
    pub pause: Mutex<PauseState>,
    pub bans: DashMap<KeyId, DateTime<Utc>>,
    pub strikes: DashMap<KeyId, u32>,
}

impl MockOracle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ban(&self, key_id: KeyId, until: DateTime<Utc>) {
        self.bans.insert(key_id, until);
    }

    pub fn set_pause(&self, state: PauseState) {
        *self.pause.lock() = state;
    }

    pub fn strikes_for(&self, key_id: KeyId) -> u32 {
        self.strikes.get(&key_id).map(|s| *s).unwrap_or(0)
    }
}

impl AdmissionOracle for MockOracle {
    fn node_pause_state(&self) -> PauseState {
        *self.pause.lock()
    }

    fn is_key_banned(&self, key_id: KeyId) -> Option<DateTime<Utc>> {
        self.bans.get(&key_id).map(|until| *until)
    }

    fn record_bad_transaction(&self, key_id: KeyId) -> Result<(), OracleError> {
        *self.strikes.entry(key_id).or_insert(0) += 1;
        Ok(())
    }
}

/// A gateway serving on an ephemeral port with its collaborators exposed
pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub processor: Arc<MockProcessor>,
    pub oracle: Arc<MockOracle>,
}

impl TestGateway {
    /// Spawn with defaults tuned for tests (fast polling, small ceiling)
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: GatewayConfig) -> Self {
        init_tracing();
        let processor = MockProcessor::new();
        let oracle = MockOracle::new();

        let service = GatewayService::new(
            config,
            Arc::clone(&processor) as Arc<dyn ClientTxProcessor>,
            Arc::clone(&oracle) as Arc<dyn AdmissionOracle>,
            Arc::new(SystemTimeSource),
        )
        .expect("gateway construction");

        let router = service.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            processor,
            oracle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Issue an anonymous token, log in with `key`, and return the session
    /// token plus the key id the gateway assigned.
    pub async fn login(&self, key: &TestKey) -> (String, KeyId) {
        let uid_resp: serde_json::Value = self
            .client
            .get(self.url("/api/v2/getuid"))
            .send()
            .await
            .expect("getuid")
            .json()
            .await
            .expect("getuid body");
        let uid = uid_resp["uid"].as_str().expect("uid").to_string();
        let anon_token = uid_resp["token"].as_str().expect("token").to_string();

        let signature = key.sign_login(1, &uid);
        let login_resp: serde_json::Value = self
            .client
            .post(self.url("/api/v2/login"))
            .bearer_auth(&anon_token)
            .json(&serde_json::json!({
                "pubkey": key.pubkey_hex(),
                "signature": signature,
            }))
            .send()
            .await
            .expect("login")
            .json()
            .await
            .expect("login body");

        let token = login_resp["token"].as_str().expect("session token").to_string();
        let key_id = login_resp["key_id"]
            .as_str()
            .expect("key_id")
            .parse()
            .expect("numeric key id");
        (token, key_id)
    }
}

/// Install a subscriber once so `RUST_LOG=debug` works under `cargo test`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config tuned for tests: sub-second polling, 1 MB aggregate ceiling
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.status.poll_interval = Duration::from_millis(20);
    config.status.send_wait_attempts = 5;
    config.limits.max_tx_size = 1_000_000;
    config
}

/// A client keypair for the login handshake
pub struct TestKey {
    secret: SecretKey,
    secp: Secp256k1<secp256k1::All>,
}

impl TestKey {
    pub fn new(seed: u8) -> Self {
        let secret = SecretKey::from_slice(&[seed; 32]).expect("secret key");
        Self {
            secret,
            secp: Secp256k1::new(),
        }
    }

    pub fn pubkey_hex(&self) -> String {
        hex::encode(self.secret.public_key(&self.secp).serialize())
    }

    /// Compact signature over `"LOGIN" + network_id + uid`, hex-encoded
    pub fn sign_login(&self, network_id: i64, uid: &str) -> String {
        let message = format!("LOGIN{}{}", network_id, uid);
        let digest = Sha256::digest(message.as_bytes());
        let msg = Message::from_digest_slice(&digest).expect("digest");
        hex::encode(self.secp.sign_ecdsa(&msg, &self.secret).serialize_compact())
    }
}

/// Relayed envelope: embedded key id ahead of the opaque signed body
pub fn relay_envelope(key_id: KeyId, body: &[u8]) -> Vec<u8> {
    let mut envelope = key_id.to_le_bytes().to_vec();
    envelope.extend_from_slice(body);
    envelope
}
