//! Multipart submission: admission policy, correlation, relayed envelopes.

#[cfg(test)]
mod tests {
    use crate::harness::{relay_envelope, TestGateway, TestKey};
    use chainfront_gateway::{PauseState, TxHash, TxRecord};
    use chrono::{Duration, Utc};
    use reqwest::multipart::{Form, Part};
    use reqwest::StatusCode;
    use std::sync::atomic::Ordering;

    fn form(fields: Vec<(&str, Vec<u8>)>) -> Form {
        let mut form = Form::new();
        for (name, body) in fields {
            form = form.part(name.to_string(), Part::bytes(body));
        }
        form
    }

    #[tokio::test]
    async fn test_send_tx_correlates_hashes() {
        let gw = TestGateway::spawn().await;
        let (token, key_id) = gw.login(&TestKey::new(21)).await;

        let resp = gw
            .client
            .post(gw.url("/api/v2/sendTx"))
            .bearer_auth(&token)
            .multipart(form(vec![
                ("tx1", b"first-payload".to_vec()),
                ("tx2", b"second-payload".to_vec()),
            ]))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(
            body["hashes"]["tx1"],
            TxHash::compute(b"first-payload").to_string()
        );
        assert_eq!(
            body["hashes"]["tx2"],
            TxHash::compute(b"second-payload").to_string()
        );

        let forwarded = gw.processor.forwarded.lock();
        assert_eq!(forwarded.len(), 2);
        assert!(forwarded.iter().all(|(_, k)| *k == key_id));
    }

    #[tokio::test]
    async fn test_send_tx_requires_identity() {
        let gw = TestGateway::spawn().await;

        let resp = gw
            .client
            .post(gw.url("/api/v2/sendTx"))
            .multipart(form(vec![("tx1", b"payload".to_vec())]))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "E_UNAUTHORIZED");
        assert!(gw.processor.forwarded.lock().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected_in_full() {
        let gw = TestGateway::spawn().await;
        let (token, key_id) = gw.login(&TestKey::new(22)).await;

        // Each field is under the 1,000,000-byte ceiling; the aggregate
        // (1,000,106 bytes) is not. Splitting must not help.
        let resp = gw
            .client
            .post(gw.url("/api/v2/sendTx"))
            .bearer_auth(&token)
            .multipart(form(vec![
                ("a", vec![0u8; 600_000]),
                ("b", vec![0u8; 400_106]),
            ]))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "E_LIMITTXSIZE");
        assert_eq!(body["params"]["size"], 1_000_106);

        // No partial admission, and the key took a strike
        assert!(gw.processor.forwarded.lock().is_empty());
        assert_eq!(gw.oracle.strikes_for(key_id), 1);
    }

    #[tokio::test]
    async fn test_banned_key_rejected() {
        let gw = TestGateway::spawn().await;
        let (token, key_id) = gw.login(&TestKey::new(23)).await;
        gw.oracle.ban(key_id, Utc::now() + Duration::hours(2));

        let resp = gw
            .client
            .post(gw.url("/api/v2/sendTx"))
            .bearer_auth(&token)
            .multipart(form(vec![("tx", b"payload".to_vec())]))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "E_BANNED");
        assert!(body["params"]["until"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_paused_node_rejects_before_everything() {
        let gw = TestGateway::spawn().await;
        let (token, key_id) = gw.login(&TestKey::new(24)).await;
        gw.oracle.set_pause(PauseState::Upgrading);
        // Banned too, but the pause check runs first
        gw.oracle.ban(key_id, Utc::now() + Duration::hours(2));

        let resp = gw
            .client
            .post(gw.url("/api/v2/sendTx"))
            .bearer_auth(&token)
            .multipart(form(vec![("tx", b"payload".to_vec())]))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "E_NODEPAUSED");
        assert_eq!(body["params"]["state"], "upgrading");
    }

    #[tokio::test]
    async fn test_nowait_returns_with_unresolved_hashes() {
        let gw = TestGateway::spawn().await;
        let (token, _) = gw.login(&TestKey::new(25)).await;
        // Nothing will resolve these hashes
        gw.processor.auto_include.store(false, Ordering::Relaxed);

        let mut form = form(vec![("tx", b"pending-payload".to_vec())]);
        form = form.text("nowait", "1");

        let resp = gw
            .client
            .post(gw.url("/api/v2/sendTx"))
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(
            body["hashes"]["tx"],
            TxHash::compute(b"pending-payload").to_string()
        );
    }

    #[tokio::test]
    async fn test_penalty_surfaces_when_waiting() {
        let gw = TestGateway::spawn().await;
        let (token, _) = gw.login(&TestKey::new(26)).await;
        gw.processor.auto_include.store(false, Ordering::Relaxed);

        // The payload's hash is known up front; script its outcome.
        let hash = TxHash::compute(b"doomed-payload");
        gw.processor.set_record(
            hash,
            TxRecord {
                block_id: Some("40".into()),
                result: None,
                errmsg: Some("insufficient balance".into()),
                penalty: true,
            },
        );

        let resp = gw
            .client
            .post(gw.url("/api/v2/sendTx"))
            .bearer_auth(&token)
            .multipart(form(vec![("tx", b"doomed-payload".to_vec())]))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "E_PROCESSOR");
        assert_eq!(body["msg"], "insufficient balance");
    }

    #[tokio::test]
    async fn test_send_signed_tx_uses_embedded_key() {
        let gw = TestGateway::spawn().await;

        let envelope = relay_envelope(9001, b"relayed-signed-body");
        let resp = gw
            .client
            .post(gw.url("/api/v2/sendSignedTx"))
            .json(&serde_json::json!({
                "data": hex::encode(&envelope),
                "nowait": true,
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        let expected = TxHash::compute(&envelope).to_string();
        assert_eq!(body["hashes"][&expected], expected);

        let forwarded = gw.processor.forwarded.lock();
        assert_eq!(forwarded[0].1, 9001);
    }

    #[tokio::test]
    async fn test_send_signed_tx_banned_embedded_key() {
        let gw = TestGateway::spawn().await;
        gw.oracle.ban(9002, Utc::now() + Duration::hours(1));

        let envelope = relay_envelope(9002, b"relayed-signed-body");
        let resp = gw
            .client
            .post(gw.url("/api/v2/sendSignedTx"))
            .json(&serde_json::json!({ "data": hex::encode(&envelope) }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "E_BANNED");
    }

    #[tokio::test]
    async fn test_processor_error_passes_through() {
        let gw = TestGateway::spawn().await;
        let (token, _) = gw.login(&TestKey::new(27)).await;
        *gw.processor.fail_with.lock() = Some("nonce already used".into());

        let resp = gw
            .client
            .post(gw.url("/api/v2/sendTx"))
            .bearer_auth(&token)
            .multipart(form(vec![("tx", b"payload".to_vec())]))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "E_PROCESSOR");
        assert_eq!(body["msg"], "nonce already used");
    }
}
