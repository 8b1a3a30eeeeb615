//! End-to-end: the real server on an ephemeral port driven by the HTTP client

use nexus_core::{Role, UserId};
use nexus_presence_client::{
    ClientConfig, ClientStatus, HttpTransport, PresenceClient, SessionIdentity, SessionPhase,
};
use presence_service::auth::{InMemoryUserDirectory, UserRecord};
use presence_service::{PresenceConfig, PresenceService};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

fn record(id: &str, role: Role) -> UserRecord {
    UserRecord {
        id: UserId::new(id),
        name: format!("User {}", id),
        email: format!("{}@nexus.test", id),
        role,
    }
}

async fn spawn_server(users: &[UserRecord]) -> (Arc<PresenceService>, String) {
    let directory = InMemoryUserDirectory::new();
    for user in users {
        directory.insert(user.clone());
    }
    let service = Arc::new(PresenceService::with_directory(
        PresenceConfig::default(),
        Some(Arc::new(directory)),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = service.clone();
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    (service, format!("http://{}", addr))
}

fn fast_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        heartbeat_interval: Duration::from_millis(200),
        health_check_interval: Duration::from_millis(150),
        refresh_interval: Duration::from_millis(250),
        soft_threshold: Duration::from_secs(5),
        hard_threshold: Duration::from_secs(10),
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

fn client_for(
    service: &PresenceService,
    base_url: &str,
    user: &UserRecord,
) -> PresenceClient<HttpTransport> {
    let config = fast_config(base_url);
    let token = service.tokens().issue(user).unwrap();
    let transport = HttpTransport::new(&config.base_url, config.request_timeout)
        .unwrap()
        .with_token(token);
    PresenceClient::new(Arc::new(transport), config)
}

async fn wait_until(
    updates: &mut watch::Receiver<ClientStatus>,
    predicate: impl FnMut(&ClientStatus) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(predicate))
        .await
        .expect("status condition not reached in time")
        .expect("status channel closed");
}

#[tokio::test]
async fn test_session_registers_refreshes_and_leaves() {
    let admin = record("a1", Role::Admin);
    let customer = record("c1", Role::Customer);
    let (service, base_url) = spawn_server(&[admin.clone(), customer.clone()]).await;

    let admin_client = client_for(&service, &base_url, &admin);
    let customer_client = client_for(&service, &base_url, &customer);
    let mut admin_updates = admin_client.subscribe();
    let mut customer_updates = customer_client.subscribe();

    assert!(admin_client.start(SessionIdentity::new("a1", Role::Admin)).await);
    assert!(customer_client.start(SessionIdentity::new("c1", Role::Customer)).await);

    wait_until(&mut admin_updates, |status| status.roster.len() == 2).await;
    wait_until(&mut customer_updates, |status| {
        status.stats.as_ref().map(|stats| stats.total) == Some(2)
    })
    .await;

    assert_eq!(service.store().len(), 2);
    let customer_status = customer_client.status();
    assert_eq!(customer_status.phase, SessionPhase::Active);
    assert!(customer_status.roster.is_empty());

    customer_client.stop().await;
    assert!(service.store().get(&UserId::new("c1")).is_none());
    assert!(service.store().get(&UserId::new("a1")).is_some());

    admin_client.stop().await;
    assert!(service.store().is_empty());
}

#[tokio::test]
async fn test_rejected_token_ends_session() {
    let known = record("a1", Role::Admin);
    let (service, base_url) = spawn_server(&[known]).await;

    let config = fast_config(&base_url);
    let transport = HttpTransport::new(&config.base_url, config.request_timeout)
        .unwrap()
        .with_token("not-a-valid-token");
    let client = PresenceClient::new(Arc::new(transport), config);
    let mut updates = client.subscribe();

    client.start(SessionIdentity::new("a1", Role::Admin)).await;
    wait_until(&mut updates, |status| status.phase == SessionPhase::Offline).await;

    assert!(service.store().is_empty());
    assert_eq!(client.status().retry_count, 0);
}
