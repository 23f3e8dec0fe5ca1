//! The publisher over a file-backed SQLite store, reading the previous head
//! from that same store, the way `ipni-publisher advertise --head-from-store`
//! runs.
//!
//! Each batch opens the database afresh, so the chain has to survive the
//! store being closed between invocations.

use std::path::Path;
use std::sync::Arc;

use ipni_publisher::core::{Advertisement, ChainHead, Cid, Event, ANNOUNCE_CONTENT_TYPE, HEAD_KEY};
use ipni_publisher::store::{ObjectStore, ObjectStoreExt, SqliteStore};
use ipni_publisher::{
    http_client, BatchReport, IndexerClient, Publisher, PublisherConfig, PublisherIdentities,
    StoreHeadFetcher,
};
use ipni_publisher_testkit::{content_cid, TestFixture};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Write both peer identity documents where `config` looks for them.
async fn seed_identities(store: &SqliteStore, config: &PublisherConfig, fixture: &TestFixture) {
    for (key, identity) in [
        (&config.peer_id_key, &fixture.bitswap),
        (&config.http_peer_id_key, &fixture.http),
    ] {
        let doc = serde_json::to_vec(&identity.to_json().unwrap()).unwrap();
        store.put_json(&config.peer_id_bucket, key, doc).await.unwrap();
    }
}

/// One invocation: open the database, load identities, publish one batch.
async fn run_batch(db: &Path, server: &MockServer, event: &Event) -> BatchReport {
    let store = Arc::new(SqliteStore::open(db).unwrap());
    let config = PublisherConfig::local_mock(&server.uri(), &server.uri()).unwrap();
    let identities = PublisherIdentities::load(store.as_ref(), &config).await.unwrap();
    let head = Arc::new(StoreHeadFetcher::new(store.clone(), config.bucket.clone()));
    let indexer = IndexerClient::new(http_client(&config).unwrap(), config.announce_url());
    let publisher = Publisher::new(config, store, head, indexer, identities);
    publisher.process(event).await.unwrap()
}

async fn stored_ad(store: &SqliteStore, bucket: &str, cid: &Cid) -> Advertisement {
    let object = store.get(bucket, &cid.to_string()).await.unwrap();
    Advertisement::decode(&object.bytes).unwrap()
}

#[tokio::test]
async fn batches_chain_through_sqlite_head() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ipni-publisher.db");

    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/ingest/announce"))
        .and(header("content-type", ANNOUNCE_CONTENT_TYPE))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let fixture = TestFixture::new();
    let config = PublisherConfig::local_mock(&server.uri(), &server.uri()).unwrap();
    {
        let store = SqliteStore::open(&db).unwrap();
        seed_identities(&store, &config, &fixture).await;
        assert!(!store.contains(&config.bucket, HEAD_KEY).await.unwrap());
    }

    let first = run_batch(&db, &server, &fixture.content_event(&[1, 2])).await;
    let event = Event::from_bodies([content_cid(3).to_string(), "AnnounceHTTP".to_string()]);
    let second = run_batch(&db, &server, &event).await;

    assert_eq!(first.published.len(), 2);
    assert_eq!(second.published.len(), 2);
    assert!(first.announced && second.announced);

    let store = SqliteStore::open(&db).unwrap();
    let bucket = &config.bucket;

    // The second batch starts from the head the first batch left behind.
    let linked = stored_ad(&store, bucket, &second.published[0]).await;
    assert_eq!(linked.previous, first.head);
    assert!(!linked.is_extended());

    // The head record was overwritten with the newest advertisement.
    let head_object = store.get(bucket, HEAD_KEY).await.unwrap();
    let head = ChainHead::decode(&head_object.bytes).unwrap();
    head.verify().unwrap();
    assert_eq!(Some(head.head), second.head);
    assert_ne!(second.head, first.head);
    assert_eq!(&head.signer().unwrap(), fixture.bitswap.peer_id());

    // Walking back from the head visits all four advertisements.
    let mut walked = Vec::new();
    let mut cursor = Some(head.head);
    while let Some(cid) = cursor {
        let ad = stored_ad(&store, bucket, &cid).await;
        ad.verify().unwrap();
        walked.push(cid);
        cursor = ad.previous;
    }
    walked.reverse();
    let expected: Vec<Cid> = first
        .published
        .iter()
        .chain(second.published.iter())
        .copied()
        .collect();
    assert_eq!(walked, expected);
    assert!(stored_ad(&store, bucket, &expected[3]).await.is_extended());
}
