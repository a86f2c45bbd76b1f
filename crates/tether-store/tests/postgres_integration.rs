use std::time::Duration;

use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tether_store::{
    BackupRecord, BackupStore, CollectionItem, MetadataValue, PgBackupStore, PgConnectSettings,
    TableName, decode_record, encode_item,
};

const PG_PORT: ContainerPort = ContainerPort::Tcp(5432);

fn postgres_image() -> testcontainers::ContainerRequest<GenericImage> {
    GenericImage::new("postgres", "16-alpine")
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_exposed_port(PG_PORT)
        .with_env_var("POSTGRES_USER", "tether")
        .with_env_var("POSTGRES_PASSWORD", "tether")
        .with_env_var("POSTGRES_DB", "backups")
}

async fn setup() -> (PgBackupStore, ContainerAsync<GenericImage>) {
    let container = postgres_image().start().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let settings = PgConnectSettings {
        host: "127.0.0.1".into(),
        port,
        user: "tether".into(),
        password: Some("tether".into()),
        database: "backups".into(),
        max_connections: 2,
        acquire_timeout: Duration::from_secs(10),
    };

    // The image restarts once after init; retry until the final server is up.
    let mut last_err = None;
    for _ in 0..20 {
        match PgBackupStore::connect(&settings).await {
            Ok(store) => return (store, container),
            Err(e) => {
                last_err = Some(e);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }
    panic!("postgres never became ready: {last_err:?}");
}

fn table() -> TableName {
    TableName::parse("chroma_data").unwrap()
}

#[tokio::test]
#[ignore = "requires docker"]
async fn upsert_and_fetch_json_records() {
    let (store, _container) = setup().await;

    let item = CollectionItem::new("a", vec![0.25, -1.5])
        .with_metadata([("source".to_owned(), MetadataValue::from("wiki"))].into())
        .with_document("hello");
    let records = vec![
        encode_item(&CollectionItem::new("b", vec![1.0, 2.0])).unwrap(),
        encode_item(&item).unwrap(),
    ];
    assert_eq!(store.upsert_records(&table(), &records).await.unwrap(), 2);

    let fetched = store.fetch_records(&table()).await.unwrap();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0].id, "a");
    assert_eq!(decode_record(&fetched[0]).unwrap(), item);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn upsert_overwrites_and_counts() {
    let (store, _container) = setup().await;

    let rec = |emb: &str| BackupRecord {
        id: "x".into(),
        embedding: Some(emb.into()),
        metadata: None,
        document: None,
    };
    store.upsert_records(&table(), &[rec("[1.0]")]).await.unwrap();
    store.upsert_records(&table(), &[rec("[2.0]")]).await.unwrap();

    assert_eq!(store.count(&table()).await.unwrap(), 1);
    let fetched = store.fetch_records(&table()).await.unwrap();
    assert_eq!(decode_record(&fetched[0]).unwrap().embedding, vec![2.0]);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn ensure_table_idempotent_and_ping() {
    let (store, _container) = setup().await;
    store.ping().await.unwrap();
    store.ensure_table(&table()).await.unwrap();
    store.ensure_table(&table()).await.unwrap();
    assert!(store.fetch_records(&table()).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn integral_float_metadata_keeps_its_type() {
    let (store, _container) = setup().await;

    let item = CollectionItem::new("t", vec![0.5]).with_metadata(
        [
            ("ts".to_owned(), MetadataValue::Float(1e16)),
            ("ratio".to_owned(), MetadataValue::Float(2.0)),
            ("page".to_owned(), MetadataValue::Int(7)),
        ]
        .into(),
    );
    store
        .upsert_records(&table(), &[encode_item(&item).unwrap()])
        .await
        .unwrap();

    let fetched = store.fetch_records(&table()).await.unwrap();
    let restored = decode_record(&fetched[0]).unwrap();
    let meta = restored.metadata.as_ref().unwrap();
    assert_eq!(meta["ts"], MetadataValue::Float(1e16));
    assert_eq!(meta["ratio"], MetadataValue::Float(2.0));
    assert_eq!(meta["page"], MetadataValue::Int(7));
    assert_eq!(restored, item);
}
