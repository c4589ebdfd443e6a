use bson::doc;
use mongodb::{options::IndexOptions, Client, Database, IndexModel};

pub async fn init_db(uri: &str, name: &str) -> Result<Database, mongodb::error::Error> {
    let client = Client::with_uri_str(uri).await?;
    Ok(client.database(name))
}

/// Creates the indexes the services rely on for uniqueness and lookups.
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let unique = || IndexOptions::builder().unique(true).build();

    let users = db.collection::<bson::Document>("users");
    users
        .create_index(IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build())
        .await?;
    users
        .create_index(IndexModel::builder().keys(doc! { "username": 1 }).options(unique()).build())
        .await?;

    db.collection::<bson::Document>("roadmaps")
        .create_index(IndexModel::builder().keys(doc! { "mentor_id": 1, "mentee_id": 1 }).build())
        .await?;
    db.collection::<bson::Document>("meetings")
        .create_index(IndexModel::builder().keys(doc! { "mentor_id": 1, "mentee_id": 1 }).build())
        .await?;
    db.collection::<bson::Document>("messages")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "sender_id": 1, "receiver_id": 1, "timestamp": -1 })
                .build(),
        )
        .await?;
    db.collection::<bson::Document>("notifications")
        .create_index(IndexModel::builder().keys(doc! { "to_user_id": 1, "created_at": -1 }).build())
        .await?;

    Ok(())
}
