use log::warn;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};

use crate::models::User;

pub struct MongoDB {
    pub client: Client,
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> Self {
        let client_options = ClientOptions::parse(uri)
            .await
            .expect("Failed to parse MongoDB connection string");
        let client = Client::with_options(client_options).expect("Failed to initialize client");
        let db = client.database(db_name);

        let mongodb = MongoDB { client, db };
        mongodb.ensure_indexes().await;
        mongodb
    }

    /// Unique index backing the account email invariant. Signup also checks
    /// for an existing email before inserting, so a failure here only widens
    /// the window for duplicates instead of breaking startup.
    async fn ensure_indexes(&self) {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        if let Err(err) = self.db.collection::<User>("users").create_index(index).await {
            warn!("Could not create unique email index: {}", err);
        }
    }
}
