//! Whole-file JSON persistence for clients, service orders and credentials.
//!
//! Every save rewrites the complete document. There is no partial update and
//! no cross-process locking; the last writer wins. Within this process all
//! writes go through one async mutex so the read-modify-write helpers below
//! never interleave.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
    auth,
    models::{Client, ClientsDocument, Credentials, ServiceOrder, ServiceOrdersDocument},
};

pub const DATA_FILE: &str = "data.json";
pub const AUTH_FILE: &str = "auth.json";
pub const ORDERS_FILE: &str = "service-orders.json";

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin123";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct Store {
    data_file: PathBuf,
    auth_file: PathBuf,
    orders_file: PathBuf,
    write_lock: Mutex<()>,
}

impl Store {
    /// Open the store rooted at `dir`, creating any missing document. A fresh
    /// `auth.json` gets the default admin account.
    pub async fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let store = Self {
            data_file: dir.join(DATA_FILE),
            auth_file: dir.join(AUTH_FILE),
            orders_file: dir.join(ORDERS_FILE),
            write_lock: Mutex::new(()),
        };

        if !store.data_file.exists() {
            write_json(&store.data_file, &ClientsDocument::default()).await?;
            tracing::info!("Created {}", store.data_file.display());
        }

        if !store.orders_file.exists() {
            write_json(&store.orders_file, &ServiceOrdersDocument::default()).await?;
            tracing::info!("Created {}", store.orders_file.display());
        }

        if !store.auth_file.exists() {
            let credentials = Credentials {
                username: DEFAULT_USERNAME.to_owned(),
                password: auth::hash_password(DEFAULT_PASSWORD)?,
            };
            write_json(&store.auth_file, &credentials).await?;
            tracing::warn!(
                "Created default login {}/{}; change the password after the first login",
                DEFAULT_USERNAME,
                DEFAULT_PASSWORD
            );
        }

        Ok(store)
    }

    // ── Clients ────────────────────────────────────────────────────────────

    pub async fn load_clients(&self) -> Result<Vec<Client>, StoreError> {
        let doc: ClientsDocument = read_json(&self.data_file).await?;
        Ok(doc.clients)
    }

    /// Replace `data.json` with `clients`.
    pub async fn save_clients(&self, clients: Vec<Client>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_clients(clients).await
    }

    /// Load the clients, let `f` modify them, and write them back unless `f`
    /// fails.
    pub async fn update_clients<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Vec<Client>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut clients = self.load_clients().await?;
        let out = f(&mut clients)?;
        self.write_clients(clients).await?;
        Ok(out)
    }

    async fn write_clients(&self, clients: Vec<Client>) -> Result<(), StoreError> {
        let doc = ClientsDocument {
            clients,
            last_updated: Some(Utc::now()),
        };
        write_json(&self.data_file, &doc).await?;
        tracing::info!("Saved {} client(s) to {}", doc.clients.len(), DATA_FILE);
        Ok(())
    }

    // ── Service orders ─────────────────────────────────────────────────────

    pub async fn load_orders(&self) -> Result<ServiceOrdersDocument, StoreError> {
        read_json(&self.orders_file).await
    }

    pub async fn save_orders(&self, orders: Vec<ServiceOrder>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_orders(orders).await
    }

    pub async fn update_orders<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Vec<ServiceOrder>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut orders = self.load_orders().await?.service_orders;
        let out = f(&mut orders)?;
        self.write_orders(orders).await?;
        Ok(out)
    }

    async fn write_orders(&self, orders: Vec<ServiceOrder>) -> Result<(), StoreError> {
        let doc = ServiceOrdersDocument {
            service_orders: orders,
            last_updated: Some(Utc::now()),
        };
        write_json(&self.orders_file, &doc).await?;
        tracing::info!("Saved {} service order(s)", doc.service_orders.len());
        Ok(())
    }

    // ── Credentials ────────────────────────────────────────────────────────

    pub async fn load_credentials(&self) -> Result<Credentials, StoreError> {
        read_json(&self.auth_file).await
    }

    pub async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.auth_file, credentials).await
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| StoreError::Read {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
        path: path.to_owned(),
        source,
    })
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let body = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, body)
        .await
        .map_err(|source| StoreError::Write {
            path: path.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{client, paid};

    #[tokio::test]
    async fn open_bootstraps_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();

        assert!(store.load_clients().await.unwrap().is_empty());
        assert!(store.load_orders().await.unwrap().service_orders.is_empty());

        let creds = store.load_credentials().await.unwrap();
        assert_eq!(creds.username, "admin");
        assert_ne!(creds.password, "admin123");
        assert!(auth::verify_password("admin123", &creds.password).unwrap());
    }

    #[tokio::test]
    async fn open_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        store.save_clients(vec![client("c1", "Acme")]).await.unwrap();

        let reopened = Store::open(dir.path()).await.unwrap();
        let clients = reopened.load_clients().await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].name, "Acme");
    }

    #[tokio::test]
    async fn save_replaces_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        store
            .save_clients(vec![client("a", "A"), client("b", "B")])
            .await
            .unwrap();
        store.save_clients(vec![client("c", "C")]).await.unwrap();

        let ids: Vec<_> = store
            .load_clients()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, ["c"]);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(DATA_FILE)).unwrap()).unwrap();
        assert!(raw["lastUpdated"].is_string());
    }

    #[tokio::test]
    async fn failed_update_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        store.save_clients(vec![client("a", "A")]).await.unwrap();

        let result: Result<(), StoreError> = store
            .update_clients(|clients| {
                clients.clear();
                Err(StoreError::Encode(serde_json::from_str::<()>("x").unwrap_err()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.load_clients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_persists_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        store.save_clients(vec![client("a", "A")]).await.unwrap();

        let count: Result<usize, StoreError> = store
            .update_clients(|clients| {
                clients[0].insert_paid(paid("p", "2025-01", 1.0, 1.0, 0.0, 1.0));
                Ok(clients[0].monthly_data.len())
            })
            .await;
        assert_eq!(count.unwrap(), 1);
        assert_eq!(store.load_clients().await.unwrap()[0].monthly_data.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join(ORDERS_FILE), "{not json").unwrap();
        assert!(matches!(
            store.load_orders().await,
            Err(StoreError::Parse { .. })
        ));
    }
}
