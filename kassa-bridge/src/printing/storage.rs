//! redb-based storage for the active printer endpoint

use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use thiserror::Error;
use tracing::info;

use super::types::PrinterEndpoint;

/// Printer settings table: key = setting name, value = string
const PRINTER_SETTINGS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("printer_settings");

const KEY_PRINTER_IP: &str = "printer_ip";
const KEY_PRINTER_PORT: &str = "printer_port";

#[derive(Debug, Error)]
pub enum SettingsStoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Corrupt setting {key}: {value}")]
    Corrupt { key: &'static str, value: String },
}

pub type SettingsStoreResult<T> = Result<T, SettingsStoreError>;

/// Persistence for the printer endpoint across restarts
pub trait EndpointStore: Send + Sync {
    fn load(&self) -> SettingsStoreResult<Option<PrinterEndpoint>>;

    fn save(&self, endpoint: &PrinterEndpoint) -> SettingsStoreResult<()>;
}

/// Endpoint store backed by a redb file
#[derive(Clone)]
pub struct RedbEndpointStore {
    db: Arc<Database>,
}

impl RedbEndpointStore {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> SettingsStoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open in-memory database (tests, throwaway runs)
    pub fn open_in_memory() -> SettingsStoreResult<Self> {
        let db =
            Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> SettingsStoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRINTER_SETTINGS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl EndpointStore for RedbEndpointStore {
    fn load(&self) -> SettingsStoreResult<Option<PrinterEndpoint>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRINTER_SETTINGS_TABLE)?;

        let ip = match table.get(KEY_PRINTER_IP)? {
            Some(guard) => guard.value().to_string(),
            None => return Ok(None),
        };
        let ip: Ipv4Addr = ip.parse().map_err(|_| SettingsStoreError::Corrupt {
            key: KEY_PRINTER_IP,
            value: ip.clone(),
        })?;

        let port = match table.get(KEY_PRINTER_PORT)? {
            Some(guard) => {
                let raw = guard.value();
                raw.parse::<u16>().map_err(|_| SettingsStoreError::Corrupt {
                    key: KEY_PRINTER_PORT,
                    value: raw.to_string(),
                })?
            }
            None => kassa_printer::DEFAULT_PORT,
        };

        Ok(Some(PrinterEndpoint::new(ip, port)))
    }

    fn save(&self, endpoint: &PrinterEndpoint) -> SettingsStoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PRINTER_SETTINGS_TABLE)?;
            table.insert(KEY_PRINTER_IP, endpoint.ip.to_string().as_str())?;
            table.insert(KEY_PRINTER_PORT, endpoint.port.to_string().as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Active printer endpoint with write-through persistence
///
/// Readers get a copy of the whole value; [`PrinterSettings::select`] replaces
/// it in one step.
pub struct PrinterSettings {
    store: Arc<dyn EndpointStore>,
    current: RwLock<Option<PrinterEndpoint>>,
}

impl PrinterSettings {
    /// Load the persisted endpoint from the store
    pub fn load(store: Arc<dyn EndpointStore>) -> SettingsStoreResult<Self> {
        let current = store.load()?;
        Ok(Self {
            store,
            current: RwLock::new(current),
        })
    }

    /// Settings over a fresh in-memory store
    pub fn in_memory(endpoint: Option<PrinterEndpoint>) -> SettingsStoreResult<Self> {
        let store = RedbEndpointStore::open_in_memory()?;
        if let Some(endpoint) = &endpoint {
            store.save(endpoint)?;
        }
        Self::load(Arc::new(store))
    }

    /// Snapshot of the active endpoint
    pub fn current(&self) -> Option<PrinterEndpoint> {
        *self.current.read()
    }

    /// Make `endpoint` the active printer and persist it
    pub fn select(&self, endpoint: PrinterEndpoint) -> SettingsStoreResult<()> {
        self.store.save(&endpoint)?;
        *self.current.write() = Some(endpoint);
        info!(printer = %endpoint, "Printer selected");
        Ok(())
    }

    /// Select `endpoint` only when nothing is configured yet
    ///
    /// Returns true if the endpoint was applied.
    pub fn seed(&self, endpoint: PrinterEndpoint) -> SettingsStoreResult<bool> {
        if self.current().is_some() {
            return Ok(false);
        }
        self.select(endpoint)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(last: u8, port: u16) -> PrinterEndpoint {
        PrinterEndpoint::new(Ipv4Addr::new(192, 168, 1, last), port)
    }

    #[test]
    fn test_empty_store_loads_none() {
        let store = RedbEndpointStore::open_in_memory().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let store = RedbEndpointStore::open_in_memory().unwrap();
        store.save(&endpoint(50, 9100)).unwrap();
        store.save(&endpoint(51, 9101)).unwrap();
        assert_eq!(store.load().unwrap(), Some(endpoint(51, 9101)));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.redb");
        {
            let store = RedbEndpointStore::open(&path).unwrap();
            store.save(&endpoint(77, 9100)).unwrap();
        }
        let store = RedbEndpointStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap(), Some(endpoint(77, 9100)));
    }

    #[test]
    fn test_corrupt_ip_is_reported() {
        let store = RedbEndpointStore::open_in_memory().unwrap();
        {
            let txn = store.db.begin_write().unwrap();
            {
                let mut table = txn.open_table(PRINTER_SETTINGS_TABLE).unwrap();
                table.insert(KEY_PRINTER_IP, "not-an-ip").unwrap();
            }
            txn.commit().unwrap();
        }
        assert!(matches!(
            store.load(),
            Err(SettingsStoreError::Corrupt { key: "printer_ip", .. })
        ));
    }

    #[test]
    fn test_settings_select_writes_through() {
        let store = Arc::new(RedbEndpointStore::open_in_memory().unwrap());
        let settings = PrinterSettings::load(store.clone()).unwrap();
        assert!(settings.current().is_none());

        settings.select(endpoint(50, 9100)).unwrap();
        assert_eq!(settings.current(), Some(endpoint(50, 9100)));
        assert_eq!(store.load().unwrap(), Some(endpoint(50, 9100)));
    }

    #[test]
    fn test_seed_only_applies_when_empty() {
        let settings = PrinterSettings::in_memory(None).unwrap();
        assert!(settings.seed(endpoint(10, 9100)).unwrap());
        assert!(!settings.seed(endpoint(11, 9100)).unwrap());
        assert_eq!(settings.current(), Some(endpoint(10, 9100)));
    }
}
