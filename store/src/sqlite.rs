use crate::{
    FishStore, PlayerStore, Result, StoreError, SyncQueueStore, TankStore,
};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tidepool_types::{
    Address, EntityType, Fish, Player, SyncQueueItem, SyncStatus, Tank, TxHash,
};
use tracing::debug;

/// rusqlite-backed implementation of all store traits.
///
/// The connection sits behind a mutex; statements are short and the core
/// never holds the lock across an await point.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        debug!(path = %path.display(), "opened off-chain store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA foreign_keys=ON;
         CREATE TABLE IF NOT EXISTS players (
             address TEXT PRIMARY KEY,
             avatar_ref TEXT,
             experience INTEGER NOT NULL DEFAULT 0,
             fish_count INTEGER NOT NULL DEFAULT 0,
             wins INTEGER NOT NULL DEFAULT 0,
             reputation INTEGER NOT NULL DEFAULT 0,
             created_at_ms INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS tanks (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             owner_address TEXT NOT NULL REFERENCES players(address),
             created_at_ms INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS tanks_owner ON tanks(owner_address);
         CREATE TABLE IF NOT EXISTS fish (
             id INTEGER PRIMARY KEY,
             owner_address TEXT NOT NULL,
             tank_id INTEGER,
             sprite_ref TEXT,
             parent1 INTEGER,
             parent2 INTEGER,
             created_at_ms INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS fish_tank ON fish(tank_id);
         CREATE INDEX IF NOT EXISTS fish_parent1 ON fish(parent1);
         CREATE INDEX IF NOT EXISTS fish_parent2 ON fish(parent2);
         CREATE TABLE IF NOT EXISTS sync_queue (
             tx_hash TEXT PRIMARY KEY,
             entity_type TEXT NOT NULL,
             entity_id TEXT NOT NULL,
             status TEXT NOT NULL,
             retry_count INTEGER NOT NULL DEFAULT 0,
             created_at_ms INTEGER NOT NULL,
             updated_at_ms INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS sync_queue_status ON sync_queue(status, created_at_ms);",
    )?;
    Ok(())
}

fn translate(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::UniqueViolation
        }
        other => StoreError::Backend(other),
    }
}

fn parse_column<T: FromStr>(value: String, idx: usize) -> rusqlite::Result<T> {
    value.parse::<T>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized value: {value}").into(),
        )
    })
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        address: Address::parse(&row.get::<_, String>(0)?).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                e.to_string().into(),
            )
        })?,
        avatar_ref: row.get(1)?,
        experience: row.get(2)?,
        fish_count: row.get(3)?,
        wins: row.get(4)?,
        reputation: row.get(5)?,
        created_at_ms: row.get(6)?,
    })
}

fn tank_from_row(row: &Row<'_>) -> rusqlite::Result<Tank> {
    Ok(Tank {
        id: row.get(0)?,
        name: row.get(1)?,
        owner: address_column(row, 2)?,
        created_at_ms: row.get(3)?,
    })
}

fn fish_from_row(row: &Row<'_>) -> rusqlite::Result<Fish> {
    Ok(Fish {
        id: row.get(0)?,
        owner: address_column(row, 1)?,
        tank_id: row.get(2)?,
        sprite_ref: row.get(3)?,
        parent1: row.get(4)?,
        parent2: row.get(5)?,
        created_at_ms: row.get(6)?,
    })
}

fn address_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Address> {
    Address::parse(&row.get::<_, String>(idx)?).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            e.to_string().into(),
        )
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<SyncQueueItem> {
    Ok(SyncQueueItem {
        tx_hash: TxHash::parse(&row.get::<_, String>(0)?).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                e.to_string().into(),
            )
        })?,
        entity_type: parse_column::<EntityType>(row.get(1)?, 1)?,
        entity_id: row.get(2)?,
        status: parse_column::<SyncStatus>(row.get(3)?, 3)?,
        retry_count: row.get(4)?,
        created_at_ms: row.get(5)?,
        updated_at_ms: row.get(6)?,
    })
}

impl PlayerStore for SqliteStore {
    fn player_by_address(&self, address: &Address) -> Result<Option<Player>> {
        let conn = self.conn();
        let result = conn.query_row(
            "SELECT address, avatar_ref, experience, fish_count, wins, reputation, created_at_ms
             FROM players WHERE address = ?",
            params![address.as_str()],
            player_from_row,
        );
        match result {
            Ok(player) => Ok(Some(player)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(translate(err)),
        }
    }

    fn insert_player(&self, player: &Player) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO players
                     (address, avatar_ref, experience, fish_count, wins, reputation, created_at_ms)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    player.address.as_str(),
                    player.avatar_ref,
                    player.experience,
                    player.fish_count,
                    player.wins,
                    player.reputation,
                    player.created_at_ms,
                ],
            )
            .map_err(translate)?;
        Ok(())
    }

    fn set_fish_count(&self, address: &Address, fish_count: u32) -> Result<()> {
        let changed = self
            .conn()
            .execute(
                "UPDATE players SET fish_count = ? WHERE address = ?",
                params![fish_count, address.as_str()],
            )
            .map_err(translate)?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

impl TankStore for SqliteStore {
    fn tank_by_id(&self, id: i64) -> Result<Option<Tank>> {
        let conn = self.conn();
        let result = conn.query_row(
            "SELECT id, name, owner_address, created_at_ms FROM tanks WHERE id = ?",
            params![id],
            tank_from_row,
        );
        match result {
            Ok(tank) => Ok(Some(tank)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(translate(err)),
        }
    }

    fn insert_tank(&self, tank: &Tank) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO tanks (id, name, owner_address, created_at_ms) VALUES (?, ?, ?, ?)",
                params![tank.id, tank.name, tank.owner.as_str(), tank.created_at_ms],
            )
            .map_err(translate)?;
        Ok(())
    }

    fn tanks_by_owner(&self, owner: &Address) -> Result<Vec<Tank>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, owner_address, created_at_ms FROM tanks
             WHERE owner_address = ? ORDER BY created_at_ms ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![owner.as_str()], tank_from_row)?;
        let mut tanks = Vec::new();
        for row in rows {
            tanks.push(row.map_err(translate)?);
        }
        Ok(tanks)
    }
}

impl FishStore for SqliteStore {
    fn fish_by_id(&self, id: i64) -> Result<Option<Fish>> {
        let conn = self.conn();
        let result = conn.query_row(
            "SELECT id, owner_address, tank_id, sprite_ref, parent1, parent2, created_at_ms
             FROM fish WHERE id = ?",
            params![id],
            fish_from_row,
        );
        match result {
            Ok(fish) => Ok(Some(fish)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(translate(err)),
        }
    }

    fn insert_fish(&self, fish: &Fish) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO fish
                     (id, owner_address, tank_id, sprite_ref, parent1, parent2, created_at_ms)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    fish.id,
                    fish.owner.as_str(),
                    fish.tank_id,
                    fish.sprite_ref,
                    fish.parent1,
                    fish.parent2,
                    fish.created_at_ms,
                ],
            )
            .map_err(translate)?;
        Ok(())
    }

    fn fish_count_in_tank(&self, tank_id: i64) -> Result<u32> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM fish WHERE tank_id = ?",
                params![tank_id],
                |row| row.get(0),
            )
            .map_err(translate)
    }

    fn fish_by_parent_ids(&self, parent_ids: &[i64]) -> Result<Vec<Fish>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; parent_ids.len()].join(", ");
        let sql = format!(
            "SELECT id, owner_address, tank_id, sprite_ref, parent1, parent2, created_at_ms
             FROM fish
             WHERE parent1 IN ({placeholders}) OR parent2 IN ({placeholders})
             ORDER BY id ASC"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let params_iter = parent_ids.iter().chain(parent_ids.iter());
        let rows = stmt.query_map(params_from_iter(params_iter), fish_from_row)?;
        let mut fish = Vec::new();
        for row in rows {
            fish.push(row.map_err(translate)?);
        }
        Ok(fish)
    }
}

impl SyncQueueStore for SqliteStore {
    fn insert_item(&self, item: &SyncQueueItem) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO sync_queue
                     (tx_hash, entity_type, entity_id, status, retry_count, created_at_ms, updated_at_ms)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    item.tx_hash.as_str(),
                    item.entity_type.as_str(),
                    item.entity_id,
                    item.status.as_str(),
                    item.retry_count,
                    item.created_at_ms,
                    item.updated_at_ms,
                ],
            )
            .map_err(translate)?;
        Ok(())
    }

    fn item_by_tx_hash(&self, tx_hash: &TxHash) -> Result<Option<SyncQueueItem>> {
        let conn = self.conn();
        let result = conn.query_row(
            "SELECT tx_hash, entity_type, entity_id, status, retry_count, created_at_ms, updated_at_ms
             FROM sync_queue WHERE tx_hash = ?",
            params![tx_hash.as_str()],
            item_from_row,
        );
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(translate(err)),
        }
    }

    fn update_item_status(
        &self,
        tx_hash: &TxHash,
        status: SyncStatus,
        retry_count: u32,
        updated_at_ms: u64,
    ) -> Result<SyncQueueItem> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE sync_queue SET status = ?, retry_count = ?, updated_at_ms = ?
                 WHERE tx_hash = ?",
                params![status.as_str(), retry_count, updated_at_ms, tx_hash.as_str()],
            )
            .map_err(translate)?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        conn.query_row(
            "SELECT tx_hash, entity_type, entity_id, status, retry_count, created_at_ms, updated_at_ms
             FROM sync_queue WHERE tx_hash = ?",
            params![tx_hash.as_str()],
            item_from_row,
        )
        .map_err(translate)
    }

    fn pending_items(&self) -> Result<Vec<SyncQueueItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT tx_hash, entity_type, entity_id, status, retry_count, created_at_ms, updated_at_ms
             FROM sync_queue WHERE status = 'pending'
             ORDER BY created_at_ms ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], item_from_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(translate)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidepool_types::now_ms;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("in-memory store should open")
    }

    fn player(address: &str) -> Player {
        Player::registered(Address::parse(address).unwrap(), now_ms())
    }

    fn queue_item(hash: &str, created_at_ms: u64) -> SyncQueueItem {
        SyncQueueItem {
            tx_hash: TxHash::parse(hash).unwrap(),
            entity_type: EntityType::Fish,
            entity_id: "1".to_string(),
            status: SyncStatus::Pending,
            retry_count: 0,
            created_at_ms,
            updated_at_ms: created_at_ms,
        }
    }

    #[test]
    fn player_round_trip() {
        let store = store();
        let player = player("0xaa");
        store.insert_player(&player).expect("insert should succeed");

        let fetched = store
            .player_by_address(&player.address)
            .expect("lookup should succeed")
            .expect("player should exist");
        assert_eq!(fetched, player);
        assert!(store
            .player_by_address(&Address::parse("0xbb").unwrap())
            .unwrap()
            .is_none());
    }

    #[test]
    fn duplicate_player_is_unique_violation() {
        let store = store();
        let player = player("0xaa");
        store.insert_player(&player).unwrap();
        let err = store.insert_player(&player).unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation));
    }

    #[test]
    fn set_fish_count_requires_existing_row() {
        let store = store();
        let err = store
            .set_fish_count(&Address::parse("0xaa").unwrap(), 3)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        store.insert_player(&player("0xaa")).unwrap();
        store
            .set_fish_count(&Address::parse("0xaa").unwrap(), 3)
            .unwrap();
        let fetched = store
            .player_by_address(&Address::parse("0xaa").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(fetched.fish_count, 3);
    }

    #[test]
    fn fish_by_parent_ids_matches_either_pointer() {
        let store = store();
        let owner = Address::parse("0xaa").unwrap();
        store.insert_player(&player("0xaa")).unwrap();
        for (id, parent1, parent2) in [
            (1, None, None),
            (2, None, None),
            (3, Some(1), Some(2)),
            (4, Some(2), Some(1)),
            (5, Some(3), Some(4)),
        ] {
            store
                .insert_fish(&Fish {
                    id,
                    owner: owner.clone(),
                    tank_id: None,
                    sprite_ref: None,
                    parent1,
                    parent2,
                    created_at_ms: now_ms(),
                })
                .unwrap();
        }

        let children = store.fish_by_parent_ids(&[1]).unwrap();
        let ids: Vec<i64> = children.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![3, 4], "both parent pointers should match");

        assert!(store.fish_by_parent_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn fish_count_in_tank_counts_only_assigned() {
        let store = store();
        let owner = Address::parse("0xaa").unwrap();
        store.insert_player(&player("0xaa")).unwrap();
        store
            .insert_tank(&Tank {
                id: 7,
                name: "reef".to_string(),
                owner: owner.clone(),
                created_at_ms: now_ms(),
            })
            .unwrap();
        for (id, tank_id) in [(1, Some(7)), (2, Some(7)), (3, None)] {
            store
                .insert_fish(&Fish {
                    id,
                    owner: owner.clone(),
                    tank_id,
                    sprite_ref: None,
                    parent1: None,
                    parent2: None,
                    created_at_ms: now_ms(),
                })
                .unwrap();
        }
        assert_eq!(store.fish_count_in_tank(7).unwrap(), 2);
        assert_eq!(store.fish_count_in_tank(999).unwrap(), 0);
    }

    #[test]
    fn pending_items_are_fifo_by_creation() {
        let store = store();
        store.insert_item(&queue_item("0x1", 100)).unwrap();
        store.insert_item(&queue_item("0x2", 50)).unwrap();
        store.insert_item(&queue_item("0x3", 100)).unwrap();

        let pending = store.pending_items().unwrap();
        let hashes: Vec<&str> = pending.iter().map(|i| i.tx_hash.as_str()).collect();
        assert_eq!(
            hashes,
            vec!["0x2", "0x1", "0x3"],
            "oldest first, insertion order breaking ties"
        );
    }

    #[test]
    fn update_item_status_returns_updated_row() {
        let store = store();
        store.insert_item(&queue_item("0x1", 100)).unwrap();
        let updated = store
            .update_item_status(&TxHash::parse("0x1").unwrap(), SyncStatus::Failed, 1, 200)
            .unwrap();
        assert_eq!(updated.status, SyncStatus::Failed);
        assert_eq!(updated.retry_count, 1);
        assert_eq!(updated.updated_at_ms, 200);

        let err = store
            .update_item_status(&TxHash::parse("0x9").unwrap(), SyncStatus::Confirmed, 0, 200)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
