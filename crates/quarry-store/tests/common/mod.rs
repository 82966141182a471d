#![allow(dead_code)]

use chrono::{DateTime, Utc};
use quarry_core::{
    FieldDescriptor, FieldReader, FieldType, FieldWriter, IndexDescriptor, Record,
    RecordDescriptor, Result,
};
use quarry_store::{ChangeNotifier, ConnectionSettings, Executor, Repository, SqliteEngine};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

const ITEM_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("id", FieldType::Integer),
    FieldDescriptor::new("name", FieldType::Text).unique(),
    FieldDescriptor::new("quantity", FieldType::Integer).column("qty"),
    FieldDescriptor::new("created_at", FieldType::Timestamp),
];

const ITEM_INDEXES: &[IndexDescriptor] = &[IndexDescriptor::new("idx_items_created_at", &["created_at"])];

pub static ITEM: RecordDescriptor =
    RecordDescriptor::new("Item", "id", ITEM_FIELDS).indexes(ITEM_INDEXES);

impl Record for Item {
    type Id = i64;

    fn descriptor() -> &'static RecordDescriptor {
        &ITEM
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn write_fields(&self, out: &mut FieldWriter) -> Result<()> {
        out.put("id", &self.id)?;
        out.put("name", &self.name)?;
        out.put("quantity", &self.quantity)?;
        out.put("created_at", &self.created_at)
    }

    fn read_fields(row: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            quantity: row.get("quantity")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub fn item(name: &str, quantity: i64) -> Item {
    Item {
        id: 0,
        name: name.to_string(),
        quantity,
        created_at: at(1_700_000_000),
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Record with a caller-assigned UUID identity
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub key: Uuid,
    pub body: String,
}

const NOTE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("key", FieldType::Uuid),
    FieldDescriptor::new("body", FieldType::Text),
];

pub static NOTE: RecordDescriptor = RecordDescriptor::new("Note", "key", NOTE_FIELDS);

impl Record for Note {
    type Id = Uuid;

    fn descriptor() -> &'static RecordDescriptor {
        &NOTE
    }

    fn id(&self) -> Uuid {
        self.key
    }

    fn set_id(&mut self, id: Uuid) {
        self.key = id;
    }

    fn write_fields(&self, out: &mut FieldWriter) -> Result<()> {
        out.put("key", &self.key)?;
        out.put("body", &self.body)
    }

    fn read_fields(row: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            key: row.get("key")?,
            body: row.get("body")?,
        })
    }
}

/// Record with a 32-bit engine-assigned identity
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub id: i32,
    pub label: String,
}

const TALLY_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("id", FieldType::Integer),
    FieldDescriptor::new("label", FieldType::Text),
];

pub static TALLY: RecordDescriptor = RecordDescriptor::new("Tally", "id", TALLY_FIELDS);

impl Record for Tally {
    type Id = i32;

    fn descriptor() -> &'static RecordDescriptor {
        &TALLY
    }

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn write_fields(&self, out: &mut FieldWriter) -> Result<()> {
        out.put("id", &self.id)?;
        out.put("label", &self.label)
    }

    fn read_fields(row: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            label: row.get("label")?,
        })
    }
}

pub struct Harness {
    pub executor: Arc<Executor>,
    pub notifier: Arc<ChangeNotifier>,
}

impl Harness {
    pub fn in_memory() -> Self {
        let engine = SqliteEngine::open_in_memory(&ConnectionSettings::default())
            .expect("open in-memory database");
        Self {
            executor: Arc::new(Executor::spawn(Box::new(engine)).expect("spawn executor")),
            notifier: Arc::new(ChangeNotifier::new()),
        }
    }

    pub fn repository<R: Record>(&self) -> Repository<R> {
        Repository::new(self.executor.clone(), self.notifier.clone())
    }

    pub async fn items(&self) -> Repository<Item> {
        let repo = self.repository::<Item>();
        repo.create_table().await.expect("create items table");
        repo
    }
}
