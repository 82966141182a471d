#![allow(dead_code)]

use quarry_core::{
    FieldDescriptor, FieldReader, FieldType, FieldWriter, Record, RecordDescriptor, Result,
};
use quarry_engine::{Database, LiveState};
use quarry_store::Repository;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
}

const ITEM_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("id", FieldType::Integer),
    FieldDescriptor::new("name", FieldType::Text).unique(),
    FieldDescriptor::new("quantity", FieldType::Integer),
];

pub static ITEM: RecordDescriptor = RecordDescriptor::new("Item", "id", ITEM_FIELDS);

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
        out.put("quantity", &self.quantity)
    }

    fn read_fields(row: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            quantity: row.get("quantity")?,
        })
    }
}

pub fn item(name: &str, quantity: i64) -> Item {
    Item {
        id: 0,
        name: name.to_string(),
        quantity,
    }
}

/// In-memory database with an empty `items` table
pub async fn open_items() -> (Database, Repository<Item>) {
    let db = Database::open_in_memory().expect("open database");
    let repo = db.repository::<Item>();
    repo.create_table().await.expect("create items table");
    (db, repo)
}

pub const WAIT: Duration = Duration::from_secs(5);

pub fn ready<T: Clone>(state: &LiveState<T>) -> Option<T> {
    state.value().cloned()
}
