//! The `items` record

use chrono::{DateTime, Utc};
use quarry_core::{
    FieldDescriptor, FieldReader, FieldType, FieldWriter, IndexDescriptor, Record,
    RecordDescriptor, Result,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            quantity,
            created_at: Utc::now(),
        }
    }
}

const ITEM_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("id", FieldType::Integer),
    FieldDescriptor::new("name", FieldType::Text),
    FieldDescriptor::new("quantity", FieldType::Integer),
    FieldDescriptor::new("created_at", FieldType::Timestamp).column("created"),
];

const ITEM_INDEXES: &[IndexDescriptor] = &[IndexDescriptor::new("idx_items_name", &["name"])];

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
