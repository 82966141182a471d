#![allow(dead_code)]

use chrono::{DateTime, Utc};
use quarry_core::{
    FieldDescriptor, FieldReader, FieldType, FieldWriter, Record, RecordDescriptor, Result,
};
use uuid::Uuid;

/// Fixture record covering every declared field type
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: i64,
    pub label: String,
    pub count: i64,
    pub ratio: f64,
    pub active: bool,
    pub tag: Option<Uuid>,
    pub payload: Vec<u8>,
    pub seen_at: Option<DateTime<Utc>>,
}

const SAMPLE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("id", FieldType::Integer),
    FieldDescriptor::new("label", FieldType::Text).column("sample_label"),
    FieldDescriptor::new("count", FieldType::Integer),
    FieldDescriptor::new("ratio", FieldType::Real),
    FieldDescriptor::new("active", FieldType::Boolean).column("is_active"),
    FieldDescriptor::new("tag", FieldType::Uuid).nullable(),
    FieldDescriptor::new("payload", FieldType::Blob),
    FieldDescriptor::new("seen_at", FieldType::Timestamp).nullable(),
];

pub static SAMPLE: RecordDescriptor = RecordDescriptor::new("Sample", "id", SAMPLE_FIELDS);

impl Record for Sample {
    type Id = i64;

    fn descriptor() -> &'static RecordDescriptor {
        &SAMPLE
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn write_fields(&self, out: &mut FieldWriter) -> Result<()> {
        out.put("id", &self.id)?;
        out.put("label", &self.label)?;
        out.put("count", &self.count)?;
        out.put("ratio", &self.ratio)?;
        out.put("active", &self.active)?;
        out.put("tag", &self.tag)?;
        out.put("payload", &self.payload)?;
        out.put("seen_at", &self.seen_at)
    }

    fn read_fields(row: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            label: row.get("label")?,
            count: row.get("count")?,
            ratio: row.get("ratio")?,
            active: row.get("active")?,
            tag: row.get("tag")?,
            payload: row.get("payload")?,
            seen_at: row.get("seen_at")?,
        })
    }
}

pub fn sample() -> Sample {
    Sample {
        id: 1,
        label: "first".to_string(),
        count: 6,
        ratio: 0.5,
        active: true,
        tag: None,
        payload: vec![0, 1, 2],
        seen_at: None,
    }
}
