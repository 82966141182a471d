//! Table definition statements derived from a record descriptor
//!
//! Every statement is idempotent (`IF NOT EXISTS` / `IF EXISTS`) so
//! creating or dropping a table twice is harmless.

use crate::descriptor::{FieldDescriptor, RecordDescriptor};
use crate::errors::{QuarryError, Result};
use crate::ident::quote_ident;
use crate::value::SqlType;

/// `CREATE TABLE IF NOT EXISTS` with inlined unique constraints
///
/// # Errors
///
/// Fails when the identity or a constrained field is not declared, or an
/// identifier cannot be quoted.
pub fn create_table_sql(descriptor: &RecordDescriptor) -> Result<String> {
    let identity = descriptor.identity_field()?;
    let mut columns = Vec::with_capacity(descriptor.fields.len() + descriptor.unique_constraints.len());

    for field in descriptor.fields {
        columns.push(column_definition(field, field.name == identity.name)?);
    }

    for constraint in descriptor.unique_constraints {
        let names = resolve_columns(descriptor, constraint)?;
        columns.push(format!("UNIQUE ({})", names.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(&descriptor.table_name())?,
        columns.join(", ")
    ))
}

/// One `CREATE [UNIQUE] INDEX IF NOT EXISTS` per declared index
///
/// # Errors
///
/// Fails when an index names an undeclared field.
pub fn create_index_sql(descriptor: &RecordDescriptor) -> Result<Vec<String>> {
    let table = quote_ident(&descriptor.table_name())?;
    descriptor
        .indexes
        .iter()
        .map(|index| {
            let names = resolve_columns(descriptor, index.fields)?;
            Ok(format!(
                "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
                if index.unique { "UNIQUE " } else { "" },
                quote_ident(index.name)?,
                table,
                names.join(", ")
            ))
        })
        .collect()
}

/// `DROP TABLE IF EXISTS`
///
/// # Errors
///
/// Fails only for an unquotable table name.
pub fn drop_table_sql(descriptor: &RecordDescriptor) -> Result<String> {
    Ok(format!(
        "DROP TABLE IF EXISTS {}",
        quote_ident(&descriptor.table_name())?
    ))
}

fn column_definition(field: &FieldDescriptor, is_identity: bool) -> Result<String> {
    let sql_type = field.field_type.sql_type();
    let mut def = format!("{} {}", quote_ident(field.column_name())?, sql_type.as_str());

    if is_identity {
        def.push_str(" PRIMARY KEY");
        if sql_type == SqlType::Integer {
            def.push_str(" AUTOINCREMENT");
        }
        def.push_str(" NOT NULL");
        return Ok(def);
    }

    if !field.nullable {
        def.push_str(" NOT NULL");
    }
    if field.unique {
        def.push_str(" UNIQUE");
    }
    Ok(def)
}

fn resolve_columns(descriptor: &RecordDescriptor, fields: &[&str]) -> Result<Vec<String>> {
    fields
        .iter()
        .map(|name| {
            let field = descriptor
                .field(name)
                .ok_or_else(|| QuarryError::UnknownField {
                    record: descriptor.type_name.to_string(),
                    field: (*name).to_string(),
                })?;
            quote_ident(field.column_name())
        })
        .collect()
}
