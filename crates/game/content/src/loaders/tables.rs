//! Lookup table loader.
//!
//! Each top-level array of tables in the file becomes one table; its entries
//! are the rows.
//!
//! ```toml
//! [[terror]]
//! level = 1
//! aid = -2
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use turnflow_core::Value;
use turnflow_core::def::TableDef;

use crate::loaders::{LoadResult, read_toml};

pub struct TablesLoader;

impl TablesLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<TableDef>> {
        let doc: toml::Table = read_toml(path, "tables")?;
        doc.into_iter()
            .map(|(id, rows)| {
                let toml::Value::Array(rows) = rows else {
                    anyhow::bail!("table `{id}` must be an array of tables");
                };
                let rows = rows
                    .into_iter()
                    .enumerate()
                    .map(|(i, row)| {
                        let toml::Value::Table(cells) = row else {
                            anyhow::bail!("row {i} of table `{id}` is not a table");
                        };
                        cells
                            .into_iter()
                            .map(|(column, cell)| {
                                let value = convert(cell).map_err(|e| {
                                    anyhow::anyhow!("{id}[{i}].{column}: {e}")
                                })?;
                                Ok((column, value))
                            })
                            .collect::<LoadResult<BTreeMap<_, _>>>()
                    })
                    .collect::<LoadResult<Vec<_>>>()?;
                Ok(TableDef { id, rows })
            })
            .collect()
    }
}

fn convert(cell: toml::Value) -> LoadResult<Value> {
    Ok(match cell {
        toml::Value::Integer(v) => Value::Int(v),
        toml::Value::Boolean(v) => Value::Bool(v),
        toml::Value::String(v) => Value::Str(v),
        toml::Value::Array(items) => {
            Value::List(items.into_iter().map(convert).collect::<LoadResult<_>>()?)
        }
        other => anyhow::bail!("unsupported cell type {}", other.type_str()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(text: &str) -> LoadResult<Vec<TableDef>> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.toml");
        std::fs::write(&path, text).unwrap();
        TablesLoader::load(&path)
    }

    #[test]
    fn rows_keep_file_order() {
        let tables = load(
            r#"
            [[terror]]
            level = 1
            aid = -2

            [[terror]]
            level = 2
            aid = -5
            tags = ["city", "coastal"]
            "#,
        )
        .unwrap();

        assert_eq!(tables.len(), 1);
        let terror = &tables[0];
        assert_eq!(terror.id, "terror");
        assert_eq!(terror.rows.len(), 2);
        assert_eq!(terror.rows[0]["aid"], Value::Int(-2));
        assert_eq!(
            terror.rows[1]["tags"],
            Value::List(vec![Value::str("city"), Value::str("coastal")])
        );
    }

    #[test]
    fn floats_are_rejected_with_their_location() {
        let err = load("[[odds]]\nchance = 0.5\n").unwrap_err();
        assert!(err.to_string().contains("odds[0].chance"), "{err}");
    }

    #[test]
    fn bare_keys_are_not_tables() {
        assert!(load("answer = 42\n").is_err());
    }
}
