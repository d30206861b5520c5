//! Row to table item mapping

use data_updater_common::codec::{Header, KeyColumns, Row};
use data_updater_common::Result;

use crate::config::StorageLayout;
use crate::table::Item;

/// Attribute holding the record value in [`StorageLayout::Record`]
pub const VALUE_ATTRIBUTE: &str = "record_value";

/// How rows of one file become items of one table
#[derive(Debug, Clone)]
pub struct RecordLayout {
    columns: Vec<String>,
    key: KeyColumns,
    layout: StorageLayout,
}

impl RecordLayout {
    /// Resolve the key columns against the header.
    pub fn new(header: &Header, key_columns: &[String], layout: StorageLayout) -> Result<Self> {
        Ok(Self {
            columns: header.columns().to_vec(),
            key: KeyColumns::resolve(header, key_columns)?,
            layout,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn key(&self) -> &KeyColumns {
        &self.key
    }

    /// Partition key attribute name
    pub fn key_attribute(&self) -> String {
        self.key.attribute_name()
    }

    /// Full item for a bulk put.
    pub fn put_item(&self, row: &Row) -> Result<Item> {
        let key_value = self.key.compose(row)?;

        let mut item = match self.layout {
            StorageLayout::Columns => self.column_values(row),
            StorageLayout::Record => {
                let mut item = Item::new();
                item.insert(VALUE_ATTRIBUTE.to_string(), self.key.compose_value(row)?);
                item
            },
        };
        item.insert(self.key_attribute(), key_value);

        Ok(item)
    }

    /// Record key and the attributes an update overwrites.
    pub fn update(&self, row: &Row) -> Result<(String, Item)> {
        let key_value = self.key.compose(row)?;
        let key_attribute = self.key_attribute();

        let updates = match self.layout {
            StorageLayout::Columns => {
                let mut values = self.column_values(row);
                values.remove(&key_attribute);
                values
            },
            StorageLayout::Record => {
                let mut item = Item::new();
                item.insert(VALUE_ATTRIBUTE.to_string(), self.key.compose_value(row)?);
                item
            },
        };

        Ok((key_value, updates))
    }

    /// Attributes to read back when exporting the table.
    pub fn projection(&self) -> Vec<String> {
        match self.layout {
            StorageLayout::Columns => {
                let mut attributes = self.columns.clone();
                let key_attribute = self.key_attribute();
                if !attributes.contains(&key_attribute) {
                    attributes.push(key_attribute);
                }
                attributes
            },
            StorageLayout::Record => vec![self.key_attribute(), VALUE_ATTRIBUTE.to_string()],
        }
    }

    /// Item back to a row in header order; absent attributes are empty.
    pub fn to_row(&self, item: &Item) -> Vec<String> {
        match self.layout {
            StorageLayout::Columns => self
                .columns
                .iter()
                .map(|column| item.get(column).cloned().unwrap_or_default())
                .collect(),
            StorageLayout::Record => {
                let key = item
                    .get(&self.key_attribute())
                    .map(String::as_str)
                    .unwrap_or_default();
                let value = item
                    .get(VALUE_ATTRIBUTE)
                    .map(String::as_str)
                    .unwrap_or_default();
                self.key.reassemble(key, value)
            },
        }
    }

    fn column_values(&self, row: &Row) -> Item {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.clone(), row.get(i).unwrap_or_default().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn header() -> Header {
        Header::new(strings(&["warehouse", "product", "qty", "note"]))
    }

    fn row() -> Row {
        Row::new(strings(&["north", "p-1", "12", "restock"]))
    }

    #[test]
    fn test_columns_layout_single_key() {
        let layout =
            RecordLayout::new(&header(), &strings(&["product"]), StorageLayout::Columns).unwrap();

        let item = layout.put_item(&row()).unwrap();
        assert_eq!(item.len(), 4);
        assert_eq!(item.get("product").map(String::as_str), Some("p-1"));

        let (key, updates) = layout.update(&row()).unwrap();
        assert_eq!(key, "p-1");
        assert_eq!(updates.keys().cloned().collect::<Vec<_>>(), strings(&["note", "qty", "warehouse"]));
    }

    #[test]
    fn test_columns_layout_composite_key() {
        let layout = RecordLayout::new(
            &header(),
            &strings(&["warehouse", "product"]),
            StorageLayout::Columns,
        )
        .unwrap();

        assert_eq!(layout.key_attribute(), "warehouse;product");

        let item = layout.put_item(&row()).unwrap();
        assert_eq!(item.get("warehouse;product").map(String::as_str), Some("north;p-1"));
        assert_eq!(item.get("warehouse").map(String::as_str), Some("north"));

        let (key, updates) = layout.update(&row()).unwrap();
        assert_eq!(key, "north;p-1");
        assert_eq!(updates.len(), 4);
        assert!(!updates.contains_key("warehouse;product"));
    }

    #[test]
    fn test_record_layout_round_trip() {
        let layout = RecordLayout::new(
            &header(),
            &strings(&["product", "warehouse"]),
            StorageLayout::Record,
        )
        .unwrap();

        let item = layout.put_item(&row()).unwrap();
        assert_eq!(item.get("product;warehouse").map(String::as_str), Some("p-1;north"));
        assert_eq!(item.get(VALUE_ATTRIBUTE).map(String::as_str), Some("12;restock"));

        assert_eq!(layout.to_row(&item), row().values());
        assert_eq!(layout.projection(), strings(&["product;warehouse", VALUE_ATTRIBUTE]));
    }

    #[test]
    fn test_columns_to_row_fills_missing_attributes() {
        let layout =
            RecordLayout::new(&header(), &strings(&["product"]), StorageLayout::Columns).unwrap();
        let item: Item = [("product".to_string(), "p-9".to_string())].into_iter().collect();

        assert_eq!(layout.to_row(&item), strings(&["", "p-9", "", ""]));
    }

    #[test]
    fn test_unknown_key_column() {
        assert!(RecordLayout::new(&header(), &strings(&["sku"]), StorageLayout::Columns).is_err());
    }
}
