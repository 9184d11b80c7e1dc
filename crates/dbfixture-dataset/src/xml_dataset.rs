//! Flat XML datasets
//!
//! ```xml
//! <dataset>
//!   <customers id="1" name="Ada"/>
//!   <orders id="10" customer_id="1"/>
//!   <audit_log/>
//! </dataset>
//! ```
//!
//! Each child of the root element is one row of the table named by the
//! element; attributes are columns. An element without attributes declares an
//! empty table. With column sensing on, a table's columns are the union of the
//! attributes of all its rows and absent attributes read as NULL; with it off,
//! the first row fixes the columns. The writer leaves NULL cells out.

use crate::dataset::DataSet;
use crate::error::{DataSetError, Result};
use crate::table::Table;
use dbfixture_core::{FixtureConfig, Value};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::path::Path;

type Attributes = Vec<(String, String)>;

fn collect_attributes(e: &BytesStart<'_>) -> Result<Attributes> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(DataSetError::xml)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(DataSetError::xml)?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

pub struct FlatXmlReader<'a> {
    config: &'a FixtureConfig,
}

impl<'a> FlatXmlReader<'a> {
    pub fn new(config: &'a FixtureConfig) -> Self {
        Self { config }
    }

    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<DataSet> {
        let text = std::fs::read_to_string(path.as_ref())?;
        self.read_str(&text)
    }

    pub fn read_str(&self, xml: &str) -> Result<DataSet> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text_start = true;
        reader.config_mut().trim_text_end = true;

        // table name -> rows of attributes, in order of first appearance
        let mut tables: IndexMap<String, Vec<Attributes>> = IndexMap::new();
        let mut depth = 0usize;
        let mut saw_root = false;

        loop {
            let event = reader.read_event().map_err(|e| {
                DataSetError::Xml(format!(
                    "parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;
            match event {
                Event::Eof => break,
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match depth {
                        0 => saw_root = true,
                        1 => {
                            let attrs = collect_attributes(e)?;
                            let rows = tables.entry(element_name(e)).or_default();
                            if !attrs.is_empty() {
                                rows.push(attrs);
                            }
                        }
                        _ => {}
                    }
                    if !is_empty {
                        depth += 1;
                    }
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        if !saw_root {
            return Err(DataSetError::format("flat XML", "document has no root element"));
        }

        let mut dataset = DataSet::with_config(self.config);
        for (name, rows) in tables {
            dataset.add_table(self.build_table(name, rows)?)?;
        }
        tracing::debug!(tables = dataset.len(), rows = dataset.row_count(), "read flat XML dataset");
        Ok(dataset)
    }

    fn build_table(&self, name: String, rows: Vec<Attributes>) -> Result<Table> {
        let cs = self.config.case_sensitive_table_names;
        let same = |a: &str, b: &str| dbfixture_core::names_match(a, b, cs);

        let mut columns: Vec<String> = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            if idx > 0 && !self.config.dataset.column_sensing {
                break;
            }
            for (key, _) in row {
                if !columns.iter().any(|c| same(c, key)) {
                    columns.push(key.clone());
                }
            }
        }

        let mut table = Table::with_columns(name, columns.clone());
        for row in rows {
            let values = columns
                .iter()
                .map(|column| {
                    row.iter()
                        .find(|(key, _)| same(key, column))
                        .map_or(Value::Null, |(_, value)| Value::String(value.clone()))
                })
                .collect();
            table.add_row(values)?;
        }
        Ok(table)
    }
}

pub struct FlatXmlWriter;

impl FlatXmlWriter {
    pub fn write_string(dataset: &DataSet) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(DataSetError::xml)?;
        writer
            .write_event(Event::Start(BytesStart::new("dataset")))
            .map_err(DataSetError::xml)?;

        for table in dataset.tables() {
            if table.is_empty() {
                writer
                    .write_event(Event::Empty(BytesStart::new(table.name())))
                    .map_err(DataSetError::xml)?;
                continue;
            }
            let columns = table.column_names();
            for row in table.rows() {
                let mut element = BytesStart::new(table.name());
                for (column, value) in columns.iter().zip(row) {
                    if !value.is_null() {
                        element.push_attribute((*column, value.to_string().as_str()));
                    }
                }
                writer
                    .write_event(Event::Empty(element))
                    .map_err(DataSetError::xml)?;
            }
        }

        writer
            .write_event(Event::End(BytesEnd::new("dataset")))
            .map_err(DataSetError::xml)?;
        String::from_utf8(writer.into_inner()).map_err(DataSetError::xml)
    }

    pub fn write_file(dataset: &DataSet, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, Self::write_string(dataset)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const SHOP: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <dataset>
          <customers id="1" name="Ada"/>
          <orders id="10" customer_id="1"/>
          <customers id="2" email="grace@example.com"/>
          <audit_log/>
        </dataset>
    "#};

    #[test]
    fn test_column_sensing_unions_attributes() {
        let config = FixtureConfig::default();
        let dataset = FlatXmlReader::new(&config).read_str(SHOP).unwrap();

        assert_eq!(dataset.table_names(), vec!["customers", "orders", "audit_log"]);
        let customers = dataset.table("customers").unwrap();
        assert_eq!(customers.column_names(), vec!["id", "name", "email"]);
        assert_eq!(customers.value(0, "email").unwrap(), &Value::Null);
        assert_eq!(customers.value(1, "name").unwrap(), &Value::Null);
        assert!(dataset.table("audit_log").unwrap().is_empty());
    }

    #[test]
    fn test_without_column_sensing_first_row_fixes_columns() {
        let mut config = FixtureConfig::default();
        config.dataset.column_sensing = false;
        let dataset = FlatXmlReader::new(&config).read_str(SHOP).unwrap();

        let customers = dataset.table("customers").unwrap();
        assert_eq!(customers.column_names(), vec!["id", "name"]);
        assert_eq!(customers.row_count(), 2);
    }

    #[test]
    fn test_entities_are_unescaped() {
        let config = FixtureConfig::default();
        let dataset = FlatXmlReader::new(&config)
            .read_str(r#"<dataset><t note="a &amp; b &lt;c&gt;"/></dataset>"#)
            .unwrap();
        assert_eq!(dataset.table("t").unwrap().value(0, "note").unwrap(), &Value::from("a & b <c>"));
    }

    #[test]
    fn test_writer_omits_nulls_and_keeps_empty_tables() {
        let dataset = DataSet::from_tables([
            Table::with_columns("customers", ["id", "email"])
                .row([Value::from(1i64), Value::Null])
                .unwrap(),
            Table::with_columns("audit_log", ["id"]),
        ])
        .unwrap();
        let xml = FlatXmlWriter::write_string(&dataset).unwrap();

        assert!(xml.contains(r#"<customers id="1"/>"#));
        assert!(xml.contains("<audit_log/>"));

        let read = FlatXmlReader::new(&FixtureConfig::default()).read_str(&xml).unwrap();
        assert_eq!(read.table_names(), vec!["customers", "audit_log"]);
    }

    #[test]
    fn test_malformed_document_fails() {
        let config = FixtureConfig::default();
        assert!(FlatXmlReader::new(&config).read_str("<dataset><t a=\"1\"></dataset>").is_err());
        assert!(FlatXmlReader::new(&config).read_str("").is_err());
    }
}
