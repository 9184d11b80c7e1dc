//! In-memory datasets and fixture files
//!
//! A `DataSet` is an ordered collection of `Table`s. Datasets are read from
//! and written to CSV directories, flat XML and JSON, reshaped with filters,
//! sorting and placeholder replacement, and serve as metadata provider and row
//! source for the dependency search so fixtures can be trimmed to the rows a
//! test needs.

mod csv_dataset;
mod dataset;
mod error;
mod filter;
mod json_dataset;
mod provider;
mod replacement;
mod restrict;
mod sorted;
mod table;
mod xml_dataset;

pub use csv_dataset::{CsvDataSetReader, CsvDataSetWriter, TABLE_ORDERING_FILE};
pub use dataset::DataSet;
pub use error::{DataSetError, Result};
pub use filter::{ColumnFilter, TableFilter, sequence, wildcard_match};
pub use json_dataset::{read_json_file, read_json_str, write_json_file, write_json_string};
pub use replacement::ReplacementDataSet;
pub use restrict::restrict;
pub use sorted::SortedTable;
pub use table::Table;
pub use xml_dataset::{FlatXmlReader, FlatXmlWriter};
