//! Type mapping for database vendors
//!
//! Maps native column type names to the framework's `DataType` and turns
//! fixture text into typed values. Each vendor gets its own `TypeMapper`;
//! the `TypeMapperRegistry` picks one by database product name. Types that
//! need optional support (PostgreSQL `citext`, for instance) are provided by
//! `TypeExtension`s registered explicitly at startup.

use crate::types::{parse_bool, parse_date, parse_datetime, parse_datetime_utc, parse_time};
use crate::{FixtureError, Result, Value};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Framework-level column type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    Unknown,
    Char,
    Varchar,
    LongVarchar,
    Clob,
    CaseInsensitiveText,
    Numeric,
    Decimal,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Date,
    Time,
    Timestamp,
    TimestampWithTimeZone,
    Binary,
    VarBinary,
    Blob,
    Uuid,
    Json,
    Other(String),
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Numeric
                | DataType::Decimal
                | DataType::TinyInt
                | DataType::SmallInt
                | DataType::Integer
                | DataType::BigInt
                | DataType::Real
                | DataType::Float
                | DataType::Double
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            DataType::Char
                | DataType::Varchar
                | DataType::LongVarchar
                | DataType::Clob
                | DataType::CaseInsensitiveText
                | DataType::Json
        )
    }

    /// Parse fixture text into a value of this type.
    ///
    /// Text types, `Unknown` and `Other` keep the text as a string.
    pub fn parse_value(&self, text: &str) -> Result<Value> {
        let trimmed = text.trim();
        let invalid = || FixtureError::Type(format!("cannot parse '{}' as {:?}", text, self));
        match self {
            DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => {
                trimmed.parse::<i64>().map(Value::Int64).map_err(|_| invalid())
            }
            DataType::Real | DataType::Float | DataType::Double => {
                trimmed.parse::<f64>().map(Value::Float64).map_err(|_| invalid())
            }
            DataType::Numeric | DataType::Decimal => trimmed
                .parse::<f64>()
                .map(|_| Value::Decimal(trimmed.to_string()))
                .map_err(|_| invalid()),
            DataType::Boolean => parse_bool(trimmed).map(Value::Bool).ok_or_else(invalid),
            DataType::Date => parse_date(trimmed).map(Value::Date).ok_or_else(invalid),
            DataType::Time => parse_time(trimmed).map(Value::Time).ok_or_else(invalid),
            DataType::Timestamp => parse_datetime(trimmed)
                .map(Value::DateTime)
                .ok_or_else(invalid),
            DataType::TimestampWithTimeZone => parse_datetime_utc(trimmed)
                .map(Value::DateTimeUtc)
                .ok_or_else(invalid),
            DataType::Uuid => Uuid::parse_str(trimmed)
                .map(Value::Uuid)
                .map_err(|_| invalid()),
            DataType::Binary | DataType::VarBinary | DataType::Blob => BASE64
                .decode(trimmed)
                .map(Value::Bytes)
                .map_err(|_| invalid()),
            DataType::Unknown
            | DataType::Char
            | DataType::Varchar
            | DataType::LongVarchar
            | DataType::Clob
            | DataType::CaseInsensitiveText
            | DataType::Json
            | DataType::Other(_) => Ok(Value::String(text.to_string())),
        }
    }
}

/// Maps one vendor's native type names to `DataType`
pub trait TypeMapper: Send + Sync {
    /// Product name this mapper is registered under (e.g. "PostgreSQL")
    fn product_name(&self) -> &str;

    /// Whether the mapper serves a product name reported by a connection
    fn matches_product(&self, product: &str) -> bool {
        product
            .to_ascii_lowercase()
            .contains(&self.product_name().to_ascii_lowercase())
    }

    /// Map a native type name
    fn data_type(&self, native_type: &str) -> DataType {
        standard_data_type(native_type)
    }
}

/// Optional vendor type support registered alongside a mapper
pub trait TypeExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Map a native type this extension understands, `None` otherwise
    fn data_type(&self, native_type: &str) -> Option<DataType>;
}

/// Upper-cased type name without length/precision arguments
fn base_type_name(native_type: &str) -> String {
    let upper = native_type.trim().to_ascii_uppercase();
    match upper.find('(') {
        Some(open) => {
            let after = upper.find(')').map(|close| &upper[close + 1..]).unwrap_or("");
            format!("{}{}", upper[..open].trim_end(), after)
                .trim()
                .to_string()
        }
        None => upper,
    }
}

/// ANSI SQL type names shared by most vendors
pub fn standard_data_type(native_type: &str) -> DataType {
    let base = base_type_name(native_type);
    match base.as_str() {
        "CHAR" | "CHARACTER" | "NCHAR" => DataType::Char,
        "VARCHAR" | "CHARACTER VARYING" | "NVARCHAR" | "VARCHAR_IGNORECASE" => DataType::Varchar,
        "LONGVARCHAR" | "LONG VARCHAR" | "LONGNVARCHAR" => DataType::LongVarchar,
        "CLOB" | "NCLOB" | "CHARACTER LARGE OBJECT" | "TEXT" => DataType::Clob,
        "NUMERIC" => DataType::Numeric,
        "DECIMAL" | "DEC" => DataType::Decimal,
        "BOOLEAN" | "BOOL" | "BIT" => DataType::Boolean,
        "TINYINT" => DataType::TinyInt,
        "SMALLINT" => DataType::SmallInt,
        "INTEGER" | "INT" => DataType::Integer,
        "BIGINT" => DataType::BigInt,
        "REAL" => DataType::Real,
        "FLOAT" => DataType::Float,
        "DOUBLE" | "DOUBLE PRECISION" => DataType::Double,
        "DATE" => DataType::Date,
        "TIME" | "TIME WITHOUT TIME ZONE" => DataType::Time,
        "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" | "DATETIME" => DataType::Timestamp,
        "TIMESTAMP WITH TIME ZONE" => DataType::TimestampWithTimeZone,
        "BINARY" => DataType::Binary,
        "VARBINARY" | "BINARY VARYING" => DataType::VarBinary,
        "BLOB" | "BINARY LARGE OBJECT" => DataType::Blob,
        "UUID" => DataType::Uuid,
        "JSON" => DataType::Json,
        _ => DataType::Other(native_type.trim().to_string()),
    }
}

/// Fallback mapper for unknown products
#[derive(Debug, Clone, Default)]
pub struct DefaultTypeMapper;

impl TypeMapper for DefaultTypeMapper {
    fn product_name(&self) -> &str {
        "default"
    }

    fn matches_product(&self, _product: &str) -> bool {
        true
    }
}

/// PostgreSQL type mapper
#[derive(Debug, Clone, Default)]
pub struct PostgresTypeMapper;

impl TypeMapper for PostgresTypeMapper {
    fn product_name(&self) -> &str {
        "postgresql"
    }

    fn data_type(&self, native_type: &str) -> DataType {
        match base_type_name(native_type).as_str() {
            "INT2" | "SMALLSERIAL" => DataType::SmallInt,
            "INT4" | "SERIAL" => DataType::Integer,
            "INT8" | "BIGSERIAL" => DataType::BigInt,
            "FLOAT4" => DataType::Real,
            "FLOAT8" => DataType::Double,
            "BOOL" => DataType::Boolean,
            "BPCHAR" => DataType::Char,
            "TEXT" => DataType::LongVarchar,
            "BYTEA" => DataType::VarBinary,
            "JSONB" => DataType::Json,
            "TIMESTAMPTZ" => DataType::TimestampWithTimeZone,
            "MONEY" => DataType::Decimal,
            "BIT" => DataType::Binary,
            _ => standard_data_type(native_type),
        }
    }
}

/// Oracle type mapper
#[derive(Debug, Clone, Default)]
pub struct OracleTypeMapper;

impl TypeMapper for OracleTypeMapper {
    fn product_name(&self) -> &str {
        "oracle"
    }

    fn data_type(&self, native_type: &str) -> DataType {
        match base_type_name(native_type).as_str() {
            "NUMBER" => DataType::Decimal,
            // Oracle DATE carries a time of day
            "DATE" => DataType::Timestamp,
            "VARCHAR2" | "NVARCHAR2" => DataType::Varchar,
            "LONG" => DataType::LongVarchar,
            "RAW" => DataType::VarBinary,
            "LONG RAW" => DataType::Blob,
            "BINARY_FLOAT" => DataType::Float,
            "BINARY_DOUBLE" => DataType::Double,
            "XMLTYPE" => DataType::Clob,
            other if other.starts_with("TIMESTAMP") && other.ends_with("WITH TIME ZONE") => {
                DataType::TimestampWithTimeZone
            }
            other if other.starts_with("TIMESTAMP") => DataType::Timestamp,
            _ => standard_data_type(native_type),
        }
    }
}

/// H2 type mapper
#[derive(Debug, Clone, Default)]
pub struct H2TypeMapper;

impl TypeMapper for H2TypeMapper {
    fn product_name(&self) -> &str {
        "h2"
    }

    fn data_type(&self, native_type: &str) -> DataType {
        match base_type_name(native_type).as_str() {
            "VARCHAR_IGNORECASE" => DataType::CaseInsensitiveText,
            "IDENTITY" => DataType::BigInt,
            "OTHER" | "JAVA_OBJECT" => DataType::Blob,
            "ENUM" => DataType::Varchar,
            _ => standard_data_type(native_type),
        }
    }
}

/// Microsoft SQL Server type mapper
#[derive(Debug, Clone, Default)]
pub struct MsSqlTypeMapper;

impl TypeMapper for MsSqlTypeMapper {
    fn product_name(&self) -> &str {
        "microsoft sql server"
    }

    fn data_type(&self, native_type: &str) -> DataType {
        match base_type_name(native_type).as_str() {
            "NTEXT" | "TEXT" => DataType::Clob,
            "UNIQUEIDENTIFIER" => DataType::Uuid,
            "DATETIME" | "DATETIME2" | "SMALLDATETIME" => DataType::Timestamp,
            "DATETIMEOFFSET" => DataType::TimestampWithTimeZone,
            "MONEY" | "SMALLMONEY" => DataType::Decimal,
            "IMAGE" => DataType::Blob,
            "INT IDENTITY" => DataType::Integer,
            "BIGINT IDENTITY" => DataType::BigInt,
            _ => standard_data_type(native_type),
        }
    }
}

/// MySQL / MariaDB type mapper
#[derive(Debug, Clone, Default)]
pub struct MySqlTypeMapper;

impl TypeMapper for MySqlTypeMapper {
    fn product_name(&self) -> &str {
        "mysql"
    }

    fn matches_product(&self, product: &str) -> bool {
        let lower = product.to_ascii_lowercase();
        lower.contains("mysql") || lower.contains("mariadb")
    }

    fn data_type(&self, native_type: &str) -> DataType {
        let upper = native_type.trim().to_ascii_uppercase();
        if upper == "TINYINT(1)" {
            return DataType::Boolean;
        }
        match base_type_name(native_type).as_str() {
            "MEDIUMINT" => DataType::Integer,
            "TINYTEXT" => DataType::Varchar,
            "TEXT" | "MEDIUMTEXT" | "LONGTEXT" => DataType::Clob,
            "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => DataType::Blob,
            "YEAR" => DataType::SmallInt,
            "ENUM" | "SET" => DataType::Varchar,
            _ => standard_data_type(native_type),
        }
    }
}

/// SQLite type mapper, following SQLite's type affinity rules
#[derive(Debug, Clone, Default)]
pub struct SqliteTypeMapper;

impl TypeMapper for SqliteTypeMapper {
    fn product_name(&self) -> &str {
        "sqlite"
    }

    fn data_type(&self, native_type: &str) -> DataType {
        let base = base_type_name(native_type);
        match base.as_str() {
            "" => return DataType::Blob,
            "DATE" => return DataType::Date,
            "TIME" => return DataType::Time,
            "DATETIME" | "TIMESTAMP" => return DataType::Timestamp,
            "BOOLEAN" | "BOOL" => return DataType::Boolean,
            "UUID" => return DataType::Uuid,
            "JSON" => return DataType::Json,
            _ => {}
        }
        if base.contains("INT") {
            DataType::BigInt
        } else if base.contains("CHAR") || base.contains("CLOB") || base.contains("TEXT") {
            DataType::Varchar
        } else if base.contains("BLOB") {
            DataType::Blob
        } else if base.contains("REAL") || base.contains("FLOA") || base.contains("DOUB") {
            DataType::Double
        } else {
            DataType::Numeric
        }
    }
}

/// PostgreSQL `citext` support
#[derive(Debug, Clone, Default)]
pub struct CitextExtension;

impl TypeExtension for CitextExtension {
    fn name(&self) -> &str {
        "citext"
    }

    fn data_type(&self, native_type: &str) -> Option<DataType> {
        native_type
            .trim()
            .eq_ignore_ascii_case("citext")
            .then_some(DataType::CaseInsensitiveText)
    }
}

struct RegisteredExtension {
    product: String,
    extension: Box<dyn TypeExtension>,
}

/// Registry of type mappers keyed by database product name
pub struct TypeMapperRegistry {
    mappers: Vec<Box<dyn TypeMapper>>,
    fallback: Box<dyn TypeMapper>,
    extensions: Vec<RegisteredExtension>,
}

impl std::fmt::Debug for TypeMapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMapperRegistry")
            .field(
                "mappers",
                &self.mappers.iter().map(|m| m.product_name()).collect::<Vec<_>>(),
            )
            .field(
                "extensions",
                &self
                    .extensions
                    .iter()
                    .map(|e| format!("{}:{}", e.product, e.extension.name()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for TypeMapperRegistry {
    fn default() -> Self {
        Self::with_builtin_mappers()
    }
}

impl TypeMapperRegistry {
    /// An empty registry that resolves every product to `DefaultTypeMapper`
    pub fn empty() -> Self {
        Self {
            mappers: Vec::new(),
            fallback: Box::new(DefaultTypeMapper),
            extensions: Vec::new(),
        }
    }

    /// A registry with every built-in vendor mapper
    pub fn with_builtin_mappers() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PostgresTypeMapper));
        registry.register(Box::new(OracleTypeMapper));
        registry.register(Box::new(H2TypeMapper));
        registry.register(Box::new(MsSqlTypeMapper));
        registry.register(Box::new(MySqlTypeMapper));
        registry.register(Box::new(SqliteTypeMapper));
        registry
    }

    /// Register a mapper. Later registrations win over earlier ones.
    pub fn register(&mut self, mapper: Box<dyn TypeMapper>) {
        tracing::debug!(product = %mapper.product_name(), "registering type mapper");
        self.mappers.insert(0, mapper);
    }

    /// Register an extension for every product whose name contains `product`
    pub fn register_extension(
        &mut self,
        product: impl Into<String>,
        extension: Box<dyn TypeExtension>,
    ) {
        let product = product.into();
        tracing::debug!(product = %product, extension = %extension.name(), "registering type extension");
        self.extensions.push(RegisteredExtension {
            product: product.to_ascii_lowercase(),
            extension,
        });
    }

    /// Resolve the mapper (and extensions) for a product name
    pub fn resolve(&self, product: &str) -> ResolvedTypeMapper<'_> {
        let mapper = self
            .mappers
            .iter()
            .find(|m| m.matches_product(product))
            .map(|m| m.as_ref())
            .unwrap_or_else(|| {
                tracing::debug!(product = %product, "no type mapper registered, using default");
                self.fallback.as_ref()
            });
        let lower = product.to_ascii_lowercase();
        let extensions = self
            .extensions
            .iter()
            .filter(|e| lower.contains(&e.product))
            .map(|e| e.extension.as_ref())
            .collect();
        ResolvedTypeMapper { mapper, extensions }
    }
}

/// A vendor mapper combined with its registered extensions
pub struct ResolvedTypeMapper<'a> {
    mapper: &'a dyn TypeMapper,
    extensions: Vec<&'a dyn TypeExtension>,
}

impl ResolvedTypeMapper<'_> {
    pub fn product_name(&self) -> &str {
        self.mapper.product_name()
    }

    /// Map a native type; extensions are consulted before the vendor mapper
    pub fn data_type(&self, native_type: &str) -> DataType {
        self.extensions
            .iter()
            .find_map(|e| e.data_type(native_type))
            .unwrap_or_else(|| self.mapper.data_type(native_type))
    }
}
