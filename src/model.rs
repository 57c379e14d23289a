use std::fmt;

use gdal::vector::{FieldValue, Geometry, OGRFieldType};

use crate::crs::Crs;
use crate::error::{Error, Result};

/// Attribute column type, reduced to the field kinds a shapefile can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Integer64,
    Real,
    Text,
    Date,
    DateTime,
}

impl ColumnKind {
    pub fn from_ogr(field_type: OGRFieldType::Type) -> Self {
        match field_type {
            OGRFieldType::OFTInteger => ColumnKind::Integer,
            OGRFieldType::OFTInteger64 => ColumnKind::Integer64,
            OGRFieldType::OFTReal => ColumnKind::Real,
            OGRFieldType::OFTDate => ColumnKind::Date,
            OGRFieldType::OFTDateTime => ColumnKind::DateTime,
            _ => ColumnKind::Text,
        }
    }

    pub fn to_ogr(self) -> OGRFieldType::Type {
        match self {
            ColumnKind::Integer => OGRFieldType::OFTInteger,
            ColumnKind::Integer64 => OGRFieldType::OFTInteger64,
            ColumnKind::Real => OGRFieldType::OFTReal,
            ColumnKind::Text => OGRFieldType::OFTString,
            ColumnKind::Date => OGRFieldType::OFTDate,
            ColumnKind::DateTime => OGRFieldType::OFTDateTime,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    /// Field width as stored in the DBF; 0 lets the driver choose.
    pub width: i32,
    pub precision: i32,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            width: 0,
            precision: 0,
        }
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    /// ISO-8601 date, `YYYY-MM-DD`.
    Date(String),
    DateTime(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<Option<FieldValue>> for Value {
    fn from(value: Option<FieldValue>) -> Self {
        match value {
            None => Value::Null,
            Some(FieldValue::IntegerValue(v)) => Value::Integer(v as i64),
            Some(FieldValue::Integer64Value(v)) => Value::Integer(v),
            Some(FieldValue::RealValue(v)) => Value::Real(v),
            Some(FieldValue::StringValue(v)) => Value::Text(v),
            Some(FieldValue::DateValue(v)) => Value::Date(v.to_string()),
            Some(FieldValue::DateTimeValue(v)) => Value::DateTime(v.to_rfc3339()),
            Some(FieldValue::IntegerListValue(v)) => Value::Text(format!("{:?}", v)),
            Some(FieldValue::Integer64ListValue(v)) => Value::Text(format!("{:?}", v)),
            Some(FieldValue::RealListValue(v)) => Value::Text(format!("{:?}", v)),
            Some(FieldValue::StringListValue(v)) => Value::Text(format!("{:?}", v)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Text(v) | Value::Date(v) | Value::DateTime(v) => f.write_str(v),
        }
    }
}

/// One feature: an optional geometry plus one value per column.
#[derive(Clone)]
pub struct Record {
    pub geometry: Option<Geometry>,
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(geometry: Option<Geometry>, values: Vec<Value>) -> Self {
        Self { geometry, values }
    }

    pub fn geometry_wkt(&self) -> Option<String> {
        self.geometry.as_ref().and_then(|g| g.wkt().ok())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("geometry", &self.geometry_wkt())
            .field("values", &self.values)
            .finish()
    }
}

/// Axis-aligned bounding box in dataset coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn of(geometry: &Geometry) -> Option<Self> {
        if geometry.is_empty() {
            return None;
        }
        let envelope = geometry.envelope();
        Some(Self {
            min_x: envelope.MinX,
            min_y: envelope.MinY,
            max_x: envelope.MaxX,
            max_y: envelope.MaxY,
        })
    }

    pub fn union(self, other: Extent) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// The loaded vector dataset: ordered columns, ordered records and a CRS.
#[derive(Debug, Clone)]
pub struct GeoDataset {
    columns: Vec<Column>,
    records: Vec<Record>,
    crs: Option<Crs>,
}

impl GeoDataset {
    pub fn new(columns: Vec<Column>, records: Vec<Record>, crs: Option<Crs>) -> Result<Self> {
        for (row, record) in records.iter().enumerate() {
            if record.values.len() != columns.len() {
                return Err(Error::RecordShape {
                    row,
                    expected: columns.len(),
                    found: record.values.len(),
                });
            }
        }

        Ok(Self {
            columns,
            records,
            crs,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    pub fn value(&self, row: usize, col: usize) -> &Value {
        &self.records[row].values[col]
    }

    pub fn geometry(&self, row: usize) -> Option<&Geometry> {
        self.records[row].geometry.as_ref()
    }

    /// Union of all non-empty geometry envelopes.
    pub fn extent(&self) -> Option<Extent> {
        self.records
            .iter()
            .filter_map(|r| r.geometry.as_ref().and_then(Extent::of))
            .reduce(Extent::union)
    }

    /// Same columns, new geometries and CRS. Used by reprojection.
    pub(crate) fn with_geometries(
        &self,
        geometries: Vec<Option<Geometry>>,
        crs: Crs,
    ) -> Self {
        let records = self
            .records
            .iter()
            .zip(geometries)
            .map(|(record, geometry)| Record::new(geometry, record.values.clone()))
            .collect();

        Self {
            columns: self.columns.clone(),
            records,
            crs: Some(crs),
        }
    }
}
