use std::fmt;
use std::str::FromStr;

use crate::error::MappingError;

// Token that marks a field as having no column.
pub const SKIP_TOKEN: &str = "skip";

// Number of fields in a full row, before any are skipped.
pub const FIELD_COUNT: usize = 4;

// The fixed set of waypoint fields a mapping places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Lat,
    Lon,
    Name,
    Desc,
}

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [Field::Lat, Field::Lon, Field::Name, Field::Desc];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Lat => "lat",
            Field::Lon => "lon",
            Field::Name => "name",
            Field::Desc => "desc",
        }
    }

    fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| MappingError::UnknownField {
                field: s.to_string(),
            })
    }
}

// Where an optional field lives in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Index(usize),
    Skip,
}

impl Column {
    pub fn index(self) -> Option<usize> {
        match self {
            Column::Index(index) => Some(index),
            Column::Skip => None,
        }
    }

    pub fn is_skip(self) -> bool {
        matches!(self, Column::Skip)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Index(index) => write!(f, "{index}"),
            Column::Skip => f.write_str(SKIP_TOKEN),
        }
    }
}

/// Positional layout of waypoint fields within a CSV row.
///
/// Latitude and longitude always have a column; name and description may be
/// skipped. Parsed from strings such as `lat:1,lon:0,name:skip,desc:2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub lat: usize,
    pub lon: usize,
    pub name: Column,
    pub desc: Column,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        ColumnMapping {
            lat: 0,
            lon: 1,
            name: Column::Index(2),
            desc: Column::Index(3),
        }
    }
}

impl ColumnMapping {
    pub fn column(&self, field: Field) -> Column {
        match field {
            Field::Lat => Column::Index(self.lat),
            Field::Lon => Column::Index(self.lon),
            Field::Name => self.name,
            Field::Desc => self.desc,
        }
    }

    /// Number of columns a written row has: four, less any skipped fields.
    pub fn row_width(&self) -> usize {
        FIELD_COUNT - [self.name, self.desc].iter().filter(|c| c.is_skip()).count()
    }

    /// Checks that the mapped columns cover `0..row_width()` exactly once each.
    /// Required for writing; readers accept gaps and shared columns.
    pub fn check_row_layout(&self) -> Result<(), MappingError> {
        let width = self.row_width();
        let mut owners: Vec<Option<Field>> = vec![None; width];

        for field in Field::ALL {
            let Some(index) = self.column(field).index() else {
                continue;
            };
            let slot = owners.get_mut(index).ok_or(MappingError::IndexOutOfRange {
                field,
                index,
                width,
            })?;
            if let Some(first) = *slot {
                return Err(MappingError::OverlappingIndex {
                    first,
                    second: field,
                    index,
                });
            }
            *slot = Some(field);
        }

        Ok(())
    }
}

impl FromStr for ColumnMapping {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entries: Vec<&str> = s.split(',').collect();
        if entries.len() != FIELD_COUNT {
            return Err(MappingError::EntryCount {
                found: entries.len(),
            });
        }

        let mut columns: [Option<Column>; FIELD_COUNT] = [None; FIELD_COUNT];
        for entry in entries {
            let parts: Vec<&str> = entry.split(':').collect();
            let [field, value] = parts[..] else {
                return Err(MappingError::EntryArity {
                    entry: entry.to_string(),
                });
            };

            let field: Field = field.parse()?;
            let column = if value == SKIP_TOKEN {
                if matches!(field, Field::Lat | Field::Lon) {
                    return Err(MappingError::SkipNotAllowed { field });
                }
                Column::Skip
            } else {
                let index = value
                    .parse::<usize>()
                    .map_err(|_| MappingError::InvalidIndex {
                        field,
                        value: value.to_string(),
                    })?;
                Column::Index(index)
            };

            let slot = &mut columns[field.position()];
            if slot.is_some() {
                return Err(MappingError::DuplicateField { field });
            }
            *slot = Some(column);
        }

        // Four distinct fields were placed, and coordinates never hold `skip`.
        let [
            Some(Column::Index(lat)),
            Some(Column::Index(lon)),
            Some(name),
            Some(desc),
        ] = columns
        else {
            unreachable!("every field is placed exactly once");
        };

        Ok(ColumnMapping {
            lat,
            lon,
            name,
            desc,
        })
    }
}

impl fmt::Display for ColumnMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lat:{},lon:{},name:{},desc:{}",
            self.lat, self.lon, self.name, self.desc
        )
    }
}
