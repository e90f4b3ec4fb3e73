use super::error::FieldError;

/// Largest string field the reader will hand out, including the terminator
/// slot the database client reserves
pub const BUFFER_SIZE: usize = 1024;

/// One row of a dataset, fields kept as the raw text the service sent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuple {
    fields: Vec<String>,
}

/// Tuple table returned by one data request, header rows included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Tuple>,
}

impl Tuple {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn field(&self, column: usize) -> Result<&str, FieldError> {
        self.fields
            .get(column)
            .map(|f| f.trim())
            .ok_or(FieldError::OutOfRange {
                column,
                fields: self.fields.len(),
            })
    }

    pub fn long_value(&self, column: usize) -> Result<i64, FieldError> {
        let field = self.field(column)?;
        field
            .parse()
            .map_err(|_| FieldError::NotInteger(field.to_string()))
    }

    /// Channel ids are unsigned, so the key column is read through here
    pub fn unsigned_value(&self, column: usize) -> Result<u64, FieldError> {
        let field = self.field(column)?;
        field
            .parse()
            .map_err(|_| FieldError::NotInteger(field.to_string()))
    }

    pub fn double_value(&self, column: usize) -> Result<f64, FieldError> {
        let field = self.field(column)?;
        field
            .parse()
            .map_err(|_| FieldError::NotFloat(field.to_string()))
    }

    /// Cut to at most `BUFFER_SIZE - 1` bytes, on a char boundary
    pub fn string_value(&self, column: usize) -> Result<String, FieldError> {
        let field = self.fields.get(column).ok_or(FieldError::OutOfRange {
            column,
            fields: self.fields.len(),
        })?;

        let mut end = field.len().min(BUFFER_SIZE - 1);
        while !field.is_char_boundary(end) {
            end -= 1;
        }
        Ok(field[..end].to_string())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl Dataset {
    pub fn new(rows: Vec<Tuple>) -> Self {
        Self { rows }
    }

    /// Parses the CSV body of a data response. Rows may have different
    /// widths (the interval rows hold a single field). Quoted fields may
    /// contain commas, newlines and `""` escapes. Blank lines are skipped.
    pub fn from_csv(body: &str) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(body.as_bytes());

        let rows = reader
            .records()
            .map(|record| Ok(Tuple::from(record?)))
            .collect::<Result<Vec<_>, csv::Error>>()?;
        Ok(Self { rows })
    }

    pub fn tuple(&self, row: usize) -> Option<&Tuple> {
        self.rows.get(row)
    }

    /// Total rows, header rows included
    pub fn num_tuples(&self) -> usize {
        self.rows.len()
    }
}

impl From<csv::StringRecord> for Tuple {
    fn from(record: csv::StringRecord) -> Self {
        Self::new(record.iter().map(str::to_string).collect())
    }
}
