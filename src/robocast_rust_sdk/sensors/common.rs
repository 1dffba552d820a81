use crate::robocast_rust_sdk::error::Result;
use crate::robocast_rust_sdk::io::write_atomic;
use camino::Utf8Path;
use std::io::Write;

pub trait CsvSaveable {
    fn get_csv_headers() -> &'static str;
    fn to_csv_row(&self) -> String;
}

/// Rows of one fixed schema extracted from a single topic, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorTable<T> {
    rows: Vec<T>,
    topic: String,
}

impl<T> SensorTable<T> {
    pub fn new(topic: &str) -> Self {
        Self {
            rows: Vec::new(),
            topic: topic.to_string(),
        }
    }

    pub(crate) fn add(&mut self, row: T) {
        self.rows.push(row);
    }

    pub fn get_topic(&self) -> &str {
        &self.topic
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T> SensorTable<T>
where
    T: CsvSaveable,
{
    /// Writes the header line and one line per row. An empty table still gets its header.
    /// The file appears complete or not at all.
    pub fn save<P: AsRef<Utf8Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        write_atomic(path, |writer| {
            writeln!(writer, "{}", T::get_csv_headers())?;
            for row in &self.rows {
                writeln!(writer, "{}", row.to_csv_row())?;
            }
            Ok(())
        })?;
        tracing::debug!(path = %path, rows = self.rows.len(), "saved table");
        Ok(())
    }
}
