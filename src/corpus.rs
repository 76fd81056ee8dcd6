use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub content: String,
    pub year: Option<i32>,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<String>, year: Option<i32>) -> Self {
        Document {
            name: name.into(),
            content: to_ascii(&content.into()),
            year,
        }
    }
}

/// Documents loaded from one corpus table.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    has_year: bool, // Whether the source table carried a `year` column
}

// Keeps sentence punctuation so keyword co-occurrence can still split on ". ".
fn to_ascii(content: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9,\.?!]+").expect("static pattern"))
        .replace_all(content, " ")
        .into_owned()
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        let has_year = !documents.is_empty() && documents.iter().any(|d| d.year.is_some());
        Corpus { documents, has_year }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads a CSV table with `name` and `content` columns and an optional `year` column.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let column = |wanted: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(wanted));
        let (Some(name_col), Some(content_col)) = (column("name"), column("content")) else {
            return Err(ExplorerError::Corpus(
                "the corpus must have a name and a content column".to_string(),
            ));
        };
        let year_col = column("year");

        let mut documents = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            let name = record.get(name_col).unwrap_or("").to_string();
            let content = record.get(content_col).unwrap_or("");
            let year = match year_col.and_then(|col| record.get(col)).map(str::trim) {
                None | Some("") => None,
                Some(value) => Some(parse_year(value).ok_or_else(|| {
                    ExplorerError::Corpus(format!("row {}: invalid year {:?}", row + 1, value))
                })?),
            };
            documents.push(Document::new(name, content, year));
        }

        log::info!("Loaded {} documents", documents.len());
        Ok(Corpus {
            documents,
            has_year: year_col.is_some(),
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, index: usize) -> Result<&Document> {
        self.documents.get(index).ok_or(ExplorerError::IndexOutOfBounds {
            index,
            max: self.documents.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Trend analysis is only available when the table had a `year` column.
    pub fn has_years(&self) -> bool {
        self.has_year
    }

    pub fn years(&self) -> Vec<Option<i32>> {
        self.documents.iter().map(|d| d.year).collect()
    }

    pub fn contents(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|d| d.content.as_str())
    }
}

// Spreadsheet exports often write years as floats ("2019.0").
fn parse_year(value: &str) -> Option<i32> {
    value.parse::<i32>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|y| y.fract() == 0.0 && y.abs() < i32::MAX as f64)
            .map(|y| y as i32)
    })
}
