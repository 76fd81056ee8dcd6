use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alignment::AlignmentReport;
use crate::corpus::Corpus;
use crate::error::{ExplorerError, Result};
use crate::matrix::DocumentTopicMatrix;
use crate::topic_modeling::{TopicId, TopicModel};

/// Output wrapper for JSON exports.
#[derive(Debug, Serialize)]
pub struct Export<'a, T: Serialize> {
    pub generated_at: DateTime<Utc>,
    pub view: &'a str,
    pub data: &'a T,
}

pub fn write_json<W: Write, T: Serialize>(writer: W, view: &str, data: &T) -> Result<()> {
    let export = Export {
        generated_at: Utc::now(),
        view,
        data,
    };
    serde_json::to_writer_pretty(writer, &export)?;
    Ok(())
}

pub fn write_documents_csv<W: Write>(writer: W, corpus: &Corpus) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["name", "year", "content"])?;
    for document in corpus.documents() {
        let year = document.year.map(|y| y.to_string()).unwrap_or_default();
        csv_writer.write_record([document.name.as_str(), year.as_str(), document.content.as_str()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicKeywords {
    pub topic: TopicId,
    pub words: Vec<String>,
}

/// The `number_of_words` top words of every topic.
pub fn topic_keywords<M: TopicModel>(model: &M, number_of_words: usize) -> Result<Vec<TopicKeywords>> {
    (0..model.num_topics())
        .map(|topic| -> Result<TopicKeywords> {
            let words = model
                .top_words(topic, number_of_words)?
                .into_iter()
                .map(|(word, _)| word)
                .collect();
            Ok(TopicKeywords { topic, words })
        })
        .collect()
}

pub fn write_topics_csv<W: Write>(writer: W, topics: &[TopicKeywords]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["topic", "content"])?;
    for topic in topics {
        csv_writer.write_record([format!("topic_{}", topic.topic), topic.words.join(" ")])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Word weights of one topic, ready for a word cloud.
pub fn word_cloud<M: TopicModel>(model: &M, topic: TopicId, number_of_words: usize) -> Result<BTreeMap<String, f64>> {
    Ok(model.top_words(topic, number_of_words)?.into_iter().collect())
}

fn check_shape(corpus: &Corpus, matrix: &DocumentTopicMatrix) -> Result<()> {
    if corpus.len() != matrix.num_documents() {
        return Err(ExplorerError::configuration(format!(
            "corpus has {} documents but the matrix has {} rows",
            corpus.len(),
            matrix.num_documents()
        )));
    }
    Ok(())
}

/// Document names, years when the corpus has them, then one column per topic.
pub fn write_document_topics_csv<W: Write>(writer: W, corpus: &Corpus, matrix: &DocumentTopicMatrix) -> Result<()> {
    check_shape(corpus, matrix)?;
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["name".to_string()];
    if corpus.has_years() {
        header.push("year".to_string());
    }
    header.extend((0..matrix.num_topics()).map(|topic| topic.to_string()));
    csv_writer.write_record(&header)?;

    for (document, row) in corpus.documents().iter().zip(matrix.rows()) {
        let mut record = vec![document.name.clone()];
        if corpus.has_years() {
            record.push(document.year.map(|y| y.to_string()).unwrap_or_default());
        }
        record.extend(row.iter().map(|weight| weight.to_string()));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_tally_csv<W: Write>(writer: W, marginals: &[f64]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["topic", "weight"])?;
    for (topic, weight) in marginals.iter().enumerate() {
        csv_writer.write_record([topic.to_string(), weight.to_string()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Per-year topic totals, or `None` when the corpus has no `year` column.
pub fn topic_trends(corpus: &Corpus, matrix: &DocumentTopicMatrix) -> Result<Option<BTreeMap<i32, Vec<f64>>>> {
    check_shape(corpus, matrix)?;
    if !corpus.has_years() {
        log::warn!("The corpus has no year column, topic trends are unavailable");
        return Ok(None);
    }
    matrix.yearly_totals(&corpus.years()).map(Some)
}

pub fn write_trends_csv<W: Write>(writer: W, trends: &BTreeMap<i32, Vec<f64>>, num_topics: usize) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut header = vec!["year".to_string()];
    header.extend((0..num_topics).map(|topic| topic.to_string()));
    csv_writer.write_record(&header)?;
    for (year, totals) in trends {
        let mut record = vec![year.to_string()];
        record.extend(totals.iter().map(|t| t.to_string()));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordMatch {
    pub name: String,
    pub year: Option<i32>,
    pub matches: Vec<bool>, // One flag per keyword
    pub score: usize,       // Number of keywords found
}

/// Which of the space-separated `keywords` every document contains.
pub fn keyword_matches(corpus: &Corpus, keywords: &str) -> (Vec<String>, Vec<KeywordMatch>) {
    let keywords: Vec<String> = keywords.split_whitespace().map(str::to_lowercase).collect();
    let rows = corpus
        .documents()
        .iter()
        .map(|document| {
            let content = document.content.to_lowercase();
            let matches: Vec<bool> = keywords.iter().map(|k| content.contains(k.as_str())).collect();
            KeywordMatch {
                name: document.name.clone(),
                year: document.year,
                score: matches.iter().filter(|&&m| m).count(),
                matches,
            }
        })
        .collect();
    (keywords, rows)
}

pub fn write_keyword_matches_csv<W: Write>(writer: W, keywords: &[String], rows: &[KeywordMatch]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut header = vec!["name".to_string(), "year".to_string()];
    header.extend(keywords.iter().cloned());
    header.push("score".to_string());
    csv_writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.name.clone(), row.year.map(|y| y.to_string()).unwrap_or_default()];
        record.extend(row.matches.iter().map(|m| m.to_string()));
        record.push(row.score.to_string());
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Word lists of every topic and run, plus the matched topic per run.
pub fn write_alignment_csv<W: Write>(writer: W, report: &AlignmentReport) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut header = vec!["topic".to_string()];
    header.extend((0..report.num_runs).map(|run| format!("run_{}", run)));
    header.extend((0..report.num_runs).map(|run| format!("match_{}", run)));
    csv_writer.write_record(&header)?;

    for (topic, (words, matches)) in report.topics.iter().zip(&report.matches).enumerate() {
        let mut record = vec![topic.to_string()];
        record.extend(words.iter().cloned());
        record.extend(matches.iter().map(|m| m.to_string()));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}
