use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::core::error::{Error, Result};
use crate::core::types::DocId;

#[derive(Debug, Clone)]
pub struct MetadataEntry {
    pub title: String,
    pub authors: String,
}

/// `doc_id -> {title, authors}` table, loaded in full at startup.
/// Separator is `|`, escaped to `\|` in input fields with backslash
/// escaping so titles and author lists may contain the literal character.
pub struct MetadataStore {
    entries: HashMap<u32, MetadataEntry>,
}

fn escape(field: &str) -> String {
    field.replace('\\', "\\\\").replace('|', "\\|")
}

fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits on unescaped `|` characters.
fn split_escaped(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == '|' {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields.into_iter().map(|f| unescape(&f)).collect()
}

impl MetadataStore {
    pub fn new() -> Self {
        MetadataStore { entries: HashMap::new() }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut store = MetadataStore::new();
        if !path.exists() {
            return Ok(store);
        }
        let data = fs::read_to_string(path)?;
        for (lineno, line) in data.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields = split_escaped(line);
            if fields.len() < 2 {
                return Err(Error::corrupt(format!(
                    "document_metadata.txt:{}: malformed line", lineno + 1
                )));
            }
            let doc_id: u32 = fields[0]
                .parse()
                .map_err(|_| Error::corrupt(format!("document_metadata.txt:{}: bad doc_id", lineno + 1)))?;
            let title = fields[1].clone();
            let authors = fields.get(2).cloned().unwrap_or_default();
            store.entries.insert(doc_id, MetadataEntry { title, authors });
        }
        Ok(store)
    }

    pub fn append(&mut self, path: &Path, doc_id: DocId, title: &str, authors: &str) -> Result<()> {
        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(f, "{}|{}|{}", doc_id.0, escape(title), escape(authors))?;
        self.entries.insert(doc_id.0, MetadataEntry { title: title.to_string(), authors: authors.to_string() });
        Ok(())
    }

    pub fn get(&self, doc_id: DocId) -> Option<&MetadataEntry> {
        self.entries.get(&doc_id.0)
    }

    /// Truncates the title for display only; the persisted form is never
    /// truncated.
    pub fn display_title(&self, doc_id: DocId, cap: usize) -> Option<String> {
        self.get(doc_id).map(|e| {
            if e.title.chars().count() > cap {
                e.title.chars().take(cap).collect()
            } else {
                e.title.clone()
            }
        })
    }

    pub fn max_doc_id(&self) -> Option<u32> {
        self.entries.keys().copied().max()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MetadataStore {
    fn default() -> Self {
        MetadataStore::new()
    }
}
