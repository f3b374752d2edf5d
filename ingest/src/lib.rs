//! Upstream collaborators of the vector model: turn XML document collections
//! into an inverted-list file and XML query files into a query-set file plus
//! expected results.
//!
//! Element names match exactly and only among direct children, so a `RECORD`
//! nested below another element is not a record.

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use vsm::config::{InvertConfig, QueryConfig};
use vsm::persist::{save_expected, save_inverted_list, save_queries, Expected};
use vsm::tokenizer::{normalize_query, tokenize};
use vsm::{DocId, InvertedList, QueryId, QuerySet};
use walkdir::WalkDir;

/// A document that made it into the inverted list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: DocId,
    pub text: String,
}

/// Element tree of a well-formed document. `text` holds only the element's
/// own character data, not that of its children.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn open(e: &BytesStart) -> Self {
        let attrs = e
            .attributes()
            .flatten()
            .map(|attr| {
                (
                    String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                    String::from_utf8_lossy(&attr.value).into_owned(),
                )
            })
            .collect();
        Self { name: String::from_utf8_lossy(e.name().as_ref()).into_owned(), attrs, ..Default::default() }
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn child<'a>(&'a self, name: &str) -> Option<&'a Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the first `name` child, when it has any.
    fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str()).filter(|t| !t.trim().is_empty())
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// Reads `xml` into an element tree. Mismatched or unclosed tags, bad
/// escapes and a missing root element are errors.
fn parse_tree(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => open.push(Element::open(e)),
            Ok(Event::Empty(ref e)) => attach(&mut open, &mut root, Element::open(e))?,
            Ok(Event::End(ref e)) => {
                let element = open.pop().ok_or_else(|| anyhow!("closing tag without an open element"))?;
                if e.name().as_ref() != element.name.as_bytes() {
                    bail!(
                        "closing tag </{}> does not match <{}>",
                        String::from_utf8_lossy(e.name().as_ref()),
                        element.name
                    );
                }
                attach(&mut open, &mut root, element)?;
            }
            Ok(Event::Text(ref e)) => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&e.unescape().context("invalid XML text content")?);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("XML parse error at byte {}: {e}", reader.buffer_position()),
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        bail!("unexpected end of document inside <{}>", unclosed.name);
    }
    root.ok_or_else(|| anyhow!("document has no root element"))
}

fn attach(open: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => bail!("more than one root element"),
        None => *root = Some(element),
    }
    Ok(())
}

/// Expands directories into the `.xml` files below them, in path order.
pub fn collect_sources(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("xml"))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Extracts every usable `RECORD` of a collection. The text is the
/// `ABSTRACT`, or the `EXTRACT` when there is no abstract. Records without a
/// valid number or without text are skipped with a warning; a document that
/// is not well-formed is an error.
pub fn parse_collection(xml: &str) -> Result<Vec<Record>> {
    let root = parse_tree(xml)?;
    let mut records = Vec::new();
    for record in root.children_named("RECORD") {
        let Some(raw_id) = record.child_text("RECORDNUM") else {
            tracing::warn!("record without RECORDNUM skipped");
            continue;
        };
        let id = match raw_id.trim().parse::<DocId>() {
            Ok(id) if id > 0 => id,
            _ => {
                tracing::warn!(recordnum = raw_id.trim(), "record with invalid RECORDNUM skipped");
                continue;
            }
        };
        match record.child_text("ABSTRACT").or_else(|| record.child_text("EXTRACT")) {
            Some(text) => records.push(Record { id, text: text.to_string() }),
            None => tracing::warn!(doc_id = id, "record has neither ABSTRACT nor EXTRACT, skipped"),
        }
    }
    Ok(records)
}

/// Tokenizes the records into an inverted list: uppercase terms, one
/// occurrence per token, in document order.
pub fn invert(records: &[Record]) -> Result<InvertedList> {
    let mut postings: BTreeMap<String, Vec<DocId>> = BTreeMap::new();
    for record in records {
        for token in tokenize(&record.text) {
            postings.entry(token.to_uppercase()).or_default().push(record.id);
        }
    }
    let mut list = InvertedList::new();
    for (term, docs) in postings {
        list.insert(term, docs)?;
    }
    Ok(list)
}

/// Reads every source; a file that cannot be read or parsed is logged and
/// skipped as a whole.
pub fn read_collections(inputs: &[PathBuf]) -> Vec<Record> {
    let mut records = Vec::new();
    for path in collect_sources(inputs) {
        tracing::info!(path = %path.display(), "processing collection");
        let parsed = fs::read_to_string(&path)
            .context("cannot read collection")
            .and_then(|xml| parse_collection(&xml).context("cannot parse collection"));
        match parsed {
            Ok(found) => records.extend(found),
            Err(e) => tracing::error!(path = %path.display(), "{e:#}"),
        }
    }
    records
}

pub fn run_invert(cfg: &InvertConfig) -> Result<Option<InvertedList>> {
    let records = read_collections(&cfg.inputs);
    tracing::info!(documents = records.len(), "documents processed");
    let list = invert(&records)?;
    tracing::info!(terms = list.num_terms(), "inverted list built");
    if list.is_empty() {
        tracing::warn!("inverted list is empty, no output written");
        return Ok(None);
    }
    save_inverted_list(&cfg.output, &list).with_context(|| format!("writing {}", cfg.output.display()))?;
    tracing::info!(output = %cfg.output.display(), "inverted list written");
    Ok(Some(list))
}

/// Parses a query file into normalized queries and expected-result votes.
/// Any `Item` with a score above zero counts as one vote for its document.
pub fn parse_queries(xml: &str) -> Result<(QuerySet, Expected)> {
    let root = parse_tree(xml)?;
    let mut queries = QuerySet::new();
    let mut expected = Expected::new();
    for query in root.children_named("QUERY") {
        let raw_id = query.child_text("QueryNumber").ok_or_else(|| anyhow!("QUERY without QueryNumber"))?;
        let id: QueryId = raw_id
            .trim()
            .parse()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| anyhow!("invalid QueryNumber {:?}", raw_id.trim()))?;
        let text = query.child_text("QueryText").ok_or_else(|| anyhow!("query {id} has no QueryText"))?;
        queries.insert(id, normalize_query(text).replace(';', ""));

        let Some(records) = query.child("Records") else { continue };
        for item in records.children_named("Item") {
            let score = item.attr("score").ok_or_else(|| anyhow!("query {id}: Item without score"))?.trim();
            let score: u64 = score.parse().map_err(|_| anyhow!("query {id}: invalid score {score:?}"))?;
            if score == 0 {
                continue;
            }
            let doc_id: DocId = item
                .text
                .trim()
                .parse()
                .map_err(|_| anyhow!("query {id}: invalid document number {:?}", item.text.trim()))?;
            *expected.entry(id).or_default().entry(doc_id).or_insert(0) += 1;
        }
    }
    Ok((queries, expected))
}

pub fn run_queries(cfg: &QueryConfig) -> Result<(QuerySet, Expected)> {
    let xml = read_required(&cfg.input)?;
    let (queries, expected) = parse_queries(&xml).with_context(|| format!("parsing {}", cfg.input.display()))?;
    tracing::info!(queries = queries.len(), "queries processed");
    save_queries(&cfg.queries, &queries).with_context(|| format!("writing {}", cfg.queries.display()))?;
    save_expected(&cfg.expected, &expected).with_context(|| format!("writing {}", cfg.expected.display()))?;
    tracing::info!(queries = %cfg.queries.display(), expected = %cfg.expected.display(), "query files written");
    Ok((queries, expected))
}

fn read_required(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => vsm::Error::NotFound { path: path.to_path_buf() }.into(),
        _ => anyhow::Error::new(e).context(format!("reading {}", path.display())),
    })
}
