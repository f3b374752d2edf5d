use crate::error::{Error, Result};
use crate::model::{DocId, InvertedList, Model, QueryId, QuerySet, RankedHit, RankedResults};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const MODEL_VERSION: u32 = 1;
const DELIMITER: char = ';';

#[derive(Serialize)]
struct ModelFileRef<'a> {
    version: u32,
    model: &'a Model,
}

#[derive(Deserialize)]
struct ModelFile {
    version: u32,
    model: Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub num_docs: usize,
    pub num_terms: usize,
    pub created_at: String,
}

impl MetaFile {
    pub fn describe(model: &Model) -> Result<Self> {
        Ok(Self {
            version: MODEL_VERSION,
            num_docs: model.num_documents(),
            num_terms: model.num_terms(),
            created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339)?,
        })
    }
}

/// Where the sidecar metadata of a model artifact lives.
pub fn meta_path(model_path: &Path) -> PathBuf {
    let mut name = model_path.as_os_str().to_os_string();
    name.push(".meta.json");
    PathBuf::from(name)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound { path: path.to_path_buf() },
        _ => Error::Io(e),
    })
}

/// Writes through a sibling `.partial` file that is renamed over `path` only
/// once `write` succeeded, so failures leave nothing behind.
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            tracing::info!(dir = %dir.display(), "creating output directory");
            fs::create_dir_all(dir)?;
        }
    }
    let mut partial = path.as_os_str().to_os_string();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let result = File::create(&partial).map_err(Error::from).and_then(|f| {
        let mut w = BufWriter::new(f);
        write(&mut w)?;
        w.flush()?;
        Ok(())
    });
    match result {
        Ok(()) => Ok(fs::rename(&partial, path)?),
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

/// Strips CSV quoting from a field, undoing doubled quotes.
fn unquote(field: &str) -> String {
    let field = field.trim();
    match field.strip_prefix('"').and_then(|f| f.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => field.to_string(),
    }
}

/// Splits at most `arity` fields on the delimiter. Delimiters inside a quoted
/// run do not count; the last field takes the rest of the line.
fn split_fields(line: &str, arity: usize) -> Vec<String> {
    let mut fields = Vec::with_capacity(arity);
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        if fields.len() + 1 >= arity {
            break;
        }
        match c {
            '"' => quoted = !quoted,
            DELIMITER if !quoted => {
                fields.push(unquote(&line[start..i]));
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    fields.push(unquote(&line[start..]));
    fields
}

/// Reads a delimited file, skipping the header line. Yields `(line, fields)`
/// with 1-based line numbers; blank lines are ignored.
fn read_records(path: &Path, arity: usize) -> Result<Vec<(usize, Vec<String>)>> {
    let reader = BufReader::new(open(path)?);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if idx == 0 || line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(&line, arity);
        if fields.len() != arity {
            return Err(Error::malformed(path, idx + 1, format!("expected {arity} fields, found {}", fields.len())));
        }
        records.push((idx + 1, fields));
    }
    Ok(records)
}

fn parse_id(path: &Path, line: usize, field: &str) -> Result<u32> {
    match field.parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::malformed(path, line, format!("invalid identifier {field:?}"))),
        Ok(id) => Ok(id),
    }
}

/// Loads `TERM;[1, 2, 2]` records. Any bad record aborts the load.
pub fn load_inverted_list(path: &Path) -> Result<InvertedList> {
    let mut list = InvertedList::new();
    for (line, fields) in read_records(path, 2)? {
        let occurrences: Vec<DocId> = serde_json::from_str(&fields[1])
            .map_err(|e| Error::malformed(path, line, format!("bad occurrence list: {e}")))?;
        list.insert(fields[0].clone(), occurrences).map_err(|e| e.at(path, line))?;
    }
    Ok(list)
}

pub fn save_inverted_list(path: &Path, list: &InvertedList) -> Result<()> {
    write_atomically(path, |w| {
        writeln!(w, "Palavra{DELIMITER}Documentos")?;
        for (term, docs) in list.iter() {
            let docs = docs.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ");
            writeln!(w, "{term}{DELIMITER}[{docs}]")?;
        }
        Ok(())
    })
}

pub fn load_queries(path: &Path) -> Result<QuerySet> {
    let mut queries = QuerySet::new();
    for (line, fields) in read_records(path, 2)? {
        let id = parse_id(path, line, &fields[0])?;
        if queries.insert(id, fields[1].clone()).is_some() {
            return Err(Error::malformed(path, line, format!("duplicate query {id}")));
        }
    }
    Ok(queries)
}

pub fn save_queries(path: &Path, queries: &QuerySet) -> Result<()> {
    write_atomically(path, |w| {
        writeln!(w, "QueryNumber{DELIMITER}QueryText")?;
        for (id, text) in queries {
            writeln!(w, "{id}{DELIMITER}{}", text.replace(DELIMITER, ""))?;
        }
        Ok(())
    })
}

pub fn save_results(path: &Path, results: &RankedResults) -> Result<()> {
    write_atomically(path, |w| {
        writeln!(w, "QueryNumber{DELIMITER}Results")?;
        for (id, hits) in results {
            let triples: Vec<(usize, DocId, f64)> = hits.iter().map(|h| (h.rank, h.doc_id, h.score)).collect();
            writeln!(w, "{id}{DELIMITER}{}", serde_json::to_string(&triples)?)?;
        }
        Ok(())
    })
}

pub fn load_results(path: &Path) -> Result<RankedResults> {
    let mut results = RankedResults::new();
    for (line, fields) in read_records(path, 2)? {
        let id = parse_id(path, line, &fields[0])?;
        let triples: Vec<(usize, DocId, f64)> = serde_json::from_str(&fields[1])
            .map_err(|e| Error::malformed(path, line, format!("bad result list: {e}")))?;
        let hits = triples
            .into_iter()
            .map(|(rank, doc_id, score)| RankedHit { rank, doc_id, score })
            .collect();
        results.insert(id, hits);
    }
    Ok(results)
}

/// Query id → (document id → votes).
pub type Expected = BTreeMap<QueryId, BTreeMap<DocId, u32>>;

pub fn save_expected(path: &Path, expected: &Expected) -> Result<()> {
    write_atomically(path, |w| {
        writeln!(w, "QueryNumber{DELIMITER}DocNumber{DELIMITER}DocVotes")?;
        for (query, docs) in expected {
            for (doc, votes) in docs {
                writeln!(w, "{query}{DELIMITER}{doc}{DELIMITER}{votes}")?;
            }
        }
        Ok(())
    })
}

pub fn load_expected(path: &Path) -> Result<Expected> {
    let mut expected = Expected::new();
    for (line, fields) in read_records(path, 3)? {
        let query = parse_id(path, line, &fields[0])?;
        let doc = parse_id(path, line, &fields[1])?;
        let votes = fields[2]
            .parse::<u32>()
            .map_err(|_| Error::malformed(path, line, format!("invalid vote count {:?}", fields[2])))?;
        expected.entry(query).or_default().insert(doc, votes);
    }
    Ok(expected)
}

pub fn save_model(path: &Path, model: &Model) -> Result<()> {
    let envelope = ModelFileRef { version: MODEL_VERSION, model };
    let bytes = bincode::serialize(&envelope)?;
    write_atomically(path, |w| Ok(w.write_all(&bytes)?))
}

pub fn load_model(path: &Path) -> Result<Model> {
    let mut buf = Vec::new();
    open(path)?.read_to_end(&mut buf)?;
    // The version leads the envelope; check it before trusting the layout.
    let version: u32 = match buf.get(..4) {
        Some(head) => bincode::deserialize(head)?,
        None => return Err(Error::ModelFormat(format!("{} bytes is too short for a model", buf.len()))),
    };
    if version != MODEL_VERSION {
        return Err(Error::ModelFormat(format!("model version {version} (expected {MODEL_VERSION})")));
    }
    let envelope: ModelFile = bincode::deserialize(&buf)?;
    Ok(envelope.model)
}

pub fn save_meta(model_path: &Path, meta: &MetaFile) -> Result<()> {
    let json = serde_json::to_string_pretty(meta)?;
    write_atomically(&meta_path(model_path), |w| Ok(w.write_all(json.as_bytes())?))
}

pub fn load_meta(model_path: &Path) -> Result<MetaFile> {
    let mut buf = String::new();
    open(&meta_path(model_path))?.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}
