use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};

use crate::request::upload::UploadSpec;

/// Columns every upload table must have
static REQUIRED_COLUMNS: [&str; 3] = ["forward_file", "reverse_file", "name"];

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("can't read upload table {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("upload table has no header row")]
    Empty,
    #[error("upload table is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("line {line}: column '{column}' must not be blank")]
    BlankField { line: usize, column: &'static str },
    #[error("line {line}: invalid value in column '{column}': {message}")]
    InvalidValue { line: usize, column: &'static str, message: String },
}

/// A delimited table of staged files, one upload per row
pub struct UploadTable {
    pub path: PathBuf,
    pub delimiter: char,
    /// Every record is imported into this workspace
    pub workspace: String,
}

impl UploadTable {
    pub fn read(&self) -> Result<Vec<UploadSpec>, InputError> {
        let path: &Path = self.path.as_path();
        info!("Reading upload table at {}", path.display());
        let text = fs::read_to_string(path).map_err(|err| {
            warn!("Can't read upload table at path {}: {}", path.display(), err);
            InputError::Read { path: path.to_path_buf(), source: err }
        })?;
        let uploads = self.parse(&text)?;
        info!("Loaded {} uploads from {}", uploads.len(), path.display());
        Ok(uploads)
    }

    /// Parse table text. The first non-blank line is the header, blank lines are skipped.
    ///
    /// Records are split on line breaks before quotes are considered, so a quoted cell can hold
    /// the delimiter but not a newline.
    pub fn parse(&self, text: &str) -> Result<Vec<UploadSpec>, InputError> {
        let mut lines = text.lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header_line) = lines.next().ok_or(InputError::Empty)?;
        let header = Header::parse(&split_line(header_line, self.delimiter))?;

        let mut uploads = Vec::new();
        for (line_number, line) in lines {
            let row = Row { line: line_number, values: split_line(line, self.delimiter), header: &header };
            let upload = row.to_upload(&self.workspace)?;
            debug!("Line {}: {:?}", line_number, upload);
            uploads.push(upload);
        }
        Ok(uploads)
    }
}

/// Column positions, keyed by canonical column name
struct Header {
    columns: HashMap<&'static str, usize>,
}

impl Header {
    fn parse(names: &[String]) -> Result<Header, InputError> {
        let mut columns = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            if let Some(canonical) = canonical_column(name.trim()) {
                columns.entry(canonical).or_insert(i);
            }
        }
        for required in REQUIRED_COLUMNS {
            if !columns.contains_key(required) {
                return Err(InputError::MissingColumn(required));
            }
        }
        Ok(Header { columns })
    }
}

/// Map a header cell onto the column name used internally, accepting the staging-area names too
fn canonical_column(name: &str) -> Option<&'static str> {
    let column = match name {
        "forward_file" | "fastq_fwd_staging_file_name" => "forward_file",
        "reverse_file" | "fastq_rev_staging_file_name" => "reverse_file",
        "name" => "name",
        "sra_file" | "sra_staging_file_name" => "sra_file",
        "sequencing_tech" => "sequencing_tech",
        "import_type" => "import_type",
        "insert_size_mean" => "insert_size_mean",
        "insert_size_std_dev" => "insert_size_std_dev",
        "interleaved" => "interleaved",
        "read_orientation_outward" => "read_orientation_outward",
        "single_genome" => "single_genome",
        _ => return None,
    };
    Some(column)
}

struct Row<'a> {
    line: usize,
    values: Vec<String>,
    header: &'a Header,
}

impl Row<'_> {
    /// Trimmed cell value, `None` when the column is absent or the cell is blank
    fn get(&self, column: &'static str) -> Option<&str> {
        let i = *self.header.columns.get(column)?;
        self.values.get(i)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, column: &'static str) -> Result<&str, InputError> {
        self.get(column).ok_or(InputError::BlankField { line: self.line, column })
    }

    fn parsed<T: FromStr>(&self, column: &'static str) -> Result<Option<T>, InputError>
    where
        T::Err: ToString,
    {
        self.get(column)
            .map(|value| value.parse::<T>())
            .transpose()
            .map_err(|err| InputError::InvalidValue { line: self.line, column, message: err.to_string() })
    }

    fn flag(&self, column: &'static str) -> Result<Option<bool>, InputError> {
        match self.get(column) {
            None => Ok(None),
            Some(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(Some(true)),
                "0" | "false" | "no" => Ok(Some(false)),
                _ => Err(InputError::InvalidValue {
                    line: self.line,
                    column,
                    message: format!("expected 0/1 or true/false, got '{value}'"),
                }),
            },
        }
    }

    fn to_upload(&self, workspace: &str) -> Result<UploadSpec, InputError> {
        let mut upload = UploadSpec::new(
            PathBuf::from(self.required("forward_file")?),
            self.get("reverse_file").map(PathBuf::from),
            self.required("name")?.to_string(),
            workspace.to_string(),
        );

        if let Some(tech) = self.parsed("sequencing_tech")? {
            upload.sequencing_tech = tech;
        }
        if let Some(import_type) = self.parsed("import_type")? {
            upload.import_type = import_type;
        }
        upload.insert_size_mean = self.parsed("insert_size_mean")?;
        upload.insert_size_std_dev = self.parsed("insert_size_std_dev")?;
        if let Some(interleaved) = self.flag("interleaved")? {
            upload.interleaved = interleaved;
        }
        if let Some(outward) = self.flag("read_orientation_outward")? {
            upload.read_orientation_outward = outward;
        }
        if let Some(single_genome) = self.flag("single_genome")? {
            upload.single_genome = single_genome;
        }
        upload.sra_file = self.get("sra_file").map(PathBuf::from);

        Ok(upload)
    }
}

/// Split a single line into cells, handling quoted fields and `""` escapes
fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else if ch == '"' {
            in_quotes = true;
        } else if ch == delimiter {
            result.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    result.push(current);
    result
}
