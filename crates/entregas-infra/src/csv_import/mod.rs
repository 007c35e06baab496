//! Bulk CSV import
//!
//! Reads `customers.csv`, `drivers.csv`, `vehicles.csv`, `routes.csv` and
//! `deliveries.csv` from one directory, in that order, and upserts every row
//! by its natural key. Each row runs in its own store transaction; a failing
//! row is skipped and reported, the rest of the file still loads.
//!
//! Files are decoded as UTF-8, falling back to Windows-1252 for exports from
//! older spreadsheet tools.

mod fields;
mod rows;

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use entregas_store::EntityStore;
use entregas_types::Error;

pub use fields::split_keys;
pub use rows::{route_by_name, CustomerRow, DeliveryRow, DriverRow, Outcome, RouteRow, VehicleRow};

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("Import directory not found: {0}")]
    NoDirectory(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse CSV header of {path}: {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Missing required column in {file}: {column}")]
    MissingColumn { file: String, column: String },
}

impl From<ImportError> for Error {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Read { source, .. } => Error::Io(source),
            other => Error::Validation(other.to_string()),
        }
    }
}

/// One import file, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Customers,
    Drivers,
    Vehicles,
    Routes,
    Deliveries,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Customers,
        Stage::Drivers,
        Stage::Vehicles,
        Stage::Routes,
        Stage::Deliveries,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Stage::Customers => "customers.csv",
            Stage::Drivers => "drivers.csv",
            Stage::Vehicles => "vehicles.csv",
            Stage::Routes => "routes.csv",
            Stage::Deliveries => "deliveries.csv",
        }
    }

    /// Required columns; each entry lists the accepted header names
    fn required_columns(&self) -> &'static [&'static [&'static str]] {
        match self {
            Stage::Customers => &[&["tax_id", "cpf_cliente", "cpf"], &["name", "nome_cliente"]],
            Stage::Drivers => &[
                &["tax_id", "cpf"],
                &["name", "nome_motorista"],
                &["registered_on", "data_cadastro"],
                &["license_class", "cnh"],
            ],
            Stage::Vehicles => &[
                &["plate", "placa"],
                &["model", "modelo"],
                &["max_capacity", "capacidade_maxima"],
            ],
            Stage::Routes => &[
                &["name", "nome_rota"],
                &["driver", "motorista"],
                &["vehicle", "veiculo"],
                &["scheduled_on", "data_rota"],
            ],
            Stage::Deliveries => &[
                &["tracking_code", "codigo_rastreio"],
                &["customer", "cliente"],
                &["capacity_required", "capacidade_necessaria"],
                &["requested_on", "data_solicitacao"],
            ],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A skipped row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDiagnostic {
    pub file: String,
    /// 1-based line in the file, the header being line 1
    pub line: u64,
    pub rule: &'static str,
    pub message: String,
}

impl fmt::Display for RowDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

/// Result of importing one file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub stage: Stage,
    pub path: PathBuf,
    /// File was absent and skipped
    pub missing: bool,
    pub encoding: &'static str,
    pub created: usize,
    pub updated: usize,
    pub skipped: Vec<RowDiagnostic>,
}

impl FileReport {
    fn new(stage: Stage, path: PathBuf) -> Self {
        Self {
            stage,
            path,
            missing: false,
            encoding: UTF_8.name(),
            created: 0,
            updated: 0,
            skipped: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.created + self.updated + self.skipped.len()
    }
}

/// Result of importing a whole directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub files: Vec<FileReport>,
}

impl ImportReport {
    pub fn created(&self) -> usize {
        self.files.iter().map(|f| f.created).sum()
    }

    pub fn updated(&self) -> usize {
        self.files.iter().map(|f| f.updated).sum()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &RowDiagnostic> {
        self.files.iter().flat_map(|f| f.skipped.iter())
    }

    pub fn missing_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.missing)
    }
}

/// Decode file bytes, UTF-8 (BOM aware) first and Windows-1252 otherwise
pub fn decode(bytes: &[u8]) -> (Cow<'_, str>, &'static Encoding) {
    let (text, encoding, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return (text, encoding);
    }
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    (text, WINDOWS_1252)
}

fn check_headers(stage: Stage, headers: &csv::StringRecord) -> Result<(), ImportError> {
    for names in stage.required_columns() {
        if !headers.iter().any(|h| names.contains(&h)) {
            return Err(ImportError::MissingColumn {
                file: stage.file_name().to_string(),
                column: names[0].to_string(),
            });
        }
    }
    Ok(())
}

fn load_rows<S, T, F>(
    store: &S,
    stage: Stage,
    text: &str,
    report: &mut FileReport,
    apply: F,
) -> Result<(), ImportError>
where
    S: EntityStore,
    T: DeserializeOwned,
    F: Fn(T, &mut S::Tx) -> entregas_types::Result<Outcome>,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| ImportError::Header {
            path: report.path.clone(),
            source,
        })?
        .clone();
    check_headers(stage, &headers)?;

    for (index, record) in reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        let outcome = match record {
            Ok(record) => {
                let line = record.position().map_or(fallback_line, |p| p.line());
                let result = record
                    .deserialize::<T>(Some(&headers))
                    .map_err(|e| Error::Validation(e.to_string()))
                    .and_then(|row| store.transaction(|tx| apply(row, tx)));
                (line, result)
            }
            Err(e) => (fallback_line, Err(Error::Validation(e.to_string()))),
        };

        match outcome {
            (_, Ok(Outcome::Created)) => report.created += 1,
            (_, Ok(Outcome::Updated)) => report.updated += 1,
            (line, Err(err)) => {
                warn!(file = stage.file_name(), line, error = %err, "skipped import row");
                report.skipped.push(RowDiagnostic {
                    file: stage.file_name().to_string(),
                    line,
                    rule: err.rule(),
                    message: err.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Import one file of `dir`; a missing file is reported, not an error
pub fn import_stage<S>(store: &S, dir: &Path, stage: Stage) -> Result<FileReport, ImportError>
where
    S: EntityStore,
{
    let path = dir.join(stage.file_name());
    let mut report = FileReport::new(stage, path.clone());

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "import file not found, skipping");
            report.missing = true;
            return Ok(report);
        }
        Err(source) => return Err(ImportError::Read { path, source }),
    };

    let (text, encoding) = decode(&bytes);
    report.encoding = encoding.name();
    if encoding != UTF_8 {
        debug!(path = %path.display(), encoding = encoding.name(), "decoded with fallback encoding");
    }

    match stage {
        Stage::Customers => load_rows(store, stage, &text, &mut report, |row: CustomerRow, tx| row.apply(tx))?,
        Stage::Drivers => load_rows(store, stage, &text, &mut report, |row: DriverRow, tx| row.apply(tx))?,
        Stage::Vehicles => load_rows(store, stage, &text, &mut report, |row: VehicleRow, tx| row.apply(tx))?,
        Stage::Routes => load_rows(store, stage, &text, &mut report, |row: RouteRow, tx| row.apply(tx))?,
        Stage::Deliveries => {
            load_rows(store, stage, &text, &mut report, |row: DeliveryRow, tx| row.apply(tx))?
        }
    }

    info!(
        file = stage.file_name(),
        created = report.created,
        updated = report.updated,
        skipped = report.skipped.len(),
        "imported file"
    );
    Ok(report)
}

/// Import every file of `dir` in dependency order
pub fn import_all<S>(store: &S, dir: &Path) -> Result<ImportReport, ImportError>
where
    S: EntityStore,
{
    if !dir.is_dir() {
        return Err(ImportError::NoDirectory(dir.to_path_buf()));
    }

    let mut report = ImportReport::default();
    for stage in Stage::ALL {
        report.files.push(import_stage(store, dir, stage)?);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_and_bom() {
        let (text, encoding) = decode("São Paulo".as_bytes());
        assert_eq!(text, "São Paulo");
        assert_eq!(encoding, UTF_8);

        let mut with_bom = vec![0xEF, 0xBB, 0xBF];
        with_bom.extend_from_slice(b"tax_id");
        assert_eq!(decode(&with_bom).0, "tax_id");
    }

    #[test]
    fn test_decode_falls_back_to_windows_1252() {
        // "São" in Windows-1252
        let (text, encoding) = decode(&[0x53, 0xE3, 0x6F]);
        assert_eq!(text, "São");
        assert_eq!(encoding, WINDOWS_1252);
    }

    #[test]
    fn test_check_headers_accepts_aliases() {
        let english = csv::StringRecord::from(vec!["tax_id", "name"]);
        assert!(check_headers(Stage::Customers, &english).is_ok());

        let legacy = csv::StringRecord::from(vec!["cpf_cliente", "nome_cliente", "cidade"]);
        assert!(check_headers(Stage::Customers, &legacy).is_ok());

        let missing = csv::StringRecord::from(vec!["placa", "modelo"]);
        let err = check_headers(Stage::Vehicles, &missing).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn { ref column, .. } if column == "max_capacity"));
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<&str> = Stage::ALL.iter().map(Stage::file_name).collect();
        assert_eq!(
            names,
            vec!["customers.csv", "drivers.csv", "vehicles.csv", "routes.csv", "deliveries.csv"]
        );
    }
}
