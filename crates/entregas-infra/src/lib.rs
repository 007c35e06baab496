//! Infrastructure layer for entregas: bulk CSV import into an entity store

pub mod csv_import;

pub use csv_import::{
    import_all, import_stage, FileReport, ImportError, ImportReport, RowDiagnostic, Stage,
};
