use strum::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;

/// Top-level delivery folders recognized as supplier categories.
const NETWORK_FOLDER: &str = "network-type";
const DISTRIBUTOR_FOLDER: &str = "distributor-type";

/// Segments expected after the supplier folder: year, month, client,
/// report type, and at least a file name.
const SEGMENTS_AFTER_SUPPLIER: usize = 5;

#[derive(AsRefStr, EnumIter, EnumString, Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum ProviderKind {
    #[strum(serialize = "NETWORK")]
    Network,
    #[strum(serialize = "DISTRIBUTOR")]
    Distributor,
}

impl ProviderKind {
    pub fn long_name(&self) -> &'static str {
        match self {
            ProviderKind::Network => "Network",
            ProviderKind::Distributor => "Distributor",
        }
    }

    fn from_folder(folder: &str) -> Option<Self> {
        match folder {
            NETWORK_FOLDER => Some(ProviderKind::Network),
            DISTRIBUTOR_FOLDER => Some(ProviderKind::Distributor),
            _ => None,
        }
    }
}

/// The closed set of reasons a delivery path can fail classification.
/// These are per-file conditions - the scan continues past them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("no supplier folder ('{NETWORK_FOLDER}'/'{DISTRIBUTOR_FOLDER}') in path")]
    NoSupplierSegment,

    #[error("too few path segments after supplier folder")]
    PathTooShort,

    #[error("year/month folders are not numeric: year='{year}', month='{month}'")]
    NonNumericPeriod { year: String, month: String },

    #[error("month {0} is outside 1..=12")]
    InvalidMonth(i32),
}

/// Metadata extracted from a delivery path. Everything the registry needs
/// besides the path itself and the file timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSource {
    pub provider: ProviderKind,
    pub report_year: i32,
    pub report_month: i32,
    pub client_name: String,
    pub report_type: String,
}

/// Classifies a root-relative path, supplied as its ordered segments.
///
/// The expected layout is
/// `<supplier>/<year>/<month>/<client>/<report type>/<file>`, where the
/// supplier folder may sit below additional grouping folders. Segments after
/// the report type are not interpreted. Pure function of its input.
pub fn classify(segments: &[&str]) -> Result<ReportSource, ClassifyError> {
    let supplier_idx = segments
        .iter()
        .position(|seg| ProviderKind::from_folder(seg).is_some())
        .ok_or(ClassifyError::NoSupplierSegment)?;

    if segments.len() < supplier_idx + 1 + SEGMENTS_AFTER_SUPPLIER {
        return Err(ClassifyError::PathTooShort);
    }

    let year_str = segments[supplier_idx + 1];
    let month_str = segments[supplier_idx + 2];

    let (year, month) = match (year_str.parse::<i32>(), month_str.parse::<i32>()) {
        (Ok(year), Ok(month)) => (year, month),
        _ => {
            return Err(ClassifyError::NonNumericPeriod {
                year: year_str.to_owned(),
                month: month_str.to_owned(),
            })
        }
    };

    if !(1..=12).contains(&month) {
        return Err(ClassifyError::InvalidMonth(month));
    }

    // Unwrap is safe: position() above only matches supplier folders
    let provider = ProviderKind::from_folder(segments[supplier_idx]).unwrap();

    Ok(ReportSource {
        provider,
        report_year: year,
        report_month: month,
        client_name: segments[supplier_idx + 3].to_owned(),
        report_type: segments[supplier_idx + 4].to_owned(),
    })
}
