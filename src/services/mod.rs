//! Services for querying, reshaping and writing reports

pub mod client;
pub mod dates;
pub mod query;
pub mod report;
pub mod reshape;
pub mod writer;

pub use client::{HttpSearchClient, SearchBackend};
pub use dates::{date_to_string, default_window, parse_date, ReportTimeZone};
pub use query::{QuerySpec, TermFilter};
pub use report::{load_raw, summarize_file, summarize_value, ReportOutcome, ReportService};
pub use reshape::Reshaper;
pub use writer::ReportWriter;
