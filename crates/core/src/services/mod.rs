//! Adapters for the external collaborators: the native scanner and the
//! structural header parser.

pub mod backends;
pub mod header;
pub mod scanner;

pub use header::{detect_header, executable_sections, HeaderError, HeaderKind};
pub use scanner::{
    default_scanner_registry, parse_scan_output, read_scan_output, ScanError, ScanRequest,
    ScanStatus, ScannerBackend, ScannerConfig, ScannerHandle, ScannerRegistry,
};
