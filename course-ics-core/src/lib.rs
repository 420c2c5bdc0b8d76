//! Course ICS Core Library
//!
//! Turns course rows captured from a schedule (OCR or manual entry) into
//! weekly-recurring calendar events, and exports them as an RFC 5545
//! document or as Google Calendar quick-add links.

pub mod compile;
pub mod error;
pub mod expand;
pub mod ics;
pub mod moment;
pub mod normalize;
pub mod parse;
pub mod quick_add;
pub mod reference;
pub mod review;
pub mod types;

// Re-export core types and error handling
pub use error::{Error, Result};
pub use types::*;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        compile::{Compilation, ValidationReport, compile},
        expand::{EventExpander, SkipReason, SkipReport},
        ics::IcsGenerator,
        normalize::{NormalizedCourse, Normalizer, ValidationIssue},
        quick_add::{QuickAddLink, build_quick_add_links},
        reference::{LookupSource, ReferenceTable},
        types::*,
    };
}
