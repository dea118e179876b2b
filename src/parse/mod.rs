mod outline;
mod references;

pub use outline::{HeadingNode, find_heading, flatten_outline, parse_outline};
pub use references::{ReferenceSpan, extract_reference_spans};
