//! Sieve search: facet counts, the filter string codec, filter toggles and
//! item matching over caller-supplied extractors.
//!
//! Everything here is a pure function of its inputs; updates always produce
//! new values.

#![forbid(unsafe_code)]

pub mod accordion;
pub mod active;
pub mod codec;
pub mod facets;
pub mod matching;
pub mod toggle;

pub use accordion::{AccordionEntry, AccordionSection, FilterAccordion};
pub use active::{ActiveFilterSet, FilterTerm};
pub use codec::{parse, parse_strict, serialize, ParseError};
pub use facets::{compute_facets, order_sections, FacetTable, Section};
pub use matching::{filter_items, matches, FilterMatcher};
pub use toggle::{is_filter_active, is_target_active, toggle_filter, toggle_target};
