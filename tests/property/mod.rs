//! Property-based tests for relevance, selection and inheritance

mod inheritance;
mod selection;
