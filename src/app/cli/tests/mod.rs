//! CLI test modules
