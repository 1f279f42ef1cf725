//! Collection of general utility functions and common traits.
//!
//! This module serves as a repository for small, reusable helpers that do not
//! fit into a specific domain module: random identifiers, the clock
//! abstraction and client-origin extraction.

pub mod clock;
pub mod generate_random_string;
pub mod network;
