//! Library side of the `formstate` command: definition loading, session
//! replay, logging and terminal rendering.

pub mod definition;
pub mod logging;
pub mod script;
pub mod summary;
