//! Runtime core: the lifecycle tree and its adapters.
//!
//! The only public type from this module is [`Node`]; the sibling modules
//! extend it rather than standing alone:
//! - [`node`]: construction, task accounting, shutdown, join, queries;
//! - [`ticker`]: bounded lossy periodic spawning;
//! - [`signals`]: optional OS termination-signal wiring.

mod node;
mod signals;
mod ticker;

pub use node::Node;
