pub mod router;

pub use router::{Addressing, MessageRouter};
