// Blocking TLS over interruptible socket waits.

pub mod connection;
pub mod context;
pub mod waiter;

pub use connection::TlsConnection;
pub use context::{ClientContext, ClientContextBuilder, ServerContext, ServerContextBuilder};
pub use waiter::{SocketWaiter, WaitDirection, WaitOutcome};
