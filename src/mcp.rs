//! [Model Context Protocol](https://modelcontextprotocol.io) gateway over standard input and output.

mod protocol;
mod server;
mod tools;

pub use self::server::Server;
