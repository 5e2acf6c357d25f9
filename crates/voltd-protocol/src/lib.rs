//! Wire protocol layer for the voltd power management daemon
//!
//! The daemon speaks a textual request/response protocol over a stream
//! socket: `get <field>` queries answered as `<field>: <value>`, mutations
//! acknowledged with `done`, and unsolicited tap-button notifications pushed
//! as bare `single`/`double`/`long` tokens on a second connection.
//!
//! This crate holds everything about that protocol that needs no socket:
//! response parsers, the field catalog, the tap-event wire representation,
//! the error taxonomy, and endpoint resolution. The connected client lives
//! in `voltd-client`.

mod error;
mod events;
mod fields;
mod lifecycle;
mod parse;

pub use error::{Error, Result};
pub use events::TapEvent;
pub use fields::{
    check_charging_range, lookup, Bounds, Direction, FieldSpec, Revision, FIELDS,
};
pub use lifecycle::{socket_path, DEFAULT_TCP_PORT};
pub use parse::{
    assert_done, contains, parse_bool, parse_float, parse_int, parse_text, FieldValue, ParserKind,
};
