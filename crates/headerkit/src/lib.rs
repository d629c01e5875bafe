//! # headerkit
//!
//! Parse HTTP and email header blocks into an ordered, case-insensitive object
//! model, query and edit it, and serialize it back.
//!
//! ## Features
//!
//! - **Tolerant parsing**: folded lines, mixed line endings, status lines and
//!   malformed lines never make parsing fail
//! - **Comma explosion**: `Accept: a, b` becomes two `Accept` headers, while
//!   quoted strings, comments and HTTP dates stay whole
//! - **Attributes**: `text/html; charset=UTF-8` is an ordered, multi-valued,
//!   case-insensitive store of members and `key=value` pairs
//! - **RFC 2047**: `=?charset?B|Q?...?=` encoded words are decoded
//! - **Raw bytes**: the decodable header block is separated from the body
//!
//! ## Quick Start
//!
//! ```
//! use headerkit::{parse, OneOrMany};
//!
//! let headers = parse(
//!     "HTTP/1.1 200 OK\r\n\
//!      Content-Type: text/html; charset=UTF-8\r\n\
//!      Set-Cookie: id=a3fWa; Max-Age=2592000\r\n\
//!      Set-Cookie: lang=en; Path=/\r\n",
//! );
//!
//! assert!(headers.has("content-type"));
//! assert_eq!(headers.get_all("set_cookie").len(), 2);
//!
//! let content_type = headers.get_all("Content-Type")[0];
//! assert_eq!(content_type.get("charset"), Some(OneOrMany::One("UTF-8".to_string())));
//! ```
//!
//! ### Editing
//!
//! ```
//! use headerkit::{Header, Headers};
//!
//! let mut headers = Headers::new();
//! headers.push(Header::new("Content-Type", "text/html")?);
//! headers.set("Accept", "application/json, text/plain")?;
//!
//! for header in headers.iter_mut().filter(|h| h.name() == "Content-Type") {
//!     header.set("charset", "UTF-8");
//! }
//!
//! assert_eq!(
//!     headers.to_text(),
//!     "Content-Type: text/html; charset=UTF-8\r\nAccept: application/json, text/plain"
//! );
//! # Ok::<(), headerkit::Error>(())
//! ```
//!
//! ### Raw Bytes
//!
//! ```
//! let block = headerkit::extract_header_block(b"Host: example.com\r\n\r\n\x89PNG");
//! assert_eq!(block.headers, "Host: example.com\r\n");
//! assert_eq!(block.body, b"\x89PNG");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attributes;
mod encoding;
mod error;
mod header;
mod headers;
mod normalize;
mod options;
mod parser;
mod split;

pub mod registry;

pub use attributes::{build_attribute_store, Attribute, AttributeStore, Member, ValueFilter};
pub use encoding::{decode_encoded_words, extract_header_block, HeaderBlock};
pub use error::{Error, Result};
pub use header::Header;
pub use headers::{HeaderMap, Headers, Needle};
pub use normalize::{
    extract_comments, is_legal_header_name, normalize_name, prettify_name, quote, unfold,
    unquote,
};
pub use options::{OneOrMany, OutputShape, ParseOptions};
pub use parser::{parse, parse_bytes, parse_bytes_with, parse_with, tokenize_entries};
pub use split::{split_entries, split_members, split_respecting_quotes};
