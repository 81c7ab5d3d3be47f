//! `encodeURI`-compatible percent-encoding for full URLs.
//!
//! Reserved URL delimiters (`/`, `?`, `#`, `&`, ...) are left intact so a
//! complete URL survives encoding; everything else outside the unreserved
//! set is encoded byte-wise from its UTF-8 form. `%` is encoded too, so an
//! already-encoded path must be flagged rather than passed through here.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes `encodeURI` escapes: everything but alphanumerics, the URL
/// delimiters and the unreserved marks.
const URI: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Percent-encode `url`, preserving URL delimiters.
pub fn encode_uri(url: &str) -> String {
    utf8_percent_encode(url, URI).to_string()
}
