//! Response body compression and `accept-encoding` negotiation.

use std::io::Write;

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};

/// Content encodings the response adapter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Gzip,
    Deflate,
}

impl Encoding {
    /// Token used in `accept-encoding` and `content-encoding`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
        }
    }

    /// Encode a whole payload.
    ///
    /// `deflate` produces the zlib container, which is what HTTP means by it.
    pub fn encode(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            Encoding::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Encoding::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `accept-encoding` values into lowercase tokens.
///
/// Tokens weighted `q=0` are refused by the client and left out; other
/// weights are not ranked.
pub fn accepted_encodings<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    values
        .into_iter()
        .flat_map(|value| value.split(','))
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let token = parts.next()?.trim().to_ascii_lowercase();
            let refused = parts.any(|param| is_zero_weight(param.trim()));
            (!token.is_empty() && !refused).then_some(token)
        })
        .collect()
}

fn is_zero_weight(param: &str) -> bool {
    let Some((key, value)) = param.split_once('=') else {
        return false;
    };
    key.trim().eq_ignore_ascii_case("q")
        && value.trim().parse::<f32>().is_ok_and(|q| q <= 0.0)
}
