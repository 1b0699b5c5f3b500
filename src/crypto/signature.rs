use strum_macros::{Display, EnumString};

// See: https://www.rfc-editor.org/rfc/rfc7518
// See: https://www.rfc-editor.org/rfc/rfc8037.html#appendix-A.4
// The non-RFC names cover the remaining algorithms of the varsig table in
// <https://github.com/ucan-wg/ucan-ipld#25-signature>.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
pub enum JwtSignatureAlgorithm {
    EdDSA,
    RS256,
    ES256,
    ES384,
    ES512,
    ES256K,
    BLS12381G1,
    BLS12381G2,
    EIP191,
}
